// The different states of the tokenizer
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum State {
    DataState,
    RcDataState,
    RcDataLessThanSignState,
    RcDataEndTagOpenState,
    RcDataEndTagNameState,
    RawTextState,
    RawTextLessThanSignState,
    RawTextEndTagOpenState,
    RawTextEndTagNameState,
    ScriptDataState,
    ScriptDataLessThanSignState,
    ScriptDataEndTagOpenState,
    ScriptDataEndTagNameState,
    ScriptDataEscapeStartState,
    ScriptDataEscapeStartDashState,
    ScriptDataEscapedState,
    ScriptDataEscapedDashState,
    ScriptDataEscapedDashDashState,
    ScriptDataEscapedLessThanSignState,
    ScriptDataEscapedEndTagOpenState,
    ScriptDataEscapedEndTagNameState,
    ScriptDataDoubleEscapeStartState,
    ScriptDataDoubleEscapedState,
    ScriptDataDoubleEscapedDashState,
    ScriptDataDoubleEscapedDashDashState,
    ScriptDataDoubleEscapedLessThanSignState,
    ScriptDataDoubleEscapeEndState,
    PlaintextState,
    TagOpenState,
    EndTagOpenState,
    TagNameState,
    BeforeAttributeNameState,
    AttributeNameState,
    AfterAttributeNameState,
    BeforeAttributeValueState,
    AttributeValueDoubleQuotedState,
    AttributeValueSingleQuotedState,
    AttributeValueUnquotedState,
    AfterAttributeValueQuotedState,
    SelfClosingStartState,
    BogusCommentState,
    MarkupDeclarationOpenState,
    CommentStartState,
    CommentStartDashState,
    CommentState,
    CommentLessThanSignState,
    CommentLessThanSignBangState,
    CommentLessThanSignBangDashState,
    CommentLessThanSignBangDashDashState,
    CommentEndDashState,
    CommentEndState,
    CommentEndBangState,
    DocTypeState,
    BeforeDocTypeNameState,
    DocTypeNameState,
    AfterDocTypeNameState,
    AfterDocTypePublicKeywordState,
    BeforeDocTypePublicIdentifierState,
    DocTypePublicIdentifierDoubleQuotedState,
    DocTypePublicIdentifierSingleQuotedState,
    AfterDocTypePublicIdentifierState,
    BetweenDocTypePublicAndSystemIdentifiersState,
    AfterDocTypeSystemKeywordState,
    BeforeDocTypeSystemIdentifierState,
    DocTypeSystemIdentifierDoubleQuotedState,
    DocTypeSystemIdentifierSingleQuotedState,
    AfterDocTypeSystemIdentifierState,
    BogusDocTypeState,
    CDataSectionState,
    CDataSectionBracketState,
    CDataSectionEndState,
}
