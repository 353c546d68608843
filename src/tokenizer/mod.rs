pub mod state;
pub mod token;

use crate::error_logger::{ErrorLogger, ParserError};
use crate::errors::Result;
use crate::input_stream::{InputStream, Location};
use crate::node::Attributes;
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

// Constants that are not directly captured as visible chars
pub const CHAR_NUL: char = '\u{0000}';
pub const CHAR_TAB: char = '\u{0009}';
pub const CHAR_LF: char = '\u{000A}';
pub const CHAR_FF: char = '\u{000C}';
pub const CHAR_SPACE: char = '\u{0020}';
pub const CHAR_REPLACEMENT: char = '\u{FFFD}';

/// The tokenizer reads the input stream and emits tokens that are consumed by
/// the tree builder. Entity references are not decoded; an ampersand flows
/// through as literal text.
pub struct Tokenizer<'a> {
    pub stream: &'a mut InputStream, // HTML character input stream
    pub state: State,                // Current state of the tokenizer
    pub consumed: String,            // Current consumed characters for the pending text token
    pub current_attr_name: String,   // Name of the attribute currently being tokenized
    pub current_attr_value: String,  // Value of the attribute currently being tokenized
    pub current_attrs: Attributes,   // Attributes tokenized so far for the current tag
    pub current_token: Option<Token>, // Token that is currently in the making (if any)
    pub temporary_buffer: String,    // Temporary buffer
    pub token_queue: Vec<Token>, // Queue of emitted tokens. Needed because we can generate multiple tokens during iteration
    pub last_start_token: String, // The last emitted start token (or empty if none)
    cdata_allowed: bool,         // Set by the tree builder while the adjusted current node is foreign
    token_location: Location,    // Where the token in the making began
    text_location: Location,     // Where the pending text run began
    pub error_logger: Rc<RefCell<ErrorLogger>>, // Parse errors
}

pub struct Options {
    pub initial_state: State, // Sets the initial state of the tokenizer. Normally only needed when dealing with tests
    pub last_start_tag: String, // Sets the last starting tag in the tokenizer. Normally only needed when dealing with tests
}

macro_rules! read_char {
    ($self:expr) => {{
        let c = $self.stream.read_char();
        match c {
            Some(ch) if $self.is_control_char(ch as u32) => {
                $self.parse_error(ParserError::ControlCharacterInInputStream);
            }
            Some(ch) if $self.is_noncharacter(ch as u32) => {
                $self.parse_error(ParserError::NoncharacterInInputStream);
            }
            _ => {}
        }

        c
    }};
}

// Adds the given character to the current token's value (if applicable)
macro_rules! add_to_token_value {
    ($self:expr, $c:expr) => {
        if let Some(Token::Comment { value, .. }) = &mut $self.current_token {
            value.push($c);
        }
    };
}

macro_rules! set_public_identifier {
    ($self:expr, $str:expr) => {
        if let Some(Token::DocType { pub_identifier, .. }) = &mut $self.current_token {
            *pub_identifier = Some($str);
        }
    };
}

macro_rules! add_public_identifier {
    ($self:expr, $c:expr) => {
        if let Some(Token::DocType {
            pub_identifier: Some(pid),
            ..
        }) = &mut $self.current_token
        {
            pid.push($c);
        }
    };
}

macro_rules! set_system_identifier {
    ($self:expr, $str:expr) => {
        if let Some(Token::DocType { sys_identifier, .. }) = &mut $self.current_token {
            *sys_identifier = Some($str);
        }
    };
}

macro_rules! add_system_identifier {
    ($self:expr, $c:expr) => {
        if let Some(Token::DocType {
            sys_identifier: Some(sid),
            ..
        }) = &mut $self.current_token
        {
            sid.push($c);
        }
    };
}

// Adds the given character to the current token's name (if applicable)
macro_rules! add_to_token_name {
    ($self:expr, $c:expr) => {
        match &mut $self.current_token {
            Some(Token::StartTag { name, .. }) => {
                name.push($c);
            }
            Some(Token::EndTag { name, .. }) => {
                name.push($c);
            }
            Some(Token::DocType { name, .. }) => {
                // Doctype can have an optional name
                match name {
                    Some(ref mut string) => string.push($c),
                    None => *name = Some($c.to_string()),
                }
            }
            _ => {}
        }
    };
}

// Convert a character to lower case value (assumes character is in A-Z range)
macro_rules! to_lowercase {
    ($c:expr) => {
        ((($c) as u8) + 0x20) as char
    };
}

// Sets the force_quirks flag on the doctype token in the making
macro_rules! set_quirks_mode {
    ($self:expr) => {
        if let Some(Token::DocType { force_quirks, .. }) = &mut $self.current_token {
            *force_quirks = true;
        }
    };
}

// Emits the given token. Any pending text run is flushed first.
macro_rules! emit_token {
    ($self:expr, $token:expr) => {{
        let token = $token;

        // Save the start token name if we are pushing it. This helps us in detecting matching tags.
        if let Token::StartTag { name, .. } = &token {
            $self.last_start_token = String::from(name);
        }

        if $self.has_consumed_data() {
            let value = $self.get_consumed_str().to_string();
            let location = $self.text_location;
            $self.token_queue.push(Token::Text { value, location });
            $self.clear_consume_buffer();
        }

        $self.token_queue.push(token);
    }};
}

// Emits the current stored token
macro_rules! emit_current_token {
    ($self:expr) => {
        if let Some(token) = $self.current_token.take() {
            emit_token!($self, token);
        }
    };
}

// Emits an EOF token at the current stream position
macro_rules! emit_eof {
    ($self:expr) => {
        emit_token!(
            $self,
            Token::Eof {
                location: $self.stream.location(),
            }
        )
    };
}

impl<'a> Tokenizer<'a> {
    // Creates a new tokenizer with the given input stream and additional options if any
    pub fn new(
        input: &'a mut InputStream,
        opts: Option<Options>,
        error_logger: Rc<RefCell<ErrorLogger>>,
    ) -> Self {
        Tokenizer {
            stream: input,
            state: opts.as_ref().map_or(State::DataState, |o| o.initial_state),
            last_start_token: opts
                .as_ref()
                .map_or(String::new(), |o| o.last_start_tag.clone()),
            consumed: String::new(),
            current_token: None,
            token_queue: vec![],
            current_attr_name: String::new(),
            current_attr_value: String::new(),
            current_attrs: Attributes::new(),
            temporary_buffer: String::new(),
            cdata_allowed: false,
            token_location: Location::default(),
            text_location: Location::default(),
            error_logger,
        }
    }

    /// Location of the next character to be read
    pub(crate) fn get_location(&self) -> Location {
        self.stream.location()
    }

    /// The tree builder switches this on while the adjusted current node is a
    /// foreign (SVG or MathML) element, which makes CDATA sections legal.
    pub fn set_cdata_allowed(&mut self, allowed: bool) {
        self.cdata_allowed = allowed;
    }

    // Retrieves the next token from the input stream or Token::Eof when the end is reached
    pub fn next_token(&mut self) -> Result<Token> {
        self.consume_stream()?;

        if self.token_queue.is_empty() {
            return Ok(Token::Eof {
                location: self.stream.location(),
            });
        }

        Ok(self.token_queue.remove(0))
    }

    pub fn get_error_logger(&self) -> Ref<ErrorLogger> {
        self.error_logger.borrow()
    }

    // Consumes the input stream. Continues until the stream is completed or a token has been generated.
    fn consume_stream(&mut self) -> Result<()> {
        loop {
            // Something is already in the token buffer, so we can return it.
            if !self.token_queue.is_empty() {
                return Ok(());
            }

            match self.state {
                State::DataState => {
                    let c = read_char!(self);
                    match c {
                        Some('<') => {
                            self.mark_token_start();
                            self.state = State::TagOpenState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        None => emit_eof!(self),
                        Some(ch) => self.consume(ch),
                    }
                }
                State::RcDataState => {
                    let c = read_char!(self);
                    match c {
                        Some('<') => {
                            self.mark_token_start();
                            self.state = State::RcDataLessThanSignState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        None => emit_eof!(self),
                        Some(ch) => self.consume(ch),
                    }
                }
                State::RcDataLessThanSignState => {
                    let c = read_char!(self);
                    match c {
                        Some('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::RcDataEndTagOpenState;
                        }
                        _ => {
                            self.consume('<');
                            self.maybe_unread(c);
                            self.state = State::RcDataState;
                        }
                    }
                }
                State::RcDataEndTagOpenState => {
                    let c = read_char!(self);
                    match c {
                        Some(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(Token::EndTag {
                                name: "".into(),
                                location: self.token_location,
                            });
                            self.stream.unread();
                            self.state = State::RcDataEndTagNameState;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.maybe_unread(c);
                            self.state = State::RcDataState;
                        }
                    }
                }
                State::RcDataEndTagNameState => {
                    self.handle_end_tag_name(State::RcDataState);
                }
                State::RawTextState => {
                    let c = read_char!(self);
                    match c {
                        Some('<') => {
                            self.mark_token_start();
                            self.state = State::RawTextLessThanSignState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        None => emit_eof!(self),
                        Some(ch) => self.consume(ch),
                    }
                }
                State::RawTextLessThanSignState => {
                    let c = read_char!(self);
                    match c {
                        Some('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::RawTextEndTagOpenState;
                        }
                        _ => {
                            self.consume('<');
                            self.maybe_unread(c);
                            self.state = State::RawTextState;
                        }
                    }
                }
                State::RawTextEndTagOpenState => {
                    let c = read_char!(self);
                    match c {
                        Some(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(Token::EndTag {
                                name: "".into(),
                                location: self.token_location,
                            });
                            self.stream.unread();
                            self.state = State::RawTextEndTagNameState;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.maybe_unread(c);
                            self.state = State::RawTextState;
                        }
                    }
                }
                State::RawTextEndTagNameState => {
                    self.handle_end_tag_name(State::RawTextState);
                }
                State::ScriptDataState => {
                    let c = read_char!(self);
                    match c {
                        Some('<') => {
                            self.mark_token_start();
                            self.state = State::ScriptDataLessThanSignState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        None => emit_eof!(self),
                        Some(ch) => self.consume(ch),
                    }
                }
                State::ScriptDataLessThanSignState => {
                    let c = read_char!(self);
                    match c {
                        Some('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::ScriptDataEndTagOpenState;
                        }
                        Some('!') => {
                            self.consume('<');
                            self.consume('!');
                            self.state = State::ScriptDataEscapeStartState;
                        }
                        _ => {
                            self.consume('<');
                            self.maybe_unread(c);
                            self.state = State::ScriptDataState;
                        }
                    }
                }
                State::ScriptDataEndTagOpenState => {
                    let c = read_char!(self);
                    match c {
                        Some(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(Token::EndTag {
                                name: "".into(),
                                location: self.token_location,
                            });
                            self.stream.unread();
                            self.state = State::ScriptDataEndTagNameState;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.maybe_unread(c);
                            self.state = State::ScriptDataState;
                        }
                    }
                }
                State::ScriptDataEndTagNameState => {
                    self.handle_end_tag_name(State::ScriptDataState);
                }
                State::ScriptDataEscapeStartState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapeStartDashState;
                        }
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::ScriptDataState;
                        }
                    }
                }
                State::ScriptDataEscapeStartDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDashDashState;
                        }
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::ScriptDataState;
                        }
                    }
                }
                State::ScriptDataEscapedState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDashState;
                        }
                        Some('<') => {
                            self.mark_token_start();
                            self.state = State::ScriptDataEscapedLessThanSignState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        None => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            emit_eof!(self);
                        }
                        Some(ch) => self.consume(ch),
                    }
                }
                State::ScriptDataEscapedDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataEscapedDashDashState;
                        }
                        Some('<') => {
                            self.mark_token_start();
                            self.state = State::ScriptDataEscapedLessThanSignState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataEscapedState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            emit_eof!(self);
                        }
                        Some(ch) => {
                            self.consume(ch);
                            self.state = State::ScriptDataEscapedState;
                        }
                    }
                }
                State::ScriptDataEscapedDashDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => self.consume('-'),
                        Some('<') => {
                            self.mark_token_start();
                            self.state = State::ScriptDataEscapedLessThanSignState;
                        }
                        Some('>') => {
                            self.consume('>');
                            self.state = State::ScriptDataState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataEscapedState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            emit_eof!(self);
                        }
                        Some(ch) => {
                            self.consume(ch);
                            self.state = State::ScriptDataEscapedState;
                        }
                    }
                }
                State::ScriptDataEscapedLessThanSignState => {
                    let c = read_char!(self);
                    match c {
                        Some('/') => {
                            self.temporary_buffer.clear();
                            self.state = State::ScriptDataEscapedEndTagOpenState;
                        }
                        Some(ch) if ch.is_ascii_alphabetic() => {
                            self.temporary_buffer.clear();
                            self.consume('<');
                            self.stream.unread();
                            self.state = State::ScriptDataDoubleEscapeStartState;
                        }
                        _ => {
                            self.consume('<');
                            self.maybe_unread(c);
                            self.state = State::ScriptDataEscapedState;
                        }
                    }
                }
                State::ScriptDataEscapedEndTagOpenState => {
                    let c = read_char!(self);
                    match c {
                        Some(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(Token::EndTag {
                                name: "".into(),
                                location: self.token_location,
                            });
                            self.stream.unread();
                            self.state = State::ScriptDataEscapedEndTagNameState;
                        }
                        _ => {
                            self.consume('<');
                            self.consume('/');
                            self.maybe_unread(c);
                            self.state = State::ScriptDataEscapedState;
                        }
                    }
                }
                State::ScriptDataEscapedEndTagNameState => {
                    self.handle_end_tag_name(State::ScriptDataEscapedState);
                }
                State::ScriptDataDoubleEscapeStartState => {
                    let c = read_char!(self);
                    match c {
                        Some(ch @ (CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE | '/' | '>')) => {
                            if self.temporary_buffer == "script" {
                                self.state = State::ScriptDataDoubleEscapedState;
                            } else {
                                self.state = State::ScriptDataEscapedState;
                            }
                            self.consume(ch);
                        }
                        Some(ch @ 'A'..='Z') => {
                            self.temporary_buffer.push(to_lowercase!(ch));
                            self.consume(ch);
                        }
                        Some(ch @ 'a'..='z') => {
                            self.temporary_buffer.push(ch);
                            self.consume(ch);
                        }
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::ScriptDataEscapedState;
                        }
                    }
                }
                State::ScriptDataDoubleEscapedState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataDoubleEscapedDashState;
                        }
                        Some('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSignState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        None => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            emit_eof!(self);
                        }
                        Some(ch) => self.consume(ch),
                    }
                }
                State::ScriptDataDoubleEscapedDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => {
                            self.consume('-');
                            self.state = State::ScriptDataDoubleEscapedDashDashState;
                        }
                        Some('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSignState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataDoubleEscapedState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            emit_eof!(self);
                        }
                        Some(ch) => {
                            self.consume(ch);
                            self.state = State::ScriptDataDoubleEscapedState;
                        }
                    }
                }
                State::ScriptDataDoubleEscapedDashDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => self.consume('-'),
                        Some('<') => {
                            self.consume('<');
                            self.state = State::ScriptDataDoubleEscapedLessThanSignState;
                        }
                        Some('>') => {
                            self.consume('>');
                            self.state = State::ScriptDataState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                            self.state = State::ScriptDataDoubleEscapedState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInScriptHtmlCommentLikeText);
                            emit_eof!(self);
                        }
                        Some(ch) => {
                            self.consume(ch);
                            self.state = State::ScriptDataDoubleEscapedState;
                        }
                    }
                }
                State::ScriptDataDoubleEscapedLessThanSignState => {
                    let c = read_char!(self);
                    match c {
                        Some('/') => {
                            self.temporary_buffer.clear();
                            self.consume('/');
                            self.state = State::ScriptDataDoubleEscapeEndState;
                        }
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::ScriptDataDoubleEscapedState;
                        }
                    }
                }
                State::ScriptDataDoubleEscapeEndState => {
                    let c = read_char!(self);
                    match c {
                        Some(ch @ (CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE | '/' | '>')) => {
                            if self.temporary_buffer == "script" {
                                self.state = State::ScriptDataEscapedState;
                            } else {
                                self.state = State::ScriptDataDoubleEscapedState;
                            }
                            self.consume(ch);
                        }
                        Some(ch @ 'A'..='Z') => {
                            self.temporary_buffer.push(to_lowercase!(ch));
                            self.consume(ch);
                        }
                        Some(ch @ 'a'..='z') => {
                            self.temporary_buffer.push(ch);
                            self.consume(ch);
                        }
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::ScriptDataDoubleEscapedState;
                        }
                    }
                }
                State::PlaintextState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.consume(CHAR_REPLACEMENT);
                        }
                        None => emit_eof!(self),
                        Some(ch) => self.consume(ch),
                    }
                }
                State::TagOpenState => {
                    let c = read_char!(self);
                    match c {
                        Some('!') => self.state = State::MarkupDeclarationOpenState,
                        Some('/') => self.state = State::EndTagOpenState,
                        Some(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(Token::StartTag {
                                name: "".into(),
                                is_self_closing: false,
                                attributes: Attributes::new(),
                                location: self.token_location,
                            });
                            self.stream.unread();
                            self.state = State::TagNameState;
                        }
                        Some('?') => {
                            self.current_token = Some(Token::Comment {
                                value: "".into(),
                                location: self.token_location,
                            });
                            self.parse_error(ParserError::UnexpectedQuestionMarkInsteadOfTagName);
                            self.stream.unread();
                            self.state = State::BogusCommentState;
                        }
                        None => {
                            self.parse_error(ParserError::EofBeforeTagName);
                            self.consume('<');
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                            self.consume('<');
                            self.stream.unread();
                            self.state = State::DataState;
                        }
                    }
                }
                State::EndTagOpenState => {
                    let c = read_char!(self);
                    match c {
                        Some(ch) if ch.is_ascii_alphabetic() => {
                            self.current_token = Some(Token::EndTag {
                                name: "".into(),
                                location: self.token_location,
                            });
                            self.stream.unread();
                            self.state = State::TagNameState;
                        }
                        Some('>') => {
                            self.parse_error(ParserError::MissingEndTagName);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofBeforeTagName);
                            self.consume('<');
                            self.consume('/');
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(ParserError::InvalidFirstCharacterOfTagName);
                            self.current_token = Some(Token::Comment {
                                value: "".into(),
                                location: self.token_location,
                            });
                            self.stream.unread();
                            self.state = State::BogusCommentState;
                        }
                    }
                }
                State::TagNameState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeAttributeNameState
                        }
                        Some('/') => self.state = State::SelfClosingStartState,
                        Some('>') => {
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        Some(ch @ 'A'..='Z') => add_to_token_name!(self, to_lowercase!(ch)),
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_to_token_name!(self, CHAR_REPLACEMENT);
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(ch) => add_to_token_name!(self, ch),
                    }
                }
                State::BeforeAttributeNameState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('/') => {
                            self.store_and_clear_current_attribute();
                            self.state = State::SelfClosingStartState;
                        }
                        Some('>') => {
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        Some('=') => {
                            self.parse_error(ParserError::UnexpectedEqualsSignBeforeAttributeName);
                            self.store_and_clear_current_attribute();
                            self.current_attr_name.push('=');
                            self.state = State::AttributeNameState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.store_and_clear_current_attribute();
                            self.stream.unread();
                            self.state = State::AttributeNameState;
                        }
                    }
                }
                State::AttributeNameState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::AfterAttributeNameState
                        }
                        Some('/') => {
                            self.store_and_clear_current_attribute();
                            self.state = State::SelfClosingStartState;
                        }
                        Some('>') => {
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        Some('=') => self.state = State::BeforeAttributeValueState,
                        Some(ch @ 'A'..='Z') => self.current_attr_name.push(to_lowercase!(ch)),
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_attr_name.push(CHAR_REPLACEMENT);
                        }
                        Some(ch @ ('"' | '\'' | '<')) => {
                            self.parse_error(ParserError::UnexpectedCharacterInAttributeName);
                            self.current_attr_name.push(ch);
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(ch) => self.current_attr_name.push(ch),
                    }
                }
                State::AfterAttributeNameState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('/') => {
                            self.store_and_clear_current_attribute();
                            self.state = State::SelfClosingStartState;
                        }
                        Some('=') => self.state = State::BeforeAttributeValueState,
                        Some('>') => {
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.store_and_clear_current_attribute();
                            self.stream.unread();
                            self.state = State::AttributeNameState;
                        }
                    }
                }
                State::BeforeAttributeValueState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('"') => self.state = State::AttributeValueDoubleQuotedState,
                        Some('\'') => self.state = State::AttributeValueSingleQuotedState,
                        Some('>') => {
                            self.parse_error(ParserError::MissingAttributeValue);
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.stream.unread();
                            self.state = State::AttributeValueUnquotedState;
                        }
                    }
                }
                State::AttributeValueDoubleQuotedState => {
                    let c = read_char!(self);
                    match c {
                        Some('"') => self.state = State::AfterAttributeValueQuotedState,
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_attr_value.push(CHAR_REPLACEMENT);
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(ch) => self.current_attr_value.push(ch),
                    }
                }
                State::AttributeValueSingleQuotedState => {
                    let c = read_char!(self);
                    match c {
                        Some('\'') => self.state = State::AfterAttributeValueQuotedState,
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_attr_value.push(CHAR_REPLACEMENT);
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(ch) => self.current_attr_value.push(ch),
                    }
                }
                State::AttributeValueUnquotedState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.store_and_clear_current_attribute();
                            self.state = State::BeforeAttributeNameState;
                        }
                        Some('>') => {
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_attr_value.push(CHAR_REPLACEMENT);
                        }
                        Some(ch @ ('"' | '\'' | '<' | '=' | '`')) => {
                            self.parse_error(
                                ParserError::UnexpectedCharacterInUnquotedAttributeValue,
                            );
                            self.current_attr_value.push(ch);
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(ch) => self.current_attr_value.push(ch),
                    }
                }
                State::AfterAttributeValueQuotedState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.store_and_clear_current_attribute();
                            self.state = State::BeforeAttributeNameState;
                        }
                        Some('/') => {
                            self.store_and_clear_current_attribute();
                            self.state = State::SelfClosingStartState;
                        }
                        Some('>') => {
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(ParserError::MissingWhitespaceBetweenAttributes);
                            self.store_and_clear_current_attribute();
                            self.stream.unread();
                            self.state = State::BeforeAttributeNameState;
                        }
                    }
                }
                State::SelfClosingStartState => {
                    let c = read_char!(self);
                    match c {
                        Some('>') => {
                            match &mut self.current_token {
                                Some(Token::StartTag { is_self_closing, .. }) => {
                                    *is_self_closing = true;
                                }
                                Some(Token::EndTag { .. }) => {
                                    // reported below, outside the borrow
                                }
                                _ => {}
                            }
                            if matches!(self.current_token, Some(Token::EndTag { .. })) {
                                self.parse_error(ParserError::EndTagWithTrailingSolidus);
                            }
                            self.emit_current_tag();
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInTag);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(ParserError::UnexpectedSolidusInTag);
                            self.stream.unread();
                            self.state = State::BeforeAttributeNameState;
                        }
                    }
                }
                State::MarkupDeclarationOpenState => {
                    if self.stream.look_ahead_slice(2) == "--" {
                        let pos = self.stream.tell();
                        self.stream.seek(pos + 2);
                        self.current_token = Some(Token::Comment {
                            value: "".into(),
                            location: self.token_location,
                        });
                        self.state = State::CommentStartState;
                    } else if self.stream.look_ahead_slice(7).eq_ignore_ascii_case("doctype") {
                        let pos = self.stream.tell();
                        self.stream.seek(pos + 7);
                        self.state = State::DocTypeState;
                    } else if self.stream.look_ahead_slice(7) == "[CDATA[" {
                        let pos = self.stream.tell();
                        self.stream.seek(pos + 7);

                        if self.cdata_allowed {
                            self.state = State::CDataSectionState;
                        } else {
                            self.parse_error(ParserError::CdataInHtmlContent);
                            self.current_token = Some(Token::Comment {
                                value: "[CDATA[".into(),
                                location: self.token_location,
                            });
                            self.state = State::BogusCommentState;
                        }
                    } else {
                        self.parse_error(ParserError::IncorrectlyOpenedComment);
                        self.current_token = Some(Token::Comment {
                            value: "".into(),
                            location: self.token_location,
                        });
                        self.state = State::BogusCommentState;
                    }
                }
                State::BogusCommentState => {
                    let c = read_char!(self);
                    match c {
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_to_token_value!(self, CHAR_REPLACEMENT);
                        }
                        Some(ch) => add_to_token_value!(self, ch),
                    }
                }
                State::CommentStartState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => self.state = State::CommentStartDashState,
                        Some('>') => {
                            self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::CommentState;
                        }
                    }
                }
                State::CommentStartDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => self.state = State::CommentEndState,
                        Some('>') => {
                            self.parse_error(ParserError::AbruptClosingOfEmptyComment);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInComment);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            add_to_token_value!(self, '-');
                            self.stream.unread();
                            self.state = State::CommentState;
                        }
                    }
                }
                State::CommentState => {
                    let c = read_char!(self);
                    match c {
                        Some('<') => {
                            add_to_token_value!(self, '<');
                            self.state = State::CommentLessThanSignState;
                        }
                        Some('-') => self.state = State::CommentEndDashState,
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_to_token_value!(self, CHAR_REPLACEMENT);
                        }
                        None => {
                            self.parse_error(ParserError::EofInComment);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(ch) => add_to_token_value!(self, ch),
                    }
                }
                State::CommentLessThanSignState => {
                    let c = read_char!(self);
                    match c {
                        Some('!') => {
                            add_to_token_value!(self, '!');
                            self.state = State::CommentLessThanSignBangState;
                        }
                        Some('<') => add_to_token_value!(self, '<'),
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::CommentState;
                        }
                    }
                }
                State::CommentLessThanSignBangState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => self.state = State::CommentLessThanSignBangDashState,
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::CommentState;
                        }
                    }
                }
                State::CommentLessThanSignBangDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => self.state = State::CommentLessThanSignBangDashDashState,
                        _ => {
                            self.maybe_unread(c);
                            self.state = State::CommentEndDashState;
                        }
                    }
                }
                State::CommentLessThanSignBangDashDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('>') | None => {
                            self.maybe_unread(c);
                            self.state = State::CommentEndState;
                        }
                        Some(_) => {
                            self.parse_error(ParserError::NestedComment);
                            self.stream.unread();
                            self.state = State::CommentEndState;
                        }
                    }
                }
                State::CommentEndDashState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => self.state = State::CommentEndState,
                        None => {
                            self.parse_error(ParserError::EofInComment);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            add_to_token_value!(self, '-');
                            self.stream.unread();
                            self.state = State::CommentState;
                        }
                    }
                }
                State::CommentEndState => {
                    let c = read_char!(self);
                    match c {
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        Some('!') => self.state = State::CommentEndBangState,
                        Some('-') => add_to_token_value!(self, '-'),
                        None => {
                            self.parse_error(ParserError::EofInComment);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            add_to_token_value!(self, '-');
                            add_to_token_value!(self, '-');
                            self.stream.unread();
                            self.state = State::CommentState;
                        }
                    }
                }
                State::CommentEndBangState => {
                    let c = read_char!(self);
                    match c {
                        Some('-') => {
                            add_to_token_value!(self, '-');
                            add_to_token_value!(self, '-');
                            add_to_token_value!(self, '!');
                            self.state = State::CommentEndDashState;
                        }
                        Some('>') => {
                            self.parse_error(ParserError::IncorrectlyClosedComment);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInComment);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            add_to_token_value!(self, '-');
                            add_to_token_value!(self, '-');
                            add_to_token_value!(self, '!');
                            self.stream.unread();
                            self.state = State::CommentState;
                        }
                    }
                }
                State::DocTypeState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeDocTypeNameState
                        }
                        Some('>') => {
                            self.stream.unread();
                            self.state = State::BeforeDocTypeNameState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.current_token = Some(Token::DocType {
                                name: None,
                                force_quirks: true,
                                pub_identifier: None,
                                sys_identifier: None,
                                location: self.token_location,
                            });
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(ParserError::MissingWhitespaceBeforeDoctypeName);
                            self.stream.unread();
                            self.state = State::BeforeDocTypeNameState;
                        }
                    }
                }
                State::BeforeDocTypeNameState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some(ch @ 'A'..='Z') => {
                            self.current_token = Some(Token::DocType {
                                name: None,
                                force_quirks: false,
                                pub_identifier: None,
                                sys_identifier: None,
                                location: self.token_location,
                            });
                            add_to_token_name!(self, to_lowercase!(ch));
                            self.state = State::DocTypeNameState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            self.current_token = Some(Token::DocType {
                                name: None,
                                force_quirks: false,
                                pub_identifier: None,
                                sys_identifier: None,
                                location: self.token_location,
                            });
                            add_to_token_name!(self, CHAR_REPLACEMENT);
                            self.state = State::DocTypeNameState;
                        }
                        Some('>') => {
                            self.parse_error(ParserError::MissingDoctypeName);
                            self.current_token = Some(Token::DocType {
                                name: None,
                                force_quirks: true,
                                pub_identifier: None,
                                sys_identifier: None,
                                location: self.token_location,
                            });
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            self.current_token = Some(Token::DocType {
                                name: None,
                                force_quirks: true,
                                pub_identifier: None,
                                sys_identifier: None,
                                location: self.token_location,
                            });
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(ch) => {
                            self.current_token = Some(Token::DocType {
                                name: None,
                                force_quirks: false,
                                pub_identifier: None,
                                sys_identifier: None,
                                location: self.token_location,
                            });
                            add_to_token_name!(self, ch);
                            self.state = State::DocTypeNameState;
                        }
                    }
                }
                State::DocTypeNameState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::AfterDocTypeNameState
                        }
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        Some(ch @ 'A'..='Z') => add_to_token_name!(self, to_lowercase!(ch)),
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_to_token_name!(self, CHAR_REPLACEMENT);
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(ch) => add_to_token_name!(self, ch),
                    }
                }
                State::AfterDocTypeNameState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.stream.unread();
                            if self.stream.look_ahead_slice(6).eq_ignore_ascii_case("public") {
                                let pos = self.stream.tell();
                                self.stream.seek(pos + 6);
                                self.state = State::AfterDocTypePublicKeywordState;
                            } else if self.stream.look_ahead_slice(6).eq_ignore_ascii_case("system")
                            {
                                let pos = self.stream.tell();
                                self.stream.seek(pos + 6);
                                self.state = State::AfterDocTypeSystemKeywordState;
                            } else {
                                self.parse_error(
                                    ParserError::InvalidCharacterSequenceAfterDoctypeName,
                                );
                                set_quirks_mode!(self);
                                self.state = State::BogusDocTypeState;
                            }
                        }
                    }
                }
                State::AfterDocTypePublicKeywordState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeDocTypePublicIdentifierState
                        }
                        Some('"') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypePublicKeyword,
                            );
                            set_public_identifier!(self, String::new());
                            self.state = State::DocTypePublicIdentifierDoubleQuotedState;
                        }
                        Some('\'') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypePublicKeyword,
                            );
                            set_public_identifier!(self, String::new());
                            self.state = State::DocTypePublicIdentifierSingleQuotedState;
                        }
                        Some('>') => {
                            self.parse_error(ParserError::MissingDoctypePublicIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypePublicIdentifier,
                            );
                            set_quirks_mode!(self);
                            self.stream.unread();
                            self.state = State::BogusDocTypeState;
                        }
                    }
                }
                State::BeforeDocTypePublicIdentifierState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('"') => {
                            set_public_identifier!(self, String::new());
                            self.state = State::DocTypePublicIdentifierDoubleQuotedState;
                        }
                        Some('\'') => {
                            set_public_identifier!(self, String::new());
                            self.state = State::DocTypePublicIdentifierSingleQuotedState;
                        }
                        Some('>') => {
                            self.parse_error(ParserError::MissingDoctypePublicIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypePublicIdentifier,
                            );
                            set_quirks_mode!(self);
                            self.stream.unread();
                            self.state = State::BogusDocTypeState;
                        }
                    }
                }
                State::DocTypePublicIdentifierDoubleQuotedState => {
                    let c = read_char!(self);
                    match c {
                        Some('"') => self.state = State::AfterDocTypePublicIdentifierState,
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_public_identifier!(self, CHAR_REPLACEMENT);
                        }
                        Some('>') => {
                            self.parse_error(ParserError::AbruptDoctypePublicIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(ch) => add_public_identifier!(self, ch),
                    }
                }
                State::DocTypePublicIdentifierSingleQuotedState => {
                    let c = read_char!(self);
                    match c {
                        Some('\'') => self.state = State::AfterDocTypePublicIdentifierState,
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_public_identifier!(self, CHAR_REPLACEMENT);
                        }
                        Some('>') => {
                            self.parse_error(ParserError::AbruptDoctypePublicIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(ch) => add_public_identifier!(self, ch),
                    }
                }
                State::AfterDocTypePublicIdentifierState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BetweenDocTypePublicAndSystemIdentifiersState
                        }
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        Some('"') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
                            );
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierDoubleQuotedState;
                        }
                        Some('\'') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
                            );
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierSingleQuotedState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            set_quirks_mode!(self);
                            self.stream.unread();
                            self.state = State::BogusDocTypeState;
                        }
                    }
                }
                State::BetweenDocTypePublicAndSystemIdentifiersState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        Some('"') => {
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierDoubleQuotedState;
                        }
                        Some('\'') => {
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierSingleQuotedState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            set_quirks_mode!(self);
                            self.stream.unread();
                            self.state = State::BogusDocTypeState;
                        }
                    }
                }
                State::AfterDocTypeSystemKeywordState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            self.state = State::BeforeDocTypeSystemIdentifierState
                        }
                        Some('"') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypeSystemKeyword,
                            );
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierDoubleQuotedState;
                        }
                        Some('\'') => {
                            self.parse_error(
                                ParserError::MissingWhitespaceAfterDoctypeSystemKeyword,
                            );
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierSingleQuotedState;
                        }
                        Some('>') => {
                            self.parse_error(ParserError::MissingDoctypeSystemIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            set_quirks_mode!(self);
                            self.stream.unread();
                            self.state = State::BogusDocTypeState;
                        }
                    }
                }
                State::BeforeDocTypeSystemIdentifierState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('"') => {
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierDoubleQuotedState;
                        }
                        Some('\'') => {
                            set_system_identifier!(self, String::new());
                            self.state = State::DocTypeSystemIdentifierSingleQuotedState;
                        }
                        Some('>') => {
                            self.parse_error(ParserError::MissingDoctypeSystemIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(
                                ParserError::MissingQuoteBeforeDoctypeSystemIdentifier,
                            );
                            set_quirks_mode!(self);
                            self.stream.unread();
                            self.state = State::BogusDocTypeState;
                        }
                    }
                }
                State::DocTypeSystemIdentifierDoubleQuotedState => {
                    let c = read_char!(self);
                    match c {
                        Some('"') => self.state = State::AfterDocTypeSystemIdentifierState,
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_system_identifier!(self, CHAR_REPLACEMENT);
                        }
                        Some('>') => {
                            self.parse_error(ParserError::AbruptDoctypeSystemIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(ch) => add_system_identifier!(self, ch),
                    }
                }
                State::DocTypeSystemIdentifierSingleQuotedState => {
                    let c = read_char!(self);
                    match c {
                        Some('\'') => self.state = State::AfterDocTypeSystemIdentifierState,
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                            add_system_identifier!(self, CHAR_REPLACEMENT);
                        }
                        Some('>') => {
                            self.parse_error(ParserError::AbruptDoctypeSystemIdentifier);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(ch) => add_system_identifier!(self, ch),
                    }
                }
                State::AfterDocTypeSystemIdentifierState => {
                    let c = read_char!(self);
                    match c {
                        Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) => {
                            // ignore character
                        }
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        None => {
                            self.parse_error(ParserError::EofInDoctype);
                            set_quirks_mode!(self);
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            self.parse_error(
                                ParserError::UnexpectedCharacterAfterDoctypeSystemIdentifier,
                            );
                            self.stream.unread();
                            self.state = State::BogusDocTypeState;
                        }
                    }
                }
                State::BogusDocTypeState => {
                    let c = read_char!(self);
                    match c {
                        Some('>') => {
                            emit_current_token!(self);
                            self.state = State::DataState;
                        }
                        Some(CHAR_NUL) => {
                            self.parse_error(ParserError::UnexpectedNullCharacter);
                        }
                        None => {
                            emit_current_token!(self);
                            emit_eof!(self);
                        }
                        Some(_) => {
                            // ignore character
                        }
                    }
                }
                State::CDataSectionState => {
                    let c = read_char!(self);
                    match c {
                        Some(']') => self.state = State::CDataSectionBracketState,
                        None => {
                            self.parse_error(ParserError::EofInCdata);
                            emit_eof!(self);
                        }
                        Some(ch) => self.consume(ch),
                    }
                }
                State::CDataSectionBracketState => {
                    let c = read_char!(self);
                    match c {
                        Some(']') => self.state = State::CDataSectionEndState,
                        _ => {
                            self.consume(']');
                            self.maybe_unread(c);
                            self.state = State::CDataSectionState;
                        }
                    }
                }
                State::CDataSectionEndState => {
                    let c = read_char!(self);
                    match c {
                        Some(']') => self.consume(']'),
                        Some('>') => self.state = State::DataState,
                        _ => {
                            self.consume(']');
                            self.consume(']');
                            self.maybe_unread(c);
                            self.state = State::CDataSectionState;
                        }
                    }
                }
            }
        }
    }

    // Consumes the given character into the pending text run
    pub(crate) fn consume(&mut self, c: char) {
        if self.consumed.is_empty() {
            self.text_location = self
                .stream
                .location_of(self.stream.tell().saturating_sub(1));
        }
        self.consumed.push(c);
    }

    // Unreads the stream when the read was an actual character (not EOF)
    fn maybe_unread(&mut self, c: Option<char>) {
        if c.is_some() {
            self.stream.unread();
        }
    }

    // Remembers the position of the '<' that opened the token in the making
    fn mark_token_start(&mut self) {
        self.token_location = self
            .stream
            .location_of(self.stream.tell().saturating_sub(1));
    }

    // Tag name states for RCDATA / RAWTEXT / script data end tags. When the
    // tag turns out not to be the appropriate end tag, the consumed characters
    // are replayed as text and we fall back to the given state.
    fn handle_end_tag_name(&mut self, return_state: State) {
        let c = self.stream.read_char();
        match c {
            Some(ch @ 'A'..='Z') => {
                add_to_token_name!(self, to_lowercase!(ch));
                self.temporary_buffer.push(ch);
            }
            Some(ch @ 'a'..='z') => {
                add_to_token_name!(self, ch);
                self.temporary_buffer.push(ch);
            }
            Some(CHAR_TAB | CHAR_LF | CHAR_FF | CHAR_SPACE) if self.is_appropriate_end_tag() => {
                self.state = State::BeforeAttributeNameState;
            }
            Some('/') if self.is_appropriate_end_tag() => {
                self.state = State::SelfClosingStartState;
            }
            Some('>') if self.is_appropriate_end_tag() => {
                self.emit_current_tag();
                self.state = State::DataState;
            }
            _ => {
                self.consume('<');
                self.consume('/');
                let tmp = self.temporary_buffer.clone();
                for ch in tmp.chars() {
                    self.consume(ch);
                }
                self.temporary_buffer.clear();
                self.current_token = None;
                self.maybe_unread(c);
                self.state = return_state;
            }
        }
    }

    // True when the end tag in the making matches the last emitted start tag
    fn is_appropriate_end_tag(&self) -> bool {
        match &self.current_token {
            Some(Token::EndTag { name, .. }) => *name == self.last_start_token,
            _ => false,
        }
    }

    // Finishes the pending attribute, attaches stored attributes and emits the tag
    fn emit_current_tag(&mut self) {
        self.store_and_clear_current_attribute();
        self.add_stored_attributes_to_current_token();
        emit_current_token!(self);
    }

    // Stores the attribute in the making (if any), reporting duplicates
    fn store_and_clear_current_attribute(&mut self) {
        if !self.current_attr_name.is_empty() {
            let stored = self
                .current_attrs
                .insert(&self.current_attr_name, &self.current_attr_value);
            if !stored {
                self.parse_error(ParserError::DuplicateAttribute);
            }
        }

        self.current_attr_name.clear();
        self.current_attr_value.clear();
    }

    // Moves the stored attributes into the current start tag token. End tags
    // may not carry attributes.
    fn add_stored_attributes_to_current_token(&mut self) {
        if self.current_attrs.is_empty() {
            return;
        }

        let attrs = std::mem::take(&mut self.current_attrs);
        let mut end_tag_with_attrs = false;
        match &mut self.current_token {
            Some(Token::StartTag { attributes, .. }) => {
                for attr in &attrs {
                    attributes.insert(&attr.name, &attr.value);
                }
            }
            Some(Token::EndTag { .. }) => end_tag_with_attrs = true,
            _ => {}
        }

        if end_tag_with_attrs {
            self.parse_error(ParserError::EndTagWithAttributes);
        }
    }

    // Returns true when there is a pending text run
    pub fn has_consumed_data(&self) -> bool {
        !self.consumed.is_empty()
    }

    // Returns the pending text run
    pub fn get_consumed_str(&self) -> &str {
        &self.consumed
    }

    // Clears the pending text run
    pub fn clear_consume_buffer(&mut self) {
        self.consumed.clear()
    }

    // Registers a recoverable error at the position of the last read character
    pub(crate) fn parse_error(&mut self, error: ParserError) {
        let location = self
            .stream
            .location_of(self.stream.tell().saturating_sub(1));
        self.error_logger.borrow_mut().add_error(location, error.as_str());
    }

    fn is_control_char(&self, num: u32) -> bool {
        // White space and NUL are handled by the individual states
        if [0x0009, 0x000a, 0x000c, 0x000d, 0x0020, 0x0000].contains(&num) {
            return false;
        }

        (0x0001..=0x001f).contains(&num) || (0x007f..=0x009f).contains(&num)
    }

    fn is_noncharacter(&self, num: u32) -> bool {
        (0xfdd0..=0xfdef).contains(&num) || (num & 0xffff) == 0xfffe || (num & 0xffff) == 0xffff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_stream::Encoding;

    fn tokenize(input: &str) -> Vec<Token> {
        let mut stream = InputStream::new();
        stream.read_from_str(input, Some(Encoding::UTF8));

        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger);

        let mut tokens = vec![];
        loop {
            let token = tokenizer.next_token().expect("token");
            let eof = token.is_eof();
            tokens.push(token);
            if eof {
                break;
            }
        }
        tokens
    }

    fn tokenize_with_options(input: &str, opts: Options) -> Vec<Token> {
        let mut stream = InputStream::new();
        stream.read_from_str(input, Some(Encoding::UTF8));

        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(&mut stream, Some(opts), error_logger);

        let mut tokens = vec![];
        loop {
            let token = tokenizer.next_token().expect("token");
            let eof = token.is_eof();
            tokens.push(token);
            if eof {
                break;
            }
        }
        tokens
    }

    #[test]
    fn test_start_tag_with_attributes() {
        let tokens = tokenize("<div class='test' id=\"x\" hidden>");
        assert_eq!(tokens.len(), 2);
        match &tokens[0] {
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                location,
            } => {
                assert_eq!(name, "div");
                assert!(!is_self_closing);
                assert_eq!(attributes.get("class"), Some("test"));
                assert_eq!(attributes.get("id"), Some("x"));
                assert_eq!(attributes.get("hidden"), Some(""));
                assert_eq!(*location, Location::new(1, 1, 0));
            }
            _ => panic!("expected start tag"),
        }
    }

    #[test]
    fn test_duplicate_attribute_first_wins() {
        let mut stream = InputStream::new();
        stream.read_from_str("<div a=1 a=2>", Some(Encoding::UTF8));

        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let mut tokenizer = Tokenizer::new(&mut stream, None, error_logger.clone());

        let token = tokenizer.next_token().expect("token");
        match token {
            Token::StartTag { attributes, .. } => {
                assert_eq!(attributes.get("a"), Some("1"));
                assert_eq!(attributes.len(), 1);
            }
            _ => panic!("expected start tag"),
        }
        assert_eq!(error_logger.borrow().get_errors().len(), 1);
    }

    #[test]
    fn test_end_tag_and_text() {
        let tokens = tokenize("<b>bold</b>");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[0].is_start_tag("b"));
        assert_eq!(
            tokens[1],
            Token::Text {
                value: "bold".to_string(),
                location: Location::new(1, 4, 3),
            }
        );
        assert!(matches!(&tokens[2], Token::EndTag { name, .. } if name == "b"));
        assert!(tokens[3].is_eof());
    }

    #[test]
    fn test_self_closing() {
        let tokens = tokenize("<br/>");
        match &tokens[0] {
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } => {
                assert_eq!(name, "br");
                assert!(is_self_closing);
            }
            _ => panic!("expected start tag"),
        }
    }

    #[test]
    fn test_comment() {
        let tokens = tokenize("<!-- hello -->");
        assert_eq!(
            tokens[0],
            Token::Comment {
                value: " hello ".to_string(),
                location: Location::new(1, 1, 0),
            }
        );
    }

    #[test]
    fn test_bogus_comment_from_question_mark() {
        let tokens = tokenize("<?xml version=\"1.0\"?>");
        match &tokens[0] {
            Token::Comment { value, .. } => assert_eq!(value, "?xml version=\"1.0\"?"),
            _ => panic!("expected comment"),
        }
    }

    #[test]
    fn test_doctype() {
        let tokens = tokenize("<!DOCTYPE html>");
        assert_eq!(
            tokens[0],
            Token::DocType {
                name: Some("html".to_string()),
                force_quirks: false,
                pub_identifier: None,
                sys_identifier: None,
                location: Location::new(1, 1, 0),
            }
        );
    }

    #[test]
    fn test_doctype_with_identifiers() {
        let tokens =
            tokenize("<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">");
        match &tokens[0] {
            Token::DocType {
                name,
                force_quirks,
                pub_identifier,
                sys_identifier,
                ..
            } => {
                assert_eq!(name.as_deref(), Some("html"));
                assert!(!force_quirks);
                assert_eq!(pub_identifier.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
                assert_eq!(
                    sys_identifier.as_deref(),
                    Some("http://www.w3.org/TR/html4/strict.dtd")
                );
            }
            _ => panic!("expected doctype"),
        }
    }

    #[test]
    fn test_rcdata_appropriate_end_tag() {
        let tokens = tokenize_with_options(
            "a <b> c</title><p>",
            Options {
                initial_state: State::RcDataState,
                last_start_tag: "title".into(),
            },
        );
        assert_eq!(
            tokens[0],
            Token::Text {
                value: "a <b> c".to_string(),
                location: Location::new(1, 1, 0),
            }
        );
        assert!(matches!(&tokens[1], Token::EndTag { name, .. } if name == "title"));
        assert!(tokens[2].is_start_tag("p"));
    }

    #[test]
    fn test_script_data_comment_like() {
        let tokens = tokenize_with_options(
            "x<!-- </script> --></script>",
            Options {
                initial_state: State::ScriptDataState,
                last_start_tag: "script".into(),
            },
        );
        assert_eq!(
            tokens[0],
            Token::Text {
                value: "x<!-- </script> -->".to_string(),
                location: Location::new(1, 1, 0),
            }
        );
        assert!(matches!(&tokens[1], Token::EndTag { name, .. } if name == "script"));
    }

    #[test]
    fn test_null_in_data_is_replaced() {
        let tokens = tokenize("a\u{0000}b");
        assert_eq!(
            tokens[0],
            Token::Text {
                value: "a\u{FFFD}b".to_string(),
                location: Location::new(1, 1, 0),
            }
        );
    }

    #[test]
    fn test_crlf_normalization() {
        let tokens = tokenize("a\r\nb\rc");
        assert_eq!(
            tokens[0],
            Token::Text {
                value: "a\nb\nc".to_string(),
                location: Location::new(1, 1, 0),
            }
        );
    }

    #[test]
    fn test_locations_span_lines() {
        let tokens = tokenize("<p>\n<b>");
        assert_eq!(tokens[0].get_location(), Location::new(1, 1, 0));
        // text "\n" at (1,4), then <b> on line 2
        assert_eq!(tokens[2].get_location(), Location::new(2, 1, 4));
    }

    #[test]
    fn test_cdata_outside_foreign_content_is_bogus_comment() {
        let tokens = tokenize("<![CDATA[x]]>");
        match &tokens[0] {
            Token::Comment { value, .. } => assert_eq!(value, "[CDATA[x]]"),
            _ => panic!("expected comment"),
        }
    }

    #[test]
    fn test_eof_in_tag() {
        let tokens = tokenize("<div");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_eof());
    }

    #[test]
    fn test_ampersand_passes_through() {
        let tokens = tokenize("a &amp; b");
        assert_eq!(
            tokens[0],
            Token::Text {
                value: "a &amp; b".to_string(),
                location: Location::new(1, 1, 0),
            }
        );
    }
}
