pub mod document;

mod attr_replacements;
mod quirks;

pub use quirks::QuirksMode;

use self::adoption_agency::AdoptionResult;
use self::attr_replacements::{MATHML_ADJUSTMENTS, SVG_ADJUSTMENTS, SVG_TAG_ADJUSTMENTS};
use self::document::{Document, DocumentType};
use crate::error_logger::{ErrorLogger, ParseError, ParserError};
use crate::errors::Result;
use crate::input_stream::{InputStream, Location};
use crate::node::{
    Attributes, Node, NodeData, NodeId, HTML_NAMESPACE, MATHML_NAMESPACE, SVG_NAMESPACE,
};
use crate::tokenizer::state::State;
use crate::tokenizer::token::Token;
use crate::tokenizer::{Options as TokenizerOptions, Tokenizer, CHAR_NUL, CHAR_REPLACEMENT};
use cow_utils::CowUtils;
use phf::{phf_set, Set};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// How often a token may be handed back for reprocessing before it is dropped.
/// The tree construction rules bounce a token between modes a handful of times
/// at most; anything beyond this means the mode table is broken.
const REPROCESS_BUDGET: usize = 32;

/// Insertion modes as defined in 13.2.4.1
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// What a mode handler decided about the token it was given. The driving loop
/// in [`Html5Parser::process_token`] applies the outcome; handlers never spin
/// on the token themselves.
#[derive(Debug, Copy, Clone, PartialEq)]
enum ModeOutcome {
    /// The token has been fully handled (or deliberately ignored)
    Consumed,
    /// Switch to the given mode and offer the same token again
    Reprocess(InsertionMode),
}

/// Scopes for "has element in scope" checks, each with its own barrier set
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Scope {
    Regular,
    ListItem,
    Button,
    Table,
    Select,
}

/// Active formatting elements list entry
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum ActiveElement {
    NodeId(NodeId),
    Marker,
}

/// Options for a parse run
pub struct ParseOptions {
    /// Treat script elements as if scripting is available. This changes how
    /// noscript content is parsed.
    pub scripting_enabled: bool,
    /// Parse as the content of an iframe srcdoc attribute. A missing doctype
    /// then no longer forces quirks mode.
    pub iframe_srcdoc: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            scripting_enabled: true,
            iframe_srcdoc: false,
        }
    }
}

// Returns the current node: the node on top of the stack of open elements
macro_rules! current_node {
    ($self:expr) => {{
        let node_id = $self
            .open_elements
            .last()
            .expect("stack of open elements is empty");
        $self
            .document
            .get_node_by_id(*node_id)
            .expect("node id not found in arena")
    }};
}

// Returns the node at the given stack index
macro_rules! open_elements_get {
    ($self:expr, $idx:expr) => {{
        $self
            .document
            .get_node_by_id($self.open_elements[$idx])
            .expect("node id not found in arena")
    }};
}

// Returns true when an element with the given name is on the stack
macro_rules! open_elements_has {
    ($self:expr, $name:expr) => {
        $self.open_elements.iter().any(|&node_id| {
            $self
                .document
                .get_node_by_id(node_id)
                .is_some_and(|node| node.name == $name)
        })
    };
}

// Child module uses the macros above; the declaration has to come after them.
mod adoption_agency;

/// Tags in foreign (SVG or MathML) content that break us back out into HTML
static FOREIGN_BREAKOUT_TAGS: Set<&'static str> = phf_set! {
    "b", "big", "blockquote", "body", "br", "center", "code", "dd", "div",
    "dl", "dt", "em", "embed", "h1", "h2", "h3", "h4", "h5", "h6", "head",
    "hr", "i", "img", "li", "listing", "menu", "meta", "nobr", "ol", "p",
    "pre", "ruby", "s", "small", "span", "strong", "strike", "sub", "sup",
    "table", "tt", "u", "ul", "var",
};

/// The HTML5 tree builder. Turns the token stream into a [`Document`],
/// repairing markup errors along the way and recording what it repaired.
pub struct Html5Parser<'a> {
    /// Tokenizer the parser pulls tokens from
    tokenizer: Tokenizer<'a>,
    /// Current insertion mode
    insertion_mode: InsertionMode,
    /// Mode to return to when leaving the Text mode
    original_insertion_mode: InsertionMode,
    /// Stack of template insertion modes
    template_insertion_mode: Vec<InsertionMode>,
    /// Stack of open elements, bottom (html) first
    open_elements: Vec<NodeId>,
    /// The head element pointer
    head_element: Option<NodeId>,
    /// The form element pointer
    form_element: Option<NodeId>,
    /// Is scripting available to this parse
    scripting_enabled: bool,
    /// May a frameset still replace the body
    frameset_ok: bool,
    /// Redirect insertions around tables while set
    foster_parenting: bool,
    /// Text tokens collected while in the InTableText mode
    pending_table_character_tokens: Vec<Token>,
    /// Was the self-closing flag of the current token acknowledged
    ack_self_closing: bool,
    /// Skip the next newline (after pre, listing and textarea start tags)
    ignore_lf: bool,
    /// List of active formatting elements
    active_formatting_elements: Vec<ActiveElement>,
    /// Is this a fragment parse
    is_fragment_case: bool,
    /// Tag name of the fragment context element
    fragment_context_name: Option<String>,
    /// Synthetic root the fragment nodes are collected under
    fragment_root: Option<NodeId>,
    /// Number of html start tags seen in the source
    html_start_tag_count: usize,
    /// Number of body start tags seen in the source
    body_start_tag_count: usize,
    /// The document we are building
    document: Document,
    /// Errors, shared with the tokenizer
    error_logger: Rc<RefCell<ErrorLogger>>,
}

impl<'a> Html5Parser<'a> {
    pub fn new(stream: &'a mut InputStream) -> Self {
        Self::with_options(stream, ParseOptions::default())
    }

    pub fn with_options(stream: &'a mut InputStream, opts: ParseOptions) -> Self {
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let tokenizer = Tokenizer::new(stream, None, Rc::clone(&error_logger));

        let mut document = Document::new();
        if opts.iframe_srcdoc {
            document.doctype = DocumentType::IframeSrcDoc;
        }

        Html5Parser {
            tokenizer,
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: InsertionMode::Initial,
            template_insertion_mode: vec![],
            open_elements: vec![],
            head_element: None,
            form_element: None,
            scripting_enabled: opts.scripting_enabled,
            frameset_ok: true,
            foster_parenting: false,
            pending_table_character_tokens: vec![],
            ack_self_closing: false,
            ignore_lf: false,
            active_formatting_elements: vec![],
            is_fragment_case: false,
            fragment_context_name: None,
            fragment_root: None,
            html_start_tag_count: 0,
            body_start_tag_count: 0,
            document,
            error_logger,
        }
    }

    /// Creates a parser for the fragment parsing algorithm. The fragment is
    /// parsed as if it appeared inside an element with the given tag name,
    /// and the resulting nodes are listed in [`Document::fragment_nodes`].
    pub fn new_fragment(stream: &'a mut InputStream, context: &str, opts: ParseOptions) -> Self {
        let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
        let tokenizer_opts = TokenizerOptions {
            initial_state: Self::initial_tokenizer_state_for_context(context, opts.scripting_enabled),
            last_start_tag: context.to_string(),
        };
        let tokenizer = Tokenizer::new(stream, Some(tokenizer_opts), Rc::clone(&error_logger));

        let mut document = Document::new();
        if opts.iframe_srcdoc {
            document.doctype = DocumentType::IframeSrcDoc;
        }

        let mut parser = Html5Parser {
            tokenizer,
            insertion_mode: InsertionMode::Initial,
            original_insertion_mode: InsertionMode::Initial,
            template_insertion_mode: vec![],
            open_elements: vec![],
            head_element: None,
            form_element: None,
            scripting_enabled: opts.scripting_enabled,
            frameset_ok: true,
            foster_parenting: false,
            pending_table_character_tokens: vec![],
            ack_self_closing: false,
            ignore_lf: false,
            active_formatting_elements: vec![],
            is_fragment_case: true,
            fragment_context_name: Some(context.to_string()),
            fragment_root: None,
            html_start_tag_count: 0,
            body_start_tag_count: 0,
            document,
            error_logger,
        };

        // The fragment nodes grow under a synthetic html root element
        let root = Node::new_element("html", Attributes::new(), HTML_NAMESPACE, Location::default());
        let root_id = parser.document.add_node(root, NodeId::root());
        parser.open_elements.push(root_id);
        parser.fragment_root = Some(root_id);

        if context == "template" {
            parser.template_insertion_mode.push(InsertionMode::InTemplate);
        }

        parser.reset_insertion_mode();
        parser
    }

    /// Tokenizer state matching the content model of the fragment context element
    pub(crate) fn initial_tokenizer_state_for_context(context: &str, scripting_enabled: bool) -> State {
        match context {
            "title" | "textarea" => State::RcDataState,
            "style" | "xmp" | "iframe" | "noembed" | "noframes" => State::RawTextState,
            "noscript" if scripting_enabled => State::RawTextState,
            "script" => State::ScriptDataState,
            "plaintext" => State::PlaintextState,
            _ => State::DataState,
        }
    }

    /// Runs the parse to completion and returns the finished document
    pub fn parse(mut self) -> Result<Document> {
        self.document.metadata.html_src_bytes = self.tokenizer.stream.src_bytes();

        loop {
            let token = self.tokenizer.next_token()?;
            let is_eof = token.is_eof();

            self.process_token(token);
            self.document.metadata.document_end_location = self.tokenizer.get_location();

            if is_eof {
                break;
            }
        }

        self.finish();
        Ok(self.document)
    }

    fn finish(&mut self) {
        // Only full quirks is interesting to consumers of the metadata
        self.document.metadata.quirks_mode = self.document.quirks_mode == QuirksMode::Quirks;

        if let Some(root_id) = self.fragment_root {
            let nodes = self.document.children(root_id).to_vec();
            self.document.set_fragment_nodes(nodes);
        }
    }

    /// Errors accumulated by the tokenizer and the tree builder so far
    pub fn get_parse_errors(&self) -> Vec<ParseError> {
        self.error_logger.borrow().get_errors()
    }

    /// Dispatches a single token. A handler may hand the token back with a new
    /// insertion mode; this loop applies that, bounded so a broken mode table
    /// cannot hang the parser.
    fn process_token(&mut self, token: Token) {
        self.track_structural_tags(&token);

        if !matches!(token, Token::Text { .. }) {
            self.ignore_lf = false;
        }
        self.ack_self_closing = false;

        let mut budget = REPROCESS_BUDGET;
        loop {
            #[cfg(feature = "debug_parser")]
            self.display_debug_info(&token);

            let outcome = if self.use_foreign_content_rules(&token) {
                self.handle_foreign_content(&token)
            } else {
                self.process_in_mode(self.insertion_mode, &token)
            };

            match outcome {
                ModeOutcome::Consumed => break,
                ModeOutcome::Reprocess(mode) => {
                    self.insertion_mode = mode;
                    budget -= 1;
                    if budget == 0 {
                        log::warn!("reprocess budget exhausted, dropping token: {token}");
                        break;
                    }
                }
            }
        }

        if let Token::StartTag {
            is_self_closing: true,
            ..
        } = &token
        {
            if !self.ack_self_closing {
                self.parse_error(
                    ParserError::NonVoidHtmlElementStartTagWithTrailingSolidus.as_str(),
                );
            }
        }

        // CDATA sections are only legal while the adjusted current node is foreign
        let cdata_allowed = !self.open_elements.is_empty()
            && self
                .document
                .get_node_by_id(self.adjusted_current_node_id())
                .is_some_and(|node| node.namespace.as_deref() != Some(HTML_NAMESPACE));
        self.tokenizer.set_cdata_allowed(cdata_allowed);
    }

    /// Counts html and body start tags as they come out of the tokenizer, so
    /// the counts reflect the source and never the repairs we make ourselves.
    fn track_structural_tags(&mut self, token: &Token) {
        let Token::StartTag { name, location, .. } = token else {
            return;
        };

        match name.as_str() {
            "html" => {
                self.html_start_tag_count += 1;
                if self.html_start_tag_count == 2 {
                    self.document.metadata.duplicate_html_elements = true;
                    self.document.metadata.duplicate_html_element_location = Some(*location);
                }
            }
            "body" => {
                self.body_start_tag_count += 1;
                if self.body_start_tag_count == 2 {
                    self.document.metadata.duplicate_body_elements = true;
                    self.document.metadata.duplicate_body_element_location = Some(*location);
                }
            }
            _ => {}
        }
    }

    fn process_in_mode(&mut self, mode: InsertionMode, token: &Token) -> ModeOutcome {
        match mode {
            InsertionMode::Initial => self.handle_initial(token),
            InsertionMode::BeforeHtml => self.handle_before_html(token),
            InsertionMode::BeforeHead => self.handle_before_head(token),
            InsertionMode::InHead => self.handle_in_head(token),
            InsertionMode::InHeadNoscript => self.handle_in_head_noscript(token),
            InsertionMode::AfterHead => self.handle_after_head(token),
            InsertionMode::InBody => self.handle_in_body(token),
            InsertionMode::Text => self.handle_text(token),
            InsertionMode::InTable => self.handle_in_table(token),
            InsertionMode::InTableText => self.handle_in_table_text(token),
            InsertionMode::InCaption => self.handle_in_caption(token),
            InsertionMode::InColumnGroup => self.handle_in_column_group(token),
            InsertionMode::InTableBody => self.handle_in_table_body(token),
            InsertionMode::InRow => self.handle_in_row(token),
            InsertionMode::InCell => self.handle_in_cell(token),
            InsertionMode::InSelect => self.handle_in_select(token),
            InsertionMode::InSelectInTable => self.handle_in_select_in_table(token),
            InsertionMode::InTemplate => self.handle_in_template(token),
            InsertionMode::AfterBody => self.handle_after_body(token),
            InsertionMode::InFrameset => self.handle_in_frameset(token),
            InsertionMode::AfterFrameset => self.handle_after_frameset(token),
            InsertionMode::AfterAfterBody => self.handle_after_after_body(token),
            InsertionMode::AfterAfterFrameset => self.handle_after_after_frameset(token),
        }
    }

    fn handle_initial(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { .. } if token.is_empty_or_white() => ModeOutcome::Consumed,
            Token::Comment { .. } => {
                self.insert_document_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType {
                name,
                force_quirks,
                pub_identifier,
                sys_identifier,
                location,
            } => {
                if name.as_deref() != Some("html")
                    || pub_identifier.is_some()
                    || (sys_identifier.is_some()
                        && sys_identifier.as_deref() != Some("about:legacy-compat"))
                {
                    self.parse_error("legacy doctype");
                }

                let node = Node::new_doctype(
                    &name.clone().unwrap_or_default(),
                    &pub_identifier.clone().unwrap_or_default(),
                    &sys_identifier.clone().unwrap_or_default(),
                    *location,
                );
                self.document.add_node(node, NodeId::root());

                if self.document.doctype != DocumentType::IframeSrcDoc {
                    self.document.quirks_mode = self.identify_quirks_mode(
                        name,
                        pub_identifier.clone(),
                        sys_identifier.clone(),
                        *force_quirks,
                    );
                }

                self.insertion_mode = InsertionMode::BeforeHtml;
                ModeOutcome::Consumed
            }
            _ => {
                match token {
                    Token::StartTag { .. } => {
                        self.parse_error(ParserError::ExpectedDocTypeButGotStartTag.as_str());
                    }
                    Token::EndTag { .. } => {
                        self.parse_error(ParserError::ExpectedDocTypeButGotEndTag.as_str());
                    }
                    Token::Text { .. } => {
                        self.parse_error(ParserError::ExpectedDocTypeButGotChars.as_str());
                    }
                    _ => {}
                }

                if self.document.doctype != DocumentType::IframeSrcDoc {
                    self.document.quirks_mode = QuirksMode::Quirks;
                }
                ModeOutcome::Reprocess(InsertionMode::BeforeHtml)
            }
        }
    }

    fn handle_before_html(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in before html insertion mode");
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_document_comment(token);
                ModeOutcome::Consumed
            }
            Token::Text { .. } if token.is_empty_or_white() => ModeOutcome::Consumed,
            Token::StartTag { name, .. } if name == "html" => {
                let node = self.create_node(token, HTML_NAMESPACE);
                let node_id = self.document.add_node(node, NodeId::root());
                self.open_elements.push(node_id);
                self.insertion_mode = InsertionMode::BeforeHead;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error("end tag not allowed in before html insertion mode");
                ModeOutcome::Consumed
            }
            _ => {
                self.document.metadata.has_manufactured_html = true;
                let node = Node::new_element(
                    "html",
                    Attributes::new(),
                    HTML_NAMESPACE,
                    token.get_location(),
                );
                let node_id = self.document.add_node(node, NodeId::root());
                self.open_elements.push(node_id);
                ModeOutcome::Reprocess(InsertionMode::BeforeHead)
            }
        }
    }

    fn handle_before_head(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { .. } if token.is_empty_or_white() => ModeOutcome::Consumed,
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in before head insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "head" => {
                let node_id = self.insert_html_element(token);
                self.head_element = Some(node_id);
                self.insertion_mode = InsertionMode::InHead;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "head" | "body" | "html" | "br") =>
            {
                self.parse_error("end tag not allowed in before head insertion mode");
                ModeOutcome::Consumed
            }
            _ => {
                self.document.metadata.has_manufactured_head = true;
                let node = Node::new_element(
                    "head",
                    Attributes::new(),
                    HTML_NAMESPACE,
                    token.get_location(),
                );
                let node_id = self.insert_element_node(node);
                self.head_element = Some(node_id);
                ModeOutcome::Reprocess(InsertionMode::InHead)
            }
        }
    }

    fn handle_in_head(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } if token.is_empty_or_white() => {
                self.insert_text_str(value, *location);
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in head insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                ..
            } if matches!(name.as_str(), "base" | "basefont" | "bgsound" | "link") => {
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();

                if name == "base" && self.document.metadata.base_url.is_none() {
                    if let Some(href) = attributes.get("href") {
                        let target = attributes.get("target").unwrap_or("");
                        self.document.metadata.base_url =
                            Some((href.to_string(), target.to_string()));
                    }
                }
                if name == "link"
                    && attributes
                        .get("rel")
                        .is_some_and(|rel| rel.cow_to_ascii_lowercase() == "canonical")
                {
                    if let Some(href) = attributes.get("href") {
                        self.document.metadata.canonical_url = Some(href.to_string());
                    }
                }
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if name == "meta" => {
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "title" => {
                self.parse_rcdata(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if (name == "noscript" && self.scripting_enabled)
                    || matches!(name.as_str(), "noframes" | "style") =>
            {
                self.parse_raw_data(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "noscript" => {
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InHeadNoscript;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "script" => {
                self.insert_html_element(token);
                self.tokenizer.state = State::ScriptDataState;
                self.original_insertion_mode = self.insertion_mode;
                self.insertion_mode = InsertionMode::Text;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "head" => {
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::AfterHead;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "template" => {
                self.insert_html_element(token);
                self.active_formatting_elements.push(ActiveElement::Marker);
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InTemplate;
                self.template_insertion_mode.push(InsertionMode::InTemplate);
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "template" => {
                self.handle_template_end_tag();
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "head" => {
                self.parse_error("head start tag not allowed in head insertion mode");
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "body" | "html" | "br") =>
            {
                self.parse_error("end tag not allowed in head insertion mode");
                ModeOutcome::Consumed
            }
            _ => {
                self.open_elements.pop();
                ModeOutcome::Reprocess(InsertionMode::AfterHead)
            }
        }
    }

    fn handle_in_head_noscript(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in head noscript insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTag { name, .. } if name == "noscript" => {
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InHead;
                ModeOutcome::Consumed
            }
            Token::Text { .. } if token.is_empty_or_white() => self.handle_in_head(token),
            Token::Comment { .. } => self.handle_in_head(token),
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "basefont" | "bgsound" | "link" | "meta" | "noframes" | "style"
                ) =>
            {
                self.handle_in_head(token)
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "head" | "noscript") => {
                self.parse_error("tag not allowed in head noscript insertion mode");
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name != "br" => {
                self.parse_error("end tag not allowed in head noscript insertion mode");
                ModeOutcome::Consumed
            }
            _ => {
                self.parse_error("unhandled token in head noscript insertion mode");
                self.open_elements.pop();
                ModeOutcome::Reprocess(InsertionMode::InHead)
            }
        }
    }

    fn handle_after_head(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } if token.is_empty_or_white() => {
                self.insert_text_str(value, *location);
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in after head insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "body" => {
                self.insert_html_element(token);
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InBody;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "frameset" => {
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InFrameset;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                        | "style" | "template" | "title"
                ) =>
            {
                self.parse_error("tag belongs in the head");
                let Some(head_id) = self.head_element else {
                    return ModeOutcome::Consumed;
                };
                self.open_elements.push(head_id);
                let outcome = self.handle_in_head(token);
                self.open_elements.retain(|&id| id != head_id);
                outcome
            }
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head(token),
            Token::StartTag { name, .. } if name == "head" => {
                self.parse_error("head start tag not allowed in after head insertion mode");
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if !matches!(name.as_str(), "body" | "html" | "br") =>
            {
                self.parse_error("end tag not allowed in after head insertion mode");
                ModeOutcome::Consumed
            }
            _ => {
                self.document.metadata.has_manufactured_body = true;
                let node = Node::new_element(
                    "body",
                    Attributes::new(),
                    HTML_NAMESPACE,
                    token.get_location(),
                );
                self.insert_element_node(node);
                ModeOutcome::Reprocess(InsertionMode::InBody)
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn handle_in_body(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } => {
                let value = if token.is_null() {
                    self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                    value.replace(CHAR_NUL, "")
                } else {
                    value.clone()
                };
                if value.is_empty() {
                    return ModeOutcome::Consumed;
                }

                self.reconstruct_formatting();
                self.insert_text_str(&value, *location);
                if !token.is_empty_or_white() {
                    self.frameset_ok = false;
                }
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in body insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name, attributes, ..
            } if name == "html" => {
                self.parse_error("html start tag not allowed in body insertion mode");
                if open_elements_has!(self, "template") {
                    return ModeOutcome::Consumed;
                }

                // Merge the attributes into the existing html element; the
                // first occurrence of each name stays
                let html_id = self.open_elements[0];
                if let Some(existing) = self
                    .document
                    .get_mut_node_by_id(html_id)
                    .and_then(Node::attributes_mut)
                {
                    for attr in attributes {
                        existing.insert(&attr.name, &attr.value);
                    }
                }
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                        | "style" | "template" | "title"
                ) =>
            {
                self.handle_in_head(token)
            }
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head(token),
            Token::StartTag {
                name, attributes, ..
            } if name == "body" => {
                self.parse_error("body start tag not allowed in body insertion mode");
                if self.open_elements.len() == 1
                    || !open_elements_get!(self, 1).is_html_element("body")
                    || open_elements_has!(self, "template")
                {
                    // fragment case
                    return ModeOutcome::Consumed;
                }

                self.frameset_ok = false;
                let body_id = self.open_elements[1];
                if let Some(existing) = self
                    .document
                    .get_mut_node_by_id(body_id)
                    .and_then(Node::attributes_mut)
                {
                    for attr in attributes {
                        existing.insert(&attr.name, &attr.value);
                    }
                }
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "frameset" => {
                self.parse_error("frameset start tag not allowed in body insertion mode");
                if self.open_elements.len() == 1
                    || !open_elements_get!(self, 1).is_html_element("body")
                    || !self.frameset_ok
                {
                    return ModeOutcome::Consumed;
                }

                let body_id = self.open_elements[1];
                self.document.detach(body_id);
                self.open_elements.truncate(1);
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InFrameset;
                ModeOutcome::Consumed
            }
            Token::Eof { .. } => {
                if !self.template_insertion_mode.is_empty() {
                    return self.handle_in_template(token);
                }
                self.check_open_elements_at_stop();
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "body" => {
                if !self.is_in_scope("body", Scope::Regular) {
                    self.parse_error("body end tag without body in scope");
                    return ModeOutcome::Consumed;
                }
                self.check_open_elements_at_stop();
                self.insertion_mode = InsertionMode::AfterBody;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "html" => {
                if !self.is_in_scope("body", Scope::Regular) {
                    self.parse_error("html end tag without body in scope");
                    return ModeOutcome::Consumed;
                }
                self.check_open_elements_at_stop();
                ModeOutcome::Reprocess(InsertionMode::AfterBody)
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "address" | "article" | "aside" | "blockquote" | "center" | "details"
                        | "dialog" | "dir" | "div" | "dl" | "fieldset" | "figcaption"
                        | "figure" | "footer" | "header" | "hgroup" | "main" | "menu" | "nav"
                        | "ol" | "p" | "search" | "section" | "summary" | "ul"
                ) =>
            {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") =>
            {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                if matches!(
                    current_node!(self).name.as_str(),
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
                ) {
                    self.parse_error("heading inside heading");
                    self.open_elements.pop();
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "pre" | "listing") => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(token);
                self.ignore_lf = true;
                self.frameset_ok = false;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "form" => {
                if self.form_element.is_some() && !open_elements_has!(self, "template") {
                    self.parse_error("form inside form");
                    return ModeOutcome::Consumed;
                }
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                let node_id = self.insert_html_element(token);
                if !open_elements_has!(self, "template") {
                    self.form_element = Some(node_id);
                }
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "li" => {
                self.frameset_ok = false;
                for idx in (0..self.open_elements.len()).rev() {
                    let (node_name, special) = {
                        let node = open_elements_get!(self, idx);
                        (node.name.clone(), node.is_special())
                    };
                    if node_name == "li" {
                        self.generate_implied_end_tags(Some("li"), false);
                        if current_node!(self).name != "li" {
                            self.parse_error("open elements remain while closing li");
                        }
                        self.pop_until_named("li");
                        break;
                    }
                    if special && !matches!(node_name.as_str(), "address" | "div" | "p") {
                        break;
                    }
                }
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "dd" | "dt") => {
                self.frameset_ok = false;
                for idx in (0..self.open_elements.len()).rev() {
                    let (node_name, special) = {
                        let node = open_elements_get!(self, idx);
                        (node.name.clone(), node.is_special())
                    };
                    if node_name == "dd" || node_name == "dt" {
                        self.generate_implied_end_tags(Some(&node_name), false);
                        if current_node!(self).name != node_name {
                            self.parse_error("open elements remain while closing dd or dt");
                        }
                        self.pop_until_named(&node_name);
                        break;
                    }
                    if special && !matches!(node_name.as_str(), "address" | "div" | "p") {
                        break;
                    }
                }
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "plaintext" => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                self.insert_html_element(token);
                self.tokenizer.state = State::PlaintextState;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "button" => {
                if self.is_in_scope("button", Scope::Regular) {
                    self.parse_error("button inside button");
                    self.generate_implied_end_tags(None, false);
                    self.pop_until_named("button");
                }
                self.reconstruct_formatting();
                self.insert_html_element(token);
                self.frameset_ok = false;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "address" | "article" | "aside" | "blockquote" | "button" | "center"
                        | "details" | "dialog" | "dir" | "div" | "dl" | "fieldset"
                        | "figcaption" | "figure" | "footer" | "header" | "hgroup" | "listing"
                        | "main" | "menu" | "nav" | "ol" | "pre" | "search" | "section"
                        | "summary" | "ul"
                ) =>
            {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.parse_error("end tag without matching element in scope");
                    return ModeOutcome::Consumed;
                }
                self.generate_implied_end_tags(None, false);
                if current_node!(self).name != *name {
                    self.parse_error("open elements remain while closing element");
                }
                self.pop_until_named(name);
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "form" => {
                if open_elements_has!(self, "template") {
                    if !self.is_in_scope("form", Scope::Regular) {
                        self.parse_error("form end tag without form in scope");
                        return ModeOutcome::Consumed;
                    }
                    self.generate_implied_end_tags(None, false);
                    if current_node!(self).name != "form" {
                        self.parse_error("open elements remain while closing form");
                    }
                    self.pop_until_named("form");
                    return ModeOutcome::Consumed;
                }

                let node_id = self.form_element.take();
                let Some(node_id) = node_id else {
                    self.parse_error("form end tag without open form");
                    return ModeOutcome::Consumed;
                };
                if !self.is_node_in_scope(node_id, Scope::Regular) {
                    self.parse_error("form end tag without form in scope");
                    return ModeOutcome::Consumed;
                }
                self.generate_implied_end_tags(None, false);
                if current_node!(self).id != node_id {
                    self.parse_error("open elements remain while closing form");
                }
                self.open_elements.retain(|&id| id != node_id);
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "p" => {
                if !self.is_in_scope("p", Scope::Button) {
                    self.parse_error("p end tag without p in scope");
                    let node = Node::new_element(
                        "p",
                        Attributes::new(),
                        HTML_NAMESPACE,
                        token.get_location(),
                    );
                    self.insert_element_node(node);
                }
                self.close_p_element();
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "li" => {
                if !self.is_in_scope("li", Scope::ListItem) {
                    self.parse_error("li end tag without li in scope");
                    return ModeOutcome::Consumed;
                }
                self.generate_implied_end_tags(Some("li"), false);
                if current_node!(self).name != "li" {
                    self.parse_error("open elements remain while closing li");
                }
                self.pop_until_named("li");
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if matches!(name.as_str(), "dd" | "dt") => {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.parse_error("end tag without matching element in scope");
                    return ModeOutcome::Consumed;
                }
                self.generate_implied_end_tags(Some(name), false);
                if current_node!(self).name != *name {
                    self.parse_error("open elements remain while closing dd or dt");
                }
                self.pop_until_named(name);
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") =>
            {
                const HEADINGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];
                if !HEADINGS.iter().any(|h| self.is_in_scope(h, Scope::Regular)) {
                    self.parse_error("heading end tag without heading in scope");
                    return ModeOutcome::Consumed;
                }
                self.generate_implied_end_tags(None, false);
                if current_node!(self).name != *name {
                    self.parse_error("open elements remain while closing heading");
                }
                self.pop_until_any(&HEADINGS);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "a" => {
                let mut open_a = None;
                for entry in self.active_formatting_elements.iter().rev() {
                    match entry {
                        ActiveElement::Marker => break,
                        ActiveElement::NodeId(node_id) => {
                            if self
                                .document
                                .get_node_by_id(*node_id)
                                .is_some_and(|node| node.name == "a")
                            {
                                open_a = Some(*node_id);
                                break;
                            }
                        }
                    }
                }
                if let Some(node_id) = open_a {
                    self.parse_error("a inside a");
                    self.run_adoption_agency(token);
                    self.active_formatting_elements
                        .retain(|entry| entry != &ActiveElement::NodeId(node_id));
                    self.open_elements.retain(|&id| id != node_id);
                }

                self.reconstruct_formatting();
                let node_id = self.insert_html_element(token);
                self.active_formatting_elements_push(node_id);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "b" | "big" | "code" | "em" | "font" | "i" | "s" | "small" | "strike"
                        | "strong" | "tt" | "u"
                ) =>
            {
                self.reconstruct_formatting();
                let node_id = self.insert_html_element(token);
                self.active_formatting_elements_push(node_id);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "nobr" => {
                self.reconstruct_formatting();
                if self.is_in_scope("nobr", Scope::Regular) {
                    self.parse_error("nobr inside nobr");
                    self.run_adoption_agency(token);
                    self.reconstruct_formatting();
                }
                let node_id = self.insert_html_element(token);
                self.active_formatting_elements_push(node_id);
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "a" | "b" | "big" | "code" | "em" | "font" | "i" | "nobr" | "s" | "small"
                        | "strike" | "strong" | "tt" | "u"
                ) =>
            {
                if let AdoptionResult::ProcessAsAnyOther = self.run_adoption_agency(token) {
                    self.handle_any_other_end_tag(token);
                }
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(name.as_str(), "applet" | "marquee" | "object") =>
            {
                self.reconstruct_formatting();
                self.insert_html_element(token);
                self.active_formatting_elements.push(ActiveElement::Marker);
                self.frameset_ok = false;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "applet" | "marquee" | "object") =>
            {
                if !self.is_in_scope(name, Scope::Regular) {
                    self.parse_error("end tag without matching element in scope");
                    return ModeOutcome::Consumed;
                }
                self.generate_implied_end_tags(None, false);
                if current_node!(self).name != *name {
                    self.parse_error("open elements remain while closing element");
                }
                self.pop_until_named(name);
                self.clear_active_formatting_until_marker();
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "table" => {
                if self.document.quirks_mode != QuirksMode::Quirks
                    && self.is_in_scope("p", Scope::Button)
                {
                    self.close_p_element();
                }
                self.insert_html_element(token);
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::InTable;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "br" => {
                self.parse_error("br end tag acts as br start tag");
                let start = Token::StartTag {
                    name: "br".to_string(),
                    is_self_closing: false,
                    attributes: Attributes::new(),
                    location: token.get_location(),
                };
                self.reconstruct_formatting();
                self.insert_html_element(&start);
                self.open_elements.pop();
                self.frameset_ok = false;
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if matches!(name.as_str(), "area" | "br" | "embed" | "img" | "keygen" | "wbr") => {
                self.reconstruct_formatting();
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                self.frameset_ok = false;
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                ..
            } if name == "input" => {
                self.reconstruct_formatting();
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                let hidden = attributes
                    .get("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("hidden"));
                if !hidden {
                    self.frameset_ok = false;
                }
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if matches!(name.as_str(), "param" | "source" | "track") => {
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if name == "hr" => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                self.frameset_ok = false;
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                location,
            } if name == "image" => {
                self.parse_error("image tag should be img");
                let img = Token::StartTag {
                    name: "img".to_string(),
                    is_self_closing: *is_self_closing,
                    attributes: attributes.clone(),
                    location: *location,
                };
                self.handle_in_body(&img)
            }
            Token::StartTag { name, .. } if name == "textarea" => {
                self.insert_html_element(token);
                self.ignore_lf = true;
                self.tokenizer.state = State::RcDataState;
                self.original_insertion_mode = self.insertion_mode;
                self.frameset_ok = false;
                self.insertion_mode = InsertionMode::Text;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "xmp" => {
                if self.is_in_scope("p", Scope::Button) {
                    self.close_p_element();
                }
                self.reconstruct_formatting();
                self.frameset_ok = false;
                self.parse_raw_data(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "iframe" => {
                self.frameset_ok = false;
                self.parse_raw_data(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if name == "noembed" || (name == "noscript" && self.scripting_enabled) =>
            {
                self.parse_raw_data(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "select" => {
                self.reconstruct_formatting();
                self.insert_html_element(token);
                self.frameset_ok = false;
                self.insertion_mode = match self.insertion_mode {
                    InsertionMode::InTable
                    | InsertionMode::InCaption
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell => InsertionMode::InSelectInTable,
                    _ => InsertionMode::InSelect,
                };
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "optgroup" | "option") => {
                if current_node!(self).name == "option" {
                    self.open_elements.pop();
                }
                self.reconstruct_formatting();
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "rb" | "rtc") => {
                if self.is_in_scope("ruby", Scope::Regular) {
                    self.generate_implied_end_tags(None, false);
                    if current_node!(self).name != "ruby" {
                        self.parse_error("open elements remain inside ruby");
                    }
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "rp" | "rt") => {
                if self.is_in_scope("ruby", Scope::Regular) {
                    self.generate_implied_end_tags(Some("rtc"), false);
                    if !matches!(current_node!(self).name.as_str(), "rtc" | "ruby") {
                        self.parse_error("open elements remain inside ruby");
                    }
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if name == "math" => {
                self.reconstruct_formatting();
                let node = self.create_node(token, MATHML_NAMESPACE);
                self.insert_element_node(node);
                if *is_self_closing {
                    self.open_elements.pop();
                    self.acknowledge_closing_tag(true);
                }
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if name == "svg" => {
                self.reconstruct_formatting();
                let node = self.create_node(token, SVG_NAMESPACE);
                self.insert_element_node(node);
                if *is_self_closing {
                    self.open_elements.pop();
                    self.acknowledge_closing_tag(true);
                }
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "frame" | "head" | "tbody" | "td"
                        | "tfoot" | "th" | "thead" | "tr"
                ) =>
            {
                self.parse_error("tag not allowed in body insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { .. } => {
                self.reconstruct_formatting();
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::EndTag { .. } => {
                self.handle_any_other_end_tag(token);
                ModeOutcome::Consumed
            }
        }
    }

    fn handle_text(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } => {
                self.insert_text_str(value, *location);
                ModeOutcome::Consumed
            }
            Token::Eof { .. } => {
                self.parse_error("unexpected end of input in element content");
                self.open_elements.pop();
                ModeOutcome::Reprocess(self.original_insertion_mode)
            }
            _ => {
                // end tag for the rcdata, rawtext or script element
                self.open_elements.pop();
                self.insertion_mode = self.original_insertion_mode;
                ModeOutcome::Consumed
            }
        }
    }

    fn handle_in_table(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { .. }
                if matches!(
                    current_node!(self).name.as_str(),
                    "table" | "tbody" | "template" | "tfoot" | "thead" | "tr"
                ) =>
            {
                self.pending_table_character_tokens.clear();
                self.original_insertion_mode = self.insertion_mode;
                ModeOutcome::Reprocess(InsertionMode::InTableText)
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in table insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "caption" => {
                self.clear_stack_back_to_table_context();
                self.active_formatting_elements.push(ActiveElement::Marker);
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InCaption;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "colgroup" => {
                self.clear_stack_back_to_table_context();
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InColumnGroup;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "col" => {
                self.clear_stack_back_to_table_context();
                let node = Node::new_element(
                    "colgroup",
                    Attributes::new(),
                    HTML_NAMESPACE,
                    token.get_location(),
                );
                self.insert_element_node(node);
                ModeOutcome::Reprocess(InsertionMode::InColumnGroup)
            }
            Token::StartTag { name, .. }
                if matches!(name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                self.clear_stack_back_to_table_context();
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InTableBody;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "td" | "th" | "tr") => {
                self.clear_stack_back_to_table_context();
                let node = Node::new_element(
                    "tbody",
                    Attributes::new(),
                    HTML_NAMESPACE,
                    token.get_location(),
                );
                self.insert_element_node(node);
                ModeOutcome::Reprocess(InsertionMode::InTableBody)
            }
            Token::StartTag { name, .. } if name == "table" => {
                self.parse_error("table inside table");
                if !self.is_in_scope("table", Scope::Table) {
                    return ModeOutcome::Consumed;
                }
                self.pop_until_named("table");
                self.reset_insertion_mode();
                ModeOutcome::Reprocess(self.insertion_mode)
            }
            Token::EndTag { name, .. } if name == "table" => {
                if !self.is_in_scope("table", Scope::Table) {
                    self.parse_error("table end tag without table in scope");
                    return ModeOutcome::Consumed;
                }
                self.pop_until_named("table");
                self.reset_insertion_mode();
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td"
                        | "tfoot" | "th" | "thead" | "tr"
                ) =>
            {
                self.parse_error("end tag not allowed in table insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(name.as_str(), "style" | "script" | "template") =>
            {
                self.handle_in_head(token)
            }
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head(token),
            Token::StartTag {
                name,
                is_self_closing,
                attributes,
                ..
            } if name == "input"
                && attributes
                    .get("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("hidden")) =>
            {
                self.parse_error("hidden input in table");
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "form" => {
                self.parse_error("form in table");
                if open_elements_has!(self, "template") || self.form_element.is_some() {
                    return ModeOutcome::Consumed;
                }
                let node_id = self.insert_html_element(token);
                self.form_element = Some(node_id);
                self.open_elements.pop();
                ModeOutcome::Consumed
            }
            Token::Eof { .. } => self.handle_in_body(token),
            _ => {
                self.parse_error("unexpected token in table insertion mode");
                self.foster_parenting = true;
                let outcome = self.handle_in_body(token);
                self.foster_parenting = false;
                outcome
            }
        }
    }

    fn handle_in_table_text(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } => {
                let value = if token.is_null() {
                    self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                    value.replace(CHAR_NUL, "")
                } else {
                    value.clone()
                };
                if !value.is_empty() {
                    self.pending_table_character_tokens.push(Token::Text {
                        value,
                        location: *location,
                    });
                }
                ModeOutcome::Consumed
            }
            _ => {
                let pending = std::mem::take(&mut self.pending_table_character_tokens);
                let any_non_whitespace = pending.iter().any(|t| !t.is_empty_or_white());

                if any_non_whitespace {
                    // Non-whitespace between table glue gets foster parented
                    // the same way any other stray content would
                    self.parse_error("non-whitespace text in table");
                    self.foster_parenting = true;
                    for pending_token in &pending {
                        if let Token::Text { value, location } = pending_token {
                            self.reconstruct_formatting();
                            self.insert_text_str(value, *location);
                            self.frameset_ok = false;
                        }
                    }
                    self.foster_parenting = false;
                } else {
                    for pending_token in &pending {
                        if let Token::Text { value, location } = pending_token {
                            self.insert_text_str(value, *location);
                        }
                    }
                }

                ModeOutcome::Reprocess(self.original_insertion_mode)
            }
        }
    }

    fn handle_in_caption(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::EndTag { name, .. } if name == "caption" => {
                if !self.is_in_scope("caption", Scope::Table) {
                    self.parse_error("caption end tag without caption in scope");
                    return ModeOutcome::Consumed;
                }
                self.close_caption();
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th"
                        | "thead" | "tr"
                ) =>
            {
                if !self.is_in_scope("caption", Scope::Table) {
                    self.parse_error("tag not allowed without caption in scope");
                    return ModeOutcome::Consumed;
                }
                self.close_caption();
                ModeOutcome::Reprocess(InsertionMode::InTable)
            }
            Token::EndTag { name, .. } if name == "table" => {
                if !self.is_in_scope("caption", Scope::Table) {
                    self.parse_error("table end tag without caption in scope");
                    return ModeOutcome::Consumed;
                }
                self.close_caption();
                ModeOutcome::Reprocess(InsertionMode::InTable)
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th"
                        | "thead" | "tr"
                ) =>
            {
                self.parse_error("end tag not allowed in caption insertion mode");
                ModeOutcome::Consumed
            }
            _ => self.handle_in_body(token),
        }
    }

    fn handle_in_column_group(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } if token.is_empty_or_white() => {
                self.insert_text_str(value, *location);
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in column group insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if name == "col" => {
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "colgroup" => {
                if current_node!(self).name != "colgroup" {
                    self.parse_error("colgroup end tag without colgroup as current node");
                    return ModeOutcome::Consumed;
                }
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "col" => {
                self.parse_error("col end tag not allowed in column group insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "template" => self.handle_in_head(token),
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head(token),
            Token::Eof { .. } => self.handle_in_body(token),
            _ => {
                if current_node!(self).name != "colgroup" {
                    self.parse_error("unexpected token in column group insertion mode");
                    return ModeOutcome::Consumed;
                }
                self.open_elements.pop();
                ModeOutcome::Reprocess(InsertionMode::InTable)
            }
        }
    }

    fn handle_in_table_body(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::StartTag { name, .. } if name == "tr" => {
                self.clear_stack_back_to_table_body_context();
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InRow;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "th" | "td") => {
                self.parse_error("cell without tr in table body");
                self.clear_stack_back_to_table_body_context();
                let node = Node::new_element(
                    "tr",
                    Attributes::new(),
                    HTML_NAMESPACE,
                    token.get_location(),
                );
                self.insert_element_node(node);
                self.insertion_mode = InsertionMode::InRow;
                ModeOutcome::Reprocess(InsertionMode::InRow)
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("end tag without matching element in table scope");
                    return ModeOutcome::Consumed;
                }
                self.clear_stack_back_to_table_body_context();
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTable;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead"
                ) =>
            {
                self.close_table_body_section(token)
            }
            Token::EndTag { name, .. } if name == "table" => self.close_table_body_section(token),
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr"
                ) =>
            {
                self.parse_error("end tag not allowed in table body insertion mode");
                ModeOutcome::Consumed
            }
            _ => self.handle_in_table(token),
        }
    }

    // Ends the current tbody, thead or tfoot and hands the token to InTable
    fn close_table_body_section(&mut self, _token: &Token) -> ModeOutcome {
        let any_section = ["tbody", "thead", "tfoot"]
            .iter()
            .any(|name| self.is_in_scope(name, Scope::Table));
        if !any_section {
            self.parse_error("no table section in table scope");
            return ModeOutcome::Consumed;
        }
        self.clear_stack_back_to_table_body_context();
        self.open_elements.pop();
        ModeOutcome::Reprocess(InsertionMode::InTable)
    }

    fn handle_in_row(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::StartTag { name, .. } if matches!(name.as_str(), "th" | "td") => {
                self.clear_stack_back_to_table_row_context();
                self.insert_html_element(token);
                self.insertion_mode = InsertionMode::InCell;
                self.active_formatting_elements.push(ActiveElement::Marker);
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "tr" => {
                if !self.is_in_scope("tr", Scope::Table) {
                    self.parse_error("tr end tag without tr in table scope");
                    return ModeOutcome::Consumed;
                }
                self.clear_stack_back_to_table_row_context();
                self.open_elements.pop();
                self.insertion_mode = InsertionMode::InTableBody;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr"
                ) =>
            {
                if !self.is_in_scope("tr", Scope::Table) {
                    self.parse_error("tag not allowed without tr in table scope");
                    return ModeOutcome::Consumed;
                }
                self.clear_stack_back_to_table_row_context();
                self.open_elements.pop();
                ModeOutcome::Reprocess(InsertionMode::InTableBody)
            }
            Token::EndTag { name, .. } if name == "table" => {
                if !self.is_in_scope("tr", Scope::Table) {
                    self.parse_error("table end tag without tr in table scope");
                    return ModeOutcome::Consumed;
                }
                self.clear_stack_back_to_table_row_context();
                self.open_elements.pop();
                ModeOutcome::Reprocess(InsertionMode::InTableBody)
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "tbody" | "tfoot" | "thead") =>
            {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("end tag without matching element in table scope");
                    return ModeOutcome::Consumed;
                }
                if !self.is_in_scope("tr", Scope::Table) {
                    return ModeOutcome::Consumed;
                }
                self.clear_stack_back_to_table_row_context();
                self.open_elements.pop();
                ModeOutcome::Reprocess(InsertionMode::InTableBody)
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th"
                ) =>
            {
                self.parse_error("end tag not allowed in row insertion mode");
                ModeOutcome::Consumed
            }
            _ => self.handle_in_table(token),
        }
    }

    fn handle_in_cell(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::EndTag { name, .. } if matches!(name.as_str(), "td" | "th") => {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("cell end tag without cell in table scope");
                    return ModeOutcome::Consumed;
                }
                self.generate_implied_end_tags(None, false);
                if current_node!(self).name != *name {
                    self.parse_error("open elements remain while closing cell");
                }
                self.pop_until_named(name);
                self.clear_active_formatting_until_marker();
                self.insertion_mode = InsertionMode::InRow;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th"
                        | "thead" | "tr"
                ) =>
            {
                if !self.is_in_scope("td", Scope::Table) && !self.is_in_scope("th", Scope::Table)
                {
                    self.parse_error("tag not allowed without open cell");
                    return ModeOutcome::Consumed;
                }
                self.close_cell();
                ModeOutcome::Reprocess(InsertionMode::InRow)
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "body" | "caption" | "col" | "colgroup" | "html") =>
            {
                self.parse_error("end tag not allowed in cell insertion mode");
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. }
                if matches!(name.as_str(), "table" | "tbody" | "tfoot" | "thead" | "tr") =>
            {
                if !self.is_in_scope(name, Scope::Table) {
                    self.parse_error("end tag without matching element in table scope");
                    return ModeOutcome::Consumed;
                }
                self.close_cell();
                ModeOutcome::Reprocess(InsertionMode::InRow)
            }
            _ => self.handle_in_body(token),
        }
    }

    fn handle_in_select(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } => {
                let value = if token.is_null() {
                    self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                    value.replace(CHAR_NUL, "")
                } else {
                    value.clone()
                };
                if !value.is_empty() {
                    self.insert_text_str(&value, *location);
                }
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in select insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "option" => {
                if current_node!(self).name == "option" {
                    self.open_elements.pop();
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "optgroup" => {
                if current_node!(self).name == "option" {
                    self.open_elements.pop();
                }
                if current_node!(self).name == "optgroup" {
                    self.open_elements.pop();
                }
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if name == "hr" => {
                if current_node!(self).name == "option" {
                    self.open_elements.pop();
                }
                if current_node!(self).name == "optgroup" {
                    self.open_elements.pop();
                }
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "optgroup" => {
                if current_node!(self).name == "option" && self.open_elements.len() > 1 {
                    let above = open_elements_get!(self, self.open_elements.len() - 2);
                    if above.name == "optgroup" {
                        self.open_elements.pop();
                    }
                }
                if current_node!(self).name == "optgroup" {
                    self.open_elements.pop();
                } else {
                    self.parse_error("optgroup end tag without optgroup as current node");
                }
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "option" => {
                if current_node!(self).name == "option" {
                    self.open_elements.pop();
                } else {
                    self.parse_error("option end tag without option as current node");
                }
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "select" => {
                if !self.is_in_scope("select", Scope::Select) {
                    self.parse_error("select end tag without select in scope");
                    return ModeOutcome::Consumed;
                }
                self.pop_until_named("select");
                self.reset_insertion_mode();
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "select" => {
                self.parse_error("select inside select");
                if self.is_in_scope("select", Scope::Select) {
                    self.pop_until_named("select");
                    self.reset_insertion_mode();
                }
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. }
                if matches!(name.as_str(), "input" | "keygen" | "textarea") =>
            {
                self.parse_error("input-like tag inside select");
                if !self.is_in_scope("select", Scope::Select) {
                    return ModeOutcome::Consumed;
                }
                self.pop_until_named("select");
                self.reset_insertion_mode();
                ModeOutcome::Reprocess(self.insertion_mode)
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "script" | "template") => {
                self.handle_in_head(token)
            }
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head(token),
            Token::Eof { .. } => self.handle_in_body(token),
            _ => {
                self.parse_error("unexpected token in select insertion mode");
                ModeOutcome::Consumed
            }
        }
    }

    fn handle_in_select_in_table(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                ) =>
            {
                self.parse_error("table tag interrupts select");
                self.pop_until_named("select");
                self.reset_insertion_mode();
                ModeOutcome::Reprocess(self.insertion_mode)
            }
            Token::EndTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
                ) =>
            {
                self.parse_error("table end tag interrupts select");
                if !self.is_in_scope(name, Scope::Table) {
                    return ModeOutcome::Consumed;
                }
                self.pop_until_named("select");
                self.reset_insertion_mode();
                ModeOutcome::Reprocess(self.insertion_mode)
            }
            _ => self.handle_in_select(token),
        }
    }

    fn handle_in_template(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { .. } | Token::Comment { .. } | Token::DocType { .. } => {
                self.handle_in_body(token)
            }
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                        | "style" | "template" | "title"
                ) =>
            {
                self.handle_in_head(token)
            }
            Token::EndTag { name, .. } if name == "template" => self.handle_in_head(token),
            Token::StartTag { name, .. }
                if matches!(name.as_str(), "caption" | "colgroup" | "tbody" | "tfoot" | "thead") =>
            {
                self.template_insertion_mode.pop();
                self.template_insertion_mode.push(InsertionMode::InTable);
                ModeOutcome::Reprocess(InsertionMode::InTable)
            }
            Token::StartTag { name, .. } if name == "col" => {
                self.template_insertion_mode.pop();
                self.template_insertion_mode.push(InsertionMode::InColumnGroup);
                ModeOutcome::Reprocess(InsertionMode::InColumnGroup)
            }
            Token::StartTag { name, .. } if name == "tr" => {
                self.template_insertion_mode.pop();
                self.template_insertion_mode.push(InsertionMode::InTableBody);
                ModeOutcome::Reprocess(InsertionMode::InTableBody)
            }
            Token::StartTag { name, .. } if matches!(name.as_str(), "td" | "th") => {
                self.template_insertion_mode.pop();
                self.template_insertion_mode.push(InsertionMode::InRow);
                ModeOutcome::Reprocess(InsertionMode::InRow)
            }
            Token::StartTag { .. } => {
                self.template_insertion_mode.pop();
                self.template_insertion_mode.push(InsertionMode::InBody);
                ModeOutcome::Reprocess(InsertionMode::InBody)
            }
            Token::EndTag { .. } => {
                self.parse_error("end tag not allowed in template insertion mode");
                ModeOutcome::Consumed
            }
            Token::Eof { .. } => {
                if !open_elements_has!(self, "template") {
                    return ModeOutcome::Consumed;
                }
                self.parse_error("unexpected end of input with open template");
                self.pop_until_named("template");
                self.clear_active_formatting_until_marker();
                self.template_insertion_mode.pop();
                self.reset_insertion_mode();
                ModeOutcome::Reprocess(self.insertion_mode)
            }
        }
    }

    fn handle_after_body(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { .. } if token.is_empty_or_white() => self.handle_in_body(token),
            Token::Comment { .. } => {
                // comment becomes the last child of the html element
                let html_id = self.open_elements[0];
                self.insert_comment_into(token, html_id);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in after body insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTag { name, .. } if name == "html" => {
                if self.is_fragment_case {
                    self.parse_error("html end tag in fragment");
                    return ModeOutcome::Consumed;
                }
                self.insertion_mode = InsertionMode::AfterAfterBody;
                ModeOutcome::Consumed
            }
            Token::Eof { .. } => ModeOutcome::Consumed,
            _ => {
                self.parse_error("unexpected token in after body insertion mode");
                ModeOutcome::Reprocess(InsertionMode::InBody)
            }
        }
    }

    fn handle_in_frameset(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } if token.is_empty_or_white() => {
                self.insert_text_str(value, *location);
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in frameset insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "frameset" => {
                self.insert_html_element(token);
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } if name == "frameset" => {
                if self.open_elements.len() == 1 {
                    self.parse_error("frameset end tag with nothing to close");
                    return ModeOutcome::Consumed;
                }
                self.open_elements.pop();
                if !self.is_fragment_case && current_node!(self).name != "frameset" {
                    self.insertion_mode = InsertionMode::AfterFrameset;
                }
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name,
                is_self_closing,
                ..
            } if name == "frame" => {
                self.acknowledge_closing_tag(*is_self_closing);
                self.insert_html_element(token);
                self.open_elements.pop();
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::Eof { .. } => {
                if self.open_elements.len() != 1 {
                    self.parse_error("unexpected end of input in frameset");
                }
                ModeOutcome::Consumed
            }
            _ => {
                self.parse_error("unexpected token in frameset insertion mode");
                ModeOutcome::Consumed
            }
        }
    }

    fn handle_after_frameset(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } if token.is_empty_or_white() => {
                self.insert_text_str(value, *location);
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in after frameset insertion mode");
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTag { name, .. } if name == "html" => {
                self.insertion_mode = InsertionMode::AfterAfterFrameset;
                ModeOutcome::Consumed
            }
            Token::StartTag { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::Eof { .. } => ModeOutcome::Consumed,
            _ => {
                self.parse_error("unexpected token in after frameset insertion mode");
                ModeOutcome::Consumed
            }
        }
    }

    fn handle_after_after_body(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Comment { .. } => {
                self.insert_document_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => self.handle_in_body(token),
            Token::Text { .. } if token.is_empty_or_white() => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::Eof { .. } => ModeOutcome::Consumed,
            _ => {
                self.parse_error("unexpected token after the document");
                ModeOutcome::Reprocess(InsertionMode::InBody)
            }
        }
    }

    fn handle_after_after_frameset(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Comment { .. } => {
                self.insert_document_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => self.handle_in_body(token),
            Token::Text { .. } if token.is_empty_or_white() => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::Eof { .. } => ModeOutcome::Consumed,
            _ => {
                self.parse_error("unexpected token after the document");
                ModeOutcome::Consumed
            }
        }
    }

    /// Should the token be handled by the foreign content rules instead of
    /// the current insertion mode (13.2.6.5)
    fn use_foreign_content_rules(&self, token: &Token) -> bool {
        if self.open_elements.is_empty() {
            return false;
        }
        let Some(node) = self.document.get_node_by_id(self.adjusted_current_node_id()) else {
            return false;
        };

        let namespace = node.namespace.as_deref().unwrap_or("");
        if namespace == HTML_NAMESPACE {
            return false;
        }

        if is_mathml_text_integration_point(node) {
            match token {
                Token::StartTag { name, .. } if name != "mglyph" && name != "malignmark" => {
                    return false;
                }
                Token::Text { .. } => return false,
                _ => {}
            }
        }
        if namespace == MATHML_NAMESPACE && node.name == "annotation-xml" {
            if let Token::StartTag { name, .. } = token {
                if name == "svg" {
                    return false;
                }
            }
        }
        if is_html_integration_point(node) {
            if let Token::StartTag { .. } | Token::Text { .. } = token {
                return false;
            }
        }

        !token.is_eof()
    }

    fn handle_foreign_content(&mut self, token: &Token) -> ModeOutcome {
        match token {
            Token::Text { value, location } => {
                let value = if token.is_null() {
                    self.parse_error(ParserError::UnexpectedNullCharacter.as_str());
                    value.replace(CHAR_NUL, &CHAR_REPLACEMENT.to_string())
                } else {
                    value.clone()
                };
                self.insert_text_str(&value, *location);
                if !token.is_empty_or_white() {
                    self.frameset_ok = false;
                }
                ModeOutcome::Consumed
            }
            Token::Comment { .. } => {
                self.insert_comment(token);
                ModeOutcome::Consumed
            }
            Token::DocType { .. } => {
                self.parse_error("doctype not allowed in foreign content");
                ModeOutcome::Consumed
            }
            Token::StartTag {
                name, attributes, ..
            } if FOREIGN_BREAKOUT_TAGS.contains(name.as_str())
                || (name == "font"
                    && (attributes.contains("color")
                        || attributes.contains("face")
                        || attributes.contains("size"))) =>
            {
                self.parse_error("html tag in foreign content");
                self.pop_foreign_until_html_boundary();
                ModeOutcome::Reprocess(self.insertion_mode)
            }
            Token::EndTag { name, .. } if matches!(name.as_str(), "br" | "p") => {
                self.parse_error("html end tag in foreign content");
                self.pop_foreign_until_html_boundary();
                ModeOutcome::Reprocess(self.insertion_mode)
            }
            Token::StartTag {
                is_self_closing, ..
            } => {
                let namespace = self
                    .document
                    .get_node_by_id(self.adjusted_current_node_id())
                    .and_then(|node| node.namespace.clone())
                    .unwrap_or_else(|| HTML_NAMESPACE.to_string());
                let node = self.create_node(token, &namespace);
                self.insert_element_node(node);
                if *is_self_closing {
                    self.open_elements.pop();
                    self.acknowledge_closing_tag(true);
                }
                ModeOutcome::Consumed
            }
            Token::EndTag { name, .. } => {
                if current_node!(self).name.cow_to_ascii_lowercase() != *name {
                    self.parse_error("end tag does not match current node");
                }

                let mut idx = self.open_elements.len();
                while idx > 0 {
                    idx -= 1;
                    let (node_name, is_html) = {
                        let node = open_elements_get!(self, idx);
                        (
                            node.name.clone(),
                            node.namespace.as_deref() == Some(HTML_NAMESPACE),
                        )
                    };
                    if is_html {
                        return self.process_in_mode(self.insertion_mode, token);
                    }
                    if node_name.cow_to_ascii_lowercase() == *name {
                        self.open_elements.truncate(idx);
                        break;
                    }
                }
                ModeOutcome::Consumed
            }
            Token::Eof { .. } => ModeOutcome::Consumed,
        }
    }

    // Pops foreign elements until the current node can take HTML content again
    fn pop_foreign_until_html_boundary(&mut self) {
        while let Some(&top_id) = self.open_elements.last() {
            let Some(node) = self.document.get_node_by_id(top_id) else {
                break;
            };
            if node.namespace.as_deref() == Some(HTML_NAMESPACE)
                || is_mathml_text_integration_point(node)
                || is_html_integration_point(node)
            {
                break;
            }
            self.open_elements.pop();
        }
    }

    /// The adjusted current node. In the fragment case with only the synthetic
    /// root on the stack this is the context element, which is always an HTML
    /// element here, just like the synthetic root itself.
    fn adjusted_current_node_id(&self) -> NodeId {
        *self
            .open_elements
            .last()
            .expect("stack of open elements is empty")
    }

    // Creates a node from a tag token, applying the case adjustments foreign
    // attributes and SVG tag names need
    fn create_node(&self, token: &Token, namespace: &str) -> Node {
        match token {
            Token::StartTag {
                name,
                attributes,
                location,
                ..
            } => {
                let name = if namespace == SVG_NAMESPACE {
                    SVG_TAG_ADJUSTMENTS
                        .get(name.as_str())
                        .copied()
                        .unwrap_or(name.as_str())
                } else {
                    name.as_str()
                };
                let attributes = match namespace {
                    ns if ns == MATHML_NAMESPACE => adjust_attributes(attributes, &MATHML_ADJUSTMENTS),
                    ns if ns == SVG_NAMESPACE => adjust_attributes(attributes, &SVG_ADJUSTMENTS),
                    _ => attributes.clone(),
                };
                Node::new_element(name, attributes, namespace, *location)
            }
            _ => Node::new_element("", Attributes::new(), namespace, token.get_location()),
        }
    }

    /// Inserts an HTML element for the token and pushes it on the stack
    fn insert_html_element(&mut self, token: &Token) -> NodeId {
        let node = self.create_node(token, HTML_NAMESPACE);
        self.insert_element_node(node)
    }

    fn insert_element_node(&mut self, node: Node) -> NodeId {
        let node_id = self.document.register_node(node);
        self.insert_element_by_id(node_id);
        node_id
    }

    fn insert_element_by_id(&mut self, node_id: NodeId) {
        let (parent_id, before_id) = self.adjusted_insert_location(None);
        match before_id {
            Some(before_id) => self.document.insert_before(node_id, parent_id, before_id),
            None => self.document.append(node_id, parent_id),
        }
        self.open_elements.push(node_id);
    }

    /// Where a new node goes: under the current node, unless foster parenting
    /// redirects it around the open table (13.2.6.1). Returns the parent and,
    /// for fostered inserts, the sibling to insert before.
    pub(crate) fn adjusted_insert_location(
        &self,
        override_id: Option<NodeId>,
    ) -> (NodeId, Option<NodeId>) {
        let target_id = override_id
            .or_else(|| self.open_elements.last().copied())
            .unwrap_or(NodeId::root());

        let target_name = self
            .document
            .get_node_by_id(target_id)
            .map_or(String::new(), |node| node.name.clone());

        if self.foster_parenting
            && matches!(
                target_name.as_str(),
                "table" | "tbody" | "tfoot" | "thead" | "tr"
            )
        {
            let last_template = self.open_elements.iter().rposition(|&id| {
                self.document
                    .get_node_by_id(id)
                    .is_some_and(|node| node.is_html_element("template"))
            });
            let last_table = self.open_elements.iter().rposition(|&id| {
                self.document
                    .get_node_by_id(id)
                    .is_some_and(|node| node.is_html_element("table"))
            });

            return match (last_template, last_table) {
                (Some(template_idx), None) => (self.open_elements[template_idx], None),
                (Some(template_idx), Some(table_idx)) if template_idx > table_idx => {
                    (self.open_elements[template_idx], None)
                }
                (None, None) => (self.open_elements[0], None),
                (_, Some(table_idx)) => {
                    let table_id = self.open_elements[table_idx];
                    match self.document.parent(table_id) {
                        Some(parent_id) => (parent_id, Some(table_id)),
                        None => (self.open_elements[table_idx - 1], None),
                    }
                }
            };
        }

        (target_id, None)
    }

    /// Inserts a text run at the adjusted insertion location. Adjacent text
    /// merges into one node, and a pending "skip the next newline" flag from
    /// pre, listing or textarea is honored here.
    fn insert_text_str(&mut self, value: &str, location: Location) {
        let mut value = value;
        if self.ignore_lf {
            self.ignore_lf = false;
            if let Some(stripped) = value.strip_prefix('\n') {
                value = stripped;
            }
        }
        if value.is_empty() {
            return;
        }

        let (parent_id, before_id) = self.adjusted_insert_location(None);
        if parent_id.is_root() {
            // text is never a child of the document itself
            return;
        }

        let preceding_id = match before_id {
            Some(before_id) => {
                let children = self.document.children(parent_id);
                children
                    .iter()
                    .position(|&id| id == before_id)
                    .and_then(|pos| pos.checked_sub(1))
                    .map(|pos| children[pos])
            }
            None => self.document.children(parent_id).last().copied(),
        };
        if let Some(preceding_id) = preceding_id {
            if let Some(Node {
                data: NodeData::Text { value: existing },
                ..
            }) = self.document.get_mut_node_by_id(preceding_id)
            {
                existing.push_str(value);
                return;
            }
        }

        let node_id = self.document.register_node(Node::new_text(value, location));
        match before_id {
            Some(before_id) => self.document.insert_before(node_id, parent_id, before_id),
            None => self.document.append(node_id, parent_id),
        }
    }

    /// Inserts a comment at the adjusted insertion location
    fn insert_comment(&mut self, token: &Token) {
        let (parent_id, before_id) = self.adjusted_insert_location(None);
        let Token::Comment { value, location } = token else {
            return;
        };
        let node_id = self
            .document
            .register_node(Node::new_comment(value, *location));
        match before_id {
            Some(before_id) => self.document.insert_before(node_id, parent_id, before_id),
            None => self.document.append(node_id, parent_id),
        }
    }

    fn insert_comment_into(&mut self, token: &Token, parent_id: NodeId) {
        let Token::Comment { value, location } = token else {
            return;
        };
        let node = Node::new_comment(value, *location);
        self.document.add_node(node, parent_id);
    }

    fn insert_document_comment(&mut self, token: &Token) {
        self.insert_comment_into(token, NodeId::root());
    }

    // RCDATA elements: insert, then collect raw text until the matching end tag
    fn parse_rcdata(&mut self, token: &Token) {
        self.insert_html_element(token);
        self.tokenizer.state = State::RcDataState;
        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    // RAWTEXT elements: like RCDATA, nothing inside is markup
    fn parse_raw_data(&mut self, token: &Token) {
        self.insert_html_element(token);
        self.tokenizer.state = State::RawTextState;
        self.original_insertion_mode = self.insertion_mode;
        self.insertion_mode = InsertionMode::Text;
    }

    fn acknowledge_closing_tag(&mut self, is_self_closing: bool) {
        if is_self_closing {
            self.ack_self_closing = true;
        }
    }

    pub(crate) fn parse_error(&self, message: &str) {
        self.error_logger
            .borrow_mut()
            .add_error(self.tokenizer.get_location(), message);
    }

    /// Is there an element with the given tag name in the given scope (13.2.4.2)
    pub(crate) fn is_in_scope(&self, tag: &str, scope: Scope) -> bool {
        for &node_id in self.open_elements.iter().rev() {
            let Some(node) = self.document.get_node_by_id(node_id) else {
                continue;
            };
            if node.is_html_element(tag) {
                return true;
            }
            if is_scope_barrier(node, scope) {
                return false;
            }
        }
        false
    }

    // Like is_in_scope, but for one specific node instead of a tag name
    fn is_node_in_scope(&self, target_id: NodeId, scope: Scope) -> bool {
        for &node_id in self.open_elements.iter().rev() {
            if node_id == target_id {
                return true;
            }
            let Some(node) = self.document.get_node_by_id(node_id) else {
                continue;
            };
            if is_scope_barrier(node, scope) {
                return false;
            }
        }
        false
    }

    /// Pops elements whose end tags the markup was allowed to omit (13.2.6.3)
    fn generate_implied_end_tags(&mut self, exclude: Option<&str>, thorough: bool) {
        loop {
            if self.open_elements.is_empty() {
                return;
            }
            let name = current_node!(self).name.clone();
            if exclude == Some(name.as_str()) {
                return;
            }
            let implied = matches!(
                name.as_str(),
                "dd" | "dt" | "li" | "optgroup" | "option" | "p" | "rb" | "rp" | "rt" | "rtc"
            ) || (thorough
                && matches!(
                    name.as_str(),
                    "caption" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead" | "tr"
                ));
            if !implied {
                return;
            }
            self.open_elements.pop();
        }
    }

    fn close_p_element(&mut self) {
        self.generate_implied_end_tags(Some("p"), false);
        if current_node!(self).name != "p" {
            self.parse_error("open elements remain while closing p");
        }
        self.pop_until_named("p");
    }

    fn close_cell(&mut self) {
        self.generate_implied_end_tags(None, false);
        if !matches!(current_node!(self).name.as_str(), "td" | "th") {
            self.parse_error("open elements remain while closing cell");
        }
        self.pop_until_any(&["td", "th"]);
        self.clear_active_formatting_until_marker();
        self.insertion_mode = InsertionMode::InRow;
    }

    fn close_caption(&mut self) {
        self.generate_implied_end_tags(None, false);
        if current_node!(self).name != "caption" {
            self.parse_error("open elements remain while closing caption");
        }
        self.pop_until_named("caption");
        self.clear_active_formatting_until_marker();
        self.insertion_mode = InsertionMode::InTable;
    }

    // Handles any end tag the InBody mode has no specific rule for
    fn handle_any_other_end_tag(&mut self, token: &Token) {
        let Token::EndTag { name, .. } = token else {
            return;
        };

        for idx in (0..self.open_elements.len()).rev() {
            let (matches_tag, special) = {
                let node = open_elements_get!(self, idx);
                (node.is_html_element(name), node.is_special())
            };
            if matches_tag {
                self.generate_implied_end_tags(Some(name), false);
                if current_node!(self).name != *name {
                    self.parse_error("open elements remain while closing element");
                }
                self.open_elements.truncate(idx);
                return;
            }
            if special {
                self.parse_error("end tag without matching open element");
                return;
            }
        }
    }

    fn handle_template_end_tag(&mut self) {
        if !open_elements_has!(self, "template") {
            self.parse_error("template end tag without open template");
            return;
        }
        self.generate_implied_end_tags(None, true);
        if current_node!(self).name != "template" {
            self.parse_error("open elements remain while closing template");
        }
        self.pop_until_named("template");
        self.clear_active_formatting_until_marker();
        self.template_insertion_mode.pop();
        self.reset_insertion_mode();
    }

    // Flags elements the source left unclosed at the end of the body
    fn check_open_elements_at_stop(&self) {
        const CLOSABLE: [&str; 18] = [
            "dd", "dt", "li", "optgroup", "option", "p", "rb", "rp", "rt", "rtc", "tbody", "td",
            "tfoot", "th", "thead", "tr", "body", "html",
        ];
        for &node_id in &self.open_elements {
            let Some(node) = self.document.get_node_by_id(node_id) else {
                continue;
            };
            if !CLOSABLE.contains(&node.name.as_str()) {
                self.parse_error("elements left open at end of body");
                break;
            }
        }
    }

    fn pop_until_named(&mut self, name: &str) {
        while let Some(node_id) = self.open_elements.pop() {
            if self
                .document
                .get_node_by_id(node_id)
                .is_some_and(|node| node.name == name)
            {
                break;
            }
        }
    }

    fn pop_until_any(&mut self, names: &[&str]) {
        while let Some(node_id) = self.open_elements.pop() {
            if self
                .document
                .get_node_by_id(node_id)
                .is_some_and(|node| names.contains(&node.name.as_str()))
            {
                break;
            }
        }
    }

    fn clear_stack_back_to_table_context(&mut self) {
        self.clear_stack_back_to(&["table", "template", "html"]);
    }

    fn clear_stack_back_to_table_body_context(&mut self) {
        self.clear_stack_back_to(&["tbody", "tfoot", "thead", "template", "html"]);
    }

    fn clear_stack_back_to_table_row_context(&mut self) {
        self.clear_stack_back_to(&["tr", "template", "html"]);
    }

    fn clear_stack_back_to(&mut self, names: &[&str]) {
        while let Some(&node_id) = self.open_elements.last() {
            if self
                .document
                .get_node_by_id(node_id)
                .is_some_and(|node| names.contains(&node.name.as_str()))
            {
                break;
            }
            self.open_elements.pop();
        }
    }

    /// Picks the insertion mode back from the stack of open elements (13.2.4.1,
    /// "reset the insertion mode appropriately")
    fn reset_insertion_mode(&mut self) {
        for idx in (0..self.open_elements.len()).rev() {
            let last = idx == 0;
            let mut name = open_elements_get!(self, idx).name.clone();
            if last && self.is_fragment_case {
                if let Some(context) = &self.fragment_context_name {
                    name.clone_from(context);
                }
            }

            match name.as_str() {
                "select" => {
                    if !last {
                        for ancestor_idx in (0..idx).rev() {
                            let ancestor_name = open_elements_get!(self, ancestor_idx).name.clone();
                            if ancestor_name == "template" {
                                break;
                            }
                            if ancestor_name == "table" {
                                self.insertion_mode = InsertionMode::InSelectInTable;
                                return;
                            }
                        }
                    }
                    self.insertion_mode = InsertionMode::InSelect;
                    return;
                }
                "td" | "th" if !last => {
                    self.insertion_mode = InsertionMode::InCell;
                    return;
                }
                "tr" => {
                    self.insertion_mode = InsertionMode::InRow;
                    return;
                }
                "tbody" | "thead" | "tfoot" => {
                    self.insertion_mode = InsertionMode::InTableBody;
                    return;
                }
                "caption" => {
                    self.insertion_mode = InsertionMode::InCaption;
                    return;
                }
                "colgroup" => {
                    self.insertion_mode = InsertionMode::InColumnGroup;
                    return;
                }
                "table" => {
                    self.insertion_mode = InsertionMode::InTable;
                    return;
                }
                "template" => {
                    self.insertion_mode = *self
                        .template_insertion_mode
                        .last()
                        .unwrap_or(&InsertionMode::InTemplate);
                    return;
                }
                "head" if !last => {
                    self.insertion_mode = InsertionMode::InHead;
                    return;
                }
                "body" => {
                    self.insertion_mode = InsertionMode::InBody;
                    return;
                }
                "frameset" => {
                    self.insertion_mode = InsertionMode::InFrameset;
                    return;
                }
                "html" => {
                    self.insertion_mode = if self.head_element.is_none() {
                        InsertionMode::BeforeHead
                    } else {
                        InsertionMode::AfterHead
                    };
                    return;
                }
                _ => {}
            }

            if last {
                break;
            }
        }
        self.insertion_mode = InsertionMode::InBody;
    }

    /// Reopens formatting elements that were closed by something else than
    /// their own end tag (13.2.4.3, "reconstruct the active formatting elements")
    fn reconstruct_formatting(&mut self) {
        if self.active_formatting_elements.is_empty() {
            return;
        }

        let last_idx = self.active_formatting_elements.len() - 1;
        match self.active_formatting_elements[last_idx] {
            ActiveElement::Marker => return,
            ActiveElement::NodeId(node_id) if self.open_elements.contains(&node_id) => return,
            ActiveElement::NodeId(_) => {}
        }

        // Rewind to the first entry that needs reopening
        let mut entry_idx = last_idx;
        while entry_idx > 0 {
            entry_idx -= 1;
            match self.active_formatting_elements[entry_idx] {
                ActiveElement::Marker => {
                    entry_idx += 1;
                    break;
                }
                ActiveElement::NodeId(node_id) if self.open_elements.contains(&node_id) => {
                    entry_idx += 1;
                    break;
                }
                ActiveElement::NodeId(_) => {}
            }
        }

        // Advance: reopen each entry with a fresh clone
        for idx in entry_idx..self.active_formatting_elements.len() {
            let ActiveElement::NodeId(node_id) = self.active_formatting_elements[idx] else {
                continue;
            };
            let Some(new_node_id) = self.document.clone_node(node_id) else {
                continue;
            };
            self.insert_element_by_id(new_node_id);
            self.active_formatting_elements[idx] = ActiveElement::NodeId(new_node_id);
        }
    }

    /// Pushes onto the list of active formatting elements, applying the Noah's
    /// Ark clause: at most three equal entries since the last marker
    fn active_formatting_elements_push(&mut self, node_id: NodeId) {
        let Some(new_node) = self.document.get_node_by_id(node_id).cloned() else {
            return;
        };

        let mut matched = vec![];
        for idx in (0..self.active_formatting_elements.len()).rev() {
            match self.active_formatting_elements[idx] {
                ActiveElement::Marker => break,
                ActiveElement::NodeId(entry_id) => {
                    if self
                        .document
                        .get_node_by_id(entry_id)
                        .is_some_and(|node| node.matches_tag_and_attrs(&new_node))
                    {
                        matched.push(idx);
                    }
                }
            }
        }
        if matched.len() >= 3 {
            if let Some(&earliest_idx) = matched.last() {
                self.active_formatting_elements.remove(earliest_idx);
            }
        }

        self.active_formatting_elements
            .push(ActiveElement::NodeId(node_id));
    }

    fn clear_active_formatting_until_marker(&mut self) {
        while let Some(entry) = self.active_formatting_elements.pop() {
            if entry == ActiveElement::Marker {
                break;
            }
        }
    }

    #[cfg(feature = "debug_parser")]
    fn display_debug_info(&self, token: &Token) {
        println!("-----------------------------------------------");
        println!("mode: {:?} token: {token}", self.insertion_mode);
        print!("stack:");
        for &node_id in &self.open_elements {
            if let Some(node) = self.document.get_node_by_id(node_id) {
                print!(" <{}>", node.name);
            }
        }
        println!();
        println!("{}", self.document);
    }
}

/// MathML text integration points take HTML content (13.2.6.5)
fn is_mathml_text_integration_point(node: &Node) -> bool {
    node.namespace.as_deref() == Some(MATHML_NAMESPACE)
        && matches!(node.name.as_str(), "mi" | "mo" | "mn" | "ms" | "mtext")
}

/// HTML integration points take HTML content (13.2.6.5)
fn is_html_integration_point(node: &Node) -> bool {
    match node.namespace.as_deref() {
        Some(MATHML_NAMESPACE) => {
            node.name == "annotation-xml"
                && node
                    .attributes()
                    .and_then(|attrs| attrs.get("encoding"))
                    .is_some_and(|encoding| {
                        encoding.eq_ignore_ascii_case("text/html")
                            || encoding.eq_ignore_ascii_case("application/xhtml+xml")
                    })
        }
        Some(SVG_NAMESPACE) => matches!(node.name.as_str(), "foreignObject" | "desc" | "title"),
        _ => false,
    }
}

// Scope barrier checks for "has an element in scope" (13.2.4.2)
fn is_scope_barrier(node: &Node, scope: Scope) -> bool {
    let namespace = node.namespace.as_deref().unwrap_or("");
    let name = node.name.as_str();

    let default_barrier = if namespace == HTML_NAMESPACE {
        matches!(
            name,
            "applet" | "caption" | "html" | "table" | "td" | "th" | "marquee" | "object"
                | "template"
        )
    } else if namespace == MATHML_NAMESPACE {
        matches!(name, "mi" | "mo" | "mn" | "ms" | "mtext" | "annotation-xml")
    } else if namespace == SVG_NAMESPACE {
        matches!(name, "foreignObject" | "desc" | "title")
    } else {
        false
    };

    match scope {
        Scope::Regular => default_barrier,
        Scope::ListItem => {
            default_barrier || (namespace == HTML_NAMESPACE && matches!(name, "ol" | "ul"))
        }
        Scope::Button => default_barrier || (namespace == HTML_NAMESPACE && name == "button"),
        Scope::Table => {
            namespace == HTML_NAMESPACE && matches!(name, "html" | "table" | "template")
        }
        Scope::Select => !(namespace == HTML_NAMESPACE && matches!(name, "optgroup" | "option")),
    }
}

// Restores the mixed case foreign markup loses in the tokenizer
fn adjust_attributes(attributes: &Attributes, map: &HashMap<&str, &str>) -> Attributes {
    let mut adjusted = attributes.clone();
    for (&from, &to) in map {
        adjusted.rename(from, to);
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_stream::Encoding;
    use test_case::test_case;

    fn parse_str(html: &str) -> Document {
        let mut stream = InputStream::new();
        stream.read_from_str(html, Some(Encoding::UTF8));
        Html5Parser::new(&mut stream).parse().expect("parse")
    }

    fn parse_fragment_str(html: &str, context: &str) -> Document {
        let mut stream = InputStream::new();
        stream.read_from_str(html, Some(Encoding::UTF8));
        Html5Parser::new_fragment(&mut stream, context, ParseOptions::default())
            .parse()
            .expect("parse")
    }

    fn name_of(document: &Document, node_id: NodeId) -> String {
        document.get_node_by_id(node_id).unwrap().name.clone()
    }

    fn text_of(document: &Document, node_id: NodeId) -> String {
        match &document.get_node_by_id(node_id).unwrap().data {
            NodeData::Text { value } => value.clone(),
            _ => String::new(),
        }
    }

    fn find_child(document: &Document, parent_id: NodeId, name: &str) -> NodeId {
        *document
            .children(parent_id)
            .iter()
            .find(|&&id| name_of(document, id) == name)
            .unwrap_or_else(|| panic!("no <{name}> under node {parent_id}"))
    }

    fn body_of(document: &Document) -> NodeId {
        let html = find_child(document, NodeId::root(), "html");
        find_child(document, html, "body")
    }

    #[test]
    fn test_minimal_document() {
        let document = parse_str("<p>Hello");

        let html = find_child(&document, NodeId::root(), "html");
        let children = document.children(html).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(name_of(&document, children[0]), "head");
        assert_eq!(name_of(&document, children[1]), "body");

        let p = find_child(&document, children[1], "p");
        let p_children = document.children(p).to_vec();
        assert_eq!(p_children.len(), 1);
        assert_eq!(text_of(&document, p_children[0]), "Hello");

        let metadata = &document.metadata;
        assert!(metadata.has_manufactured_html);
        assert!(metadata.has_manufactured_head);
        assert!(metadata.has_manufactured_body);
        assert!(!metadata.duplicate_html_elements);
        assert!(!metadata.duplicate_body_elements);
        assert_eq!(metadata.html_src_bytes, 8);
    }

    #[test]
    fn test_document_end_location_spans_lines() {
        let document = parse_str("<p>Hello\nworld");
        assert_eq!(
            document.metadata.document_end_location,
            Location::new(2, 6, 14)
        );
    }

    #[test]
    fn test_explicit_structure_is_not_manufactured() {
        let document = parse_str("<html><head></head><body><p>x</p></body></html>");

        let metadata = &document.metadata;
        assert!(!metadata.has_manufactured_html);
        assert!(!metadata.has_manufactured_head);
        assert!(!metadata.has_manufactured_body);
    }

    #[test]
    fn test_missing_doctype_is_quirks() {
        let document = parse_str("<p>x");
        assert_eq!(document.quirks_mode, QuirksMode::Quirks);
        assert!(document.metadata.quirks_mode);
    }

    #[test]
    fn test_html5_doctype_is_no_quirks() {
        let document = parse_str("<!DOCTYPE html><p>x");
        assert_eq!(document.quirks_mode, QuirksMode::NoQuirks);
        assert!(!document.metadata.quirks_mode);
    }

    #[test]
    fn test_limited_quirks_reports_false_in_metadata() {
        let document = parse_str(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Frameset//EN\"><p>x",
        );
        assert_eq!(document.quirks_mode, QuirksMode::LimitedQuirks);
        assert!(!document.metadata.quirks_mode);
    }

    #[test]
    fn test_iframe_srcdoc_skips_quirks() {
        let mut stream = InputStream::new();
        stream.read_from_str("<p>x", Some(Encoding::UTF8));
        let parser = Html5Parser::with_options(
            &mut stream,
            ParseOptions {
                iframe_srcdoc: true,
                ..Default::default()
            },
        );
        let document = parser.parse().expect("parse");
        assert_eq!(document.doctype, DocumentType::IframeSrcDoc);
        assert_eq!(document.quirks_mode, QuirksMode::NoQuirks);
    }

    #[test]
    fn test_duplicate_html_merges_attributes() {
        let document = parse_str("<html a=\"1\"><html a=\"2\" b=\"3\"><p>x");

        let html = find_child(&document, NodeId::root(), "html");
        let node = document.get_node_by_id(html).unwrap();
        let attrs = node.attributes().unwrap();
        assert_eq!(attrs.get("a"), Some("1"));
        assert_eq!(attrs.get("b"), Some("3"));

        assert!(document.metadata.duplicate_html_elements);
        assert_eq!(
            document.metadata.duplicate_html_element_location,
            Some(Location::new(1, 13, 12))
        );
    }

    #[test]
    fn test_duplicate_body_merges_attributes() {
        let document = parse_str("<body><p>x</p><body foo=\"bar\">");

        let body = body_of(&document);
        let node = document.get_node_by_id(body).unwrap();
        assert_eq!(node.attributes().unwrap().get("foo"), Some("bar"));

        assert!(document.metadata.duplicate_body_elements);
        assert_eq!(
            document.metadata.duplicate_body_element_location,
            Some(Location::new(1, 15, 14))
        );
    }

    #[test]
    fn test_base_url_first_wins() {
        let document = parse_str(
            "<head><base href=\"https://a.example/\" target=\"_top\">\
             <base href=\"https://b.example/\"></head>",
        );
        assert_eq!(
            document.metadata.base_url,
            Some(("https://a.example/".to_string(), "_top".to_string()))
        );
    }

    #[test]
    fn test_canonical_url_last_wins() {
        let document = parse_str(
            "<head><link rel=\"canonical\" href=\"https://c.example/1\">\
             <link rel=\"CANONICAL\" href=\"https://c.example/2\"></head>",
        );
        assert_eq!(
            document.metadata.canonical_url,
            Some("https://c.example/2".to_string())
        );
    }

    #[test]
    fn test_base_without_href_is_skipped() {
        let document = parse_str("<head><base target=\"_top\"><base href=\"u\"></head>");
        assert_eq!(
            document.metadata.base_url,
            Some(("u".to_string(), String::new()))
        );
    }

    #[test]
    fn test_table_text_is_foster_parented() {
        let document = parse_str("<table>x<tr><td>y</td></tr></table>");

        let body = body_of(&document);
        let body_children = document.children(body).to_vec();
        assert_eq!(body_children.len(), 2);
        assert_eq!(text_of(&document, body_children[0]), "x");
        assert_eq!(name_of(&document, body_children[1]), "table");

        let tbody = find_child(&document, body_children[1], "tbody");
        let tr = find_child(&document, tbody, "tr");
        let td = find_child(&document, tr, "td");
        assert_eq!(text_of(&document, document.children(td)[0]), "y");
    }

    #[test]
    fn test_fragment_td_in_tr_context() {
        let document = parse_fragment_str("<td>a</td><td>b</td>", "tr");

        let nodes = document.fragment_nodes().to_vec();
        assert_eq!(nodes.len(), 2);
        assert_eq!(name_of(&document, nodes[0]), "td");
        assert_eq!(name_of(&document, nodes[1]), "td");
        assert_eq!(text_of(&document, document.children(nodes[0])[0]), "a");
    }

    #[test]
    fn test_fragment_in_div_context() {
        let document = parse_fragment_str("<p>one<p>two", "div");

        let nodes = document.fragment_nodes().to_vec();
        assert_eq!(nodes.len(), 2);
        assert_eq!(name_of(&document, nodes[0]), "p");
        assert_eq!(name_of(&document, nodes[1]), "p");
    }

    #[test]
    fn test_fragment_script_context_is_raw() {
        let document = parse_fragment_str("a < b", "script");

        let nodes = document.fragment_nodes().to_vec();
        assert_eq!(nodes.len(), 1);
        assert_eq!(text_of(&document, nodes[0]), "a < b");
    }

    #[test]
    fn test_title_content_stays_text() {
        let document = parse_str("<title>a<b>c</title><p>x");

        let html = find_child(&document, NodeId::root(), "html");
        let head = find_child(&document, html, "head");
        let title = find_child(&document, head, "title");
        assert_eq!(text_of(&document, document.children(title)[0]), "a<b>c");
    }

    #[test]
    fn test_script_content_stays_text() {
        let document = parse_str("<script>if (a<b) { x(); }</script>");

        let html = find_child(&document, NodeId::root(), "html");
        let head = find_child(&document, html, "head");
        let script = find_child(&document, head, "script");
        assert_eq!(
            text_of(&document, document.children(script)[0]),
            "if (a<b) { x(); }"
        );
    }

    #[test]
    fn test_br_end_tag_acts_as_start_tag() {
        let document = parse_str("</br>x");

        let body = body_of(&document);
        let children = document.children(body).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(name_of(&document, children[0]), "br");
        assert_eq!(text_of(&document, children[1]), "x");
    }

    #[test]
    fn test_image_start_tag_becomes_img() {
        let document = parse_str("<image src=\"i.png\">");

        let body = body_of(&document);
        let img = find_child(&document, body, "img");
        let node = document.get_node_by_id(img).unwrap();
        assert_eq!(node.attributes().unwrap().get("src"), Some("i.png"));
    }

    #[test]
    fn test_option_closes_option() {
        let document = parse_str("<select><option>a<option>b</select>");

        let body = body_of(&document);
        let select = find_child(&document, body, "select");
        let options = document.children(select).to_vec();
        assert_eq!(options.len(), 2);
        assert_eq!(name_of(&document, options[0]), "option");
        assert_eq!(name_of(&document, options[1]), "option");
        assert_eq!(text_of(&document, document.children(options[1])[0]), "b");
    }

    #[test]
    fn test_heading_closes_open_heading() {
        let document = parse_str("<h1>a<h2>b");

        let body = body_of(&document);
        let children = document.children(body).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(name_of(&document, children[0]), "h1");
        assert_eq!(name_of(&document, children[1]), "h2");
    }

    #[test]
    fn test_li_closes_open_li() {
        let document = parse_str("<ul><li>a<li>b</ul>");

        let body = body_of(&document);
        let ul = find_child(&document, body, "ul");
        let items = document.children(ul).to_vec();
        assert_eq!(items.len(), 2);
        assert_eq!(name_of(&document, items[0]), "li");
        assert_eq!(name_of(&document, items[1]), "li");
    }

    #[test]
    fn test_nested_form_is_ignored() {
        let document = parse_str("<form id=\"a\"><form id=\"b\"><input></form>");

        let body = body_of(&document);
        let children = document.children(body).to_vec();
        assert_eq!(children.len(), 1);

        let form = children[0];
        let node = document.get_node_by_id(form).unwrap();
        assert_eq!(node.attributes().unwrap().get("id"), Some("a"));
        assert_eq!(name_of(&document, document.children(form)[0]), "input");
    }

    #[test]
    fn test_a_inside_a_splits() {
        let document = parse_str("<a>1<a>2");

        let body = body_of(&document);
        let children = document.children(body).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(name_of(&document, children[0]), "a");
        assert_eq!(name_of(&document, children[1]), "a");
        assert_eq!(text_of(&document, document.children(children[0])[0]), "1");
        assert_eq!(text_of(&document, document.children(children[1])[0]), "2");
    }

    #[test]
    fn test_formatting_reopens_at_most_three_equal_entries() {
        // four identical open b elements; the list of active formatting
        // elements keeps only the last three
        let document = parse_str("<p><b><b><b><b>x</p><p>y");

        let body = body_of(&document);
        let paragraphs = document.children(body).to_vec();
        assert_eq!(paragraphs.len(), 2);

        let mut node_id = paragraphs[0];
        let mut depth = 0;
        while name_of(&document, document.children(node_id)[0]) == "b" {
            node_id = document.children(node_id)[0];
            depth += 1;
        }
        assert_eq!(depth, 4);
        assert_eq!(text_of(&document, document.children(node_id)[0]), "x");

        // the second paragraph reconstructs from the capped list
        let mut node_id = paragraphs[1];
        let mut depth = 0;
        while name_of(&document, document.children(node_id)[0]) == "b" {
            node_id = document.children(node_id)[0];
            depth += 1;
        }
        assert_eq!(depth, 3);
        assert_eq!(text_of(&document, document.children(node_id)[0]), "y");
    }

    #[test]
    fn test_comment_after_body_lands_under_html() {
        let document = parse_str("<body><p>x</p></body><!--tail-->");

        let html = find_child(&document, NodeId::root(), "html");
        let children = document.children(html).to_vec();
        assert_eq!(children.len(), 3);
        assert_eq!(name_of(&document, children[0]), "head");
        assert_eq!(name_of(&document, children[1]), "body");
        assert!(matches!(
            &document.get_node_by_id(children[2]).unwrap().data,
            NodeData::Comment { value } if value == "tail"
        ));
    }

    #[test]
    fn test_svg_case_is_restored() {
        let document = parse_str("<svg viewbox=\"0 0 1 1\"><foreignobject></foreignobject></svg>");

        let body = body_of(&document);
        let svg = find_child(&document, body, "svg");
        let node = document.get_node_by_id(svg).unwrap();
        assert_eq!(node.namespace.as_deref(), Some(SVG_NAMESPACE));
        assert_eq!(node.attributes().unwrap().get("viewBox"), Some("0 0 1 1"));

        let foreign = find_child(&document, svg, "foreignObject");
        assert_eq!(
            document.get_node_by_id(foreign).unwrap().namespace.as_deref(),
            Some(SVG_NAMESPACE)
        );
    }

    #[test]
    fn test_mathml_definition_url_is_restored() {
        let document = parse_str("<math definitionurl=\"u\"></math>");

        let body = body_of(&document);
        let math = find_child(&document, body, "math");
        let node = document.get_node_by_id(math).unwrap();
        assert_eq!(node.namespace.as_deref(), Some(MATHML_NAMESPACE));
        assert_eq!(node.attributes().unwrap().get("definitionURL"), Some("u"));
    }

    #[test]
    fn test_pre_skips_leading_newline() {
        let document = parse_str("<pre>\nx</pre>");

        let body = body_of(&document);
        let pre = find_child(&document, body, "pre");
        assert_eq!(text_of(&document, document.children(pre)[0]), "x");
    }

    #[test]
    fn test_textarea_skips_leading_newline() {
        let document = parse_str("<textarea>\nabc</textarea>");

        let body = body_of(&document);
        let textarea = find_child(&document, body, "textarea");
        assert_eq!(text_of(&document, document.children(textarea)[0]), "abc");
    }

    #[test]
    fn test_frameset_replaces_body() {
        let document = parse_str("<frameset><frame></frameset>");

        let html = find_child(&document, NodeId::root(), "html");
        let children = document.children(html).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(name_of(&document, children[0]), "head");
        assert_eq!(name_of(&document, children[1]), "frameset");
        assert_eq!(name_of(&document, document.children(children[1])[0]), "frame");
        assert!(!document.metadata.has_manufactured_body);
    }

    #[test]
    fn test_ampersand_flows_through() {
        let document = parse_str("<p>a &amp; b</p>");

        let body = body_of(&document);
        let p = find_child(&document, body, "p");
        assert_eq!(text_of(&document, document.children(p)[0]), "a &amp; b");
    }

    #[test_case("title", State::RcDataState)]
    #[test_case("textarea", State::RcDataState)]
    #[test_case("style", State::RawTextState)]
    #[test_case("xmp", State::RawTextState)]
    #[test_case("noscript", State::RawTextState)]
    #[test_case("script", State::ScriptDataState)]
    #[test_case("plaintext", State::PlaintextState)]
    #[test_case("div", State::DataState)]
    fn test_fragment_context_tokenizer_state(context: &str, expected: State) {
        assert_eq!(
            Html5Parser::initial_tokenizer_state_for_context(context, true),
            expected
        );
    }

    #[test]
    fn test_noscript_context_with_scripting_disabled() {
        assert_eq!(
            Html5Parser::initial_tokenizer_state_for_context("noscript", false),
            State::DataState
        );
    }
}
