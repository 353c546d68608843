//! An HTML5 tokenizer and tree builder.
//!
//! The parser follows the WHATWG tree construction rules, recovering from
//! malformed markup the way browsers do, and records what it had to repair
//! in [`DocumentMetadata`]: manufactured html/head/body elements, duplicate
//! html/body start tags, quirks mode and the base and canonical URLs.
//!
//! Character and entity references are never decoded; `&amp;` in the source
//! is `&amp;` in the tree. Together with [`writer`] this makes a parse
//! followed by a serialize a fixpoint.
//!
//! ```
//! let document = html5tree::parse("<p>Hello").unwrap();
//! assert!(document.metadata.has_manufactured_html);
//! assert_eq!(html5tree::writer::write_document(&document),
//!     "<html><head></head><body><p>Hello</p></body></html>");
//! ```

pub mod error_logger;
pub mod errors;
pub mod input_stream;
pub mod node;
pub mod node_arena;
pub mod parser;
pub mod tokenizer;
pub mod writer;

pub use crate::errors::{Error, Result};
pub use crate::input_stream::{Encoding, InputStream, Location};
pub use crate::parser::document::{Document, DocumentMetadata, DocumentType};
pub use crate::parser::{Html5Parser, ParseOptions, QuirksMode};

/// Parses an HTML document with the default options
pub fn parse(html: &str) -> Result<Document> {
    parse_with_options(html, ParseOptions::default())
}

/// Parses an HTML document
pub fn parse_with_options(html: &str, opts: ParseOptions) -> Result<Document> {
    let mut stream = InputStream::new();
    stream.read_from_str(html, Some(Encoding::UTF8));
    Html5Parser::with_options(&mut stream, opts).parse()
}

/// Parses an HTML fragment as if it appeared inside an element with the given
/// tag name. The parsed nodes are listed in [`Document::fragment_nodes`].
pub fn parse_fragment(html: &str, context: &str) -> Result<Document> {
    parse_fragment_with_options(html, context, ParseOptions::default())
}

/// Parses an HTML fragment
pub fn parse_fragment_with_options(
    html: &str,
    context: &str,
    opts: ParseOptions,
) -> Result<Document> {
    let mut stream = InputStream::new();
    stream.read_from_str(html, Some(Encoding::UTF8));
    Html5Parser::new_fragment(&mut stream, context, opts).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let document = parse("<!DOCTYPE html><p>hi</p>").expect("parse");
        assert_eq!(document.quirks_mode, QuirksMode::NoQuirks);
        assert!(!document.metadata.has_manufactured_html);
    }

    #[test]
    fn test_parse_fragment() {
        let document = parse_fragment("<li>one<li>two", "ul").expect("parse");
        assert_eq!(document.fragment_nodes().len(), 2);
    }

    #[test]
    fn test_parse_with_options() {
        let document = parse_with_options(
            "<p>x",
            ParseOptions {
                iframe_srcdoc: true,
                ..Default::default()
            },
        )
        .expect("parse");
        assert_eq!(document.doctype, DocumentType::IframeSrcDoc);
    }
}
