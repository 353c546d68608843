use crate::node::{NodeData, NodeId, HTML_NAMESPACE, VOID_HTML_ELEMENTS};
use crate::parser::document::Document;

/// Serializes the whole document back to HTML source.
///
/// Text and attribute values are written verbatim: the parser never decodes
/// entity references, so writing them back unchanged keeps the output a
/// fixpoint (parsing the output and serializing again yields the same string).
pub fn write_document(document: &Document) -> String {
    let mut out = String::new();
    for &child_id in document.children(NodeId::root()) {
        write_node_into(document, child_id, &mut out);
    }
    out
}

/// Serializes the top-level nodes of a fragment parse
pub fn write_fragment(document: &Document) -> String {
    let mut out = String::new();
    for &node_id in document.fragment_nodes() {
        write_node_into(document, node_id, &mut out);
    }
    out
}

/// Serializes a single node and its subtree
pub fn write_node(document: &Document, node_id: NodeId) -> String {
    let mut out = String::new();
    write_node_into(document, node_id, &mut out);
    out
}

fn write_node_into(document: &Document, node_id: NodeId, out: &mut String) {
    let Some(node) = document.get_node_by_id(node_id) else {
        return;
    };

    match &node.data {
        NodeData::Document => {
            for &child_id in document.children(node_id) {
                write_node_into(document, child_id, out);
            }
        }
        NodeData::DocType {
            name,
            pub_identifier,
            sys_identifier,
        } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            if !pub_identifier.is_empty() {
                out.push_str(" PUBLIC \"");
                out.push_str(pub_identifier);
                out.push('"');
                if !sys_identifier.is_empty() {
                    out.push_str(" \"");
                    out.push_str(sys_identifier);
                    out.push('"');
                }
            } else if !sys_identifier.is_empty() {
                out.push_str(" SYSTEM \"");
                out.push_str(sys_identifier);
                out.push('"');
            }
            out.push('>');
        }
        NodeData::Text { value } => {
            out.push_str(value);
        }
        NodeData::Comment { value } => {
            out.push_str("<!--");
            out.push_str(value);
            out.push_str("-->");
        }
        NodeData::Element { attributes } => {
            out.push('<');
            out.push_str(&node.name);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&attr.value);
                out.push('"');
            }
            out.push('>');

            // Void elements have no content and never get an end tag
            if node.namespace.as_deref() == Some(HTML_NAMESPACE)
                && VOID_HTML_ELEMENTS.contains(node.name.as_str())
            {
                return;
            }

            for &child_id in document.children(node_id) {
                write_node_into(document, child_id, out);
            }

            out.push_str("</");
            out.push_str(&node.name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_stream::{Encoding, InputStream};
    use crate::parser::{Html5Parser, ParseOptions};

    fn parse_str(html: &str) -> Document {
        let mut stream = InputStream::new();
        stream.read_from_str(html, Some(Encoding::UTF8));
        Html5Parser::new(&mut stream).parse().expect("parse")
    }

    #[test]
    fn test_write_document() {
        let document = parse_str("<!DOCTYPE html><p class=\"x\">Hello</p>");
        assert_eq!(
            write_document(&document),
            "<!DOCTYPE html><html><head></head><body><p class=\"x\">Hello</p></body></html>"
        );
    }

    #[test]
    fn test_void_elements_have_no_end_tag() {
        let document = parse_str("<p>a<br>b<img src=\"i\"></p>");
        assert_eq!(
            write_document(&document),
            "<html><head></head><body><p>a<br>b<img src=\"i\"></p></body></html>"
        );
    }

    #[test]
    fn test_comments_are_kept() {
        let document = parse_str("<!--x--><p>y</p>");
        assert_eq!(
            write_document(&document),
            "<!--x--><html><head></head><body><p>y</p></body></html>"
        );
    }

    #[test]
    fn test_entities_stay_verbatim() {
        let document = parse_str("<p title=\"a &amp; b\">&lt;</p>");
        assert_eq!(
            write_document(&document),
            "<html><head></head><body><p title=\"a &amp; b\">&lt;</p></body></html>"
        );
    }

    #[test]
    fn test_round_trip_is_a_fixpoint() {
        let inputs = [
            "<p>Hello",
            "<!DOCTYPE html><table>x<tr><td>y</td></tr></table>",
            "<b>1<i>2</b>3</i>",
            "<ul><li>a<li>b</ul>",
            "<title>a<b>c</title><p>&amp;</p>",
        ];

        for input in inputs {
            let first = write_document(&parse_str(input));
            let second = write_document(&parse_str(&first));
            assert_eq!(first, second, "serializing {input:?} is not stable");
        }
    }

    #[test]
    fn test_write_fragment() {
        let mut stream = InputStream::new();
        stream.read_from_str("<td>a</td><td>b</td>", Some(Encoding::UTF8));
        let parser = Html5Parser::new_fragment(&mut stream, "tr", ParseOptions::default());
        let document = parser.parse().expect("parse");

        assert_eq!(write_fragment(&document), "<td>a</td><td>b</td>");
    }

    #[test]
    fn test_write_node() {
        let document = parse_str("<p id=\"x\">y</p>");
        let root = document.get_root().id;
        let html = document.children(root)[0];
        let body = document.children(html)[1];
        let p = document.children(body)[0];

        assert_eq!(write_node(&document, p), "<p id=\"x\">y</p>");
    }
}
