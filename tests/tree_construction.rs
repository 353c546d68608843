use html5tree::writer::{write_document, write_fragment};
use html5tree::{parse, parse_fragment};
use test_case::test_case;

#[test_case("<p>Hello", "<html><head></head><body><p>Hello</p></body></html>"; "manufactured structure")]
#[test_case("<!DOCTYPE html><p>x", "<!DOCTYPE html><html><head></head><body><p>x</p></body></html>"; "doctype kept")]
#[test_case("<b>1<i>2</b>3</i>", "<html><head></head><body><b>1<i>2</i></b><i>3</i></body></html>"; "adoption agency")]
#[test_case("<table><tr><td>x</td></tr></table>", "<html><head></head><body><table><tbody><tr><td>x</td></tr></tbody></table></body></html>"; "tbody inserted")]
#[test_case("<table><b>x</b></table>", "<html><head></head><body><b>x</b><table></table></body></html>"; "foster parenting")]
#[test_case("<ul><li>a<li>b</ul>", "<html><head></head><body><ul><li>a</li><li>b</li></ul></body></html>"; "implied li end tags")]
#[test_case("</br>x", "<html><head></head><body><br>x</body></html>"; "br end tag")]
#[test_case("<image src=\"i\">", "<html><head></head><body><img src=\"i\"></body></html>"; "image renamed to img")]
#[test_case("<title>a<b>c</title>", "<html><head><title>a<b>c</title></head><body></body></html>"; "rcdata title")]
#[test_case("<svg><circle/></svg>", "<html><head></head><body><svg><circle></circle></svg></body></html>"; "foreign self closing")]
#[test_case("a &amp; b", "<html><head></head><body>a &amp; b</body></html>"; "entities verbatim")]
fn document_tree(input: &str, expected: &str) {
    let document = parse(input).expect("parse");
    assert_eq!(write_document(&document), expected);
}

#[test_case("<td>x", "tr", "<td>x</td>"; "cell in row context")]
#[test_case("<li>one<li>two", "ul", "<li>one</li><li>two</li>"; "list items in list context")]
#[test_case("<p>x", "div", "<p>x</p>"; "paragraph in div context")]
#[test_case("a < b", "script", "a < b"; "script context is raw")]
fn fragment_tree(input: &str, context: &str, expected: &str) {
    let document = parse_fragment(input, context).expect("parse");
    assert_eq!(write_fragment(&document), expected);
}

#[test_case("<p>Hello"; "plain paragraph")]
#[test_case("<table>x<tr><td>y"; "fostered table text")]
#[test_case("<b>1<i>2</b>3</i>"; "misnested formatting")]
#[test_case("<!DOCTYPE html><pre>\ncode</pre>"; "pre newline")]
#[test_case("<select><option>a<option>b"; "select options")]
fn serialization_is_a_fixpoint(input: &str) {
    let first = write_document(&parse(input).expect("parse"));
    let second = write_document(&parse(&first).expect("reparse"));
    assert_eq!(first, second);
}

#[test]
fn repair_metadata_is_reported() {
    let document = parse("<p>x").expect("parse");
    assert!(document.metadata.has_manufactured_html);
    assert!(document.metadata.has_manufactured_head);
    assert!(document.metadata.has_manufactured_body);
    assert!(document.metadata.quirks_mode);

    let document = parse("<!DOCTYPE html><html><head></head><body></body></html>").expect("parse");
    assert!(!document.metadata.has_manufactured_html);
    assert!(!document.metadata.has_manufactured_head);
    assert!(!document.metadata.has_manufactured_body);
    assert!(!document.metadata.quirks_mode);
}
