use crate::input_stream::Location;
use phf::{phf_set, Set};

pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";
pub const MATHML_NAMESPACE: &str = "http://www.w3.org/1998/Math/MathML";
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Different types of nodes
#[derive(Debug, PartialEq)]
pub enum NodeType {
    Document,
    DocType,
    Text,
    Comment,
    Element,
}

/// A single element attribute
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Ordered attribute list. Source order is preserved and the first occurrence
/// of a name wins; later inserts under the same name are rejected.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Attributes {
    attrs: Vec<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self { attrs: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Appends the attribute unless the name is already present. Returns
    /// false when the attribute was rejected as a duplicate.
    pub fn insert(&mut self, name: &str, value: &str) -> bool {
        if self.contains(name) {
            return false;
        }

        self.attrs.push(Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
        true
    }

    /// Overwrites the value under the given name, appending when absent.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attrs.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Renames an attribute in place, keeping its position and value.
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == from) {
            attr.name = to.to_string();
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attrs.iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Attributes {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in pairs {
            attrs.insert(name, value);
        }
        attrs
    }
}

/// Different types of node data
#[derive(Debug, PartialEq, Clone)]
pub enum NodeData {
    Document,
    DocType {
        name: String,
        pub_identifier: String,
        sys_identifier: String,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
    Element {
        attributes: Attributes,
    },
}

/// Id used to identify a node
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NodeId> for usize {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl NodeId {
    pub const ROOT_NODE: usize = 0;

    pub fn root() -> Self {
        Self(Self::ROOT_NODE)
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT_NODE
    }
}

/// Node that resembles a DOM node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// ID of the node, 0 is always the root / document node
    pub id: NodeId,
    /// parent of the node, if any
    pub parent: Option<NodeId>,
    /// children of the node
    pub children: Vec<NodeId>,
    /// name of the node, or empty when it's not a tag
    pub name: String,
    /// namespace of the node
    pub namespace: Option<String>,
    /// actual data of the node
    pub data: NodeData,
    /// where in the source the node was opened
    pub location: Location,
}

impl Node {
    /// Create a new document node
    pub fn new_document() -> Self {
        Node {
            id: Default::default(),
            parent: None,
            children: vec![],
            data: NodeData::Document,
            name: "".to_string(),
            namespace: None,
            location: Location::default(),
        }
    }

    /// Create a new element node with the given name, attributes and namespace
    pub fn new_element(
        name: &str,
        attributes: Attributes,
        namespace: &str,
        location: Location,
    ) -> Self {
        Node {
            id: Default::default(),
            parent: None,
            children: vec![],
            data: NodeData::Element { attributes },
            name: name.to_string(),
            namespace: Some(namespace.into()),
            location,
        }
    }

    /// Create a new doctype node
    pub fn new_doctype(
        name: &str,
        pub_identifier: &str,
        sys_identifier: &str,
        location: Location,
    ) -> Self {
        Node {
            id: Default::default(),
            parent: None,
            children: vec![],
            data: NodeData::DocType {
                name: name.to_string(),
                pub_identifier: pub_identifier.to_string(),
                sys_identifier: sys_identifier.to_string(),
            },
            name: "".to_string(),
            namespace: None,
            location,
        }
    }

    /// Create a new comment node
    pub fn new_comment(value: &str, location: Location) -> Self {
        Node {
            id: Default::default(),
            parent: None,
            children: vec![],
            data: NodeData::Comment {
                value: value.to_string(),
            },
            name: "".to_string(),
            namespace: None,
            location,
        }
    }

    /// Create a new text node
    pub fn new_text(value: &str, location: Location) -> Self {
        Node {
            id: Default::default(),
            parent: None,
            children: vec![],
            data: NodeData::Text {
                value: value.to_string(),
            },
            name: "".to_string(),
            namespace: None,
            location,
        }
    }

    // Compares against tag, namespace and attributes only. Both nodes could
    // still have different parents and children.
    pub fn matches_tag_and_attrs(&self, other: &Self) -> bool {
        self.name == other.name && self.namespace == other.namespace && self.data == other.data
    }

    /// Returns true if the given node is a "formatting" node
    pub fn is_formatting(&self) -> bool {
        self.namespace.as_deref() == Some(HTML_NAMESPACE)
            && FORMATTING_HTML_ELEMENTS.contains(self.name.as_str())
    }

    /// Returns true if the given node is a "special" node based on namespace and name
    pub fn is_special(&self) -> bool {
        match self.namespace.as_deref() {
            Some(HTML_NAMESPACE) => SPECIAL_HTML_ELEMENTS.contains(self.name.as_str()),
            Some(MATHML_NAMESPACE) => SPECIAL_MATHML_ELEMENTS.contains(self.name.as_str()),
            Some(SVG_NAMESPACE) => SPECIAL_SVG_ELEMENTS.contains(self.name.as_str()),
            _ => false,
        }
    }

    /// Returns true for an HTML-namespaced element with the given name
    pub fn is_html_element(&self, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(HTML_NAMESPACE)
    }

    /// Attributes of an element node; empty for any other node type
    pub fn attributes(&self) -> Option<&Attributes> {
        match &self.data {
            NodeData::Element { attributes } => Some(attributes),
            _ => None,
        }
    }

    pub fn attributes_mut(&mut self) -> Option<&mut Attributes> {
        match &mut self.data {
            NodeData::Element { attributes } => Some(attributes),
            _ => None,
        }
    }
}

pub trait NodeTrait {
    fn type_of(&self) -> NodeType;
}

impl NodeTrait for Node {
    fn type_of(&self) -> NodeType {
        match self.data {
            NodeData::Document => NodeType::Document,
            NodeData::DocType { .. } => NodeType::DocType,
            NodeData::Text { .. } => NodeType::Text,
            NodeData::Comment { .. } => NodeType::Comment,
            NodeData::Element { .. } => NodeType::Element,
        }
    }
}

pub static FORMATTING_HTML_ELEMENTS: Set<&'static str> = phf_set! {
    "a", "b", "big", "code", "em", "font", "i", "nobr", "s", "small", "strike",
    "strong", "tt", "u",
};

pub static SPECIAL_HTML_ELEMENTS: Set<&'static str> = phf_set! {
    "address", "applet", "area", "article", "aside", "base", "basefont",
    "bgsound", "blockquote", "body", "br", "button", "caption", "center",
    "col", "colgroup", "dd", "details", "dir", "div", "dl", "dt", "embed",
    "fieldset", "figcaption", "figure", "footer", "form", "frame", "frameset",
    "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup", "hr",
    "html", "iframe", "img", "input", "keygen", "li", "link", "listing",
    "main", "marquee", "menu", "meta", "nav", "noembed", "noframes",
    "noscript", "object", "ol", "p", "param", "plaintext", "pre", "script",
    "search", "section", "select", "source", "style", "summary", "table",
    "tbody", "td", "template", "textarea", "tfoot", "th", "thead", "title",
    "tr", "track", "ul", "wbr", "xmp",
};

pub static SPECIAL_MATHML_ELEMENTS: Set<&'static str> = phf_set! {
    "mi", "mo", "mn", "ms", "mtext", "annotation-xml",
};

pub static SPECIAL_SVG_ELEMENTS: Set<&'static str> = phf_set! {
    "foreignObject", "desc", "title",
};

/// Void elements never get an end tag when serialized
pub static VOID_HTML_ELEMENTS: Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document() {
        let node = Node::new_document();
        assert_eq!(node.id, NodeId::default());
        assert_eq!(node.parent, None);
        assert!(node.children.is_empty());
        assert_eq!(node.name, "".to_string());
        assert_eq!(node.namespace, None);
        assert_eq!(node.data, NodeData::Document);
    }

    #[test]
    fn new_element() {
        let attributes = Attributes::from([("id", "test")]);
        let node = Node::new_element("div", attributes.clone(), HTML_NAMESPACE, Location::default());
        assert_eq!(node.id, NodeId::default());
        assert_eq!(node.parent, None);
        assert!(node.children.is_empty());
        assert_eq!(node.name, "div".to_string());
        assert_eq!(node.namespace, Some(HTML_NAMESPACE.into()));
        assert_eq!(node.data, NodeData::Element { attributes });
    }

    #[test]
    fn new_comment() {
        let node = Node::new_comment("test", Location::default());
        assert_eq!(node.parent, None);
        assert_eq!(node.name, "".to_string());
        assert_eq!(
            node.data,
            NodeData::Comment {
                value: "test".to_string()
            }
        );
    }

    #[test]
    fn new_text() {
        let node = Node::new_text("test", Location::default());
        assert_eq!(node.parent, None);
        assert_eq!(
            node.data,
            NodeData::Text {
                value: "test".to_string()
            }
        );
    }

    #[test]
    fn attributes_first_occurrence_wins() {
        let mut attrs = Attributes::new();
        assert!(attrs.insert("class", "one"));
        assert!(!attrs.insert("class", "two"));
        assert_eq!(attrs.get("class"), Some("one"));
        assert_eq!(attrs.len(), 1);

        attrs.set("class", "two");
        assert_eq!(attrs.get("class"), Some("two"));
    }

    #[test]
    fn attributes_rename_keeps_position_and_value() {
        let mut attrs = Attributes::from([("a", "1"), ("viewbox", "0 0 1 1"), ("c", "3")]);
        attrs.rename("viewbox", "viewBox");

        assert_eq!(attrs.get("viewBox"), Some("0 0 1 1"));
        assert_eq!(attrs.get("viewbox"), None);
        let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "viewBox", "c"]);
    }

    #[test]
    fn attributes_preserve_order() {
        let mut attrs = Attributes::new();
        attrs.insert("b", "2");
        attrs.insert("a", "1");
        attrs.insert("c", "3");

        let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn is_special() {
        let node = Node::new_element("div", Attributes::new(), HTML_NAMESPACE, Location::default());
        assert!(node.is_special());

        let node = Node::new_element("b", Attributes::new(), HTML_NAMESPACE, Location::default());
        assert!(!node.is_special());
        assert!(node.is_formatting());

        let node = Node::new_element("mi", Attributes::new(), MATHML_NAMESPACE, Location::default());
        assert!(node.is_special());

        let node = Node::new_element("div", Attributes::new(), SVG_NAMESPACE, Location::default());
        assert!(!node.is_special());
    }

    #[test]
    fn type_of() {
        let node = Node::new_document();
        assert_eq!(node.type_of(), NodeType::Document);

        let node = Node::new_text("test", Location::default());
        assert_eq!(node.type_of(), NodeType::Text);

        let node = Node::new_doctype("html", "", "", Location::default());
        assert_eq!(node.type_of(), NodeType::DocType);
    }
}
