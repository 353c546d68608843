use crate::input_stream::Location;
use crate::node::{Node, NodeData, NodeId};
use crate::node_arena::NodeArena;
use crate::parser::quirks::QuirksMode;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(PartialEq, Debug, Copy, Clone)]
pub enum DocumentType {
    HTML,
    IframeSrcDoc,
}

/// Facts about the document gathered during parsing. This is what repair
/// analysis is interested in: which structural elements were missing or
/// doubled in the source, and where.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// True when the html start tag was synthesized rather than found
    pub has_manufactured_html: bool,
    /// True when the head start tag was synthesized rather than found
    pub has_manufactured_head: bool,
    /// True when the body start tag was synthesized rather than found
    pub has_manufactured_body: bool,
    /// True when the source contained two or more html start tags
    pub duplicate_html_elements: bool,
    /// Where the second html start tag was found
    pub duplicate_html_element_location: Option<Location>,
    /// True when the source contained two or more body start tags
    pub duplicate_body_elements: bool,
    /// Where the second body start tag was found
    pub duplicate_body_element_location: Option<Location>,
    /// True only for full quirks mode; limited quirks reports false
    pub quirks_mode: bool,
    /// Location just past the last consumed token
    pub document_end_location: Location,
    /// Byte length of the source
    pub html_src_bytes: usize,
    /// (href, target) of the first base element carrying an href
    pub base_url: Option<(String, String)>,
    /// href of the last link element with rel="canonical"
    pub canonical_url: Option<String>,
}

pub struct Document {
    arena: NodeArena,
    fragment_nodes: Vec<NodeId>, // Top-level nodes of a fragment parse
    pub doctype: DocumentType,   // Document type
    pub quirks_mode: QuirksMode, // Quirks mode
    pub metadata: DocumentMetadata,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    // Creates a new document with an empty root node
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        arena.add_node(Node::new_document());
        Self {
            arena,
            fragment_nodes: vec![],
            doctype: DocumentType::HTML,
            quirks_mode: QuirksMode::NoQuirks,
            metadata: DocumentMetadata::default(),
        }
    }

    /// Fetches a node by id or returns None when no node with this ID is found
    pub fn get_node_by_id(&self, node_id: NodeId) -> Option<&Node> {
        self.arena.get_node(node_id)
    }

    /// Fetches a mutable node by id or returns None when no node with this ID is found
    pub fn get_mut_node_by_id(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.arena.get_mut_node(node_id)
    }

    /// Registers the node and appends it as the last child of the parent
    pub fn add_node(&mut self, node: Node, parent_id: NodeId) -> NodeId {
        let node_id = self.arena.add_node(node);
        self.arena.attach_node(parent_id, node_id);
        node_id
    }

    /// Registers the node without attaching it to anything
    pub fn register_node(&mut self, node: Node) -> NodeId {
        self.arena.add_node(node)
    }

    /// Appends the node as the last child of the parent, detaching it from
    /// any previous parent
    pub fn append(&mut self, node_id: NodeId, parent_id: NodeId) {
        self.arena.attach_node(parent_id, node_id);
    }

    /// Inserts the node as a child of the parent, directly before the
    /// reference node. Used by foster parenting.
    pub fn insert_before(&mut self, node_id: NodeId, parent_id: NodeId, reference_id: NodeId) {
        self.arena.attach_node_before(parent_id, node_id, reference_id);
    }

    /// Detaches the node from its parent. The node stays registered.
    pub fn detach(&mut self, node_id: NodeId) {
        self.arena.detach_node(node_id);
    }

    /// Shallow-clones the node (no parent, no children) and returns the clone's id
    pub fn clone_node(&mut self, node_id: NodeId) -> Option<NodeId> {
        self.arena.clone_node(node_id)
    }

    // Returns the root node
    pub fn get_root(&self) -> &Node {
        self.arena
            .get_node(NodeId::root())
            .expect("root node not found")
    }

    /// Children of the given node, in tree order
    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        self.arena
            .get_node(node_id)
            .map_or(&[], |node| node.children.as_slice())
    }

    /// Parent of the given node, or None for the root
    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.arena.get_node(node_id).and_then(|node| node.parent)
    }

    /// Top-level nodes of a fragment parse. Empty for a document parse.
    pub fn fragment_nodes(&self) -> &[NodeId] {
        &self.fragment_nodes
    }

    pub(crate) fn set_fragment_nodes(&mut self, nodes: Vec<NodeId>) {
        self.fragment_nodes = nodes;
    }

    pub fn count_nodes(&self) -> usize {
        self.arena.count()
    }
}

impl Document {
    /// Print a node and all its children in a tree-like structure
    fn print_tree(&self, node: &Node, prefix: String, last: bool, f: &mut fmt::Formatter<'_>) {
        let mut buffer = prefix.clone();
        if last {
            buffer.push_str("└─ ");
        } else {
            buffer.push_str("├─ ");
        }

        match &node.data {
            NodeData::Document => {
                _ = writeln!(f, "{buffer}Document");
            }
            NodeData::DocType {
                name,
                pub_identifier,
                sys_identifier,
            } => {
                _ = writeln!(f, "{buffer}<!DOCTYPE {name} {pub_identifier} {sys_identifier}>");
            }
            NodeData::Text { value } => {
                _ = writeln!(f, "{buffer}\"{value}\"");
            }
            NodeData::Comment { value } => {
                _ = writeln!(f, "{buffer}<!-- {value} -->");
            }
            NodeData::Element { attributes } => {
                _ = write!(f, "{}<{}", buffer, node.name);
                for attr in attributes {
                    _ = write!(f, " {}={}", attr.name, attr.value);
                }
                _ = writeln!(f, ">");
            }
        }

        let mut buffer = prefix;
        if last {
            buffer.push_str("   ");
        } else {
            buffer.push_str("│  ");
        }

        let len = node.children.len();
        for (i, child) in node.children.iter().enumerate() {
            if let Some(child) = self.arena.get_node(*child) {
                self.print_tree(child, buffer.clone(), i == len - 1, f);
            }
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_tree(self.get_root(), "".to_string(), true, f);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Attributes, HTML_NAMESPACE};

    fn element(name: &str) -> Node {
        Node::new_element(name, Attributes::new(), HTML_NAMESPACE, Location::default())
    }

    #[test]
    fn test_tree_structure() {
        let mut document = Document::new();
        let root_id = document.get_root().id;
        let html_id = document.add_node(element("html"), root_id);
        let head_id = document.add_node(element("head"), html_id);
        let body_id = document.add_node(element("body"), html_id);
        let p_id = document.add_node(element("p"), body_id);
        document.add_node(Node::new_text("Hello world", Location::default()), p_id);

        assert_eq!(document.children(html_id), &[head_id, body_id]);
        assert_eq!(document.parent(p_id), Some(body_id));
        assert_eq!(document.count_nodes(), 6);
    }

    #[test]
    fn test_display() {
        let mut document = Document::new();
        let root_id = document.get_root().id;
        let html_id = document.add_node(element("html"), root_id);
        let body_id = document.add_node(element("body"), html_id);
        document.add_node(Node::new_text("hi", Location::default()), body_id);

        let output = format!("{document}");
        assert!(output.contains("<html>"));
        assert!(output.contains("<body>"));
        assert!(output.contains("\"hi\""));
    }

    #[test]
    fn test_metadata_serializes() {
        let mut metadata = DocumentMetadata {
            has_manufactured_html: true,
            base_url: Some(("https://example.com/".to_string(), "_blank".to_string())),
            ..Default::default()
        };
        metadata.html_src_bytes = 42;

        let json = serde_json::to_string(&metadata).expect("serialize");
        let parsed: DocumentMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_insert_before() {
        let mut document = Document::new();
        let root_id = document.get_root().id;
        let html_id = document.add_node(element("html"), root_id);
        let a = document.add_node(element("a"), html_id);
        let b = document.add_node(element("b"), html_id);
        let c = document.register_node(element("c"));
        document.insert_before(c, html_id, b);

        assert_eq!(document.children(html_id), &[a, c, b]);
    }
}
