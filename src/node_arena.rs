use crate::node::{Node, NodeId};
use std::collections::HashMap;

/// Id-indexed node storage. All tree mutation goes through the arena so that
/// parent and children links stay consistent.
pub struct NodeArena {
    nodes: HashMap<NodeId, Node>, // Current nodes
    next_id: NodeId,              // next id to use
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeArena {
    /// Creates a new NodeArena
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: NodeId::root(),
        }
    }

    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the node with the given id
    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable reference to the node with the given id
    pub fn get_mut_node(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Registers a node and returns its assigned id. The node is not attached
    /// to anything yet.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = self.next_id;
        self.next_id = NodeId(id.0 + 1);

        node.id = id;
        node.parent = None;
        node.children.clear();
        self.nodes.insert(id, node);
        id
    }

    /// Appends node_id as the last child of parent_id, detaching it from any
    /// previous parent first.
    pub fn attach_node(&mut self, parent_id: NodeId, node_id: NodeId) {
        self.detach_node(node_id);

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.push(node_id);
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.parent = Some(parent_id);
        }
    }

    /// Inserts node_id as a child of parent_id directly before reference_id.
    /// Falls back to appending when the reference is not a child of the parent.
    pub fn attach_node_before(
        &mut self,
        parent_id: NodeId,
        node_id: NodeId,
        reference_id: NodeId,
    ) {
        self.detach_node(node_id);

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            match parent.children.iter().position(|&c| c == reference_id) {
                Some(idx) => parent.children.insert(idx, node_id),
                None => parent.children.push(node_id),
            }
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.parent = Some(parent_id);
        }
    }

    /// Removes the node from its parent's child list. The node itself stays
    /// in the arena.
    pub fn detach_node(&mut self, node_id: NodeId) {
        let parent_id = self.nodes.get(&node_id).and_then(|n| n.parent);

        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|&c| c != node_id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.parent = None;
        }
    }

    /// Shallow-clones a node: name, namespace and data are copied, parent and
    /// children are not. Returns the id of the clone.
    pub fn clone_node(&mut self, node_id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&node_id)?;

        let clone = Node {
            id: NodeId::default(),
            parent: None,
            children: vec![],
            name: node.name.clone(),
            namespace: node.namespace.clone(),
            data: node.data.clone(),
            location: node.location,
        };

        Some(self.add_node(clone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Attributes, HTML_NAMESPACE};
    use crate::input_stream::Location;

    fn element(name: &str) -> Node {
        Node::new_element(name, Attributes::new(), HTML_NAMESPACE, Location::default())
    }

    #[test]
    fn test_add_and_get() {
        let mut arena = NodeArena::new();
        let id = arena.add_node(Node::new_document());
        assert_eq!(id, NodeId::root());

        let node = arena.get_node(id).unwrap();
        assert_eq!(node.id, id);
        assert_eq!(arena.count(), 1);
    }

    #[test]
    fn test_attach() {
        let mut arena = NodeArena::new();
        let root = arena.add_node(Node::new_document());
        let child = arena.add_node(element("div"));

        arena.attach_node(root, child);
        assert_eq!(arena.get_node(root).unwrap().children, vec![child]);
        assert_eq!(arena.get_node(child).unwrap().parent, Some(root));
    }

    #[test]
    fn test_attach_moves_node() {
        let mut arena = NodeArena::new();
        let root = arena.add_node(Node::new_document());
        let a = arena.add_node(element("a"));
        let b = arena.add_node(element("b"));

        arena.attach_node(root, a);
        arena.attach_node(a, b);
        arena.attach_node(root, b);

        assert!(arena.get_node(a).unwrap().children.is_empty());
        assert_eq!(arena.get_node(root).unwrap().children, vec![a, b]);
        assert_eq!(arena.get_node(b).unwrap().parent, Some(root));
    }

    #[test]
    fn test_attach_before() {
        let mut arena = NodeArena::new();
        let root = arena.add_node(Node::new_document());
        let a = arena.add_node(element("a"));
        let b = arena.add_node(element("b"));
        let c = arena.add_node(element("c"));

        arena.attach_node(root, a);
        arena.attach_node(root, b);
        arena.attach_node_before(root, c, b);

        assert_eq!(arena.get_node(root).unwrap().children, vec![a, c, b]);
    }

    #[test]
    fn test_detach() {
        let mut arena = NodeArena::new();
        let root = arena.add_node(Node::new_document());
        let child = arena.add_node(element("div"));

        arena.attach_node(root, child);
        arena.detach_node(child);

        assert!(arena.get_node(root).unwrap().children.is_empty());
        assert_eq!(arena.get_node(child).unwrap().parent, None);
        assert_eq!(arena.count(), 2);
    }

    #[test]
    fn test_clone_node_has_no_relations() {
        let mut arena = NodeArena::new();
        let root = arena.add_node(Node::new_document());
        let parent = arena.add_node(element("p"));
        let child = arena.add_node(element("b"));

        arena.attach_node(root, parent);
        arena.attach_node(parent, child);

        let clone = arena.clone_node(parent).unwrap();
        let clone_node = arena.get_node(clone).unwrap();
        assert_eq!(clone_node.name, "p");
        assert_eq!(clone_node.parent, None);
        assert!(clone_node.children.is_empty());
        assert_ne!(clone, parent);
    }
}
