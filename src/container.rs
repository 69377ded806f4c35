//! The rendered contents of one list.
//!
//! A [`Container`] is an ordered sequence of nodes: rendered items and filler
//! placeholders. Nodes keep a stable [`NodeId`] for their whole life so the
//! segment list can hold on to them as insertion anchors while other nodes
//! come and go around them.

use std::fmt;

/// Stable identifier of a node inside a [`Container`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// One rendered item. May span several lines.
    Item(String),
    /// Placeholder for unrendered items, `height` rows tall.
    Filler {
        /// Height in rows.
        height: usize,
    },
}

/// A node in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: NodeId,
    /// The node's content.
    pub kind: NodeKind,
}

impl Node {
    /// The node's identifier.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether this node is a filler.
    pub fn is_filler(&self) -> bool {
        matches!(self.kind, NodeKind::Filler { .. })
    }

    /// The rendered item text, if this node is an item.
    pub fn item(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Item(text) => Some(text),
            NodeKind::Filler { .. } => None,
        }
    }
}

/// Ordered nodes of one list.
///
/// # Examples
///
/// ```rust
/// use bubbletea_dllist::container::{Container, NodeKind};
///
/// let mut container = Container::new("results");
/// let last = container.append(NodeKind::Item("b".into()));
/// container.insert_before(Some(last), NodeKind::Item("a".into()));
/// assert_eq!(container.items().collect::<Vec<_>>(), vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Container {
    id: String,
    nodes: Vec<Node>,
    next_id: u64,
}

impl Container {
    /// Creates an empty container.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nodes: Vec::new(),
            next_id: 0,
        }
    }

    /// Creates a container holding the given rendered items.
    pub fn with_items(id: impl Into<String>, items: impl IntoIterator<Item = String>) -> Self {
        let mut container = Self::new(id);
        for item in items {
            container.append(NodeKind::Item(item));
        }
        container
    }

    /// The container's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// All nodes in order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the container has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rendered item texts in order, skipping fillers.
    pub fn items(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().filter_map(Node::item)
    }

    /// Number of rendered items.
    pub fn item_count(&self) -> usize {
        self.items().count()
    }

    /// Looks up a node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.position(id).map(|pos| &self.nodes[pos])
    }

    /// Position of a node in document order.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    /// The node following `id`, if any.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let pos = self.position(id)?;
        self.nodes.get(pos + 1).map(Node::id)
    }

    /// The last node, if any.
    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().map(Node::id)
    }

    /// Appends a node at the end.
    pub fn append(&mut self, kind: NodeKind) -> NodeId {
        self.insert_before(None, kind)
    }

    /// Inserts a node before `anchor`, or at the end when `anchor` is `None`
    /// or no longer present.
    pub fn insert_before(&mut self, anchor: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let pos = anchor
            .and_then(|anchor| self.position(anchor))
            .unwrap_or(self.nodes.len());
        self.nodes.insert(pos, Node { id, kind });
        id
    }

    /// Removes a node, returning it.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let pos = self.position(id)?;
        Some(self.nodes.remove(pos))
    }

    /// Drops every node after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    /// Resizes a filler. Returns `false` when `id` is not a filler.
    pub fn set_filler_height(&mut self, id: NodeId, height: usize) -> bool {
        match self.position(id).map(|pos| &mut self.nodes[pos].kind) {
            Some(NodeKind::Filler { height: h }) => {
                *h = height;
                true
            }
            _ => false,
        }
    }

    /// Height of a filler node, if `id` is one.
    pub fn filler_height(&self, id: NodeId) -> Option<usize> {
        match self.get(id)?.kind {
            NodeKind::Filler { height } => Some(height),
            NodeKind::Item(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_before_keeps_order() {
        let mut container = Container::with_items("c", ["a".to_string(), "d".to_string()]);
        let d = container.nodes()[1].id();
        let filler = container.insert_before(Some(d), NodeKind::Filler { height: 4 });
        container.insert_before(Some(filler), NodeKind::Item("b".into()));
        container.insert_before(Some(filler), NodeKind::Item("c".into()));

        assert_eq!(container.items().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        assert_eq!(container.position(filler), Some(3));
        assert_eq!(container.next_sibling(filler), Some(d));
        assert_eq!(container.next_sibling(d), None);
    }

    #[test]
    fn test_ids_stay_stable_across_removal() {
        let mut container = Container::new("c");
        let a = container.append(NodeKind::Item("a".into()));
        let b = container.append(NodeKind::Item("b".into()));
        assert!(container.remove(a).is_some());
        assert!(container.remove(a).is_none());
        assert_eq!(container.get(b).and_then(Node::item), Some("b"));
        let c = container.append(NodeKind::Item("c".into()));
        assert_ne!(a, c);
    }

    #[test]
    fn test_filler_height_only_for_fillers() {
        let mut container = Container::new("c");
        let item = container.append(NodeKind::Item("a".into()));
        let filler = container.append(NodeKind::Filler { height: 2 });
        assert!(!container.set_filler_height(item, 5));
        assert!(container.set_filler_height(filler, 5));
        assert_eq!(container.filler_height(filler), Some(5));
        assert_eq!(container.filler_height(item), None);
        assert_eq!(container.item_count(), 1);
    }

    #[test]
    fn test_insert_before_missing_anchor_appends() {
        let mut container = Container::new("c");
        let a = container.append(NodeKind::Item("a".into()));
        container.remove(a);
        container.insert_before(Some(a), NodeKind::Item("b".into()));
        assert_eq!(container.items().collect::<Vec<_>>(), vec!["b"]);
    }
}
