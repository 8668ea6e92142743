// src/graph/node.rs

use std::fmt;

/// Index of a node inside the arena of the [`Graph`](super::Graph) that
/// created it. Only meaningful for that graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value plus its immediate edges.
///
/// Edges are kept as index lists in insertion order, which makes traversal
/// deterministic for a given construction sequence. The graph keeps the two
/// lists mutually inverse: `a` is in `b.antecedents()` exactly when `b` is in
/// `a.descendants()`.
#[derive(Debug, Clone)]
pub struct Node<T> {
    value: T,
    /// Nodes that must complete before this one.
    antecedents: Vec<NodeId>,
    /// Nodes that depend on this one.
    descendants: Vec<NodeId>,
}

impl<T> Node<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            antecedents: Vec::new(),
            descendants: Vec::new(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn antecedents(&self) -> &[NodeId] {
        &self.antecedents
    }

    pub fn descendants(&self) -> &[NodeId] {
        &self.descendants
    }

    /// A node nothing else depends on.
    pub fn is_frontier(&self) -> bool {
        self.descendants.is_empty()
    }

    /// A node with no dependencies of its own.
    pub fn is_root(&self) -> bool {
        self.antecedents.is_empty()
    }

    /// Returns `false` if the edge was already present.
    pub(crate) fn push_antecedent(&mut self, id: NodeId) -> bool {
        if self.antecedents.contains(&id) {
            return false;
        }
        self.antecedents.push(id);
        true
    }

    pub(crate) fn push_descendant(&mut self, id: NodeId) {
        if !self.descendants.contains(&id) {
            self.descendants.push(id);
        }
    }
}

impl<T: fmt::Display> fmt::Display for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}
