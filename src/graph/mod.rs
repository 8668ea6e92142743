// src/graph/mod.rs

//! Generic dependency graph.
//!
//! - [`node`] holds the per-value node record (value + edge lists).
//! - [`walk`] drives an async action over every node in dependency order.
//! - [`dot`] renders the graph for external visualisation.
//!
//! The graph is an arena: nodes live in one `Vec`, edges are stored as
//! [`NodeId`] lists in both directions, and an index maps each value's
//! identity (see [`Identity`]) to its node. Acyclicity is expected but not
//! enforced on insertion; [`Graph::find_cycle`] reports one if present.

pub mod dot;
pub mod node;
pub mod walk;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

pub use dot::DotKind;
pub use node::{Node, NodeId};
pub use walk::WalkFailure;

/// Strategy deciding when two values denote the same node.
pub trait Identity<T> {
    type Key: Hash + Eq;

    fn identify(&self, value: &T) -> Self::Key;
}

/// Identity by the value's own `Eq`/`Hash`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByValue;

impl<T: Hash + Eq + Clone> Identity<T> for ByValue {
    type Key = T;

    fn identify(&self, value: &T) -> T {
        value.clone()
    }
}

/// Identity by a derived key, e.g. a case-folded name.
#[derive(Clone, Copy)]
pub struct ByKey<F>(pub F);

impl<T, K, F> Identity<T> for ByKey<F>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    type Key = K;

    fn identify(&self, value: &T) -> K {
        (self.0)(value)
    }
}

/// Directed acyclic graph of values with antecedent/descendant edges.
pub struct Graph<T, I = ByValue>
where
    I: Identity<T>,
{
    identity: I,
    index: HashMap<I::Key, NodeId>,
    nodes: Vec<Node<T>>,
}

impl<T: Hash + Eq + Clone> Graph<T> {
    pub fn new() -> Self {
        Self::with_identity(ByValue)
    }
}

impl<T: Hash + Eq + Clone> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, I: Identity<T>> fmt::Debug for Graph<T, I>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

impl<T, I: Identity<T>> Graph<T, I> {
    pub fn with_identity(identity: I) -> Self {
        Self {
            identity,
            index: HashMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Get or insert the node for `value`.
    ///
    /// If a node with the same identity already exists, `value` is dropped and
    /// the existing node is returned unchanged.
    pub fn add(&mut self, value: T) -> NodeId {
        let key = self.identity.identify(&value);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(value));
        self.index.insert(key, id);
        id
    }

    /// Record that `antecedent` must complete before `value`, inserting either
    /// value if absent.
    ///
    /// No self-loop or cycle check is performed here.
    pub fn set_antecedent(&mut self, value: T, antecedent: T) {
        let node = self.add(value);
        let antecedent = self.add(antecedent);
        self.link(node, antecedent);
    }

    fn link(&mut self, node: NodeId, antecedent: NodeId) {
        if self.nodes[node.0].push_antecedent(antecedent) {
            self.nodes[antecedent.0].push_descendant(node);
        }
    }

    /// Node id for a value with the same identity, if present.
    pub fn get(&self, value: &T) -> Option<NodeId> {
        self.index.get(&self.identity.identify(value)).copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0)
    }

    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(Node::value)
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node<T>)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes with no descendants, in insertion order.
    pub fn frontier(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.is_frontier())
            .map(|(id, _)| id)
            .collect()
    }

    /// Topological order of all values.
    ///
    /// Iterative depth-first postorder into a stack, read back by popping:
    ///
    /// - `descending = true` recurses into antecedents, so every value comes
    ///   before the values it depends on;
    /// - `descending = false` recurses into descendants, so every value comes
    ///   after the values it depends on.
    ///
    /// The result is a fresh snapshot of the current graph.
    pub fn sort(&self, descending: bool) -> Vec<&T> {
        let postorder = if descending {
            self.postorder(Node::antecedents)
        } else {
            self.postorder(Node::descendants)
        };

        postorder
            .into_iter()
            .rev()
            .map(|id| self.nodes[id.0].value())
            .collect()
    }

    fn postorder(&self, next: fn(&Node<T>) -> &[NodeId]) -> Vec<NodeId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        // (node, cursor into its edge list)
        let mut stack: Vec<(NodeId, usize)> = Vec::new();

        for start in 0..self.nodes.len() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            stack.push((NodeId(start), 0));

            while let Some(top) = stack.last_mut() {
                let (id, cursor) = *top;
                match next(&self.nodes[id.0]).get(cursor) {
                    Some(&child) => {
                        top.1 += 1;
                        if !visited[child.0] {
                            visited[child.0] = true;
                            stack.push((child, 0));
                        }
                    }
                    None => {
                        order.push(id);
                        stack.pop();
                    }
                }
            }
        }

        order
    }

    /// Some value lying on a dependency cycle, or `None` if the graph is
    /// acyclic. Self-loops count as cycles.
    pub fn find_cycle(&self) -> Option<&T> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();

        for (id, node) in self.nodes() {
            graph.add_node(id.0);
            for antecedent in node.antecedents() {
                graph.add_edge(antecedent.0, id.0, ());
            }
        }

        match toposort(&graph, None) {
            Ok(_) => None,
            Err(cycle) => Some(self.nodes[cycle.node_id()].value()),
        }
    }
}
