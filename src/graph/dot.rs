// src/graph/dot.rs

//! Graphviz export.
//!
//! Pure formatting over the node/edge lists; nothing in sorting or walking
//! depends on it. Two synthetic markers frame the graph: `Start` attaches to
//! the frontier, `End` to the nodes with no antecedents.

use std::fmt::{self, Write};
use std::str::FromStr;

use super::{Graph, Identity};

/// Edge orientation of the rendered graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotKind {
    /// Edges run from each node to its descendants; frontier nodes point at
    /// `Start` and `End` points at nodes without antecedents.
    Dependency,
    /// Every edge of [`DotKind::Dependency`] reversed.
    Flow,
}

impl FromStr for DotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dependency" => Ok(DotKind::Dependency),
            "flow" => Ok(DotKind::Flow),
            other => Err(format!(
                "invalid graph kind: {other} (expected \"dependency\" or \"flow\")"
            )),
        }
    }
}

impl<T: fmt::Display, I: Identity<T>> Graph<T, I> {
    /// Render the graph in DOT syntax.
    pub fn to_dot(&self, kind: DotKind) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_dot(&mut out, kind);
        out
    }

    pub fn write_dot<W: Write>(&self, w: &mut W, kind: DotKind) -> fmt::Result {
        writeln!(w, "digraph graphname {{")?;
        writeln!(w, "    node [shape=doublecircle]; Start;")?;
        write!(w, "    node [shape=circle];")?;
        for (_, node) in self.nodes() {
            write!(w, " {node}")?;
        }
        writeln!(w, ";")?;

        for (_, node) in self.nodes().filter(|(_, n)| n.is_root()) {
            match kind {
                DotKind::Dependency => writeln!(w, "    End -> {node};")?,
                DotKind::Flow => writeln!(w, "    {node} -> End;")?,
            }
        }
        for (_, node) in self.nodes().filter(|(_, n)| n.is_frontier()) {
            match kind {
                DotKind::Dependency => writeln!(w, "    {node} -> Start;")?,
                DotKind::Flow => writeln!(w, "    Start -> {node};")?,
            }
        }

        for (_, node) in self.nodes() {
            let targets = match kind {
                DotKind::Dependency => node.descendants(),
                DotKind::Flow => node.antecedents(),
            };
            for target in targets {
                writeln!(w, "    {node} -> {};", self.nodes[target.0])?;
            }
        }

        writeln!(w, "}}")
    }
}
