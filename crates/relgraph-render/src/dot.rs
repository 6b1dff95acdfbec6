//! Graphviz DOT export of a live entity graph.

use relgraph_core::graph::{EdgeKind, RelationGraph};
use std::fmt;

/// Export the graph as a DOT string.
pub fn render(graph: &RelationGraph) -> String {
    Dot(graph).to_string()
}

/// Display adapter over a [`RelationGraph`].
pub struct Dot<'g>(pub &'g RelationGraph);

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.0;
        writeln!(f, "digraph relgraph {{")?;
        writeln!(f, "  rankdir=LR;")?;
        writeln!(f, "  node [shape=box, fontsize=10];")?;
        writeln!(f)?;

        for entity in graph.entities() {
            let mut label = escape(&entity.type_tag);
            if !entity.roles.is_empty() {
                let roles: Vec<&str> = entity.roles.iter().map(String::as_str).collect();
                label.push_str("\\n«");
                label.push_str(&escape(&roles.join(", ")));
                label.push('»');
            }
            writeln!(f, "  \"{}\" [label=\"{}\"];", entity.id, label)?;
        }

        writeln!(f)?;

        for edge in graph.edges() {
            write!(f, "  \"{}\" -> \"{}\" [{}", edge.source, edge.target, style(edge.kind))?;
            if let Some(label) = &edge.label {
                write!(f, ", label=\"{}\"", escape(label))?;
            }
            writeln!(f, "];")?;
        }

        writeln!(f, "}}")
    }
}

fn style(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Composition => "dir=back, arrowtail=diamond, style=solid",
        EdgeKind::Aggregation => "dir=back, arrowtail=odiamond, style=solid",
        EdgeKind::Association => "arrowhead=vee, style=solid",
        EdgeKind::Dependency => "arrowhead=vee, style=dashed",
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
