//! Relationship lines shared by the PlantUML and AML renderers.

use relgraph_core::graph::EdgeKind;
use relgraph_core::model::ClassModel;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    Extends,
    Implements,
    Edge(EdgeKind),
}

/// Every drawable relationship of `class`: supertypes, structural relations,
/// and dependencies not already shown as a structural relation.
pub(crate) fn links(class: &ClassModel) -> Vec<(Link, &str)> {
    let mut out = Vec::new();
    if let Some(base) = &class.extends {
        out.push((Link::Extends, base.as_str()));
    }
    for iface in &class.implements {
        out.push((Link::Implements, iface.as_str()));
    }
    for kind in [EdgeKind::Association, EdgeKind::Aggregation, EdgeKind::Composition] {
        for target in class.targets(kind) {
            out.push((Link::Edge(kind), target));
        }
    }
    for target in class.uncovered_dependencies() {
        out.push((Link::Edge(EdgeKind::Dependency), target));
    }
    out
}

/// Render each class's links with `line` and return them sorted and deduplicated.
pub(crate) fn sorted_lines<F>(classes: &[ClassModel], mut line: F) -> BTreeSet<String>
where
    F: FnMut(&str, Link, &str) -> String,
{
    let mut out = BTreeSet::new();
    for class in classes {
        for (link, target) in links(class) {
            out.insert(line(&class.name, link, target));
        }
    }
    out
}
