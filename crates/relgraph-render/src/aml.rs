//! Aetheris Modeling Language output.

use crate::relations::{Link, sorted_lines};
use relgraph_core::graph::EdgeKind;
use relgraph_core::model::{ClassKind, ClassModel};
use std::collections::BTreeMap;
use std::fmt;

pub fn render(classes: &[ClassModel]) -> String {
    Aml(classes).to_string()
}

/// Display adapter: namespaces in name order, then loose classes, then
/// the sorted relationship list.
pub struct Aml<'a>(pub &'a [ClassModel]);

impl fmt::Display for Aml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut namespaces: BTreeMap<&str, Vec<&ClassModel>> = BTreeMap::new();
        let mut loose = Vec::new();
        for class in self.0 {
            match class.package.as_deref() {
                Some(ns) => namespaces.entry(ns).or_default().push(class),
                None => loose.push(class),
            }
        }

        for (ns, mut members) in namespaces {
            members.sort_by(|a, b| a.name.cmp(&b.name));
            writeln!(f, "namespace {ns} {{")?;
            for class in members {
                write_class(f, class, "    ")?;
            }
            writeln!(f, "}}")?;
            writeln!(f)?;
        }
        loose.sort_by(|a, b| a.name.cmp(&b.name));
        for class in loose {
            write_class(f, class, "")?;
            writeln!(f)?;
        }

        writeln!(f, "// Relationships")?;
        let lines = sorted_lines(self.0, |source, link, target| match link {
            Link::Extends => format!("{source} --|> {target}"),
            Link::Implements => format!("{source} ..|> {target}"),
            Link::Edge(kind) => {
                let arrow = match kind {
                    EdgeKind::Composition => "*--",
                    EdgeKind::Aggregation => "o--",
                    EdgeKind::Association => "->",
                    EdgeKind::Dependency => "..>",
                };
                format!("{source} {arrow} {target} [type: {kind}]")
            }
        });
        for line in &lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

fn write_class(f: &mut fmt::Formatter<'_>, class: &ClassModel, indent: &str) -> fmt::Result {
    let modifier = if class.is_abstract && class.kind == ClassKind::Class {
        "abstract "
    } else {
        ""
    };
    writeln!(f, "{indent}{modifier}{} {} {{", class.kind, class.name)?;
    for field in &class.fields {
        if field.type_name.is_empty() {
            writeln!(f, "{indent}    {}", field.name)?;
            continue;
        }
        write!(
            f,
            "{indent}    {}: {} [{}]",
            field.name,
            field.type_name,
            field.visibility.symbol()
        )?;
        if field.is_static {
            f.write_str(" static")?;
        }
        writeln!(f)?;
    }
    for method in &class.methods {
        let params: Vec<&str> = method.parameters.iter().map(|p| p.type_name.as_str()).collect();
        write!(
            f,
            "{indent}    {}({}): {} [{}]",
            method.name,
            params.join(", "),
            method.return_type,
            method.visibility.symbol()
        )?;
        if method.is_static {
            f.write_str(" static")?;
        }
        writeln!(f)?;
    }
    writeln!(f, "{indent}}}")
}
