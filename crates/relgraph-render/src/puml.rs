//! PlantUML class diagram output.
//!
//! Classes are grouped into `package` blocks; relationships follow as one
//! sorted, deduplicated list so that output is stable across runs.

use crate::relations::{Link, sorted_lines};
use relgraph_core::config::RenderConfig;
use relgraph_core::graph::EdgeKind;
use relgraph_core::model::{ClassKind, ClassModel, FieldModel, MethodModel};
use std::fmt;

/// Render a PlantUML diagram.
pub fn render(classes: &[ClassModel], config: &RenderConfig) -> String {
    PlantUml { classes, config }.to_string()
}

/// Display adapter producing a complete `@startuml` … `@enduml` document.
pub struct PlantUml<'a> {
    pub classes: &'a [ClassModel],
    pub config: &'a RenderConfig,
}

impl PlantUml<'_> {
    /// Packages in first-seen order, plus the classes without one.
    fn grouped(&self) -> (Vec<(&str, Vec<&ClassModel>)>, Vec<&ClassModel>) {
        let mut packages: Vec<(&str, Vec<&ClassModel>)> = Vec::new();
        let mut loose = Vec::new();
        for class in self.classes {
            match class.package.as_deref() {
                Some(pkg) => match packages.iter_mut().find(|(name, _)| *name == pkg) {
                    Some((_, members)) => members.push(class),
                    None => packages.push((pkg, vec![class])),
                },
                None => loose.push(class),
            }
        }
        for (_, members) in &mut packages {
            members.sort_by(|a, b| a.name.cmp(&b.name));
        }
        loose.sort_by(|a, b| a.name.cmp(&b.name));
        (packages, loose)
    }

    fn write_layout(&self, f: &mut fmt::Formatter<'_>, package_count: usize) -> fmt::Result {
        let total = self.classes.len();
        // Many packages or crowded packages read better horizontally.
        if package_count >= 4 || total > 5 * package_count.max(1) {
            writeln!(f, "left to right direction")?;
        } else {
            writeln!(f, "top to bottom direction")?;
        }

        let mut nodesep = self.config.base_nodesep;
        let mut ranksep = self.config.base_ranksep;
        if total > self.config.large_diagram_threshold {
            nodesep += self.config.large_nodesep_bonus;
            ranksep += self.config.large_ranksep_bonus;
        }
        writeln!(f, "skinparam nodesep {nodesep}")?;
        writeln!(f, "skinparam ranksep {ranksep}")?;
        writeln!(f, "skinparam linetype {}", self.config.linetype)?;
        writeln!(f)
    }
}

impl fmt::Display for PlantUml<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config.title {
            Some(title) => writeln!(f, "@startuml {title}")?,
            None => writeln!(f, "@startuml")?,
        }
        writeln!(f)?;
        writeln!(f, "skinparam shadowing false")?;
        writeln!(f, "skinparam class {{")?;
        writeln!(f, "    BackgroundColor white")?;
        writeln!(f, "    ArrowColor #263238")?;
        writeln!(f, "    BorderColor #263238")?;
        writeln!(f, "}}")?;
        writeln!(f, "skinparam packageStyle rectangle")?;

        let (packages, loose) = self.grouped();
        self.write_layout(f, packages.len())?;

        for (pkg, members) in &packages {
            writeln!(f, "  package \"{pkg}\" {{")?;
            for class in members {
                write_class(f, class)?;
            }
            writeln!(f, "  }}")?;
            writeln!(f)?;
        }
        for class in &loose {
            write_class(f, class)?;
        }

        let lines = sorted_lines(self.classes, |source, link, target| match link {
            Link::Extends => format!("{target} <|-- {source}"),
            Link::Implements => format!("{target} <|.. {source}"),
            Link::Edge(kind) => format!("{source} {} {target}", arrow(kind)),
        });
        if !lines.is_empty() {
            writeln!(f)?;
            writeln!(f, "' Relationships")?;
            for line in &lines {
                writeln!(f, "{line}")?;
            }
        }
        writeln!(f, "@enduml")
    }
}

fn arrow(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Composition => "*--",
        EdgeKind::Aggregation => "o--",
        EdgeKind::Association => "-->",
        EdgeKind::Dependency => "..>",
    }
}

fn header(class: &ClassModel) -> String {
    match class.kind {
        ClassKind::Class if class.is_abstract => format!("abstract class {}", class.name),
        ClassKind::Record | ClassKind::Object => {
            format!("class {} <<{}>>", class.name, class.kind)
        }
        kind => format!("{kind} {}", class.name),
    }
}

fn write_class(f: &mut fmt::Formatter<'_>, class: &ClassModel) -> fmt::Result {
    writeln!(f, "    {} {{", header(class))?;
    for field in &class.fields {
        writeln!(f, "      {}", FieldLine(field))?;
    }
    for method in &class.methods {
        let show_abstract = method.is_abstract && class.kind != ClassKind::Interface;
        writeln!(f, "      {}", MethodLine(method, show_abstract))?;
    }
    writeln!(f, "    }}")
}

struct FieldLine<'a>(&'a FieldModel);

impl fmt::Display for FieldLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.0;
        // Enum constants carry no type and no visibility marker.
        if field.type_name.is_empty() {
            return f.write_str(&field.name);
        }
        write!(f, "{}", field.visibility.symbol())?;
        if field.is_static {
            f.write_str("{static} ")?;
        }
        write!(f, "{} : {}", field.name, field.type_name)
    }
}

struct MethodLine<'a>(&'a MethodModel, bool);

impl fmt::Display for MethodLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (method, show_abstract) = (self.0, self.1);
        write!(f, "{}", method.visibility.symbol())?;
        if method.is_static {
            f.write_str("{static} ")?;
        }
        if show_abstract {
            f.write_str("{abstract} ")?;
        }
        let params: Vec<&str> = method.parameters.iter().map(|p| p.type_name.as_str()).collect();
        write!(f, "{}({})", method.name, params.join(", "))?;
        if !method.return_type.is_empty() {
            write!(f, " : {}", method.return_type)?;
        }
        Ok(())
    }
}
