//! Language-neutral class models extracted from source code.

use crate::graph::{Cardinality, EdgeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Object,
    Record,
    Annotation,
}

impl ClassKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Object => "object",
            Self::Record => "record",
            Self::Annotation => "annotation",
        }
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// UML visibility marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Protected,
    Package,
}

impl Visibility {
    /// Resolve from a modifier list such as `"private static final"`.
    pub fn from_modifiers(modifiers: &str) -> Self {
        let has = |word: &str| modifiers.split_whitespace().any(|m| m == word);
        if has("public") {
            Self::Public
        } else if has("private") {
            Self::Private
        } else if has("protected") {
            Self::Protected
        } else {
            Self::Package
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Public => '+',
            Self::Private => '-',
            Self::Protected => '#',
            Self::Package => '~',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldModel {
    pub name: String,
    /// Empty for enum constants.
    pub type_name: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodModel {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<Parameter>,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    /// Declared without a body (abstract or interface method).
    #[serde(default)]
    pub is_abstract: bool,
}

/// A relationship from the declaring class to another type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: EdgeKind,
    pub target: String,
    /// Field or parameter the relation was inferred from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
}

/// One declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassModel {
    pub name: String,
    pub kind: ClassKind,
    pub visibility: Visibility,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<MethodModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub implements: Vec<String>,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl ClassModel {
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            fields: Vec::new(),
            methods: Vec::new(),
            extends: None,
            implements: Vec::new(),
            is_abstract: false,
            package: None,
            relations: Vec::new(),
        }
    }

    /// Interfaces and abstract classes are never instantiated.
    pub fn is_instantiable(&self) -> bool {
        !self.is_abstract && !matches!(self.kind, ClassKind::Interface | ClassKind::Annotation)
    }

    /// Record a relation unless one with the same kind, target and field exists.
    pub fn relate(&mut self, relation: Relation) {
        let duplicate = self
            .relations
            .iter()
            .any(|r| r.kind == relation.kind && r.target == relation.target && r.via == relation.via);
        if !duplicate {
            self.relations.push(relation);
        }
    }

    /// Distinct targets of the given relation kind, in declaration order,
    /// excluding self-references.
    pub fn targets(&self, kind: EdgeKind) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for r in &self.relations {
            if r.kind == kind && r.target != self.name && !out.contains(&r.target.as_str()) {
                out.push(&r.target);
            }
        }
        out
    }

    /// Dependency targets not already covered by a structural relation.
    pub fn uncovered_dependencies(&self) -> Vec<&str> {
        let structural: Vec<&str> = self
            .relations
            .iter()
            .filter(|r| r.kind.is_structural())
            .map(|r| r.target.as_str())
            .collect();
        self.targets(EdgeKind::Dependency)
            .into_iter()
            .filter(|t| !structural.contains(t))
            .collect()
    }
}
