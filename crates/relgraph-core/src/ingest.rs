//! Lower extracted class models into a type registry and a relationship graph.
//!
//! Interfaces become roles, classes become types, and every instantiable
//! class becomes one entity. Relations become edges. Invariant violations the
//! source exhibits (shared composition, composition cycles, unbound interface
//! methods) are collected as [`IngestIssue`]s instead of aborting, so a whole
//! code base can be checked in one pass.

use crate::config::ExtractionConfig;
use crate::error::GraphError;
use crate::graph::{EdgeKind, EdgeSpec, EntityId, RelationGraph};
use crate::model::{ClassKind, ClassModel, MethodModel};
use crate::registry::{OperationSig, RegistryBuilder, TypeDecl};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A problem found while lowering the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestIssue {
    /// Declaring class the issue belongs to.
    pub class: String,
    pub error: GraphError,
}

impl fmt::Display for IngestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.error)
    }
}

/// Result of [`ingest`].
#[derive(Debug)]
pub struct Ingested {
    pub graph: RelationGraph,
    pub entities_by_name: BTreeMap<String, EntityId>,
    pub issues: Vec<IngestIssue>,
}

impl Ingested {
    pub fn entity_named(&self, name: &str) -> Option<EntityId> {
        self.entities_by_name.get(name).copied()
    }

    /// Reverse lookup: the class name an entity was created for.
    pub fn name_of(&self, id: EntityId) -> Option<&str> {
        self.graph.entity(id).map(|e| e.type_tag.as_str())
    }
}

fn signature(method: &MethodModel) -> OperationSig {
    OperationSig::new(&method.name, method.parameters.len())
}

/// Build a registry and graph from extracted classes.
pub fn ingest(classes: &[ClassModel], config: &ExtractionConfig) -> Result<Ingested> {
    let mut issues = Vec::new();

    let mut declared: BTreeMap<&str, &ClassModel> = BTreeMap::new();
    for class in classes {
        if declared.insert(class.name.as_str(), class).is_some() {
            tracing::warn!("duplicate declaration of {}; keeping the last one", class.name);
        }
    }
    let is_role = |name: &str| {
        declared
            .get(name)
            .is_some_and(|c| c.kind == ClassKind::Interface)
    };

    let mut builder = RegistryBuilder::new();

    // Roles: interface contracts, flattened across interface inheritance.
    for class in declared.values().filter(|c| c.kind == ClassKind::Interface) {
        let required: BTreeSet<OperationSig> = role_closure(&class.name, &declared)
            .into_iter()
            .filter_map(|name| declared.get(name.as_str()))
            .flat_map(|iface| iface.methods.iter().filter(|m| m.is_abstract))
            .map(signature)
            .collect();
        builder
            .declare_role(&class.name, required)
            .with_context(|| format!("failed to declare role {}", class.name))?;
    }

    // Types: every non-interface declaration, bases only when declared.
    for class in declared.values().filter(|c| c.kind != ClassKind::Interface) {
        let mut decl = if class.is_instantiable() {
            TypeDecl::concrete(&class.name)
        } else {
            TypeDecl::abstract_base(&class.name)
        };
        if let Some(base) = class.extends.as_deref() {
            if declared.contains_key(base) && !is_role(base) {
                decl = decl.extends(base);
            } else {
                tracing::debug!("{} extends undeclared type {}", class.name, base);
            }
        }
        decl = decl.binds_all(class.methods.iter().filter(|m| !m.is_abstract).map(signature));
        builder
            .declare_type(decl)
            .with_context(|| format!("failed to declare type {}", class.name))?;
    }

    let mut externals = BTreeSet::new();
    if config.include_external_types {
        for class in declared.values() {
            for relation in &class.relations {
                if !declared.contains_key(relation.target.as_str()) {
                    externals.insert(relation.target.clone());
                }
            }
        }
        for name in &externals {
            builder
                .declare_type(TypeDecl::concrete(name))
                .with_context(|| format!("failed to declare external type {name}"))?;
        }
    }

    let registry = Arc::new(builder.build().context("invalid type hierarchy")?);
    let mut graph = RelationGraph::new(Arc::clone(&registry));
    let mut entities_by_name = BTreeMap::new();

    for class in declared.values().filter(|c| c.is_instantiable()) {
        let roles = implemented_roles(class, &declared);
        let created = match graph.create_entity(&class.name, roles.iter().cloned()) {
            Err(error @ GraphError::RoleContractViolation { .. }) => {
                tracing::warn!("{}: {}", class.name, error);
                issues.push(IngestIssue {
                    class: class.name.clone(),
                    error,
                });
                let satisfied = roles.into_iter().filter(|role| {
                    registry
                        .missing_operations(&class.name, role)
                        .is_ok_and(|missing| missing.is_empty())
                });
                graph.create_entity(&class.name, satisfied)
            }
            other => other,
        };
        match created {
            Ok(id) => {
                entities_by_name.insert(class.name.clone(), id);
            }
            Err(error) => issues.push(IngestIssue {
                class: class.name.clone(),
                error,
            }),
        }
    }
    for name in externals {
        let id = graph.create_entity(&name, std::iter::empty::<String>())?;
        entities_by_name.insert(name, id);
    }

    for class in declared.values() {
        let Some(&source) = entities_by_name.get(&class.name) else {
            if !class.relations.is_empty() {
                tracing::debug!("{} is not instantiable; its relations are not ingested", class.name);
            }
            continue;
        };

        let mut specs = Vec::new();
        for target in class.targets(EdgeKind::Composition) {
            if let Some(&target) = entities_by_name.get(target) {
                specs.push(EdgeSpec::composition(source, target));
            }
        }
        // Self-references such as `Node next` are kept as loops.
        for relation in class
            .relations
            .iter()
            .filter(|r| matches!(r.kind, EdgeKind::Aggregation | EdgeKind::Association))
        {
            if let Some(&target) = entities_by_name.get(&relation.target) {
                let mut spec = EdgeSpec::new(source, target, relation.kind);
                spec.label.clone_from(&relation.via);
                spec.cardinality = relation.cardinality;
                specs.push(spec);
            }
        }
        for target in class.uncovered_dependencies() {
            if let Some(&target) = entities_by_name.get(target) {
                specs.push(EdgeSpec::dependency(source, target));
            }
        }

        for spec in specs {
            if let Err(error) = graph.add_edge(spec) {
                tracing::warn!("{}: {}", class.name, error);
                issues.push(IngestIssue {
                    class: class.name.clone(),
                    error,
                });
            }
        }
    }

    tracing::debug!(
        "ingested {} entities, {} edges, {} issues",
        graph.entity_count(),
        graph.edge_count(),
        issues.len()
    );
    Ok(Ingested {
        graph,
        entities_by_name,
        issues,
    })
}

/// An interface plus every interface it extends, transitively.
fn role_closure(name: &str, declared: &BTreeMap<&str, &ClassModel>) -> BTreeSet<String> {
    let mut closure = BTreeSet::new();
    let mut pending = vec![name.to_string()];
    while let Some(current) = pending.pop() {
        let Some(class) = declared.get(current.as_str()) else {
            continue;
        };
        if class.kind != ClassKind::Interface || !closure.insert(current) {
            continue;
        }
        pending.extend(class.implements.iter().cloned());
        pending.extend(class.extends.iter().cloned());
    }
    closure
}

/// Declared roles of a class: its interfaces and those of its bases, closed
/// over interface inheritance.
fn implemented_roles(class: &ClassModel, declared: &BTreeMap<&str, &ClassModel>) -> BTreeSet<String> {
    let mut roles = BTreeSet::new();
    let mut seen = BTreeSet::new();
    let mut cursor = Some(class);
    while let Some(current) = cursor {
        if !seen.insert(current.name.as_str()) {
            break;
        }
        for iface in &current.implements {
            roles.extend(role_closure(iface, declared));
        }
        cursor = current
            .extends
            .as_deref()
            .and_then(|base| declared.get(base).copied());
    }
    roles
}
