//! Error types for the relationship graph engine and type registry.

use crate::graph::{EdgeId, EntityId};
use std::fmt;

/// A handle to something that lives in a graph: an entity or an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Entity(EntityId),
    Edge(EdgeId),
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(id) => write!(f, "entity {id}"),
            Self::Edge(id) => write!(f, "edge {id}"),
        }
    }
}

/// Errors from graph mutations and queries.
///
/// Every error is deterministic: repeating the same call against the same
/// graph state reproduces it, and a failed mutation leaves the graph untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("unknown or deleted {0}")]
    UnknownEntity(Handle),
    #[error("{target} is already composed by {owner}")]
    OwnershipConflict { target: EntityId, owner: EntityId },
    #[error("composing {child} under {parent} would create a cycle")]
    CycleDetected { parent: EntityId, child: EntityId },
    #[error("{holder} already holds an association labeled {label:?} with cardinality one")]
    CardinalityViolation {
        holder: EntityId,
        label: Option<String>,
    },
    #[error("type {type_tag} does not bind {missing:?} required by role {role}")]
    RoleContractViolation {
        type_tag: String,
        role: String,
        missing: Vec<String>,
    },
    #[error("type {0} is not registered")]
    UnknownType(String),
    #[error("type {0} is abstract and cannot be instantiated")]
    AbstractType(String),
    #[error("role {0} is not registered")]
    UnknownRole(String),
    #[error("graph lock poisoned")]
    Poisoned,
}

impl GraphError {
    pub(crate) fn unknown_entity(id: EntityId) -> Self {
        Self::UnknownEntity(Handle::Entity(id))
    }

    pub(crate) fn unknown_edge(id: EdgeId) -> Self {
        Self::UnknownEntity(Handle::Edge(id))
    }
}

/// Errors raised while declaring types and roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("type {0} declared twice")]
    DuplicateType(String),
    #[error("role {0} declared twice")]
    DuplicateRole(String),
    #[error("type {type_tag} extends unknown base {base}")]
    UnknownBase { type_tag: String, base: String },
    #[error("inheritance cycle through {0}")]
    InheritanceCycle(String),
    #[error("type {type_tag} declares unknown role {role}")]
    UnknownRole { type_tag: String, role: String },
}
