//! Static type registry: concrete/abstract types, single-inheritance chains,
//! and capability roles with their required operation signatures.
//!
//! The registry is declared once through [`RegistryBuilder`] and frozen by
//! [`RegistryBuilder::build`]. Inherited bindings and roles are resolved at
//! build time, so role checks during entity construction are plain set lookups.

use crate::error::{GraphError, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// An operation signature: a name plus the number of parameters it takes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperationSig {
    pub name: String,
    pub arity: usize,
}

impl OperationSig {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for OperationSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A capability contract (interface).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDef {
    pub tag: String,
    pub required: BTreeSet<OperationSig>,
}

/// Declaration of a type, before inherited bindings are resolved.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub tag: String,
    pub base: Option<String>,
    pub is_abstract: bool,
    pub operations: BTreeSet<OperationSig>,
    pub roles: BTreeSet<String>,
}

impl TypeDecl {
    pub fn concrete(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            base: None,
            is_abstract: false,
            operations: BTreeSet::new(),
            roles: BTreeSet::new(),
        }
    }

    pub fn abstract_base(tag: impl Into<String>) -> Self {
        Self {
            is_abstract: true,
            ..Self::concrete(tag)
        }
    }

    #[must_use]
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    #[must_use]
    pub fn binds(mut self, op: OperationSig) -> Self {
        self.operations.insert(op);
        self
    }

    #[must_use]
    pub fn binds_all(mut self, ops: impl IntoIterator<Item = OperationSig>) -> Self {
        self.operations.extend(ops);
        self
    }

    #[must_use]
    pub fn conforms_to(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }
}

/// A resolved type: own declaration plus everything inherited from its bases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub tag: String,
    pub base: Option<String>,
    pub is_abstract: bool,
    /// Operations bound by this type or any base.
    pub bound_operations: BTreeSet<OperationSig>,
    /// Roles declared by this type or any base.
    pub roles: BTreeSet<String>,
}

impl TypeDef {
    pub fn binds(&self, op: &OperationSig) -> bool {
        self.bound_operations.contains(op)
    }
}

/// Collects role and type declarations, then resolves them into a [`TypeRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    roles: BTreeMap<String, RoleDef>,
    types: BTreeMap<String, TypeDecl>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a role and the operations any conforming type must bind.
    pub fn declare_role(
        &mut self,
        tag: impl Into<String>,
        required: impl IntoIterator<Item = OperationSig>,
    ) -> Result<&mut Self, RegistryError> {
        let tag = tag.into();
        if self.roles.contains_key(&tag) {
            return Err(RegistryError::DuplicateRole(tag));
        }
        self.roles.insert(
            tag.clone(),
            RoleDef {
                tag,
                required: required.into_iter().collect(),
            },
        );
        Ok(self)
    }

    pub fn declare_type(&mut self, decl: TypeDecl) -> Result<&mut Self, RegistryError> {
        if self.types.contains_key(&decl.tag) {
            return Err(RegistryError::DuplicateType(decl.tag));
        }
        self.types.insert(decl.tag.clone(), decl);
        Ok(self)
    }

    pub fn has_type(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    pub fn has_role(&self, tag: &str) -> bool {
        self.roles.contains_key(tag)
    }

    /// Validate every declaration and resolve inherited bindings.
    pub fn build(self) -> Result<TypeRegistry, RegistryError> {
        let mut resolved = BTreeMap::new();
        for decl in self.types.values() {
            let mut bound = decl.operations.clone();
            let mut roles = decl.roles.clone();

            let mut seen = HashSet::new();
            seen.insert(decl.tag.as_str());
            let mut cursor = decl;
            while let Some(base_tag) = cursor.base.as_deref() {
                let base = self
                    .types
                    .get(base_tag)
                    .ok_or_else(|| RegistryError::UnknownBase {
                        type_tag: cursor.tag.clone(),
                        base: base_tag.to_string(),
                    })?;
                if !seen.insert(base.tag.as_str()) {
                    return Err(RegistryError::InheritanceCycle(decl.tag.clone()));
                }
                bound.extend(base.operations.iter().cloned());
                roles.extend(base.roles.iter().cloned());
                cursor = base;
            }

            if let Some(role) = roles.iter().find(|r| !self.roles.contains_key(*r)) {
                return Err(RegistryError::UnknownRole {
                    type_tag: decl.tag.clone(),
                    role: role.clone(),
                });
            }

            resolved.insert(
                decl.tag.clone(),
                TypeDef {
                    tag: decl.tag.clone(),
                    base: decl.base.clone(),
                    is_abstract: decl.is_abstract,
                    bound_operations: bound,
                    roles,
                },
            );
        }

        Ok(TypeRegistry {
            types: resolved,
            roles: self.roles,
        })
    }
}

/// Immutable registry of types and roles, consulted by entity construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDef>,
    roles: BTreeMap<String, RoleDef>,
}

impl TypeRegistry {
    pub fn type_def(&self, tag: &str) -> Option<&TypeDef> {
        self.types.get(tag)
    }

    pub fn role_def(&self, tag: &str) -> Option<&RoleDef> {
        self.roles.get(tag)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleDef> {
        self.roles.values()
    }

    /// Base chain of a type, nearest base first. Empty for unknown tags.
    pub fn bases_of(&self, tag: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut cursor = self.types.get(tag);
        while let Some(base) = cursor.and_then(|t| t.base.as_deref()) {
            chain.push(base);
            cursor = self.types.get(base);
        }
        chain
    }

    /// True when `tag` is `ancestor` or inherits from it.
    pub fn is_subtype_of(&self, tag: &str, ancestor: &str) -> bool {
        (tag == ancestor && self.types.contains_key(tag)) || self.bases_of(tag).contains(&ancestor)
    }

    /// Operations `role` requires that `type_tag` leaves unbound.
    pub fn missing_operations(
        &self,
        type_tag: &str,
        role: &str,
    ) -> Result<Vec<OperationSig>, GraphError> {
        let type_def = self
            .types
            .get(type_tag)
            .ok_or_else(|| GraphError::UnknownType(type_tag.to_string()))?;
        let role_def = self
            .roles
            .get(role)
            .ok_or_else(|| GraphError::UnknownRole(role.to_string()))?;
        Ok(role_def
            .required
            .iter()
            .filter(|op| !type_def.binds(op))
            .cloned()
            .collect())
    }

    /// Check that `type_tag` can be instantiated with `requested` roles.
    ///
    /// Returns the full role set of the new entity: the requested roles plus
    /// every role the type (or a base) declares.
    pub(crate) fn resolve_roles<I, S>(
        &self,
        type_tag: &str,
        requested: I,
    ) -> Result<BTreeSet<String>, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let type_def = self
            .types
            .get(type_tag)
            .ok_or_else(|| GraphError::UnknownType(type_tag.to_string()))?;
        if type_def.is_abstract {
            return Err(GraphError::AbstractType(type_tag.to_string()));
        }

        let mut roles = type_def.roles.clone();
        roles.extend(requested.into_iter().map(Into::into));

        for role in &roles {
            let missing = self.missing_operations(type_tag, role)?;
            if !missing.is_empty() {
                return Err(GraphError::RoleContractViolation {
                    type_tag: type_tag.to_string(),
                    role: role.clone(),
                    missing: missing.iter().map(ToString::to_string).collect(),
                });
            }
        }
        Ok(roles)
    }
}
