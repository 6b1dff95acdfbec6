//! Thread-safe handle over a [`RelationGraph`].
//!
//! Mutations take the write lock; queries take the read lock, so readers run
//! concurrently with each other but never alongside a mutation.

use crate::error::GraphError;
use crate::graph::{Edge, EdgeId, EdgeKinds, EdgeSpec, EntityId, RelationGraph};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
pub struct SharedGraph {
    inner: Arc<RwLock<RelationGraph>>,
}

impl SharedGraph {
    pub fn new(graph: RelationGraph) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    pub fn create_entity<I, S>(&self, type_tag: &str, roles: I) -> Result<EntityId, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write()?.create_entity(type_tag, roles)
    }

    pub fn add_edge(&self, spec: EdgeSpec) -> Result<EdgeId, GraphError> {
        self.write()?.add_edge(spec)
    }

    pub fn remove_edge(&self, id: EdgeId) -> Result<Edge, GraphError> {
        self.write()?.remove_edge(id)
    }

    pub fn delete_entity(&self, id: EntityId) -> Result<Vec<EntityId>, GraphError> {
        self.write()?.delete_entity(id)
    }

    /// Collect a reachability walk while holding the read lock.
    pub fn reachable(&self, start: EntityId, kinds: EdgeKinds) -> Result<Vec<EntityId>, GraphError> {
        Ok(self.read()?.reachable(start, kinds)?.collect())
    }

    pub fn satisfies(&self, id: EntityId, role: &str) -> Result<bool, GraphError> {
        self.read()?.satisfies(id, role)
    }

    /// Run a read-only closure against the graph.
    pub fn with_read<R>(&self, f: impl FnOnce(&RelationGraph) -> R) -> Result<R, GraphError> {
        let guard = self.read()?;
        Ok(f(&guard))
    }

    /// Run several mutations under one write lock.
    ///
    /// Each mutation is still all-or-nothing on its own; the closure decides
    /// what to do when one of them fails.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut RelationGraph) -> R) -> Result<R, GraphError> {
        let mut guard = self.write()?;
        Ok(f(&mut guard))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RelationGraph>, GraphError> {
        self.inner.read().map_err(|_| GraphError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, RelationGraph>, GraphError> {
        self.inner.write().map_err(|_| GraphError::Poisoned)
    }
}
