//! The relationship graph: typed entities joined by typed, directed edges.
//!
//! Edge kinds carry lifetime contracts. `Composition` is exclusive ownership
//! (one composer per target, no cycles, cascade on delete); `Aggregation`,
//! `Association` and `Dependency` never affect lifetimes. Non-owning edges are
//! stored as ids resolved through the graph, so back-references never form
//! ownership cycles.

use crate::error::GraphError;
use crate::registry::TypeRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Identifier of an entity. Never reused while the graph is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

/// Identifier of an edge. Never reused while the graph is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(u64);

impl EntityId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl EdgeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of relationship between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Exclusive ownership: the target lives and dies with the source.
    Composition,
    /// Grouping without ownership.
    Aggregation,
    /// A stored reference used by the source.
    Association,
    /// A call-time usage fact, not a stored reference.
    Dependency,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 4] = [
        EdgeKind::Composition,
        EdgeKind::Aggregation,
        EdgeKind::Association,
        EdgeKind::Dependency,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Composition => "composition",
            Self::Aggregation => "aggregation",
            Self::Association => "association",
            Self::Dependency => "dependency",
        }
    }

    /// Structural kinds are stored as fields; dependencies are not.
    pub fn is_structural(self) -> bool {
        self != Self::Dependency
    }

    fn bit(self) -> u8 {
        match self {
            Self::Composition => 1,
            Self::Aggregation => 1 << 1,
            Self::Association => 1 << 2,
            Self::Dependency => 1 << 3,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown edge kind: {s}"))
    }
}

/// Declared multiplicity of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    One,
    Many,
}

/// A set of edge kinds, used to filter traversals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EdgeKinds(u8);

impl EdgeKinds {
    pub const NONE: EdgeKinds = EdgeKinds(0);
    pub const ALL: EdgeKinds = EdgeKinds(0b1111);
    /// Edges that bind lifetimes: answers "what dies with X".
    pub const OWNERSHIP: EdgeKinds = EdgeKinds(1);
    /// Edges that express use: answers "what does X use".
    pub const USAGE: EdgeKinds = EdgeKinds(0b1100);

    #[must_use]
    pub fn with(self, kind: EdgeKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub fn contains(self, kind: EdgeKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<EdgeKind> for EdgeKinds {
    fn from(kind: EdgeKind) -> Self {
        Self::NONE.with(kind)
    }
}

impl FromIterator<EdgeKind> for EdgeKinds {
    fn from_iter<I: IntoIterator<Item = EdgeKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, EdgeKinds::with)
    }
}

/// A live entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub type_tag: String,
    pub roles: BTreeSet<String>,
}

/// A live edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: EntityId,
    pub target: EntityId,
    pub kind: EdgeKind,
    /// Role label of the reference (usually the field name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
}

/// Arguments to [`RelationGraph::add_edge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeSpec {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: EdgeKind,
    pub label: Option<String>,
    pub cardinality: Option<Cardinality>,
}

impl EdgeSpec {
    pub fn new(source: EntityId, target: EntityId, kind: EdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
            label: None,
            cardinality: None,
        }
    }

    pub fn composition(source: EntityId, target: EntityId) -> Self {
        Self::new(source, target, EdgeKind::Composition)
    }

    pub fn aggregation(source: EntityId, target: EntityId) -> Self {
        Self::new(source, target, EdgeKind::Aggregation)
    }

    pub fn association(source: EntityId, target: EntityId) -> Self {
        Self::new(source, target, EdgeKind::Association)
    }

    pub fn dependency(source: EntityId, target: EntityId) -> Self {
        Self::new(source, target, EdgeKind::Dependency)
    }

    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }
}

/// Typed entity-relationship graph enforcing the composition-forest invariants.
#[derive(Debug, Clone)]
pub struct RelationGraph {
    registry: Arc<TypeRegistry>,
    entities: BTreeMap<EntityId, Entity>,
    edges: BTreeMap<EdgeId, Edge>,
    /// Entity ID → edges where it is the source.
    outgoing: HashMap<EntityId, BTreeSet<EdgeId>>,
    /// Entity ID → edges where it is the target.
    incoming: HashMap<EntityId, BTreeSet<EdgeId>>,
    /// Composed entity → its single composition edge.
    composer: HashMap<EntityId, EdgeId>,
    next_entity: u64,
    next_edge: u64,
}

impl RelationGraph {
    /// Create an empty graph over a frozen type registry.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            entities: BTreeMap::new(),
            edges: BTreeMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            composer: HashMap::new(),
            next_entity: 1,
            next_edge: 1,
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Instantiate a registered concrete type.
    ///
    /// Every requested role, and every role the type declares, must have all
    /// its operations bound by the type or one of its bases.
    pub fn create_entity<I, S>(&mut self, type_tag: &str, roles: I) -> Result<EntityId, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles = self.registry.resolve_roles(type_tag, roles)?;
        let id = EntityId(self.next_entity);
        self.next_entity += 1;

        tracing::debug!("created entity {} of type {}", id, type_tag);
        self.entities.insert(
            id,
            Entity {
                id,
                type_tag: type_tag.to_string(),
                roles,
            },
        );
        self.outgoing.insert(id, BTreeSet::new());
        self.incoming.insert(id, BTreeSet::new());
        Ok(id)
    }

    /// Link two live entities.
    pub fn add_edge(&mut self, spec: EdgeSpec) -> Result<EdgeId, GraphError> {
        self.require_live(spec.source)?;
        self.require_live(spec.target)?;

        match spec.kind {
            EdgeKind::Composition => {
                if let Some(owner) = self.composer_of(spec.target) {
                    return Err(GraphError::OwnershipConflict {
                        target: spec.target,
                        owner,
                    });
                }
                if self.is_composition_ancestor(spec.target, spec.source) {
                    return Err(GraphError::CycleDetected {
                        parent: spec.source,
                        child: spec.target,
                    });
                }
            }
            EdgeKind::Association => self.check_cardinality(&spec)?,
            EdgeKind::Aggregation | EdgeKind::Dependency => {}
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;

        if spec.kind == EdgeKind::Composition {
            self.composer.insert(spec.target, id);
        }
        self.outgoing.entry(spec.source).or_default().insert(id);
        self.incoming.entry(spec.target).or_default().insert(id);

        tracing::debug!(
            "added {} edge {}: {} -> {}",
            spec.kind,
            id,
            spec.source,
            spec.target
        );
        self.edges.insert(
            id,
            Edge {
                id,
                source: spec.source,
                target: spec.target,
                kind: spec.kind,
                label: spec.label,
                cardinality: spec.cardinality,
            },
        );
        Ok(id)
    }

    /// Remove a single edge. Never cascades, whatever its kind.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let edge = self
            .edges
            .remove(&id)
            .ok_or_else(|| GraphError::unknown_edge(id))?;
        self.unindex_edge(&edge);
        tracing::debug!("removed {} edge {}", edge.kind, id);
        Ok(edge)
    }

    /// Delete an entity together with its composition subtree.
    ///
    /// Returns the deleted ids in post-order (composed parts before their
    /// owner, `id` last). Every edge touching a deleted entity is dropped.
    pub fn delete_entity(&mut self, id: EntityId) -> Result<Vec<EntityId>, GraphError> {
        self.require_live(id)?;
        let order = self.composition_post_order(id);
        for &victim in &order {
            self.detach(victim);
        }
        tracing::debug!("deleted entity {} ({} with cascade)", id, order.len());
        Ok(order)
    }

    /// Breadth-first walk over outgoing edges whose kind is in `kinds`.
    ///
    /// The start entity is not yielded. Each reachable entity is yielded once.
    pub fn reachable(&self, start: EntityId, kinds: EdgeKinds) -> Result<Reachable<'_>, GraphError> {
        self.require_live(start)?;
        Ok(Reachable::new(self, start, kinds))
    }

    /// True iff the entity's role set contains `role`.
    pub fn satisfies(&self, id: EntityId, role: &str) -> Result<bool, GraphError> {
        self.entity(id)
            .map(|e| e.roles.contains(role))
            .ok_or_else(|| GraphError::unknown_entity(id))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges leaving `id`, in insertion order.
    pub fn edges_from(&self, id: EntityId) -> impl Iterator<Item = &Edge> {
        self.indexed_edges(self.outgoing.get(&id))
    }

    /// Edges arriving at `id`, in insertion order.
    pub fn edges_to(&self, id: EntityId) -> impl Iterator<Item = &Edge> {
        self.indexed_edges(self.incoming.get(&id))
    }

    /// The entity that composes `id`, if any.
    pub fn composer_of(&self, id: EntityId) -> Option<EntityId> {
        self.composer
            .get(&id)
            .and_then(|edge| self.edges.get(edge))
            .map(|edge| edge.source)
    }

    /// Re-verify every structural invariant from scratch.
    ///
    /// Returns a description of each violation found; empty when the graph is
    /// consistent. Mutations maintain these incrementally, so a non-empty
    /// result indicates a bug in the engine itself.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut composers: HashMap<EntityId, Vec<EdgeId>> = HashMap::new();
        for edge in self.edges.values() {
            if !self.contains(edge.source) || !self.contains(edge.target) {
                problems.push(format!("edge {} has a dangling endpoint", edge.id));
            }
            if edge.kind == EdgeKind::Composition {
                composers.entry(edge.target).or_default().push(edge.id);
            }
        }

        for (target, edges) in &composers {
            if edges.len() > 1 {
                problems.push(format!("entity {target} has {} composers", edges.len()));
            }
            if self.composer.get(target) != edges.first() {
                problems.push(format!("composer index out of sync for {target}"));
            }
        }
        if self.composer.len() != composers.len() {
            problems.push("composer index holds stale entries".to_string());
        }

        // Walking up the composer chain must terminate within |V| steps.
        let limit = self.entities.len();
        for &start in self.entities.keys() {
            let mut cursor = start;
            let mut steps = 0;
            while let Some(parent) = self.composer_of(cursor) {
                steps += 1;
                if parent == start || steps > limit {
                    problems.push(format!("composition cycle through {start}"));
                    break;
                }
                cursor = parent;
            }
        }

        problems
    }

    fn require_live(&self, id: EntityId) -> Result<(), GraphError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(GraphError::unknown_entity(id))
        }
    }

    fn indexed_edges<'a>(
        &'a self,
        ids: Option<&'a BTreeSet<EdgeId>>,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
    }

    /// True when `ancestor` is `node` or composes it, directly or transitively.
    fn is_composition_ancestor(&self, ancestor: EntityId, node: EntityId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.composer_of(current);
        }
        false
    }

    fn check_cardinality(&self, spec: &EdgeSpec) -> Result<(), GraphError> {
        let clash = self.edges_from(spec.source).any(|existing| {
            existing.kind == EdgeKind::Association
                && existing.label == spec.label
                && (existing.cardinality == Some(Cardinality::One)
                    || spec.cardinality == Some(Cardinality::One))
        });
        if clash {
            return Err(GraphError::CardinalityViolation {
                holder: spec.source,
                label: spec.label.clone(),
            });
        }
        Ok(())
    }

    fn composed_children(&self, id: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.edges_from(id)
            .filter(|e| e.kind == EdgeKind::Composition)
            .map(|e| e.target)
    }

    fn composition_post_order(&self, root: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut stack = vec![(root, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            stack.push((node, true));
            let children: Vec<EntityId> = self.composed_children(node).collect();
            stack.extend(children.into_iter().rev().map(|c| (c, false)));
        }
        order
    }

    fn detach(&mut self, id: EntityId) {
        let incident: BTreeSet<EdgeId> = self
            .outgoing
            .remove(&id)
            .into_iter()
            .chain(self.incoming.remove(&id))
            .flatten()
            .collect();
        for edge_id in incident {
            if let Some(edge) = self.edges.remove(&edge_id) {
                self.unindex_edge(&edge);
            }
        }
        self.entities.remove(&id);
    }

    fn unindex_edge(&mut self, edge: &Edge) {
        if let Some(ids) = self.outgoing.get_mut(&edge.source) {
            ids.remove(&edge.id);
        }
        if let Some(ids) = self.incoming.get_mut(&edge.target) {
            ids.remove(&edge.id);
        }
        if edge.kind == EdgeKind::Composition && self.composer.get(&edge.target) == Some(&edge.id) {
            self.composer.remove(&edge.target);
        }
    }
}

/// Lazy breadth-first traversal returned by [`RelationGraph::reachable`].
///
/// A clone continues independently from the same point; calling `reachable`
/// again starts a fresh walk over the current graph.
#[derive(Debug, Clone)]
pub struct Reachable<'g> {
    graph: &'g RelationGraph,
    kinds: EdgeKinds,
    queue: VecDeque<EntityId>,
    seen: HashSet<EntityId>,
}

impl<'g> Reachable<'g> {
    fn new(graph: &'g RelationGraph, start: EntityId, kinds: EdgeKinds) -> Self {
        let mut walk = Self {
            graph,
            kinds,
            queue: VecDeque::new(),
            seen: HashSet::from([start]),
        };
        walk.expand(start);
        walk
    }

    fn expand(&mut self, node: EntityId) {
        for edge in self.graph.edges_from(node) {
            if self.kinds.contains(edge.kind) && self.seen.insert(edge.target) {
                self.queue.push_back(edge.target);
            }
        }
    }
}

impl Iterator for Reachable<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let node = self.queue.pop_front()?;
        self.expand(node);
        Some(node)
    }
}
