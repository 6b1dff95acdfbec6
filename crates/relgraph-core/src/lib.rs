//! Core types for relgraph: a typed entity-relationship graph that separates
//! ownership (composition) from reference (aggregation, association,
//! dependency).
//!
//! Provides the graph engine ([`graph::RelationGraph`]), the static type and
//! role registry, a lock-guarded shared handle, language-neutral class models,
//! and ingestion of those models into a checked graph.

pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod model;
pub mod registry;
pub mod shared;
