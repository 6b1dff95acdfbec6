//! Tree-sitter based extraction of class models from Java and Kotlin sources.
//!
//! Each declared class, interface, enum or object becomes a
//! [`ClassModel`](relgraph_core::model::ClassModel) carrying its members and
//! the relationships inferred from field, parameter and return types.

pub mod classes;
mod java;
mod kotlin;
pub mod languages;
pub mod treesitter;
pub mod types;
