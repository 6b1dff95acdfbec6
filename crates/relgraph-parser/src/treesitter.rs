//! Tree-sitter integration shared by the per-language extractors.

use anyhow::{Context, Result};
use std::path::Path;
use tree_sitter::Node;

/// Parse a source file and return the tree-sitter tree.
pub fn parse_file(
    path: &Path,
    source: &[u8],
    language: tree_sitter::Language,
) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&language)
        .context("failed to set tree-sitter language")?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse {}", path.display()))?;
    if tree.root_node().has_error() {
        tracing::warn!("{} contains syntax errors; extraction may be partial", path.display());
    }
    Ok(tree)
}

/// Source text of a node.
pub(crate) fn text<'s>(node: &Node, source: &'s str) -> &'s str {
    &source[node.byte_range()]
}

/// First direct child of the given kind.
pub(crate) fn child_of_kind<'t>(node: &Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|c| c.kind() == kind)
}

/// All direct children of the given kind.
pub(crate) fn children_of_kind<'t>(node: &Node<'t>, kind: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|c| c.kind() == kind)
        .collect()
}

/// Whether a whitespace-separated modifier list contains `word`.
pub(crate) fn has_modifier(modifiers: &str, word: &str) -> bool {
    modifiers.split_whitespace().any(|m| m == word)
}
