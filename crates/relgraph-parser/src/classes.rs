//! Class model extraction: language dispatch, shared relationship
//! heuristics and parallel multi-file parsing.

use crate::languages::Language;
use crate::types::{ResolvedType, split_generic};
use anyhow::Result;
use rayon::prelude::*;
use relgraph_core::config::ExtractionConfig;
use relgraph_core::graph::{Cardinality, EdgeKind};
use relgraph_core::model::{ClassModel, Relation};
use std::path::{Path, PathBuf};

/// Extract every class-like declaration from one source file.
pub fn extract_classes(
    path: &Path,
    source: &str,
    language: Language,
    config: &ExtractionConfig,
) -> Result<Vec<ClassModel>> {
    let classes = match language {
        Language::Java => crate::java::extract(path, source, config)?,
        Language::Kotlin => crate::kotlin::extract(path, source, config)?,
    };
    tracing::debug!("{}: {} classes", path.display(), classes.len());
    Ok(classes)
}

/// Extract classes from many files in parallel.
///
/// Files with an unsupported extension are skipped; files that fail to parse
/// are logged and skipped. Output keeps the input file order.
pub fn parse_files_parallel(files: &[(PathBuf, String)], config: &ExtractionConfig) -> Vec<ClassModel> {
    files
        .par_iter()
        .filter_map(|(path, source)| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let Some(language) = Language::from_extension(ext) else {
                tracing::debug!("skipping {}: unsupported extension", path.display());
                return None;
            };
            match extract_classes(path, source, language, config) {
                Ok(classes) => Some(classes),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                    None
                }
            }
        })
        .flatten_iter()
        .collect()
}

/// Record the relationship implied by a field (or property) of type `ty`.
///
/// Containers aggregate their element type; an owned initializer composes;
/// anything else is a single-valued association.
pub(crate) fn relate_field(model: &mut ClassModel, field: &str, ty: &ResolvedType, owned: bool) {
    let Some(target) = ty.target.clone() else {
        return;
    };
    let (kind, cardinality) = if ty.is_collection {
        (EdgeKind::Aggregation, Some(Cardinality::Many))
    } else if owned {
        (EdgeKind::Composition, None)
    } else {
        (EdgeKind::Association, Some(Cardinality::One))
    };
    model.relate(Relation {
        kind,
        target,
        via: Some(field.to_string()),
        cardinality,
    });
}

/// Record a dependency on a parameter or return type of `method`.
pub(crate) fn relate_usage(model: &mut ClassModel, method: &str, ty: &ResolvedType) {
    if let Some(target) = ty.target.clone() {
        model.relate(Relation {
            kind: EdgeKind::Dependency,
            target,
            via: Some(method.to_string()),
            cardinality: None,
        });
    }
}

/// Simple name of a supertype reference: `com.x.Base<T>(args)` → `Base`.
pub(crate) fn supertype_name(text: &str) -> Option<String> {
    let head = text.split('(').next().unwrap_or("");
    let head = head.split_whitespace().next().unwrap_or("");
    let (base, _) = split_generic(head);
    let simple = base.rsplit('.').next().unwrap_or(base).trim();
    (!simple.is_empty()).then(|| simple.to_string())
}

/// Leading identifier of `text`, when followed by a call: `Foo(…)`, `Foo<T>(…)`.
pub(crate) fn constructor_call(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let (name, rest) = text.split_at(end);
    let rest = rest.trim_start();
    let is_call = rest.starts_with('(') || (rest.starts_with('<') && rest.contains('('));
    (is_call && name.starts_with(|c: char| c.is_uppercase())).then_some(name)
}
