//! Diagram and data output for extracted class models and live graphs.

pub mod aml;
pub mod dot;
pub mod json;
pub mod puml;
mod relations;

use anyhow::{Context, Result};
use relgraph_core::config::RelgraphConfig;
use relgraph_core::ingest::ingest;
use relgraph_core::model::ClassModel;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// PlantUML class diagram.
    #[default]
    Puml,
    /// Aetheris Modeling Language.
    Aml,
    /// Class models as pretty-printed JSON.
    Json,
    /// Graphviz DOT of the ingested entity graph.
    Dot,
}

impl Format {
    pub const ALL: [Format; 4] = [Format::Puml, Format::Aml, Format::Json, Format::Dot];

    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Puml => "puml",
            Self::Aml => "aml",
            Self::Json => "json",
            Self::Dot => "dot",
        }
    }

    /// Infer the format from an output file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_extension())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "puml" | "plantuml" | "uml" => Ok(Self::Puml),
            "aml" => Ok(Self::Aml),
            "json" => Ok(Self::Json),
            "dot" | "gv" | "graphviz" => Ok(Self::Dot),
            other => Err(format!(
                "unknown format '{}' (expected one of: puml, aml, json, dot)",
                other
            )),
        }
    }
}

/// Render class models in the given format.
///
/// DOT output ingests the models first and draws the resulting entity graph;
/// ingestion issues are logged, not fatal.
pub fn render(classes: &[ClassModel], format: Format, config: &RelgraphConfig) -> Result<String> {
    match format {
        Format::Puml => Ok(puml::render(classes, &config.render)),
        Format::Aml => Ok(aml::render(classes)),
        Format::Json => json::render(classes),
        Format::Dot => {
            let ingested = ingest(classes, &config.extraction).context("failed to build entity graph")?;
            for issue in &ingested.issues {
                tracing::warn!("{}", issue);
            }
            Ok(dot::render(&ingested.graph))
        }
    }
}
