//! Configuration for extraction and diagram rendering.
//!
//! Load order: `.relgraph/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".relgraph";
const CONFIG_FILE: &str = "config.toml";

/// Top-level relgraph configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelgraphConfig {
    pub extraction: ExtractionConfig,
    pub render: RenderConfig,
}

/// Relationship inference settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Extra value types that never produce a relationship (e.g. `UUID`).
    pub extra_primitive_types: Vec<String>,
    /// Extra container types whose fields aggregate their element type.
    pub extra_collection_types: Vec<String>,
    /// Keep relations to types referenced but never declared in the input,
    /// registering them as opaque concrete types during ingestion.
    pub include_external_types: bool,
}

impl ExtractionConfig {
    pub fn is_extra_primitive(&self, type_name: &str) -> bool {
        self.extra_primitive_types.iter().any(|t| t == type_name)
    }

    pub fn is_extra_collection(&self, type_name: &str) -> bool {
        self.extra_collection_types.iter().any(|t| t == type_name)
    }
}

/// PlantUML layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Diagram title; defaults to the output file stem.
    pub title: Option<String>,
    pub base_nodesep: u32,
    pub base_ranksep: u32,
    /// Class count above which spacing is widened.
    pub large_diagram_threshold: usize,
    pub large_nodesep_bonus: u32,
    pub large_ranksep_bonus: u32,
    /// `polyline` renders reliably everywhere; `ortho` needs a recent Graphviz.
    pub linetype: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: None,
            base_nodesep: 50,
            base_ranksep: 60,
            large_diagram_threshold: 15,
            large_nodesep_bonus: 30,
            large_ranksep_bonus: 40,
            linetype: "polyline".to_string(),
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

/// Path to the config file for a project root.
pub fn config_file(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(CONFIG_FILE)
}

impl RelgraphConfig {
    /// Load config from `.relgraph/config.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = config_file(project_root);

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override("RELGRAPH_NODESEP", &mut config.render.base_nodesep);
        env_override("RELGRAPH_RANKSEP", &mut config.render.base_ranksep);
        env_override("RELGRAPH_LINETYPE", &mut config.render.linetype);
        env_override(
            "RELGRAPH_INCLUDE_EXTERNAL",
            &mut config.extraction.include_external_types,
        );

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.render.linetype.trim().is_empty() {
            anyhow::bail!("render.linetype must not be empty");
        }
        if self.render.base_nodesep == 0 || self.render.base_ranksep == 0 {
            anyhow::bail!(
                "render spacing must be positive (nodesep {}, ranksep {})",
                self.render.base_nodesep,
                self.render.base_ranksep,
            );
        }
        Ok(())
    }
}
