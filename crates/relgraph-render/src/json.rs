//! Class models as JSON, for tooling that consumes the extracted model.

use anyhow::{Context, Result};
use relgraph_core::model::ClassModel;

pub fn render(classes: &[ClassModel]) -> Result<String> {
    let mut out = serde_json::to_string_pretty(classes).context("failed to serialize class models")?;
    out.push('\n');
    Ok(out)
}
