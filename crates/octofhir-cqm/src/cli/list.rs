//! List command implementation

use super::{load_catalog, output};
use anyhow::{Context, Result};
use octofhir_cqm_eval::MeasureDefinition;
use octofhir_cqm_measures::standard_registry;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Tabled;

/// Configuration for list command
#[derive(Debug, Clone, Default)]
pub struct ListConfig {
    pub catalog: Option<PathBuf>,
    pub output_format: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// One registered measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct MeasureSummary {
    #[tabled(rename = "Measure")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Version")]
    pub version: String,
    #[tabled(rename = "Populations", display_with = "join_ids")]
    pub populations: Vec<String>,
    #[tabled(rename = "Reports")]
    pub reporting: String,
}

impl From<&MeasureDefinition> for MeasureSummary {
    fn from(definition: &MeasureDefinition) -> Self {
        Self {
            id: definition.id().to_string(),
            title: definition.metadata.title.clone(),
            version: definition.metadata.version.clone(),
            populations: definition.populations.iter().map(|p| p.id.to_string()).collect(),
            reporting: definition.reporting.to_string(),
        }
    }
}

fn join_ids(ids: &[String]) -> String {
    ids.join(", ")
}

/// Summaries of every bundled measure, in registration order
pub fn registered_measures(config: &ListConfig) -> Result<Vec<MeasureSummary>> {
    let catalog = load_catalog(config.catalog.as_deref())?;
    let registry = standard_registry(Arc::new(catalog)).context("Failed to register the bundled measures")?;
    Ok(registry
        .measures()
        .iter()
        .map(|definition| MeasureSummary::from(definition.as_ref()))
        .collect())
}

/// Print the bundled measures
pub fn list(config: ListConfig) -> Result<()> {
    let format = output::OutputFormat::parse_or_default(config.output_format.as_deref())?;
    let measures = registered_measures(&config)?;
    let content = match format {
        output::OutputFormat::Json => output::format_json(&measures, false)?,
        output::OutputFormat::JsonPretty => output::format_json(&measures, true)?,
        output::OutputFormat::Table => output::format_table(measures),
    };
    output::write_output(&content, config.output_file.as_deref())
}
