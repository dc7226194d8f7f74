//! CLI functionality for the CQM tool
//!
//! - Measure evaluation for a patient or a panel
//! - Measure validation against a codeset catalog
//! - Listing of the bundled measures
//! - Output formatting

pub mod evaluate;
pub mod list;
pub mod output;
pub mod validate;

use anyhow::{Context, Result};
use octofhir_cqm_measures::standard_catalog;
use octofhir_cqm_model::CodesetCatalog;
use std::path::Path;

/// The bundled catalog, extended with the codesets of `extra` when given
pub fn load_catalog(extra: Option<&Path>) -> Result<CodesetCatalog> {
    let catalog = standard_catalog().context("Failed to load the bundled codeset catalog")?;
    if let Some(path) = extra {
        let loaded = CodesetCatalog::from_file(path)
            .with_context(|| format!("Failed to load codeset catalog: {}", path.display()))?;
        log::debug!("Merging {} codesets from {}", loaded.len(), path.display());
        catalog.extend_from(&loaded)?;
    }
    Ok(catalog)
}
