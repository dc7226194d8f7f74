//! Sample Measure Definitions
//!
//! Ready-made definitions for two eCQMs and the codeset names they reference:
//!
//! - **CMS130v6**: Colorectal Cancer Screening (five cascading exams)
//! - **CMS138v6**: Tobacco Use Screening and Cessation Intervention
//!   (three sub-populations, plus the single-population variants p1 and p2)
//!
//! # Example
//!
//! ```ignore
//! use octofhir_cqm_measures::{standard_catalog, standard_registry};
//! use std::sync::Arc;
//!
//! let registry = standard_registry(Arc::new(standard_catalog()?))?;
//! let colorectal = registry.get("CMS130v6").unwrap();
//! ```

pub mod colorectal;
pub mod tobacco;
pub mod valuesets;

pub use colorectal::cms130v6;
pub use tobacco::{TobaccoVariant, cms138v6, cms138v6p1, cms138v6p2};
pub use valuesets::standard_catalog;

use log::debug;
use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_eval::{MeasureDefinition, MeasureRegistry};
use octofhir_cqm_model::CodesetMatcher;
use std::sync::Arc;

/// Build every bundled measure definition
pub fn all_measures() -> Result<Vec<MeasureDefinition>, ConfigurationError> {
    Ok(vec![cms130v6()?, cms138v6()?, cms138v6p1()?, cms138v6p2()?])
}

/// Create a registry holding every bundled measure, validated against `matcher`
pub fn standard_registry(matcher: Arc<dyn CodesetMatcher>) -> Result<MeasureRegistry, ConfigurationError> {
    let registry = MeasureRegistry::new(matcher);
    for definition in all_measures()? {
        registry.register(definition)?;
    }
    debug!("Registered {} bundled measures", registry.len());
    Ok(registry)
}
