//! Temporal Clinical Quality Measure evaluation for Rust
//!
//! This crate bundles the whole engine:
//! - Reporting timeframes, lookbacks, patients and clinical events
//! - Timeline and codeset contracts with in-memory implementations
//! - Cascading evidence search, population classification and result synthesis
//! - Sample eCQM definitions (colorectal cancer screening, tobacco screening)
//!
//! # Example
//!
//! ```ignore
//! use octofhir_cqm::{MeasureEngine, InMemoryTimeline, Timeframe, measures};
//! use std::sync::Arc;
//!
//! let engine = MeasureEngine::new(Arc::new(measures::standard_catalog()?));
//! let timelines = InMemoryTimeline::from_file("patients.json")?;
//! let result = engine.evaluate(&timelines[0], &timeframe, &measures::cms130v6()?)?;
//! println!("{} (due in {:?})", result.status, result.due_in);
//! ```

// Re-export all public APIs from internal crates
pub use octofhir_cqm_diagnostics as diagnostics;
pub use octofhir_cqm_eval as eval;
pub use octofhir_cqm_measures as measures;
pub use octofhir_cqm_model as model;
pub use octofhir_cqm_types as types;

// Convenience re-exports
pub use octofhir_cqm_diagnostics::{ConfigurationError, Diagnostic};
pub use octofhir_cqm_eval::{
    EvalError, EvaluationMode, EvaluationOptions, MeasureDefinition, MeasureEngine, MeasureRegistry,
    PanelSummary, evaluate_panel,
};
pub use octofhir_cqm_model::{CodesetCatalog, CodesetMatcher, InMemoryTimeline, TimelineStore};
pub use octofhir_cqm_types::{ClinicalEvent, MeasureResult, MeasureStatus, Patient, Timeframe};

// CLI module (only available with cli feature)
#[cfg(feature = "cli")]
pub mod cli;
