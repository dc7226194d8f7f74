//! Clinical Quality Measure Evaluation Engine
//!
//! This crate decides, for one patient timeline and one reporting timeframe,
//! where the patient stands with respect to a clinical quality measure:
//!
//! - **Evidence Resolver**: cascading, priority-ordered searches with per-rule lookbacks
//! - **Population Classifier**: initial population, denominator and numerator gates
//!   for one or more sub-populations sharing a base, including composites
//! - **Result Synthesizer**: status, due-in days, narrative and ranked recommendations
//! - **Predicates**: age, event presence, reporting-only and rule-match criteria
//!   with three-valued verdicts
//!
//! # Example
//!
//! ```ignore
//! use octofhir_cqm_eval::{MeasureEngine, EvaluationOptions};
//!
//! let engine = MeasureEngine::new(catalog).with_options(EvaluationOptions::new());
//! let result = engine.evaluate(&timeline, &timeframe, &definition)?;
//! ```
//!
//! # Architecture
//!
//! - `MeasureDefinition`: read-only measure value, validated at registration
//! - `EvaluationContext`: per-evaluation state including the evidence memo cache
//! - `PopulationClassifier`: runs the gates and returns a fresh `Classification`
//! - `ResultSynthesizer`: maps the reporting population to a `MeasureResult`
//!
//! # Three-Valued Verdicts
//!
//! Predicates return met, not met, or indeterminate (e.g. no birth date):
//!
//! - an indeterminate initial population or prerequisite keeps the patient out
//! - an indeterminate exclusion or exception does not apply

pub mod batch;
pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod population;
pub mod predicate;
pub mod registry;
pub mod synthesis;

pub use batch::{PanelSummary, PatientOutcome, PopulationCounts, evaluate_panel};
pub use context::{EvaluationContext, EvaluationMode, EvaluationOptions};
pub use definition::{MeasureDefinition, MeasureDefinitionBuilder, MeasureMetadata};
pub use engine::{Evaluation, MeasureEngine};
pub use error::{EvalError, EvalResult};
pub use evidence::{
    AnchorPrecision, EvidenceMatch, EvidenceResolver, EvidenceRule, Remediation, RuleId,
};
pub use population::{
    Classification, Criterion, DueNarrative, NumeratorCriteria, Population, PopulationClassifier,
    PopulationDefinition,
};
pub use predicate::{
    AgeAtLeast, AgeBetween, AllOf, AnyOf, HasEvent, Not, Predicate, ReportingOnly, RuleMatched, Verdict,
};
pub use registry::MeasureRegistry;
pub use synthesis::{DUE_NOW, ResultSynthesizer};
