//! Measure Evaluation Engine
//!
//! This module provides the main [`MeasureEngine`] which evaluates a measure
//! definition against one patient's timeline and a reporting timeframe.

use crate::context::{EvaluationContext, EvaluationOptions};
use crate::definition::MeasureDefinition;
use crate::error::EvalResult;
use crate::evidence::RuleId;
use crate::population::{Classification, PopulationClassifier};
use crate::synthesis::ResultSynthesizer;
use octofhir_cqm_model::{CodesetMatcher, TimelineStore};
use octofhir_cqm_types::{MeasureResult, Timeframe};
use std::sync::Arc;

/// Everything an evaluation produced, for callers that need more than the result
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: MeasureResult,
    pub classification: Classification,
    /// Evidence rules searched, in the order they were first resolved
    pub queried_rules: Vec<RuleId>,
}

/// The main measure evaluation engine
///
/// The engine holds no per-patient state; it is safe to share one engine
/// across threads and evaluate many patients concurrently.
#[derive(Clone)]
pub struct MeasureEngine {
    matcher: Arc<dyn CodesetMatcher>,
    options: EvaluationOptions,
}

impl std::fmt::Debug for MeasureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasureEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MeasureEngine {
    /// Create an engine over a codeset matcher with default options
    pub fn new(matcher: Arc<dyn CodesetMatcher>) -> Self {
        Self {
            matcher,
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> EvaluationOptions {
        self.options
    }

    pub fn matcher(&self) -> &dyn CodesetMatcher {
        self.matcher.as_ref()
    }

    /// Evaluate `definition` for the patient behind `timeline`
    pub fn evaluate(
        &self,
        timeline: &dyn TimelineStore,
        timeframe: &Timeframe,
        definition: &MeasureDefinition,
    ) -> EvalResult<MeasureResult> {
        self.evaluate_detailed(timeline, timeframe, definition)
            .map(|evaluation| evaluation.result)
    }

    /// Evaluate and keep the per-population classification alongside the result
    pub fn evaluate_detailed(
        &self,
        timeline: &dyn TimelineStore,
        timeframe: &Timeframe,
        definition: &MeasureDefinition,
    ) -> EvalResult<Evaluation> {
        log::debug!(
            "Evaluating {} for patient {} over {}",
            definition.id(),
            timeline.patient().id,
            timeframe
        );
        let mut ctx = EvaluationContext::new(
            timeline,
            self.matcher.as_ref(),
            &definition.rules,
            *timeframe,
            self.options,
        );
        let classification = PopulationClassifier::classify(definition, &mut ctx)?;
        let result = ResultSynthesizer::synthesize(definition, &classification, &mut ctx)?;
        Ok(Evaluation {
            result,
            classification,
            queried_rules: ctx.queried_rules().cloned().collect(),
        })
    }
}
