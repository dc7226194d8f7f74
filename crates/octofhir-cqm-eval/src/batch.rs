//! Panel evaluation
//!
//! Each patient evaluation is independent, so a panel is evaluated in
//! parallel with `rayon` and no shared mutable state. [`PanelSummary`]
//! aggregates the per-population verdicts into reporting rates.

use crate::definition::MeasureDefinition;
use crate::engine::MeasureEngine;
use crate::error::EvalResult;
use indexmap::IndexMap;
use octofhir_cqm_model::TimelineStore;
use octofhir_cqm_types::{MeasureResult, MeasureStatus, PopulationState, Timeframe};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Result of one patient in a panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientOutcome {
    pub patient_id: String,
    pub result: MeasureResult,
}

/// Evaluate every timeline of a panel in parallel, keeping panel order.
///
/// The first evaluation error aborts the panel; absence of evidence is never an error.
pub fn evaluate_panel<T>(
    engine: &MeasureEngine,
    timelines: &[T],
    timeframe: &Timeframe,
    definition: &MeasureDefinition,
) -> EvalResult<Vec<PatientOutcome>>
where
    T: TimelineStore,
{
    log::debug!("Evaluating {} for a panel of {} patients", definition.id(), timelines.len());
    timelines
        .par_iter()
        .map(|timeline| {
            let result = engine.evaluate(timeline, timeframe, definition)?;
            Ok(PatientOutcome {
                patient_id: timeline.patient().id.clone(),
                result,
            })
        })
        .collect()
}

/// Counts of one sub-population across a panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationCounts {
    pub initial_population: usize,
    pub denominator: usize,
    pub exclusions: usize,
    pub numerator: usize,
}

impl PopulationCounts {
    fn record(&mut self, state: PopulationState) {
        if state.in_initial_population() {
            self.initial_population += 1;
        }
        if state.in_denominator() {
            self.denominator += 1;
        }
        if state == PopulationState::ExcludedFromDenominator {
            self.exclusions += 1;
        }
        if state == PopulationState::InNumerator {
            self.numerator += 1;
        }
    }

    /// Performance rate `numerator / denominator`, `None` for an empty denominator
    pub fn rate(&self) -> Option<f64> {
        if self.denominator == 0 {
            None
        } else {
            Some(self.numerator as f64 / self.denominator as f64)
        }
    }
}

/// Aggregated verdicts of a panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSummary {
    pub patients: usize,
    pub due: usize,
    pub satisfied: usize,
    pub not_applicable: usize,
    pub populations: IndexMap<String, PopulationCounts>,
}

impl PanelSummary {
    pub fn from_outcomes(outcomes: &[PatientOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(&outcome.result);
        }
        summary
    }

    pub fn record(&mut self, result: &MeasureResult) {
        self.patients += 1;
        match result.status {
            MeasureStatus::Due => self.due += 1,
            MeasureStatus::Satisfied => self.satisfied += 1,
            MeasureStatus::NotApplicable => self.not_applicable += 1,
        }
        for (id, state) in &result.populations {
            self.populations.entry(id.clone()).or_default().record(*state);
        }
    }

    pub fn rate(&self, population: &str) -> Option<f64> {
        self.populations.get(population).and_then(PopulationCounts::rate)
    }
}
