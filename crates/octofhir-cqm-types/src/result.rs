//! Evaluation output handed to reporting and UI collaborators

use crate::event::Coding;
use crate::population::PopulationState;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall verdict of a measure for one patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasureStatus {
    Due,
    Satisfied,
    NotApplicable,
}

impl fmt::Display for MeasureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureStatus::Due => write!(f, "DUE"),
            MeasureStatus::Satisfied => write!(f, "SATISFIED"),
            MeasureStatus::NotApplicable => write!(f, "NOT_APPLICABLE"),
        }
    }
}

/// Kind of remediation a recommendation proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    OrderLab,
    OrderImaging,
    OrderReferral,
    Prescribe,
    ScheduleInterview,
    Instruct,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::OrderLab => "order-lab",
            ActionKind::OrderImaging => "order-imaging",
            ActionKind::OrderReferral => "order-referral",
            ActionKind::Prescribe => "prescribe",
            ActionKind::ScheduleInterview => "schedule-interview",
            ActionKind::Instruct => "instruct",
        };
        f.write_str(s)
    }
}

/// Clinical context attached to a recommendation so the caller can prefill an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Coding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specialties: Vec<String>,
    /// Codeset the ordered item should be chosen from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codeset: Option<String>,
}

impl SupportingContext {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.specialties.is_empty() && self.codeset.is_none()
    }
}

/// A ranked remediation step for a patient who is due
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// 1-based; lower is preferred
    pub rank: u32,
    pub key: String,
    pub kind: ActionKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "SupportingContext::is_empty")]
    pub context: SupportingContext,
}

/// Result of evaluating one measure for one patient and timeframe.
///
/// Plain data: created fresh per evaluation and safe to render or persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureResult {
    pub status: MeasureStatus,
    /// Days until the evidence expires (`Satisfied`), `-1` when due now,
    /// days until first eligible or `None` (`NotApplicable`)
    pub due_in: Option<i64>,
    pub narrative: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    /// Final state of every named sub-population, in declaration order
    #[serde(default)]
    pub populations: IndexMap<String, PopulationState>,
}

impl MeasureResult {
    pub fn new(status: MeasureStatus) -> Self {
        Self {
            status,
            due_in: None,
            narrative: Vec::new(),
            recommendations: Vec::new(),
            populations: IndexMap::new(),
        }
    }

    pub fn with_due_in(mut self, due_in: Option<i64>) -> Self {
        self.due_in = due_in;
        self
    }

    pub fn add_narrative(&mut self, line: impl Into<String>) {
        self.narrative.push(line.into());
    }

    pub fn add_recommendation(&mut self, recommendation: Recommendation) {
        self.recommendations.push(recommendation);
    }

    pub fn is_due(&self) -> bool {
        self.status == MeasureStatus::Due
    }

    pub fn is_satisfied(&self) -> bool {
        self.status == MeasureStatus::Satisfied
    }

    pub fn population(&self, id: &str) -> Option<PopulationState> {
        self.populations.get(id).copied()
    }
}
