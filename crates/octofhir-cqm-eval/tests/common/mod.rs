//! Shared helpers for evaluation integration tests

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use octofhir_cqm_eval::{
    AgeBetween, Criterion, DueNarrative, EvaluationOptions, EvidenceRule, HasEvent, MeasureDefinition,
    MeasureEngine, MeasureMetadata, PopulationDefinition, Remediation,
};
use octofhir_cqm_model::{ConceptTagMatcher, InMemoryTimeline, TimelineStore};
use octofhir_cqm_types::{ActionKind, ClinicalEvent, EventCategory, Lookback, Patient, Timeframe};
use parking_lot::Mutex;
use std::sync::Arc;

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn year_2024() -> Timeframe {
    Timeframe::new(at(2024, 1, 1), at(2024, 12, 31)).unwrap()
}

pub fn patient_born(y: i32, m: u32, d: u32) -> Patient {
    Patient::new("p1", "Jane").with_birth_date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

pub fn event(id: &str, category: EventCategory, timestamp: DateTime<Utc>, concept: &str) -> ClinicalEvent {
    ClinicalEvent::new(id, category, timestamp).in_concept(concept)
}

pub fn engine() -> MeasureEngine {
    MeasureEngine::new(Arc::new(ConceptTagMatcher::new()))
        .with_options(EvaluationOptions::new().with_now(at(2024, 12, 31)))
}

/// Timeline store that records every category lookup
#[derive(Debug)]
pub struct CountingTimeline {
    inner: InMemoryTimeline,
    requests: Mutex<Vec<EventCategory>>,
}

impl CountingTimeline {
    pub fn new(inner: InMemoryTimeline) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of lookups of `category` so far
    pub fn requested(&self, category: EventCategory) -> usize {
        self.requests.lock().iter().filter(|c| **c == category).count()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().len()
    }
}

impl TimelineStore for CountingTimeline {
    fn patient(&self) -> &Patient {
        self.inner.patient()
    }

    fn events(&self, category: EventCategory) -> &[ClinicalEvent] {
        self.requests.lock().push(category);
        self.inner.events(category)
    }
}

/// A two-rule screening measure: a lab test valid one year, a referral valid ten
pub fn screening_measure() -> MeasureDefinition {
    MeasureDefinition::builder(MeasureMetadata::new("SCREEN1", "Screening").version("1"))
        .initial_population(AgeBetween::new(50, 75))
        .exclusion(Criterion::new(
            "hospice",
            "in hospice care",
            HasEvent::new("Hospice", [EventCategory::Encounter]),
        ))
        .rule(
            EvidenceRule::new("lab", "Lab test", "LabTest")
                .in_categories([EventCategory::LabReport])
                .remediate(Remediation::new("SCREEN1_LAB", ActionKind::OrderLab, "Order a lab test")),
        )
        .rule(
            EvidenceRule::new("referral", "Referral", "Referral")
                .in_categories([EventCategory::ReferralReport])
                .lookback(Lookback::years(10))
                .remediate(Remediation::new(
                    "SCREEN1_REFERRAL",
                    ActionKind::OrderReferral,
                    "Order a referral",
                )),
        )
        .population(
            PopulationDefinition::evidence("numerator", "a Screening", ["lab", "referral"])
                .when_due(DueNarrative::new("{name} is due for a Screening.").with_history()),
        )
        .build()
        .unwrap()
}
