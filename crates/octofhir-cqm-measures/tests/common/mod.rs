//! Shared helpers for the sample measure scenarios

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use octofhir_cqm_eval::{EvaluationMode, EvaluationOptions, MeasureEngine};
use octofhir_cqm_measures::standard_catalog;
use octofhir_cqm_model::{InMemoryTimeline, TimelineStore};
use octofhir_cqm_types::{ClinicalEvent, EventCategory, Patient, Timeframe};
use parking_lot::Mutex;
use std::sync::Arc;

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn year_2024() -> Timeframe {
    Timeframe::new(at(2024, 1, 1), at(2024, 12, 31)).unwrap()
}

/// Days from the end of 2024 until `instant`
pub fn days_from_period_end(instant: DateTime<Utc>) -> i64 {
    (instant - at(2024, 12, 31)).num_days()
}

pub fn patient_born(y: i32, m: u32, d: u32) -> InMemoryTimeline {
    InMemoryTimeline::new(
        Patient::new("p1", "Jane")
            .with_last_name("Doe")
            .with_birth_date(NaiveDate::from_ymd_opt(y, m, d).unwrap()),
    )
}

pub fn event(id: &str, category: EventCategory, timestamp: DateTime<Utc>, concept: &str) -> ClinicalEvent {
    ClinicalEvent::new(id, category, timestamp).in_concept(concept)
}

fn engine_in(mode: EvaluationMode) -> MeasureEngine {
    MeasureEngine::new(Arc::new(standard_catalog().unwrap()))
        .with_options(EvaluationOptions::new().with_mode(mode).with_now(at(2024, 12, 31)))
}

/// Point-of-care engine backed by the bundled catalog, clock fixed at the end of 2024
pub fn guidance() -> MeasureEngine {
    engine_in(EvaluationMode::Guidance)
}

pub fn report() -> MeasureEngine {
    engine_in(EvaluationMode::Report)
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

    pub fn requested(&self, category: EventCategory) -> usize {
        self.requests.lock().iter().filter(|c| **c == category).count()
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
