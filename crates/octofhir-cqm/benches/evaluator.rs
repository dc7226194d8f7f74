//! Evaluator benchmarks using divan
//!
//! Benchmarks for single-patient and panel evaluation of the bundled measures.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use divan::{Bencher, black_box};
use octofhir_cqm::measures::{cms130v6, cms138v6, standard_catalog};
use octofhir_cqm::types::{ClinicalEvent, EventCategory};
use octofhir_cqm::{EvaluationOptions, InMemoryTimeline, MeasureEngine, Patient, Timeframe, evaluate_panel};
use std::sync::Arc;

fn main() {
    divan::main();
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn engine() -> MeasureEngine {
    MeasureEngine::new(Arc::new(standard_catalog().unwrap()))
        .with_options(EvaluationOptions::new().with_now(at(2024, 12, 31)))
}

fn year_2024() -> Timeframe {
    Timeframe::new(at(2024, 1, 1), at(2024, 12, 31)).unwrap()
}

/// A patient with `noise` unrelated encounters plus one old colonoscopy and a tobacco screening
fn timeline(index: usize, noise: usize) -> InMemoryTimeline {
    let birth = NaiveDate::from_ymd_opt(1950 + (index % 30) as i32, 1 + (index % 12) as u32, 1).unwrap();
    let patient = Patient::new(format!("p{}", index), "Bench").with_birth_date(birth);
    let encounters = (0..noise).map(|i| {
        ClinicalEvent::new(format!("e{}", i), EventCategory::Encounter, at(2015, 1, 1) + Duration::days(i as i64))
            .in_concept("OfficeVisit")
    });
    InMemoryTimeline::new(patient)
        .with_events(encounters)
        .with_event(
            ClinicalEvent::new("colonoscopy", EventCategory::ReferralReport, at(2016, 5, 1))
                .in_concept("Colonoscopy"),
        )
        .with_event(
            ClinicalEvent::new("screening", EventCategory::Interview, at(2024, 2, 1))
                .in_concept("TobaccoUseScreening")
                .in_concept("TobaccoUser"),
        )
}

#[divan::bench(args = [10, 100, 1000])]
fn colorectal_single_patient(bencher: Bencher, noise: usize) {
    let engine = engine();
    let definition = cms130v6().unwrap();
    let timeline = timeline(0, noise);
    let timeframe = year_2024();

    bencher.bench_local(|| black_box(engine.evaluate(&timeline, &timeframe, &definition).unwrap()));
}

#[divan::bench(args = [10, 100, 1000])]
fn tobacco_single_patient(bencher: Bencher, noise: usize) {
    let engine = engine();
    let definition = cms138v6().unwrap();
    let timeline = timeline(0, noise);
    let timeframe = year_2024();

    bencher.bench_local(|| black_box(engine.evaluate(&timeline, &timeframe, &definition).unwrap()));
}

#[divan::bench(args = [100, 1000])]
fn colorectal_panel(bencher: Bencher, patients: usize) {
    let engine = engine();
    let definition = cms130v6().unwrap();
    let panel: Vec<InMemoryTimeline> = (0..patients).map(|i| timeline(i, 20)).collect();
    let timeframe = year_2024();

    bencher.bench_local(|| black_box(evaluate_panel(&engine, &panel, &timeframe, &definition).unwrap()));
}
