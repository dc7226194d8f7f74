//! Evidence resolution through the engine
//!
//! Covers priority short-circuiting, window boundaries, tie-breaking,
//! anchors, qualifiers and the per-evaluation memo cache.

mod common;

use common::{CountingTimeline, at, engine, event, patient_born, screening_measure, year_2024};
use octofhir_cqm_eval::{
    AgeAtLeast, Criterion, EvidenceRule, MeasureDefinition, MeasureMetadata, PopulationDefinition, RuleId,
    RuleMatched,
};
use octofhir_cqm_model::InMemoryTimeline;
use octofhir_cqm_types::{EventCategory, Lookback, MeasureStatus, PopulationId, PopulationState};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn timeline() -> InMemoryTimeline {
    InMemoryTimeline::new(patient_born(1970, 6, 1))
}

#[test]
fn test_higher_priority_match_short_circuits_lower_rules() {
    let store = CountingTimeline::new(
        timeline()
            .with_event(event("lab-1", EventCategory::LabReport, at(2024, 5, 1), "LabTest"))
            .with_event(event("ref-1", EventCategory::ReferralReport, at(2020, 3, 1), "Referral")),
    );
    let evaluation = engine()
        .evaluate_detailed(&store, &year_2024(), &screening_measure())
        .unwrap();

    assert_eq!(evaluation.result.status, MeasureStatus::Satisfied);
    assert_eq!(evaluation.result.due_in, Some(121));
    assert_eq!(evaluation.result.narrative, vec!["Jane had a Lab test on 2024-05-01.".to_string()]);
    assert_eq!(store.requested(EventCategory::ReferralReport), 0);
    assert_eq!(evaluation.queried_rules, vec![RuleId::new("lab")]);
}

#[test]
fn test_falls_back_to_lower_priority_rule() {
    let store = CountingTimeline::new(
        timeline().with_event(event("ref-1", EventCategory::ReferralReport, at(2020, 3, 1), "Referral")),
    );
    let result = engine().evaluate(&store, &year_2024(), &screening_measure()).unwrap();

    assert_eq!(result.status, MeasureStatus::Satisfied);
    // Ten years after 2020-03-01
    assert_eq!(result.due_in, Some((at(2030, 3, 1) - at(2024, 12, 31)).num_days()));
    assert_eq!(store.requested(EventCategory::LabReport), 1);
    assert_eq!(store.requested(EventCategory::ReferralReport), 1);
}

#[rstest]
#[case::at_period_end(at(2024, 12, 31), MeasureStatus::Satisfied)]
#[case::at_lookback_start(at(2014, 12, 31), MeasureStatus::Satisfied)]
#[case::before_lookback_start(at(2014, 12, 30), MeasureStatus::Due)]
#[case::after_period_end(at(2025, 1, 1), MeasureStatus::Due)]
fn test_window_bounds_are_inclusive(#[case] timestamp: chrono::DateTime<chrono::Utc>, #[case] expected: MeasureStatus) {
    let store = timeline().with_event(event("ref-1", EventCategory::ReferralReport, timestamp, "Referral"));
    let result = engine().evaluate(&store, &year_2024(), &screening_measure()).unwrap();
    assert_eq!(result.status, expected);
}

#[test]
fn test_same_timestamp_tie_prefers_last_inserted() {
    let store = timeline()
        .with_event(event("ref-a", EventCategory::ReferralReport, at(2022, 2, 2), "Referral"))
        .with_event(event("ref-b", EventCategory::ReferralReport, at(2022, 2, 2), "Referral"))
        .with_event(event("ref-old", EventCategory::ReferralReport, at(2019, 1, 1), "Referral"));
    let evaluation = engine()
        .evaluate_detailed(&store, &year_2024(), &screening_measure())
        .unwrap();

    let numerator = evaluation.classification.get(&PopulationId::new("numerator")).unwrap();
    assert_eq!(numerator.evidence().map(|e| e.event.id.as_str()), Some("ref-b"));
}

#[test]
fn test_due_cites_history_and_ranks_recommendations() {
    let store = timeline().with_event(event("ref-1", EventCategory::ReferralReport, at(2010, 3, 1), "Referral"));
    let result = engine().evaluate(&store, &year_2024(), &screening_measure()).unwrap();

    assert_eq!(result.status, MeasureStatus::Due);
    assert_eq!(result.due_in, Some(-1));
    assert_eq!(
        result.narrative,
        vec![
            "Jane is due for a Screening.".to_string(),
            "Last Referral done on 2010-03-01.".to_string(),
        ]
    );
    let ranked: Vec<(u32, &str)> = result
        .recommendations
        .iter()
        .map(|r| (r.rank, r.key.as_str()))
        .collect();
    assert_eq!(ranked, vec![(1, "SCREEN1_LAB"), (2, "SCREEN1_REFERRAL")]);
    assert_eq!(result.population("numerator"), Some(PopulationState::NotInNumerator));
}

#[test]
fn test_due_without_any_history() {
    let result = engine().evaluate(&timeline(), &year_2024(), &screening_measure()).unwrap();
    assert_eq!(result.narrative[1], "No relevant exams found.");
}

#[test]
fn test_global_period_adjustment_ignores_lookbacks() {
    let store = timeline().with_event(event("ref-1", EventCategory::ReferralReport, at(2020, 3, 1), "Referral"));
    let engine = engine();
    let adjusted = engine
        .clone()
        .with_options(engine.options().with_period_adjustment(true));

    let result = adjusted.evaluate(&store, &year_2024(), &screening_measure()).unwrap();
    assert_eq!(result.status, MeasureStatus::Due);
}

fn anchored_measure() -> MeasureDefinition {
    MeasureDefinition::builder(MeasureMetadata::new("ANCHOR1", "Anchored"))
        .initial_population(AgeAtLeast::new(18))
        .rule(
            EvidenceRule::new("user", "Screening", "Screening")
                .in_categories([EventCategory::Interview])
                .lookback(Lookback::months(24))
                .qualified_by("User"),
        )
        .rule(
            EvidenceRule::new("counseling", "Counseling", "Counseling")
                .in_categories([EventCategory::Instruction])
                .period_adjusted()
                .on_or_after("user"),
        )
        .population(PopulationDefinition::evidence("screened", "screening", ["user"]))
        .population(
            PopulationDefinition::evidence("treated", "treatment", ["counseling"])
                .requires(Criterion::new("user", "a current user", RuleMatched::new("user", "a current user"))),
        )
        .reporting("treated")
        .build()
        .unwrap()
}

fn screening(id: &str, timestamp: chrono::DateTime<chrono::Utc>, answer: &str) -> octofhir_cqm_types::ClinicalEvent {
    event(id, EventCategory::Interview, timestamp, "Screening").in_concept(answer)
}

#[test]
fn test_anchor_requires_evidence_on_or_after_anchor_event() {
    let store = timeline()
        .with_event(screening("s1", at(2024, 6, 1), "User"))
        .with_event(event("c-before", EventCategory::Instruction, at(2024, 3, 1), "Counseling"));
    let result = engine().evaluate(&store, &year_2024(), &anchored_measure()).unwrap();
    assert_eq!(result.status, MeasureStatus::Due);

    let store = store.with_event(event("c-same-day", EventCategory::Instruction, at(2024, 6, 1), "Counseling"));
    let result = engine().evaluate(&store, &year_2024(), &anchored_measure()).unwrap();
    assert_eq!(result.status, MeasureStatus::Satisfied);
}

#[test]
fn test_qualifier_only_checks_latest_event() {
    let store = timeline()
        .with_event(screening("s1", at(2023, 6, 1), "User"))
        .with_event(screening("s2", at(2024, 6, 1), "NonUser"))
        .with_event(event("c1", EventCategory::Instruction, at(2024, 7, 1), "Counseling"));
    let evaluation = engine()
        .evaluate_detailed(&store, &year_2024(), &anchored_measure())
        .unwrap();

    assert_eq!(evaluation.result.status, MeasureStatus::NotApplicable);
    assert_eq!(
        evaluation.result.population("treated"),
        Some(PopulationState::ExcludedFromDenominator)
    );
    assert!(!evaluation.queried_rules.contains(&RuleId::new("counseling")));
}

#[test]
fn test_rule_searched_once_per_evaluation() {
    let store = CountingTimeline::new(
        timeline()
            .with_event(screening("s1", at(2024, 6, 1), "User"))
            .with_event(event("c1", EventCategory::Instruction, at(2024, 7, 1), "Counseling")),
    );
    let evaluation = engine()
        .evaluate_detailed(&store, &year_2024(), &anchored_measure())
        .unwrap();

    assert_eq!(evaluation.result.status, MeasureStatus::Satisfied);
    assert_eq!(store.requested(EventCategory::Interview), 1);
    assert_eq!(
        evaluation.queried_rules,
        vec![RuleId::new("user"), RuleId::new("counseling")]
    );
}

#[test]
fn test_missing_birth_date_is_not_applicable_with_reason() {
    let store = InMemoryTimeline::new(octofhir_cqm_types::Patient::new("p2", "Sam"));
    let result = engine().evaluate(&store, &year_2024(), &screening_measure()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.due_in, None);
    assert_eq!(
        result.narrative,
        vec!["Sam: eligibility could not be determined (birth date is unknown).".to_string()]
    );
    assert_eq!(result.population("numerator"), Some(PopulationState::NotInInitial));
}

#[test]
fn test_measure_exclusion_names_reason() {
    let store = timeline().with_event(event("h1", EventCategory::Encounter, at(2024, 2, 1), "Hospice"));
    let result = engine().evaluate(&store, &year_2024(), &screening_measure()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.narrative, vec!["Jane is excluded: in hospice care.".to_string()]);
    assert!(result.recommendations.is_empty());
}
