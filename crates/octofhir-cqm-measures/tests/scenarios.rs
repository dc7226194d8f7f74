//! End-to-end scenarios for the bundled measures

mod common;

use chrono::{TimeZone, Utc};
use common::{CountingTimeline, at, days_from_period_end, event, guidance, patient_born, report, year_2024};
use octofhir_cqm_eval::{DUE_NOW, RuleId};
use octofhir_cqm_measures::colorectal::{self, cms130v6};
use octofhir_cqm_measures::tobacco::{self, cms138v6, cms138v6p1, cms138v6p2};
use octofhir_cqm_measures::valuesets::{
    ANNUAL_WELLNESS_VISIT, COLONOSCOPY, FECAL_OCCULT_BLOOD_TEST, HOSPICE_CARE_AMBULATORY,
    MALIGNANT_NEOPLASM_OF_COLON, OFFICE_VISIT, TOBACCO_NON_USER, TOBACCO_USE_CESSATION_COUNSELING,
    TOBACCO_USE_CESSATION_PHARMACOTHERAPY, TOBACCO_USE_SCREENING, TOBACCO_USER, TOTAL_COLECTOMY,
};
use octofhir_cqm_model::InMemoryTimeline;
use octofhir_cqm_types::{ClinicalEvent, EventCategory, MeasureStatus, PopulationState};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn screening(month: u32, answer: &str) -> ClinicalEvent {
    event("screening", EventCategory::Interview, at(2024, month, 1), TOBACCO_USE_SCREENING).in_concept(answer)
}

fn keys(result: &octofhir_cqm_types::MeasureResult) -> Vec<&str> {
    result.recommendations.iter().map(|r| r.key.as_str()).collect()
}

// Colorectal cancer screening

#[test]
fn test_recent_colonoscopy_satisfies() {
    let timeline = patient_born(1972, 3, 10).with_event(event(
        "colonoscopy",
        EventCategory::ReferralReport,
        at(2021, 12, 31),
        COLONOSCOPY,
    ));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Satisfied);
    assert_eq!(result.due_in, Some(days_from_period_end(at(2031, 12, 31))));
    assert_eq!(result.narrative, vec!["Jane had a Colonoscopy on 2021-12-31.".to_string()]);
    assert_eq!(result.population(colorectal::NUMERATOR), Some(PopulationState::InNumerator));
}

#[test]
fn test_shortest_window_exam_is_cited_without_searching_reports() {
    let timeline = CountingTimeline::new(
        patient_born(1960, 1, 1)
            .with_event(event("fobt", EventCategory::LabReport, at(2024, 2, 1), FECAL_OCCULT_BLOOD_TEST))
            .with_event(event("colonoscopy", EventCategory::ReferralReport, at(2020, 1, 1), COLONOSCOPY)),
    );
    let result = guidance().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.narrative, vec!["Jane had a FOBT on 2024-02-01.".to_string()]);
    // One reporting period (365 days) after the test
    assert_eq!(result.due_in, Some(days_from_period_end(at(2025, 1, 31))));
    assert_eq!(timeline.requested(EventCategory::ReferralReport), 0);
    assert_eq!(timeline.requested(EventCategory::ImagingReport), 0);
}

#[rstest]
#[case::colectomy(EventCategory::Condition, at(2015, 4, 2), TOTAL_COLECTOMY, "history of total colectomy or colorectal cancer")]
#[case::cancer(EventCategory::Condition, at(2019, 9, 1), MALIGNANT_NEOPLASM_OF_COLON, "history of total colectomy or colorectal cancer")]
#[case::hospice(EventCategory::Encounter, at(2024, 6, 1), HOSPICE_CARE_AMBULATORY, "in hospice care during the measurement period")]
fn test_exclusions_make_measure_not_applicable(
    #[case] category: EventCategory,
    #[case] timestamp: chrono::DateTime<chrono::Utc>,
    #[case] concept: &str,
    #[case] reason: &str,
) {
    let timeline = patient_born(1960, 1, 1).with_event(event("exclusion", category, timestamp, concept));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.due_in, None);
    assert_eq!(result.narrative, vec![format!("Jane is excluded: {}.", reason)]);
    assert_eq!(
        result.population(colorectal::NUMERATOR),
        Some(PopulationState::ExcludedFromDenominator)
    );
}

#[test]
fn test_too_young_reports_days_until_eligible() {
    let timeline = patient_born(1975, 6, 15);
    let result = guidance().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.population(colorectal::NUMERATOR), Some(PopulationState::NotInInitial));
    assert_eq!(result.due_in, Some(days_from_period_end(at(2025, 6, 15))));
}

#[test]
fn test_too_young_without_visits_in_report_mode_reports_days_until_eligible() {
    let timeline = patient_born(1975, 6, 15);
    let result = report().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.due_in, Some(days_from_period_end(at(2025, 6, 15))));
    assert_eq!(result.due_in, Some(166));
}

#[test]
fn test_eligible_age_without_visits_in_report_mode_has_no_first_due_date() {
    let timeline = patient_born(1960, 1, 1);
    let result = report().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.due_in, None);
}

#[test]
fn test_too_young_with_exclusion_has_no_first_due_date() {
    let timeline = patient_born(1975, 6, 15).with_event(event(
        "colectomy",
        EventCategory::Condition,
        at(2015, 4, 2),
        TOTAL_COLECTOMY,
    ));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.due_in, None);
}

#[test]
fn test_expired_colonoscopy_is_due_with_history() {
    let timeline = patient_born(1960, 1, 1).with_event(event(
        "colonoscopy",
        EventCategory::ImagingReport,
        at(2012, 5, 1),
        COLONOSCOPY,
    ));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms130v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Due);
    assert_eq!(result.due_in, Some(DUE_NOW));
    assert_eq!(
        result.narrative,
        vec![
            "Jane is due for a Colorectal Cancer Screening.".to_string(),
            "Last Colonoscopy done on 2012-05-01.".to_string(),
            "Current screening interval 10 years.".to_string(),
        ]
    );
    assert_eq!(
        keys(&result),
        vec![
            "CMS130v6_RECOMMEND_FOBT",
            "CMS130v6_RECOMMEND_FITDNA",
            "CMS130v6_RECOMMEND_SIGMOIDOSCOPY",
            "CMS130v6_RECOMMEND_COLONOGRAPHY",
            "CMS130v6_RECOMMEND_COLONOSCOPY",
        ]
    );
    let ranks: Vec<u32> = result.recommendations.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    assert_eq!(result.recommendations[4].context.specialties, vec!["Gastroenterology".to_string()]);
}

#[rstest]
#[case::no_visit(None, MeasureStatus::NotApplicable)]
#[case::office_visit(Some(OFFICE_VISIT), MeasureStatus::Due)]
#[case::wellness_visit(Some(ANNUAL_WELLNESS_VISIT), MeasureStatus::Due)]
fn test_report_mode_requires_a_visit(#[case] visit: Option<&str>, #[case] expected: MeasureStatus) {
    let mut timeline = patient_born(1960, 1, 1);
    if let Some(visit) = visit {
        timeline.push(event("visit", EventCategory::Encounter, at(2024, 7, 1), visit));
    }
    let definition = cms130v6().unwrap();

    assert_eq!(report().evaluate(&timeline, &year_2024(), &definition).unwrap().status, expected);
    assert_eq!(
        guidance().evaluate(&timeline, &year_2024(), &definition).unwrap().status,
        MeasureStatus::Due
    );
}

// Tobacco screening and cessation

#[test]
fn test_current_user_without_intervention_is_due() {
    let timeline = patient_born(1984, 2, 2).with_event(screening(3, TOBACCO_USER));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Due);
    assert_eq!(result.due_in, Some(DUE_NOW));
    assert_eq!(
        result.narrative,
        vec!["Jane is a current tobacco user, intervention is indicated.".to_string()]
    );
    assert_eq!(
        keys(&result),
        vec![
            "CMS138v6_RECOMMEND_CESSATION_COUNSELING",
            "CMS138v6_RECOMMEND_CESSATION_MEDICATION",
        ]
    );
    assert_eq!(result.population(tobacco::POPULATION_1), Some(PopulationState::InNumerator));
    assert_eq!(result.population(tobacco::POPULATION_2), Some(PopulationState::NotInNumerator));
    assert_eq!(result.population(tobacco::POPULATION_3), Some(PopulationState::NotInNumerator));
}

#[test]
fn test_non_user_is_satisfied_without_intervention_lookups() {
    let timeline = CountingTimeline::new(patient_born(1984, 2, 2).with_event(screening(3, TOBACCO_NON_USER)));
    let evaluation = guidance()
        .evaluate_detailed(&timeline, &year_2024(), &cms138v6().unwrap())
        .unwrap();
    let result = &evaluation.result;

    assert_eq!(result.status, MeasureStatus::Satisfied);
    assert_eq!(
        result.narrative,
        vec!["Jane had a Tobacco screening on 2024-03-01 and is not a smoker.".to_string()]
    );
    assert_eq!(result.due_in, Some(days_from_period_end(at(2026, 3, 1))));
    assert_eq!(
        result.population(tobacco::POPULATION_2),
        Some(PopulationState::ExcludedFromDenominator)
    );
    assert_eq!(result.population(tobacco::POPULATION_3), Some(PopulationState::InNumerator));

    assert_eq!(timeline.requested(EventCategory::Instruction), 0);
    assert_eq!(timeline.requested(EventCategory::Medication), 0);
    assert!(!evaluation.queried_rules.contains(&RuleId::new(tobacco::rules::CESSATION_COUNSELING)));
    assert!(!evaluation.queried_rules.contains(&RuleId::new(tobacco::rules::CESSATION_MEDICATION)));
}

#[test]
fn test_unscreened_patient_is_due_for_screening() {
    let timeline = patient_born(1984, 2, 2);
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Due);
    assert_eq!(
        result.narrative,
        vec![
            "Jane should be screened for tobacco use.".to_string(),
            "Current screening interval 2 years.".to_string(),
        ]
    );
    assert_eq!(keys(&result), vec!["CMS138v6_RECOMMEND_TOBACCO_USE_SCREENING"]);
}

#[test]
fn test_counseling_after_screening_satisfies_user() {
    let timeline = patient_born(1984, 2, 2)
        .with_event(screening(3, TOBACCO_USER))
        .with_event(event(
            "counseling",
            EventCategory::Instruction,
            at(2024, 4, 1),
            TOBACCO_USE_CESSATION_COUNSELING,
        ));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Satisfied);
    assert_eq!(
        result.narrative,
        vec![
            "Jane had a Tobacco screening on 2024-03-01 and is a smoker.".to_string(),
            "Jane had a smoking cessation counseling on 2024-04-01.".to_string(),
        ]
    );
    assert_eq!(result.due_in, Some(days_from_period_end(at(2025, 4, 1))));
}

#[test]
fn test_counseling_before_screening_does_not_count() {
    let timeline = patient_born(1984, 2, 2)
        .with_event(event(
            "counseling",
            EventCategory::Instruction,
            at(2024, 2, 1),
            TOBACCO_USE_CESSATION_COUNSELING,
        ))
        .with_event(screening(3, TOBACCO_USER));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Due);
}

#[test]
fn test_medication_course_after_screening_satisfies_user() {
    let timeline = patient_born(1984, 2, 2).with_event(screening(3, TOBACCO_USER)).with_event(
        event(
            "varenicline",
            EventCategory::Medication,
            at(2024, 5, 1),
            TOBACCO_USE_CESSATION_PHARMACOTHERAPY,
        )
        .ended(at(2024, 8, 1)),
    );
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Satisfied);
    assert_eq!(
        result.narrative[1],
        "Jane has been prescribed cessation medication on 2024-05-01."
    );
}

#[test]
fn test_medication_started_earlier_on_screening_day_counts() {
    let screened = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
    let prescribed = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let timeline = patient_born(1984, 2, 2)
        .with_event(
            event("screening", EventCategory::Interview, screened, TOBACCO_USE_SCREENING).in_concept(TOBACCO_USER),
        )
        .with_event(
            event("varenicline", EventCategory::Medication, prescribed, TOBACCO_USE_CESSATION_PHARMACOTHERAPY)
                .ended(at(2024, 6, 1)),
        );
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Satisfied);
    assert_eq!(result.population(tobacco::POPULATION_2), Some(PopulationState::InNumerator));
}

#[test]
fn test_counseling_earlier_on_screening_day_does_not_count() {
    let screened = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
    let counseled = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let timeline = patient_born(1984, 2, 2)
        .with_event(
            event("screening", EventCategory::Interview, screened, TOBACCO_USE_SCREENING).in_concept(TOBACCO_USER),
        )
        .with_event(event("counseling", EventCategory::Instruction, counseled, TOBACCO_USE_CESSATION_COUNSELING));
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::Due);
    assert_eq!(result.population(tobacco::POPULATION_2), Some(PopulationState::NotInNumerator));
}

#[test]
fn test_single_population_variants() {
    let user = patient_born(1984, 2, 2).with_event(screening(3, TOBACCO_USER));
    let non_user = patient_born(1984, 2, 2).with_event(screening(3, TOBACCO_NON_USER));

    let screening_only = guidance().evaluate(&user, &year_2024(), &cms138v6p1().unwrap()).unwrap();
    assert_eq!(screening_only.status, MeasureStatus::Satisfied);

    let cessation_only = guidance().evaluate(&user, &year_2024(), &cms138v6p2().unwrap()).unwrap();
    assert_eq!(cessation_only.status, MeasureStatus::Due);
    assert_eq!(
        keys(&cessation_only),
        vec![
            "CMS138v6p2_RECOMMEND_CESSATION_COUNSELING",
            "CMS138v6p2_RECOMMEND_CESSATION_MEDICATION",
        ]
    );

    let not_a_user = guidance().evaluate(&non_user, &year_2024(), &cms138v6p2().unwrap()).unwrap();
    assert_eq!(not_a_user.status, MeasureStatus::NotApplicable);
    assert_eq!(
        not_a_user.narrative,
        vec!["Jane is excluded: not identified as a tobacco user.".to_string()]
    );
}

#[rstest]
#[case::one_office_visit(&[OFFICE_VISIT], MeasureStatus::NotApplicable)]
#[case::two_office_visits(&[OFFICE_VISIT, OFFICE_VISIT], MeasureStatus::Due)]
#[case::one_preventive_visit(&[ANNUAL_WELLNESS_VISIT], MeasureStatus::Due)]
fn test_tobacco_report_mode_visit_counts(#[case] visits: &[&str], #[case] expected: MeasureStatus) {
    let timeline = visits.iter().enumerate().fold(patient_born(1984, 2, 2), |timeline, (i, visit)| {
        timeline.with_event(event(
            &format!("visit-{}", i),
            EventCategory::Encounter,
            at(2024, 3 + i as u32, 1),
            visit,
        ))
    });
    let result = report().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, expected);
}

#[test]
fn test_adolescent_is_not_applicable() {
    let timeline: InMemoryTimeline = patient_born(2010, 1, 1);
    let result = guidance().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.due_in, Some(days_from_period_end(at(2028, 1, 1))));
}

#[test]
fn test_adolescent_without_visits_in_report_mode_reports_days_until_eligible() {
    let timeline: InMemoryTimeline = patient_born(2010, 1, 1);
    let result = report().evaluate(&timeline, &year_2024(), &cms138v6().unwrap()).unwrap();

    assert_eq!(result.status, MeasureStatus::NotApplicable);
    assert_eq!(result.due_in, Some(days_from_period_end(at(2028, 1, 1))));
}
