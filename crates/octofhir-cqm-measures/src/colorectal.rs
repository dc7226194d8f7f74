//! CMS130v6: Colorectal Cancer Screening
//!
//! Adults 50-75 with a visit during the measurement period are screened when
//! any one of five exams falls inside its own validity window. Exams are
//! searched from the shortest window to the longest.

use crate::valuesets::{
    ANNUAL_WELLNESS_VISIT, CMS130V6_CT_COLONOGRAPHY, COLONOSCOPY, CT_COLONOGRAPHY,
    DISCHARGED_TO_FACILITY_FOR_HOSPICE_CARE, DISCHARGED_TO_HOME_FOR_HOSPICE_CARE, FECAL_OCCULT_BLOOD_TEST,
    FIT_DNA, FLEXIBLE_SIGMOIDOSCOPY, HOME_HEALTHCARE_SERVICES, HOSPICE_CARE_AMBULATORY,
    MALIGNANT_NEOPLASM_OF_COLON, OFFICE_VISIT, PREVENTIVE_ESTABLISHED_OFFICE_VISIT_18_AND_UP,
    PREVENTIVE_INITIAL_OFFICE_VISIT_18_AND_UP, TOTAL_COLECTOMY,
};
use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_eval::{
    AgeBetween, AllOf, Criterion, DueNarrative, EvidenceRule, HasEvent, MeasureDefinition, MeasureMetadata,
    PopulationDefinition, Remediation, ReportingOnly,
};
use octofhir_cqm_model::CodesetRef;
use octofhir_cqm_types::{ActionKind, Coding, EventCategory, Lookback, SupportingContext};

pub const CMS130V6: &str = "CMS130v6";

pub const AGE_RANGE_START: u32 = 50;
pub const AGE_RANGE_END: u32 = 75;

/// Reporting population
pub const NUMERATOR: &str = "numerator";

pub mod rules {
    pub const FOBT: &str = "fobt";
    pub const FIT_DNA: &str = "fit_dna";
    pub const SIGMOIDOSCOPY: &str = "sigmoidoscopy";
    pub const CT_COLONOGRAPHY: &str = "ct_colonography";
    pub const COLONOSCOPY: &str = "colonoscopy";
}

const REPORTS: [EventCategory; 2] = [EventCategory::ReferralReport, EventCategory::ImagingReport];

pub fn metadata() -> MeasureMetadata {
    MeasureMetadata::new(CMS130V6, "Colorectal Cancer Screening")
        .version("2020-02-24v1")
        .description("Adults 50-75 years of age who have not had appropriate screening for colorectal cancer.")
        .information("https://ecqi.healthit.gov/sites/default/files/ecqm/measures/CMS130v6.html")
        .display_interval_days(365 * 10)
}

/// Visits that place a patient in the initial population in report mode
pub fn qualifying_visits() -> CodesetRef {
    CodesetRef::from(OFFICE_VISIT)
        | PREVENTIVE_ESTABLISHED_OFFICE_VISIT_18_AND_UP
        | PREVENTIVE_INITIAL_OFFICE_VISIT_18_AND_UP
        | HOME_HEALTHCARE_SERVICES
        | ANNUAL_WELLNESS_VISIT
}

pub fn hospice_care() -> CodesetRef {
    CodesetRef::from(HOSPICE_CARE_AMBULATORY)
        | DISCHARGED_TO_HOME_FOR_HOSPICE_CARE
        | DISCHARGED_TO_FACILITY_FOR_HOSPICE_CARE
}

fn screening_context(specialty: Option<&str>, codeset: &str) -> SupportingContext {
    SupportingContext {
        conditions: vec![
            Coding::new("ICD-10", "Z1211").with_display("Encounter for screening for malignant neoplasm of colon"),
        ],
        specialties: specialty.into_iter().map(str::to_string).collect(),
        codeset: Some(codeset.to_string()),
    }
}

fn remediation(suffix: &str, kind: ActionKind, exam: &str, specialty: Option<&str>, codeset: &str) -> Remediation {
    Remediation::new(format!("{}_RECOMMEND_{}", CMS130V6, suffix), kind, format!("Order a {}", exam))
        .with_context(screening_context(specialty, codeset))
}

/// Build the CMS130v6 definition
pub fn cms130v6() -> Result<MeasureDefinition, ConfigurationError> {
    MeasureDefinition::builder(metadata())
        .initial_population(
            AllOf::new()
                .with(AgeBetween::new(AGE_RANGE_START, AGE_RANGE_END))
                .with(ReportingOnly::new(HasEvent::new(qualifying_visits(), [EventCategory::Encounter]))),
        )
        .exclusion(Criterion::new(
            "hospice",
            "in hospice care during the measurement period",
            HasEvent::new(hospice_care(), [EventCategory::Encounter]).intersecting(),
        ))
        .exclusion(Criterion::new(
            "colon_exclusion",
            "history of total colectomy or colorectal cancer",
            HasEvent::new(CodesetRef::from(TOTAL_COLECTOMY) | MALIGNANT_NEOPLASM_OF_COLON, [EventCategory::Condition])
                .intersecting(),
        ))
        .rule(
            EvidenceRule::new(rules::FOBT, "FOBT", FECAL_OCCULT_BLOOD_TEST)
                .in_categories([EventCategory::LabReport])
                .remediate(remediation("FOBT", ActionKind::OrderLab, "FOBT", None, FECAL_OCCULT_BLOOD_TEST)),
        )
        .rule(
            EvidenceRule::new(rules::FIT_DNA, "FIT-DNA", FIT_DNA)
                .in_categories([EventCategory::LabReport])
                .lookback(Lookback::years(3))
                .remediate(remediation("FITDNA", ActionKind::OrderLab, "FIT-DNA", None, FIT_DNA)),
        )
        .rule(
            EvidenceRule::new(rules::SIGMOIDOSCOPY, "Flexible sigmoidoscopy", FLEXIBLE_SIGMOIDOSCOPY)
                .in_categories(REPORTS)
                .lookback(Lookback::years(5))
                .remediate(remediation(
                    "SIGMOIDOSCOPY",
                    ActionKind::OrderReferral,
                    "Flexible sigmoidoscopy",
                    Some("Gastroenterology"),
                    FLEXIBLE_SIGMOIDOSCOPY,
                )),
        )
        .rule(
            EvidenceRule::new(
                rules::CT_COLONOGRAPHY,
                "CT Colonography",
                CodesetRef::from(CT_COLONOGRAPHY) | CMS130V6_CT_COLONOGRAPHY,
            )
            .in_categories(REPORTS)
            .lookback(Lookback::years(5))
            .remediate(remediation(
                "COLONOGRAPHY",
                ActionKind::OrderImaging,
                "CT Colonography",
                Some("Radiology"),
                CT_COLONOGRAPHY,
            )),
        )
        .rule(
            EvidenceRule::new(rules::COLONOSCOPY, "Colonoscopy", COLONOSCOPY)
                .in_categories(REPORTS)
                .lookback(Lookback::years(10))
                .remediate(remediation(
                    "COLONOSCOPY",
                    ActionKind::OrderReferral,
                    "Colonoscopy",
                    Some("Gastroenterology"),
                    COLONOSCOPY,
                )),
        )
        .population(
            PopulationDefinition::evidence(
                NUMERATOR,
                "a Colorectal Cancer Screening",
                [
                    rules::FOBT,
                    rules::FIT_DNA,
                    rules::SIGMOIDOSCOPY,
                    rules::CT_COLONOGRAPHY,
                    rules::COLONOSCOPY,
                ],
            )
            .when_due(
                DueNarrative::new("{name} is due for a Colorectal Cancer Screening.")
                    .with_history()
                    .with_interval(),
            ),
        )
        .screening_interval(Lookback::years(10))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuesets::standard_catalog;

    #[test]
    fn test_definition_is_valid_against_standard_catalog() {
        let definition = cms130v6().unwrap();
        definition.validate(&standard_catalog().unwrap()).unwrap();
        assert_eq!(definition.rules.len(), 5);
        assert_eq!(definition.reporting.as_str(), NUMERATOR);
    }

    #[test]
    fn test_recommendation_keys() {
        let definition = cms130v6().unwrap();
        let keys: Vec<&str> = definition
            .rules
            .values()
            .filter_map(|rule| rule.remediation.as_ref())
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(
            keys,
            [
                "CMS130v6_RECOMMEND_FOBT",
                "CMS130v6_RECOMMEND_FITDNA",
                "CMS130v6_RECOMMEND_SIGMOIDOSCOPY",
                "CMS130v6_RECOMMEND_COLONOGRAPHY",
                "CMS130v6_RECOMMEND_COLONOSCOPY",
            ]
        );
    }
}
