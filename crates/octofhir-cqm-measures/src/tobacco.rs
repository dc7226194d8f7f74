//! CMS138v6: Tobacco Use Screening and Cessation Intervention
//!
//! Three sub-populations share one initial population:
//!
//! 1. screened for tobacco use within 24 months
//! 2. identified as a user and given a cessation intervention afterwards
//! 3. both of the above where they apply (the overall rate)
//!
//! The p1 and p2 variants report population 1 or 2 on its own.

use crate::valuesets::{
    ANNUAL_WELLNESS_VISIT, HEALTH_AND_BEHAVIORAL_ASSESSMENT_INITIAL, HEALTH_AND_BEHAVIORAL_ASSESSMENT_REASSESSMENT,
    HEALTH_BEHAVIORAL_ASSESSMENT_INDIVIDUAL, HOME_HEALTHCARE_SERVICES, OCCUPATIONAL_THERAPY_EVALUATION,
    OFFICE_VISIT, OPHTHALMOLOGICAL_SERVICES, PREVENTIVE_ESTABLISHED_OFFICE_VISIT_18_AND_UP,
    PREVENTIVE_GROUP_COUNSELING, PREVENTIVE_INDIVIDUAL_COUNSELING, PREVENTIVE_INITIAL_OFFICE_VISIT_18_AND_UP,
    PREVENTIVE_OTHER, PSYCH_VISIT_DIAGNOSTIC_EVALUATION, PSYCH_VISIT_PSYCHOTHERAPY, PSYCHOANALYSIS,
    SPEECH_AND_HEARING_EVALUATION, TOBACCO_NON_USER, TOBACCO_USE_CESSATION_COUNSELING,
    TOBACCO_USE_CESSATION_PHARMACOTHERAPY, TOBACCO_USE_SCREENING, TOBACCO_USER,
};
use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_eval::{
    AgeAtLeast, AllOf, AnyOf, Criterion, DueNarrative, EvidenceRule, HasEvent, MeasureDefinition,
    MeasureMetadata, PopulationDefinition, Remediation, ReportingOnly, RuleMatched,
};
use octofhir_cqm_model::CodesetRef;
use octofhir_cqm_types::{ActionKind, EventCategory, Lookback, SupportingContext};

pub const CMS138V6: &str = "CMS138v6";
pub const CMS138V6P1: &str = "CMS138v6p1";
pub const CMS138V6P2: &str = "CMS138v6p2";

pub const MINIMUM_AGE: u32 = 18;

pub const POPULATION_1: &str = "population_1";
pub const POPULATION_2: &str = "population_2";
pub const POPULATION_3: &str = "population_3";

pub mod rules {
    pub const SCREENING_NON_USER: &str = "screening_non_user";
    pub const SCREENING_USER: &str = "screening_user";
    pub const CESSATION_COUNSELING: &str = "cessation_counseling";
    pub const CESSATION_MEDICATION: &str = "cessation_medication";
}

const INFORMATION: &str = "https://ecqi.healthit.gov/sites/default/files/ecqm/measures/CMS138v6.html";

/// Which population a tobacco measure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TobaccoVariant {
    /// Overall rate (population 3)
    Combined,
    /// Screening only (population 1)
    Screening,
    /// Cessation intervention only (population 2)
    Cessation,
}

impl TobaccoVariant {
    pub fn id(self) -> &'static str {
        match self {
            Self::Combined => CMS138V6,
            Self::Screening => CMS138V6P1,
            Self::Cessation => CMS138V6P2,
        }
    }

    fn reporting(self) -> &'static str {
        match self {
            Self::Combined => POPULATION_3,
            Self::Screening => POPULATION_1,
            Self::Cessation => POPULATION_2,
        }
    }

    fn metadata(self) -> MeasureMetadata {
        let metadata = match self {
            Self::Combined => MeasureMetadata::new(
                CMS138V6,
                "Preventive Care and Screening: Tobacco Use: Screening and Cessation Intervention",
            )
            .version("2022-01-31v1")
            .description(
                "Patients aged 18 years and older who have not been screened for tobacco use OR who have not \
                 received tobacco cessation intervention if identified as a tobacco user.",
            ),
            Self::Screening => MeasureMetadata::new(CMS138V6P1, "Preventive Care and Screening: Tobacco Use: Screening")
                .version("2019-04-18v1")
                .description("Patients aged 18 years and older who have not been screened for tobacco use in the last year."),
            Self::Cessation => MeasureMetadata::new(
                CMS138V6P2,
                "Preventive Care and Screening: Tobacco Use: Cessation Intervention",
            )
            .version("2019-04-18v1")
            .description(
                "Patients aged 18 years and older, and identified as a tobacco user, who have not received \
                 tobacco cessation intervention such as counselling, referral or medication.",
            ),
        };
        metadata.information(INFORMATION).display_interval_days(365 * 2)
    }

    fn remediation(self, suffix: &str, kind: ActionKind, title: &str, codeset: &str) -> Remediation {
        Remediation::new(format!("{}_RECOMMEND_{}", self.id(), suffix), kind, title).with_context(SupportingContext {
            codeset: Some(codeset.to_string()),
            ..SupportingContext::default()
        })
    }
}

fn preventive_visits() -> CodesetRef {
    CodesetRef::from(ANNUAL_WELLNESS_VISIT)
        | PREVENTIVE_ESTABLISHED_OFFICE_VISIT_18_AND_UP
        | PREVENTIVE_GROUP_COUNSELING
        | PREVENTIVE_OTHER
        | PREVENTIVE_INDIVIDUAL_COUNSELING
        | PREVENTIVE_INITIAL_OFFICE_VISIT_18_AND_UP
}

fn other_visits() -> CodesetRef {
    [
        HEALTH_BEHAVIORAL_ASSESSMENT_INDIVIDUAL,
        HEALTH_AND_BEHAVIORAL_ASSESSMENT_INITIAL,
        HEALTH_AND_BEHAVIORAL_ASSESSMENT_REASSESSMENT,
        HOME_HEALTHCARE_SERVICES,
        OCCUPATIONAL_THERAPY_EVALUATION,
        OFFICE_VISIT,
        OPHTHALMOLOGICAL_SERVICES,
        PSYCH_VISIT_DIAGNOSTIC_EVALUATION,
        PSYCH_VISIT_PSYCHOTHERAPY,
        PSYCHOANALYSIS,
        SPEECH_AND_HEARING_EVALUATION,
    ]
    .into_iter()
    .collect()
}

fn screening_rule(id: &str, answer: &str, narrative: &str) -> EvidenceRule {
    EvidenceRule::new(id, "Tobacco screening", TOBACCO_USE_SCREENING)
        .in_categories([EventCategory::Interview])
        .lookback(Lookback::months(24))
        .qualified_by(answer)
        .narrative(narrative)
}

/// Build one of the CMS138v6 definitions
pub fn tobacco(variant: TobaccoVariant) -> Result<MeasureDefinition, ConfigurationError> {
    let screening_due = DueNarrative::new("{name} should be screened for tobacco use.");
    let screening_due = match variant {
        TobaccoVariant::Combined => screening_due.with_interval(),
        _ => screening_due,
    };

    let mut builder = MeasureDefinition::builder(variant.metadata())
        .initial_population(
            AllOf::new().with(AgeAtLeast::new(MINIMUM_AGE)).with(ReportingOnly::new(
                AnyOf::new()
                    .with(HasEvent::new(preventive_visits(), [EventCategory::Encounter]))
                    .with(HasEvent::new(other_visits(), [EventCategory::Encounter]).at_least(2)),
            )),
        )
        .rule(
            screening_rule(
                rules::SCREENING_NON_USER,
                TOBACCO_NON_USER,
                "{name} had a Tobacco screening {date} and is not a smoker.",
            )
            .remediate(variant.remediation(
                "TOBACCO_USE_SCREENING",
                ActionKind::ScheduleInterview,
                "Complete tobacco use questionnaire",
                TOBACCO_USE_SCREENING,
            )),
        )
        .rule(screening_rule(
            rules::SCREENING_USER,
            TOBACCO_USER,
            "{name} had a Tobacco screening {date} and is a smoker.",
        ))
        .rule(
            EvidenceRule::new(rules::CESSATION_COUNSELING, "smoking cessation counseling", TOBACCO_USE_CESSATION_COUNSELING)
                .in_categories([EventCategory::Instruction])
                .period_adjusted()
                .on_or_after(rules::SCREENING_USER)
                .remediate(variant.remediation(
                    "CESSATION_COUNSELING",
                    ActionKind::Instruct,
                    "Tobacco cessation counseling",
                    TOBACCO_USE_CESSATION_COUNSELING,
                )),
        )
        .rule(
            EvidenceRule::new(rules::CESSATION_MEDICATION, "cessation medication", TOBACCO_USE_CESSATION_PHARMACOTHERAPY)
                .in_categories([EventCategory::Medication])
                .period_adjusted()
                .intersecting()
                .on_or_after_day_of(rules::SCREENING_USER)
                .narrative("{name} has been prescribed cessation medication {date}.")
                .remediate(variant.remediation(
                    "CESSATION_MEDICATION",
                    ActionKind::Prescribe,
                    "Cessation support medication",
                    TOBACCO_USE_CESSATION_PHARMACOTHERAPY,
                )),
        )
        .population(
            PopulationDefinition::evidence(
                POPULATION_1,
                "tobacco use screening",
                [rules::SCREENING_NON_USER, rules::SCREENING_USER],
            )
            .when_due(screening_due),
        )
        .population(
            PopulationDefinition::evidence(
                POPULATION_2,
                "tobacco cessation intervention",
                [rules::CESSATION_COUNSELING, rules::CESSATION_MEDICATION],
            )
            .requires(Criterion::new(
                "tobacco_user",
                "identified as a tobacco user",
                RuleMatched::new(rules::SCREENING_USER, "identified as a tobacco user"),
            ))
            .when_due(DueNarrative::new("{name} is a current tobacco user, intervention is indicated.")),
        );

    if variant == TobaccoVariant::Combined {
        builder = builder.population(PopulationDefinition::composite(
            POPULATION_3,
            "tobacco screening and cessation intervention",
            [POPULATION_1, POPULATION_2],
        ));
    }

    builder
        .reporting(variant.reporting())
        .screening_interval(Lookback::years(2))
        .build()
}

pub fn cms138v6() -> Result<MeasureDefinition, ConfigurationError> {
    tobacco(TobaccoVariant::Combined)
}

pub fn cms138v6p1() -> Result<MeasureDefinition, ConfigurationError> {
    tobacco(TobaccoVariant::Screening)
}

pub fn cms138v6p2() -> Result<MeasureDefinition, ConfigurationError> {
    tobacco(TobaccoVariant::Cessation)
}
