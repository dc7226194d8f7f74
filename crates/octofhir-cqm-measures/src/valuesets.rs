//! Codeset names used by the bundled measures
//!
//! Only names and descriptions are bundled; the code lists themselves come
//! from an external catalog (see [`CodesetCatalog::from_file`]). Events tagged
//! with a codeset name match without any codes.

use octofhir_cqm_diagnostics::ConfigurationError;
use octofhir_cqm_model::CodesetCatalog;
use once_cell::sync::Lazy;

/// Bundled catalog document (embedded at compile time)
pub const STANDARD_CATALOG_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/codesets.json"));

/// Lazily parsed bundled catalog
pub static STANDARD_CATALOG: Lazy<Result<CodesetCatalog, ConfigurationError>> =
    Lazy::new(|| CodesetCatalog::from_json(STANDARD_CATALOG_JSON));

/// Get the bundled codeset catalog.
///
/// Each call returns an independent copy, so callers may extend it.
pub fn standard_catalog() -> Result<CodesetCatalog, ConfigurationError> {
    let shared = STANDARD_CATALOG.as_ref().map_err(Clone::clone)?;
    let catalog = CodesetCatalog::new();
    catalog.extend_from(shared)?;
    Ok(catalog)
}

// Encounters
pub const ANNUAL_WELLNESS_VISIT: &str = "AnnualWellnessVisit";
pub const HEALTH_AND_BEHAVIORAL_ASSESSMENT_INITIAL: &str = "HealthAndBehavioralAssessmentInitial";
pub const HEALTH_AND_BEHAVIORAL_ASSESSMENT_REASSESSMENT: &str = "HealthAndBehavioralAssessmentReassessment";
pub const HEALTH_BEHAVIORAL_ASSESSMENT_INDIVIDUAL: &str = "HealthBehavioralAssessmentIndividual";
pub const HOME_HEALTHCARE_SERVICES: &str = "HomeHealthcareServices";
pub const OCCUPATIONAL_THERAPY_EVALUATION: &str = "OccupationalTherapyEvaluation";
pub const OFFICE_VISIT: &str = "OfficeVisit";
pub const OPHTHALMOLOGICAL_SERVICES: &str = "OphthalmologicalServices";
pub const PREVENTIVE_ESTABLISHED_OFFICE_VISIT_18_AND_UP: &str = "PreventiveCareServicesEstablishedOfficeVisit18AndUp";
pub const PREVENTIVE_GROUP_COUNSELING: &str = "PreventiveCareServicesGroupCounseling";
pub const PREVENTIVE_INDIVIDUAL_COUNSELING: &str = "PreventiveCareServicesIndividualCounseling";
pub const PREVENTIVE_INITIAL_OFFICE_VISIT_18_AND_UP: &str = "PreventiveCareServicesInitialOfficeVisit18AndUp";
pub const PREVENTIVE_OTHER: &str = "PreventiveCareServicesOther";
pub const PSYCHOANALYSIS: &str = "Psychoanalysis";
pub const PSYCH_VISIT_DIAGNOSTIC_EVALUATION: &str = "PsychVisitDiagnosticEvaluation";
pub const PSYCH_VISIT_PSYCHOTHERAPY: &str = "PsychVisitPsychotherapy";
pub const SPEECH_AND_HEARING_EVALUATION: &str = "SpeechAndHearingEvaluation";

// Hospice
pub const HOSPICE_CARE_AMBULATORY: &str = "HospiceCareAmbulatory";
pub const DISCHARGED_TO_HOME_FOR_HOSPICE_CARE: &str = "DischargedToHomeForHospiceCare";
pub const DISCHARGED_TO_FACILITY_FOR_HOSPICE_CARE: &str = "DischargedToHealthCareFacilityForHospiceCare";

// Colorectal cancer screening
pub const FECAL_OCCULT_BLOOD_TEST: &str = "FecalOccultBloodTestFobt";
pub const FIT_DNA: &str = "FitDna";
pub const FLEXIBLE_SIGMOIDOSCOPY: &str = "FlexibleSigmoidoscopy";
pub const CT_COLONOGRAPHY: &str = "CtColonography";
pub const CMS130V6_CT_COLONOGRAPHY: &str = "CMS130v6CtColonography";
pub const COLONOSCOPY: &str = "Colonoscopy";
pub const TOTAL_COLECTOMY: &str = "TotalColectomy";
pub const MALIGNANT_NEOPLASM_OF_COLON: &str = "MalignantNeoplasmOfColon";

// Tobacco use
pub const TOBACCO_USE_SCREENING: &str = "TobaccoUseScreening";
pub const TOBACCO_USER: &str = "TobaccoUser";
pub const TOBACCO_NON_USER: &str = "TobaccoNonUser";
pub const TOBACCO_USE_CESSATION_COUNSELING: &str = "TobaccoUseCessationCounseling";
pub const TOBACCO_USE_CESSATION_PHARMACOTHERAPY: &str = "TobaccoUseCessationPharmacotherapy";
