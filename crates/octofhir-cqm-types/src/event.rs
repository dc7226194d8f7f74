//! Clinical events on a patient timeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Category of a clinical event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    LabReport,
    ImagingReport,
    ReferralReport,
    Medication,
    Interview,
    Encounter,
    Instruction,
    Condition,
}

impl EventCategory {
    pub const ALL: [EventCategory; 8] = [
        EventCategory::LabReport,
        EventCategory::ImagingReport,
        EventCategory::ReferralReport,
        EventCategory::Medication,
        EventCategory::Interview,
        EventCategory::Encounter,
        EventCategory::Instruction,
        EventCategory::Condition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LabReport => "lab_report",
            Self::ImagingReport => "imaging_report",
            Self::ReferralReport => "referral_report",
            Self::Medication => "medication",
            Self::Interview => "interview",
            Self::Encounter => "encounter",
            Self::Instruction => "instruction",
            Self::Condition => "condition",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identifier of an event within its timeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A code from a terminology system
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            code: code.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// An immutable record on a patient timeline.
///
/// `timestamp` is the effective/occurred instant. Events with a duration
/// (active conditions, medication courses, hospice stays) also carry
/// `ended_at`; `None` there means still ongoing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalEvent {
    pub id: EventId,
    pub category: EventCategory,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub codes: SmallVec<[Coding; 2]>,
    /// Codesets the event is already known to belong to
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub concepts: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl ClinicalEvent {
    pub fn new(id: impl Into<String>, category: EventCategory, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(id),
            category,
            timestamp,
            ended_at: None,
            codes: SmallVec::new(),
            concepts: BTreeSet::new(),
            display: None,
        }
    }

    /// Tag the event as a member of a codeset
    pub fn in_concept(mut self, codeset: impl Into<String>) -> Self {
        self.concepts.insert(codeset.into());
        self
    }

    pub fn with_code(mut self, coding: Coding) -> Self {
        self.codes.push(coding);
        self
    }

    pub fn ended(mut self, ended_at: DateTime<Utc>) -> Self {
        self.ended_at = Some(ended_at);
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_json_shape() {
        let event = ClinicalEvent::new(
            "lab-1",
            EventCategory::LabReport,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        )
        .in_concept("FecalOccultBloodTestFobt")
        .with_code(Coding::new("http://loinc.org", "2335-8"));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "lab-1",
                "category": "lab_report",
                "timestamp": "2024-03-01T00:00:00Z",
                "codes": [{"system": "http://loinc.org", "code": "2335-8"}],
                "concepts": ["FecalOccultBloodTestFobt"]
            })
        );

        let back: ClinicalEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_category_display_matches_serde() {
        for category in EventCategory::ALL {
            let json = serde_json::to_value(category).unwrap();
            assert_eq!(json, serde_json::Value::String(category.to_string()));
        }
    }
}
