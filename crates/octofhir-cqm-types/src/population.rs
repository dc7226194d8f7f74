//! Sub-population identifiers and membership states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a sub-population within a measure (e.g. `numerator1`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PopulationId(pub String);

impl PopulationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PopulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PopulationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Membership of one patient in one sub-population.
///
/// States only ever move forward along
///
/// ```text
/// InInitial -> InDenominator -> InNumerator
///     |              |   \            |
///     v              v    `-> NotInNumerator
/// ExcludedFromDenominator
/// ```
///
/// `NotInInitial`, `ExcludedFromDenominator` and `NotInNumerator` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PopulationState {
    NotInInitial,
    InInitial,
    InDenominator,
    ExcludedFromDenominator,
    InNumerator,
    NotInNumerator,
}

impl PopulationState {
    /// Whether moving from `self` to `next` is a permitted downgrade or promotion
    pub fn can_transition_to(self, next: PopulationState) -> bool {
        matches!(
            (self, next),
            (Self::InInitial, Self::InDenominator)
                | (Self::InInitial, Self::ExcludedFromDenominator)
                | (Self::InDenominator, Self::ExcludedFromDenominator)
                | (Self::InDenominator, Self::InNumerator)
                | (Self::InDenominator, Self::NotInNumerator)
                | (Self::InNumerator, Self::NotInNumerator)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::NotInInitial | Self::ExcludedFromDenominator | Self::NotInNumerator
        )
    }

    /// Still counted in the denominator (whatever the numerator outcome)
    pub fn in_denominator(self) -> bool {
        matches!(
            self,
            Self::InDenominator | Self::InNumerator | Self::NotInNumerator
        )
    }

    pub fn in_initial_population(self) -> bool {
        !matches!(self, Self::NotInInitial)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotInInitial => "NOT_IN_INITIAL",
            Self::InInitial => "IN_INITIAL",
            Self::InDenominator => "IN_DENOMINATOR",
            Self::ExcludedFromDenominator => "EXCLUDED_FROM_DENOMINATOR",
            Self::InNumerator => "IN_NUMERATOR",
            Self::NotInNumerator => "NOT_IN_NUMERATOR",
        }
    }
}

impl fmt::Display for PopulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
