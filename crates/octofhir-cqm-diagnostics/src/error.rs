//! Measure error types

use crate::{
    CQM0001, CQM0002, CQM0100, CQM0101, CQM0102, CQM0103, CQM0104, CQM0105, CQM0106, CQM0107,
    CQM0108, CQM0109, CQM0110, CQM0300, CQM0301, CQM0303, CQM0400, CQM0401, ErrorCode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - registration or evaluation cannot proceed
    Error,
    /// Warning - potential issue but can continue
    Warning,
    /// Information - informational message
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message with the configuration element it concerns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Element the diagnostic is about (e.g. `CMS130v6/colonoscopy`)
    pub subject: Option<String>,
    /// Additional context or help
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            subject: None,
            help: code.info().help.map(str::to_string),
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            subject: None,
            help: code.info().help.map(str::to_string),
        }
    }

    /// Set the subject
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the diagnostic with terminal colors
    #[cfg(feature = "colored")]
    pub fn to_colored_string(&self) -> String {
        use colored::Colorize;

        let severity = match self.severity {
            Severity::Error => self.severity.to_string().red().bold(),
            Severity::Warning => self.severity.to_string().yellow().bold(),
            Severity::Info => self.severity.to_string().blue().bold(),
        };
        let mut out = format!("{}[{}]: {}", severity, self.code, self.message);
        if let Some(subject) = &self.subject {
            out.push_str(&format!("\n  {} {}", "-->".cyan(), subject));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("\n  {} {}", "help:".green(), help));
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(subject) = &self.subject {
            write!(f, " ({})", subject)?;
        }
        Ok(())
    }
}

/// Error raised while constructing timeframes or registering measures.
///
/// A misconfigured measure is rejected before it can evaluate a single patient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Timeframe with `start > end`
    #[error("Invalid timeframe: start {start} is after end {end}")]
    InvalidTimeframe { start: String, end: String },

    /// Lookback too large to apply to an instant
    #[error("Lookback {lookback} cannot be applied to {instant}")]
    LookbackOutOfRange { lookback: String, instant: String },

    /// Codeset referenced by a rule or predicate but absent from the catalog
    #[error("Measure {measure}: {referenced_by} references undefined codeset '{codeset}'")]
    UndefinedCodeset {
        measure: String,
        referenced_by: String,
        codeset: String,
    },

    /// Evidence rule referenced but not declared
    #[error("Measure {measure}: {referenced_by} references unknown evidence rule '{rule}'")]
    UnknownRule {
        measure: String,
        referenced_by: String,
        rule: String,
    },

    /// Population referenced but not declared
    #[error("Measure {measure}: {referenced_by} references unknown population '{population}'")]
    UnknownPopulation {
        measure: String,
        referenced_by: String,
        population: String,
    },

    /// Two rules with the same identifier
    #[error("Measure {measure}: evidence rule '{rule}' is declared more than once")]
    DuplicateRule { measure: String, rule: String },

    /// Two populations with the same identifier
    #[error("Measure {measure}: population '{population}' is declared more than once")]
    DuplicatePopulation { measure: String, population: String },

    /// Measure identifier already registered
    #[error("Measure '{measure}' is already registered")]
    DuplicateMeasure { measure: String },

    /// Anchor chain that loops back on itself
    #[error("Measure {measure}: evidence rule '{rule}' has a cyclic anchor chain")]
    CyclicAnchor { measure: String, rule: String },

    /// Composite population depending on itself, a later population or another composite
    #[error("Measure {measure}: composite population '{population}' cannot depend on '{dependency}'")]
    InvalidDependency {
        measure: String,
        population: String,
        dependency: String,
    },

    /// Evidence population with an empty rule list
    #[error("Measure {measure}: population '{population}' has no evidence rules")]
    EmptyEvidence { measure: String, population: String },

    /// Reporting population not among the declared populations
    #[error("Measure {measure}: reporting population '{population}' is not defined")]
    MissingReportingPopulation { measure: String, population: String },

    /// Measure without any population
    #[error("Measure {measure} declares no populations")]
    NoPopulations { measure: String },

    /// Codeset catalog that cannot be parsed
    #[error("Invalid codeset catalog: {message}")]
    InvalidCatalog { message: String },

    /// Change to a catalog that measures have already been registered against
    #[error("Codeset catalog is frozen; cannot change '{codeset}'")]
    CatalogFrozen { codeset: String },

    /// Timeline document that cannot be parsed
    #[error("Invalid timeline document: {message}")]
    InvalidTimeline { message: String },

    /// I/O failure while loading configuration
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    /// File with an extension the loader does not understand
    #[error("Unsupported file format: {path}")]
    UnsupportedFormat { path: String },
}

impl ConfigurationError {
    /// Create an invalid timeframe error
    pub fn invalid_timeframe(start: impl fmt::Display, end: impl fmt::Display) -> Self {
        Self::InvalidTimeframe {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Create an undefined codeset error
    pub fn undefined_codeset(
        measure: impl Into<String>,
        referenced_by: impl Into<String>,
        codeset: impl Into<String>,
    ) -> Self {
        Self::UndefinedCodeset {
            measure: measure.into(),
            referenced_by: referenced_by.into(),
            codeset: codeset.into(),
        }
    }

    /// Create an unknown rule error
    pub fn unknown_rule(
        measure: impl Into<String>,
        referenced_by: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self::UnknownRule {
            measure: measure.into(),
            referenced_by: referenced_by.into(),
            rule: rule.into(),
        }
    }

    /// Create an unknown population error
    pub fn unknown_population(
        measure: impl Into<String>,
        referenced_by: impl Into<String>,
        population: impl Into<String>,
    ) -> Self {
        Self::UnknownPopulation {
            measure: measure.into(),
            referenced_by: referenced_by.into(),
            population: population.into(),
        }
    }

    /// Create an invalid catalog error
    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Io {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidTimeframe { .. } => CQM0001,
            Self::LookbackOutOfRange { .. } => CQM0002,
            Self::UndefinedCodeset { .. } => CQM0100,
            Self::UnknownRule { .. } => CQM0101,
            Self::UnknownPopulation { .. } => CQM0102,
            Self::DuplicateRule { .. } => CQM0103,
            Self::DuplicatePopulation { .. } => CQM0104,
            Self::DuplicateMeasure { .. } => CQM0105,
            Self::CyclicAnchor { .. } => CQM0106,
            Self::InvalidDependency { .. } => CQM0107,
            Self::EmptyEvidence { .. } => CQM0108,
            Self::MissingReportingPopulation { .. } => CQM0109,
            Self::NoPopulations { .. } => CQM0110,
            Self::InvalidCatalog { .. } => CQM0300,
            Self::InvalidTimeline { .. } => CQM0301,
            Self::CatalogFrozen { .. } => CQM0303,
            Self::Io { .. } => CQM0400,
            Self::UnsupportedFormat { .. } => CQM0401,
        }
    }

    /// Measure the error concerns, when there is one
    pub fn measure(&self) -> Option<&str> {
        match self {
            Self::UndefinedCodeset { measure, .. }
            | Self::UnknownRule { measure, .. }
            | Self::UnknownPopulation { measure, .. }
            | Self::DuplicateRule { measure, .. }
            | Self::DuplicatePopulation { measure, .. }
            | Self::DuplicateMeasure { measure }
            | Self::CyclicAnchor { measure, .. }
            | Self::InvalidDependency { measure, .. }
            | Self::EmptyEvidence { measure, .. }
            | Self::MissingReportingPopulation { measure, .. }
            | Self::NoPopulations { measure } => Some(measure.as_str()),
            _ => None,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.code(), self.to_string());
        match self {
            Self::UndefinedCodeset {
                measure,
                referenced_by,
                ..
            }
            | Self::UnknownRule {
                measure,
                referenced_by,
                ..
            }
            | Self::UnknownPopulation {
                measure,
                referenced_by,
                ..
            } => diag.with_subject(format!("{}/{}", measure, referenced_by)),
            Self::Io { path, .. } | Self::UnsupportedFormat { path } => diag.with_subject(path),
            other => match other.measure() {
                Some(measure) => diag.with_subject(measure),
                None => diag,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_timeframe_code() {
        let err = ConfigurationError::invalid_timeframe("2024-12-31", "2024-01-01");
        assert_eq!(err.code(), CQM0001);
        assert!(err.to_string().contains("2024-12-31"));
        assert!(err.measure().is_none());
    }

    #[test]
    fn test_undefined_codeset_diagnostic() {
        let err = ConfigurationError::undefined_codeset("CMS130v6", "rule colonoscopy", "Colonoscopy");
        let diag = err.to_diagnostic();

        assert_eq!(diag.code, CQM0100);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.subject.as_deref(), Some("CMS130v6/rule colonoscopy"));
        assert!(diag.help.is_some());
        assert!(diag.to_string().contains("CQM0100"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::warning(CQM0108, "no rules").with_subject("CMS138v6");
        assert_eq!(diag.to_string(), "warning: CQM0108 - no rules (CMS138v6)");
    }
}
