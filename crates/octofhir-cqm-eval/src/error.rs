//! Evaluation errors for the measure engine

use octofhir_cqm_diagnostics::{CQM0200, CQM0201, CQM0202, ConfigurationError, Diagnostic, ErrorCode};
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that can occur while evaluating a measure.
///
/// Absence of evidence is never an error; these only surface programmer
/// errors in measure definitions or custom predicates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Evidence rule referenced at evaluation time but not declared
    #[error("Unknown evidence rule: {rule}")]
    UnknownRule { rule: String },

    /// Population referenced at evaluation time but not declared
    #[error("Unknown population: {population}")]
    UnknownPopulation { population: String },

    /// A custom predicate failed
    #[error("Predicate '{predicate}' failed: {message}")]
    Predicate { predicate: String, message: String },

    /// Configuration problem detected while evaluating
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Internal error (should not happen)
    #[error("Internal evaluation error: {message}")]
    Internal { message: String },
}

impl EvalError {
    /// Create an unknown rule error
    pub fn unknown_rule(rule: impl Into<String>) -> Self {
        Self::UnknownRule { rule: rule.into() }
    }

    /// Create an unknown population error
    pub fn unknown_population(population: impl Into<String>) -> Self {
        Self::UnknownPopulation {
            population: population.into(),
        }
    }

    /// Create a predicate failure
    pub fn predicate(predicate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Predicate {
            predicate: predicate.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownRule { .. } | Self::UnknownPopulation { .. } => CQM0201,
            Self::Predicate { .. } => CQM0200,
            Self::Configuration(err) => err.code(),
            Self::Internal { .. } => CQM0202,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Configuration(err) => err.to_diagnostic(),
            other => Diagnostic::error(other.code(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(EvalError::unknown_rule("fobt").code(), CQM0201);
        assert_eq!(EvalError::predicate("custom", "boom").code(), CQM0200);
        assert_eq!(EvalError::internal("oops").code(), CQM0202);

        let config: EvalError = ConfigurationError::invalid_timeframe("b", "a").into();
        assert!(config.code().is_temporal_error());
        assert_eq!(config.to_diagnostic().code, config.code());
    }
}
