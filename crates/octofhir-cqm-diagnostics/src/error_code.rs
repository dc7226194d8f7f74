//! Measure error codes following a structured numbering system
//!
//! Error code ranges:
//! - CQM0001-CQM0099: Temporal errors (timeframes, lookbacks)
//! - CQM0100-CQM0199: Measure configuration errors (registration)
//! - CQM0200-CQM0299: Evaluation errors (runtime)
//! - CQM0300-CQM0399: Timeline and codeset catalog errors
//! - CQM0400-CQM0499: System errors (I/O)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    /// Create a new error code
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Get error information for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    /// Check if this is a temporal error (0001-0099)
    pub const fn is_temporal_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    /// Check if this is a configuration error (0100-0199)
    pub const fn is_configuration_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    /// Check if this is an evaluation error (0200-0299)
    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Check if this is a timeline or catalog error (0300-0399)
    pub const fn is_model_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    /// Check if this is a system error (0400-0499)
    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CQM{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Temporal errors (0001-0099)
    map.insert(
        1,
        ErrorInfo::new("Timeframe start is after its end")
            .with_help("Swap the bounds or check the reporting period parameters"),
    );
    map.insert(2, ErrorInfo::new("Lookback cannot be represented"));

    // Configuration errors (0100-0199)
    map.insert(
        100,
        ErrorInfo::new("Undefined codeset")
            .with_help("Declare the codeset in the catalog before registering the measure"),
    );
    map.insert(101, ErrorInfo::new("Unknown evidence rule"));
    map.insert(102, ErrorInfo::new("Unknown population"));
    map.insert(103, ErrorInfo::new("Duplicate evidence rule identifier"));
    map.insert(104, ErrorInfo::new("Duplicate population identifier"));
    map.insert(105, ErrorInfo::new("Duplicate measure identifier"));
    map.insert(
        106,
        ErrorInfo::new("Cyclic evidence anchor")
            .with_help("An anchored rule must not depend on itself, directly or transitively"),
    );
    map.insert(
        107,
        ErrorInfo::new("Invalid composite population dependency")
            .with_help("Composite populations may only combine evidence populations declared before them"),
    );
    map.insert(108, ErrorInfo::new("Population has no evidence rules"));
    map.insert(109, ErrorInfo::new("Reporting population is not defined"));
    map.insert(110, ErrorInfo::new("Measure definition has no populations"));

    // Evaluation errors (0200-0299)
    map.insert(200, ErrorInfo::new("Predicate evaluation failed"));
    map.insert(201, ErrorInfo::new("Evidence rule referenced at evaluation time is missing"));
    map.insert(202, ErrorInfo::new("Internal evaluation error"));

    // Timeline and catalog errors (0300-0399)
    map.insert(300, ErrorInfo::new("Invalid codeset catalog document"));
    map.insert(301, ErrorInfo::new("Invalid timeline document"));
    map.insert(
        302,
        ErrorInfo::new("Codeset lists no codes")
            .with_help("Only events already tagged with the codeset name will match"),
    );
    map.insert(
        303,
        ErrorInfo::new("Codeset catalog is frozen")
            .with_help("Finish defining codesets before registering measures against the catalog"),
    );

    // System errors (0400-0499)
    map.insert(400, ErrorInfo::new("I/O error"));
    map.insert(401, ErrorInfo::new("Unsupported file format"));

    map
});

// Temporal errors
pub const CQM0001: ErrorCode = ErrorCode::new(1);
pub const CQM0002: ErrorCode = ErrorCode::new(2);

// Configuration errors
pub const CQM0100: ErrorCode = ErrorCode::new(100);
pub const CQM0101: ErrorCode = ErrorCode::new(101);
pub const CQM0102: ErrorCode = ErrorCode::new(102);
pub const CQM0103: ErrorCode = ErrorCode::new(103);
pub const CQM0104: ErrorCode = ErrorCode::new(104);
pub const CQM0105: ErrorCode = ErrorCode::new(105);
pub const CQM0106: ErrorCode = ErrorCode::new(106);
pub const CQM0107: ErrorCode = ErrorCode::new(107);
pub const CQM0108: ErrorCode = ErrorCode::new(108);
pub const CQM0109: ErrorCode = ErrorCode::new(109);
pub const CQM0110: ErrorCode = ErrorCode::new(110);

// Evaluation errors
pub const CQM0200: ErrorCode = ErrorCode::new(200);
pub const CQM0201: ErrorCode = ErrorCode::new(201);
pub const CQM0202: ErrorCode = ErrorCode::new(202);

// Timeline and catalog errors
pub const CQM0300: ErrorCode = ErrorCode::new(300);
pub const CQM0301: ErrorCode = ErrorCode::new(301);
pub const CQM0302: ErrorCode = ErrorCode::new(302);
pub const CQM0303: ErrorCode = ErrorCode::new(303);

// System errors
pub const CQM0400: ErrorCode = ErrorCode::new(400);
pub const CQM0401: ErrorCode = ErrorCode::new(401);
