//! Clinical quality measure diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by every
//! measure crate: structured error codes, the configuration error raised when
//! a timeframe or measure definition is malformed, and diagnostic reporting.

mod error;
mod error_code;

pub use error::*;
pub use error_code::*;

/// Result type for configuration-time operations
pub type Result<T> = std::result::Result<T, ConfigurationError>;
