//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying loader failure (missing variable, bad type).
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors raised while validating loaded configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required value is missing.
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    /// A value is outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ValidationError {
    /// Creates an invalid-value error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
