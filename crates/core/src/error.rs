//! Input validation error model.

use thiserror::Error;

/// Result type used when constructing validated values.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Caller-side input failure.
///
/// Always the caller's fault: malformed or missing request data. Never wraps
/// an infrastructure failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The domain is not a usable DNS-style name.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),
}

impl ValidationError {
    pub fn invalid_domain(msg: impl Into<String>) -> Self {
        Self::InvalidDomain(msg.into())
    }
}
