//! Error types for privkit Core.

use thiserror::Error;

/// Core errors raised by the envelope codec.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("invalid document name: {0:?}")]
    InvalidDocumentName(String),
}

/// Argument validation errors.
///
/// Raised before any I/O happens. Every variant names the offending
/// parameter so callers can map it straight to a client error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{param} must be a non-empty string")]
    EmptyIdentifier { param: String },

    #[error("{param} must be a non-null object")]
    NotAnObject { param: String },

    #[error("{param} must be a boolean")]
    NotABoolean { param: String },

    #[error("{param} must be a string")]
    NotAString { param: String },
}

impl ValidationError {
    /// The name of the parameter that failed validation.
    pub fn param(&self) -> &str {
        match self {
            ValidationError::EmptyIdentifier { param }
            | ValidationError::NotAnObject { param }
            | ValidationError::NotABoolean { param }
            | ValidationError::NotAString { param } => param,
        }
    }
}
