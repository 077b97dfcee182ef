//! Policy domain errors

use thiserror::Error;

/// Errors that can occur in the policy domain
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Bad input, rejected before anything is written
    #[error("Validation error: {0}")]
    Validation(String),

    /// Required field missing when building a policy
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Coverage tier level outside 1-3
    #[error("Unknown coverage tier level: {0}")]
    UnknownTier(u8),
}

impl PolicyError {
    /// Creates a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PolicyError::Validation(message.into())
    }

    /// Creates a missing-field error
    pub fn missing(field: impl Into<String>) -> Self {
        PolicyError::MissingRequiredField(field.into())
    }
}
