//! Underwriting error taxonomy
//!
//! The split that matters downstream: `Transient` means the transport gave
//! out after bounded retries and the operation may succeed later; `Rejected`
//! means the underwriter said no and retrying without changed input is
//! pointless.

use thiserror::Error;

/// Errors surfaced by the underwriting client
#[derive(Debug, Error)]
pub enum UnderwritingError {
    /// Network-level failure that persisted through the retry budget
    #[error("underwriting unreachable after {attempts} attempt(s): {message}")]
    Transient { message: String, attempts: u32 },

    /// The underwriter explicitly rejected the request
    #[error("underwriting rejected the request: {message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// Authentication with the underwriting service failed
    #[error("unauthorized by the underwriting service")]
    Unauthorized,

    /// The service answered with something the client cannot interpret
    #[error("unexpected underwriting response: {0}")]
    Protocol(String),
}

impl UnderwritingError {
    /// True when the failure may clear on its own and a later retry is sane
    pub fn is_transient(&self) -> bool {
        matches!(self, UnderwritingError::Transient { .. })
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        UnderwritingError::Protocol(message.into())
    }

    pub fn rejected(code: Option<String>, message: impl Into<String>) -> Self {
        UnderwritingError::Rejected {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let transient = UnderwritingError::Transient {
            message: "connect timeout".to_string(),
            attempts: 3,
        };
        assert!(transient.is_transient());

        let rejected = UnderwritingError::rejected(Some("INVALID_PASSPORT".into()), "bad data");
        assert!(!rejected.is_transient());
    }
}
