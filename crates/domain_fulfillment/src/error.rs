//! Fulfillment error taxonomy
//!
//! What reaches a caller synchronously. Failures inside the saga's external
//! calls never appear here; they are recorded as `Failed` events instead.

use thiserror::Error;

use core_kernel::PolicyId;
use domain_policy::{PolicyError, StoreError};

use crate::ports::{AccountError, PaymentError};

/// Errors returned by the fulfillment services
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Bad purchase or traveler input, rejected before any write
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation does not apply to the policy's current state
    ///
    /// E.g. a refund with no recorded payment, or a retry on a policy that
    /// is not failed. Nothing is written.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Policy not found: {0}")]
    PolicyNotFound(PolicyId),

    /// The checkout session could not be opened; the purchase is retryable
    /// and no pending-payment event was written
    #[error("Payment gateway failure: {0}")]
    PaymentGateway(#[from] PaymentError),

    #[error("Account resolution failure: {0}")]
    Account(#[from] AccountError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FulfillmentError {
    pub fn validation(message: impl Into<String>) -> Self {
        FulfillmentError::Validation(message.into())
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        FulfillmentError::InvalidTransition(message.into())
    }
}

impl From<PolicyError> for FulfillmentError {
    fn from(err: PolicyError) -> Self {
        FulfillmentError::Validation(err.to_string())
    }
}
