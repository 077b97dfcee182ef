//! Collaborator ports
//!
//! The fulfillment workflows drive four external collaborators. Each is a
//! narrow trait; production adapters live in `adapters`, test fakes wherever
//! the tests are.

use async_trait::async_trait;
use thiserror::Error;

use core_kernel::{AccountId, Money, PolicyId};
use domain_policy::Policy;

/// Errors from the payment processor
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The processor answered with an error
    #[error("payment processor error: {0}")]
    Gateway(String),

    /// The processor could not be reached
    #[error("payment processor unreachable: {0}")]
    Connection(String),
}

/// A checkout session opened with the payment processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted payment page, when the processor provides one
    pub url: Option<String>,
}

/// Metadata attached to a checkout session for later correlation
#[derive(Debug, Clone)]
pub struct CheckoutMetadata {
    pub policy_id: PolicyId,
}

/// A completed refund at the payment processor
#[derive(Debug, Clone, PartialEq)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount: Money,
}

/// The payment processor
///
/// Checkout-completed notifications arrive out of band (webhook) and are
/// at-least-once; see `PaymentConfirmation` for the idempotent handler.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a checkout session for the given amount
    async fn create_checkout_session(
        &self,
        amount: Money,
        metadata: CheckoutMetadata,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Refunds a captured payment
    async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Money,
    ) -> Result<RefundReceipt, PaymentError>;
}

/// Error from the account management collaborator
#[derive(Debug, Error)]
#[error("account directory error: {0}")]
pub struct AccountError(pub String);

/// Account management, owned elsewhere in the application
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Finds the account for an email address, creating it if absent
    async fn resolve_or_create(&self, email: &str) -> Result<AccountId, AccountError>;
}

/// Error from the document storage collaborator
#[derive(Debug, Error)]
#[error("document storage error: {0}")]
pub struct DocumentError(pub String);

/// Persists fetched policy documents and hands back a retrievable path
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn store_policy_document(
        &self,
        policy_id: PolicyId,
        bytes: &[u8],
    ) -> Result<String, DocumentError>;
}

/// Fire-and-forget customer notifications
///
/// Not part of the core's correctness: implementations log failures and
/// never propagate them.
#[async_trait]
pub trait PolicyNotifier: Send + Sync {
    async fn policy_confirmed(&self, policy: &Policy);
    async fn refund_processed(&self, policy_id: PolicyId, amount: Money);
}
