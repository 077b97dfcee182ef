//! Storage ports for the policy domain
//!
//! The event store is a dumb log: append and read back, nothing else. No
//! update or delete is exposed anywhere, and reads come back unsorted; the
//! projector owns ordering. Adapters live in the infrastructure crate.

use async_trait::async_trait;
use thiserror::Error;

use core_kernel::{AccountId, PolicyId};

use crate::events::{LifecycleEvent, RecordedEvent};
use crate::policy::{Policy, Traveler};

/// Errors surfaced by storage adapters
#[derive(Debug, Error)]
pub enum StoreError {
    /// A `PaymentReceived` for this checkout session already exists
    ///
    /// Raised from the storage-level uniqueness constraint. Callers handling
    /// payment notifications treat this as "already recorded", not a failure.
    #[error("payment already recorded for checkout session {checkout_session_id}")]
    DuplicatePayment { checkout_session_id: String },

    #[error("store connection error: {0}")]
    Connection(String),

    #[error("event serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        StoreError::Connection(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        StoreError::Serialization(message.into())
    }
}

/// Append-only store of lifecycle events
///
/// Each append is a single atomic insert. There are deliberately no
/// cross-event transactions: related events (payment + fulfillment trigger)
/// are two separate appends, and a crash between them is recovered by
/// re-deriving state, not by rollback.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists a new immutable event record
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicatePayment` when the event is a
    /// `PaymentReceived` whose `(policy_id, checkout_session_id)` pair is
    /// already recorded.
    async fn append(
        &self,
        policy_id: PolicyId,
        event: LifecycleEvent,
    ) -> Result<RecordedEvent, StoreError>;

    /// Reads every event for a policy, any variant, unsorted
    ///
    /// Finite and restartable: every call re-reads the log, so repeated
    /// calls observe appends made in between.
    async fn events_for(&self, policy_id: PolicyId) -> Result<Vec<RecordedEvent>, StoreError>;
}

/// Store of policy and traveler rows created at purchase time
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Inserts a policy together with its travelers
    async fn insert(&self, policy: &Policy, travelers: &[Traveler]) -> Result<(), StoreError>;

    /// Loads a policy and its travelers
    async fn get(&self, policy_id: PolicyId)
        -> Result<Option<(Policy, Vec<Traveler>)>, StoreError>;

    /// Lists the policies owned by an account
    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Policy>, StoreError>;
}
