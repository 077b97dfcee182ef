//! Lifecycle events for the policy aggregate
//!
//! The event log is the single source of truth for what has happened to a
//! policy. Each variant is an immutable fact; the set of variants is closed.
//! Current state and history are derived by the projector, never stored.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{EventId, Money, PolicyId};

/// Lifecycle events recorded against a policy
///
/// Appended in the order their causing step completed. Ordering is not
/// trusted at read time; the projector sorts and tie-breaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// A checkout session was opened; payment is awaited
    PendingPayment {
        checkout_session_id: String,
    },

    /// The payment processor confirmed the checkout
    ///
    /// At most one of these exists per distinct checkout session; the store
    /// enforces the uniqueness.
    PaymentReceived {
        payment_intent_id: String,
        checkout_session_id: String,
        amount: Money,
    },

    /// The underwriter accepted the contract
    ContractCreated {
        order_id: String,
        policy_number: String,
        total_amount: Decimal,
    },

    /// The underwriting contract was confirmed
    ContractConfirmed {
        order_id: String,
    },

    /// The policy document was retrieved and stored
    Completed {
        document_path: String,
    },

    /// A fulfillment step failed; the saga halted pending operator retry
    Failed {
        step: FulfillmentStep,
        error_message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        created_by: Option<String>,
    },

    /// An operator started a refund against the recorded payment
    RefundInitiated {
        payment_intent_id: String,
        reason: String,
        initiated_by: String,
    },

    /// The payment processor completed the refund
    Refunded {
        refund_id: String,
        amount: Money,
    },
}

impl LifecycleEvent {
    /// Returns the state name this event projects to
    pub fn state(&self) -> PolicyState {
        match self {
            LifecycleEvent::PendingPayment { .. } => PolicyState::PendingPayment,
            LifecycleEvent::PaymentReceived { .. } => PolicyState::PaymentReceived,
            LifecycleEvent::ContractCreated { .. } => PolicyState::ContractCreated,
            LifecycleEvent::ContractConfirmed { .. } => PolicyState::ContractConfirmed,
            LifecycleEvent::Completed { .. } => PolicyState::Completed,
            LifecycleEvent::Failed { .. } => PolicyState::Failed,
            LifecycleEvent::RefundInitiated { .. } => PolicyState::RefundInitiated,
            LifecycleEvent::Refunded { .. } => PolicyState::Refunded,
        }
    }

    /// Returns the snake_case event type tag
    pub fn event_type(&self) -> &'static str {
        self.state().as_str()
    }

    /// Returns the checkout session this event guards, if any
    ///
    /// Only `PaymentReceived` participates in the per-session uniqueness
    /// constraint.
    pub fn payment_session_guard(&self) -> Option<&str> {
        match self {
            LifecycleEvent::PaymentReceived {
                checkout_session_id, ..
            } => Some(checkout_session_id),
            _ => None,
        }
    }
}

/// The fulfillment step a failure was recorded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStep {
    ContractCreation,
    ContractConfirmation,
    DocumentRetrieval,
}

impl FulfillmentStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStep::ContractCreation => "contract_creation",
            FulfillmentStep::ContractConfirmation => "contract_confirmation",
            FulfillmentStep::DocumentRetrieval => "document_retrieval",
        }
    }
}

impl fmt::Display for FulfillmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived state names, one per event variant
///
/// Ordering by `precedence()` reflects causal precedence and is used only to
/// break exact-timestamp ties: a failure recorded in the same instant as a
/// pending state still wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    PendingPayment,
    PaymentReceived,
    ContractCreated,
    ContractConfirmed,
    Completed,
    Failed,
    RefundInitiated,
    Refunded,
}

impl PolicyState {
    /// Returns the snake_case state name
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyState::PendingPayment => "pending_payment",
            PolicyState::PaymentReceived => "payment_received",
            PolicyState::ContractCreated => "contract_created",
            PolicyState::ContractConfirmed => "contract_confirmed",
            PolicyState::Completed => "completed",
            PolicyState::Failed => "failed",
            PolicyState::RefundInitiated => "refund_initiated",
            PolicyState::Refunded => "refunded",
        }
    }

    /// Tie-break priority for events sharing a timestamp, highest wins
    pub fn precedence(&self) -> u8 {
        match self {
            PolicyState::PendingPayment => 0,
            PolicyState::PaymentReceived => 1,
            PolicyState::ContractCreated => 2,
            PolicyState::ContractConfirmed => 3,
            PolicyState::Completed => 4,
            PolicyState::Failed => 5,
            PolicyState::RefundInitiated => 6,
            PolicyState::Refunded => 7,
        }
    }
}

impl fmt::Display for PolicyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event as persisted: the fact plus its append envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub id: EventId,
    pub policy_id: PolicyId,
    pub recorded_at: DateTime<Utc>,
    pub event: LifecycleEvent,
}

impl RecordedEvent {
    /// Stamps a new envelope around an event, recorded now
    pub fn new(policy_id: PolicyId, event: LifecycleEvent) -> Self {
        Self {
            id: EventId::new_v7(),
            policy_id,
            recorded_at: Utc::now(),
            event,
        }
    }

    /// Returns the state name this record projects to
    pub fn state(&self) -> PolicyState {
        self.event.state()
    }
}
