//! Payment confirmation
//!
//! Entry point for the processor's checkout-completed notifications, which
//! are delivered at least once. Recording is idempotent per checkout
//! session: a fast-path scan catches ordinary redeliveries, and the store's
//! uniqueness constraint closes the check-then-append race - a constraint
//! violation means "already recorded", not an error.

use std::sync::Arc;

use tracing::{info, instrument};

use core_kernel::{Money, PolicyId};
use domain_policy::{EventStore, LifecycleEvent, StoreError};

use crate::dispatch::JobDispatcher;
use crate::error::FulfillmentError;

/// Whether a notification recorded a new payment or hit an earlier one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// First delivery: the payment was recorded and fulfillment dispatched
    Recorded,
    /// Redelivery: nothing appended, nothing dispatched
    AlreadyRecorded,
}

/// Handles payment-completed notifications
pub struct PaymentConfirmation {
    events: Arc<dyn EventStore>,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl PaymentConfirmation {
    pub fn new(events: Arc<dyn EventStore>, dispatcher: Arc<dyn JobDispatcher>) -> Self {
        Self { events, dispatcher }
    }

    /// Records a confirmed payment and dispatches fulfillment, exactly once
    /// per checkout session
    ///
    /// Both deliveries of a duplicate notification return `Ok`; only the
    /// first appends an event and enqueues the saga.
    #[instrument(skip(self, amount), fields(policy_id = %policy_id, session = %checkout_session_id))]
    pub async fn record_payment(
        &self,
        policy_id: PolicyId,
        checkout_session_id: &str,
        payment_intent_id: &str,
        amount: Money,
    ) -> Result<PaymentOutcome, FulfillmentError> {
        let existing = self.events.events_for(policy_id).await?;
        if existing
            .iter()
            .any(|e| e.event.payment_session_guard() == Some(checkout_session_id))
        {
            info!("duplicate payment notification ignored");
            return Ok(PaymentOutcome::AlreadyRecorded);
        }

        let append = self
            .events
            .append(
                policy_id,
                LifecycleEvent::PaymentReceived {
                    payment_intent_id: payment_intent_id.to_string(),
                    checkout_session_id: checkout_session_id.to_string(),
                    amount,
                },
            )
            .await;

        match append {
            Ok(_) => {
                info!("payment recorded, dispatching fulfillment");
                self.dispatcher.dispatch_fulfillment(policy_id);
                Ok(PaymentOutcome::Recorded)
            }
            // Lost the race against a concurrent delivery; the winner
            // dispatched the saga.
            Err(StoreError::DuplicatePayment { .. }) => {
                info!("payment already recorded by concurrent delivery");
                Ok(PaymentOutcome::AlreadyRecorded)
            }
            Err(other) => Err(other.into()),
        }
    }
}
