//! Refund workflow
//!
//! Operator-triggered, two phases: `initiate_refund` validates the
//! precondition and appends `RefundInitiated` synchronously; `process` runs
//! on the worker pool, calls the payment processor, and appends `Refunded`.
//! A policy with no recorded payment can never grow a refund event.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::{Money, PolicyId};
use domain_policy::{EventStore, LifecycleEvent, RecordedEvent};

use crate::error::FulfillmentError;
use crate::ports::{PaymentGateway, PolicyNotifier};

/// Initiates and settles refunds against recorded payments
pub struct RefundWorkflow {
    events: Arc<dyn EventStore>,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn PolicyNotifier>,
}

impl RefundWorkflow {
    pub fn new(
        events: Arc<dyn EventStore>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn PolicyNotifier>,
    ) -> Self {
        Self {
            events,
            payments,
            notifier,
        }
    }

    /// Records the operator's intent to refund the most recent payment
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when no payment was ever received or the policy
    /// is already refunded; nothing is appended in either case.
    #[instrument(skip(self, reason), fields(policy_id = %policy_id, initiated_by))]
    pub async fn initiate_refund(
        &self,
        policy_id: PolicyId,
        reason: &str,
        initiated_by: &str,
    ) -> Result<(), FulfillmentError> {
        let events = self.events.events_for(policy_id).await?;

        let payment = latest_payment(&events).ok_or_else(|| {
            FulfillmentError::invalid_transition("cannot refund a policy with no recorded payment")
        })?;

        if events
            .iter()
            .any(|e| matches!(e.event, LifecycleEvent::Refunded { .. }))
        {
            return Err(FulfillmentError::invalid_transition(
                "policy is already refunded",
            ));
        }

        self.events
            .append(
                policy_id,
                LifecycleEvent::RefundInitiated {
                    payment_intent_id: payment.intent_id,
                    reason: reason.to_string(),
                    initiated_by: initiated_by.to_string(),
                },
            )
            .await?;
        info!("refund initiated");
        Ok(())
    }

    /// External phase: refunds at the processor and records the outcome
    ///
    /// Idempotent: exits quietly when the policy is already refunded. A
    /// processor failure leaves the policy in `refund_initiated` for
    /// re-dispatch and surfaces as `PaymentGateway`.
    #[instrument(skip(self), fields(policy_id = %policy_id))]
    pub async fn process(&self, policy_id: PolicyId) -> Result<(), FulfillmentError> {
        let events = self.events.events_for(policy_id).await?;

        if events
            .iter()
            .any(|e| matches!(e.event, LifecycleEvent::Refunded { .. }))
        {
            info!("refund already settled, exiting");
            return Ok(());
        }

        let Some(initiation) = latest_initiation(&events) else {
            warn!("refund processing invoked without an initiation event");
            return Ok(());
        };
        let payment = latest_payment(&events).ok_or_else(|| {
            FulfillmentError::invalid_transition("refund initiated without a recorded payment")
        })?;

        let receipt = self
            .payments
            .create_refund(&initiation, payment.amount)
            .await?;

        self.events
            .append(
                policy_id,
                LifecycleEvent::Refunded {
                    refund_id: receipt.refund_id.clone(),
                    amount: receipt.amount,
                },
            )
            .await?;
        info!(refund_id = %receipt.refund_id, "refund settled");

        self.notifier
            .refund_processed(policy_id, receipt.amount)
            .await;
        Ok(())
    }
}

struct PaymentRef {
    intent_id: String,
    amount: Money,
}

/// The most recent `PaymentReceived`, by recording time
fn latest_payment(events: &[RecordedEvent]) -> Option<PaymentRef> {
    events
        .iter()
        .filter_map(|e| match &e.event {
            LifecycleEvent::PaymentReceived {
                payment_intent_id,
                amount,
                ..
            } => Some((e.recorded_at, payment_intent_id.clone(), *amount)),
            _ => None,
        })
        .max_by_key(|(at, _, _)| *at)
        .map(|(_, intent_id, amount)| PaymentRef { intent_id, amount })
}

/// The payment intent referenced by the most recent `RefundInitiated`
fn latest_initiation(events: &[RecordedEvent]) -> Option<String> {
    events
        .iter()
        .filter_map(|e| match &e.event {
            LifecycleEvent::RefundInitiated {
                payment_intent_id, ..
            } => Some((e.recorded_at, payment_intent_id.clone())),
            _ => None,
        })
        .max_by_key(|(at, _)| *at)
        .map(|(_, intent_id)| intent_id)
}
