//! Fulfillment saga
//!
//! The multi-step workflow executed after payment confirmation:
//!
//! ```text
//! start -> contract_created -> contract_confirmed -> completed
//!              |                     |                   |
//!              +----------- failed (any step) -----------+
//! ```
//!
//! Re-entrant by design: progress is derived from the event log on every
//! run, so a re-invocation (operator retry, duplicate dispatch) skips steps
//! that already have their event on record. A contract that already has an
//! order id is never created again.
//!
//! Underwriting failures are business outcomes, not infrastructure errors:
//! they are appended as `Failed` events and `run` still returns `Ok`. Only
//! storage trouble surfaces as `Err`.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::PolicyId;
use domain_policy::projector::current_state;
use domain_policy::{
    EventStore, FulfillmentStep, LifecycleEvent, Policy, PolicyRepository, PolicyState,
    RecordedEvent, Traveler,
};
use domain_underwriting::{ContractOrder, UnderwritingApi};

use crate::error::FulfillmentError;
use crate::ports::{DocumentStore, PolicyNotifier};
use crate::singleflight::SagaLocks;

/// Terminal result of one saga invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaOutcome {
    /// All steps done; the policy is completed
    Completed,
    /// A step failed and was recorded; awaiting operator retry
    Failed(FulfillmentStep),
    /// Another execution holds the policy's claim; exited without effects
    AlreadyRunning,
    /// The policy was already completed before this run
    AlreadyCompleted,
    /// No recorded payment, or the policy left the fulfillment path
    /// (refund in progress)
    NotEligible,
}

/// Executes fulfillment for one policy at a time
pub struct FulfillmentSaga {
    policies: Arc<dyn PolicyRepository>,
    events: Arc<dyn EventStore>,
    underwriting: Arc<dyn UnderwritingApi>,
    documents: Arc<dyn DocumentStore>,
    notifier: Arc<dyn PolicyNotifier>,
    locks: SagaLocks,
}

impl FulfillmentSaga {
    pub fn new(
        policies: Arc<dyn PolicyRepository>,
        events: Arc<dyn EventStore>,
        underwriting: Arc<dyn UnderwritingApi>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn PolicyNotifier>,
        locks: SagaLocks,
    ) -> Self {
        Self {
            policies,
            events,
            underwriting,
            documents,
            notifier,
            locks,
        }
    }

    /// Runs the saga to a terminal outcome
    ///
    /// # Errors
    ///
    /// Only storage failures. Underwriting and document problems are
    /// recorded as `Failed` events and reported through the outcome.
    #[instrument(skip(self), fields(policy_id = %policy_id))]
    pub async fn run(&self, policy_id: PolicyId) -> Result<SagaOutcome, FulfillmentError> {
        // Single-flight: the loser of a duplicate dispatch exits here.
        let Some(_claim) = self.locks.try_claim(policy_id) else {
            info!("saga already in flight, exiting");
            return Ok(SagaOutcome::AlreadyRunning);
        };

        let events = self.events.events_for(policy_id).await?;

        if !events
            .iter()
            .any(|e| matches!(e.event, LifecycleEvent::PaymentReceived { .. }))
        {
            warn!("saga invoked without a recorded payment");
            return Ok(SagaOutcome::NotEligible);
        }
        match current_state(&events) {
            Some(PolicyState::Completed) => return Ok(SagaOutcome::AlreadyCompleted),
            Some(PolicyState::Refunded) | Some(PolicyState::RefundInitiated) => {
                info!("policy left the fulfillment path, exiting");
                return Ok(SagaOutcome::NotEligible);
            }
            _ => {}
        }

        let (policy, travelers) = self
            .policies
            .get(policy_id)
            .await?
            .ok_or(FulfillmentError::PolicyNotFound(policy_id))?;

        // Resume from whatever the log already proves happened.
        let order = match latest_order(&events) {
            Some(order) => {
                info!(order_id = %order.order_id, "resuming with existing contract");
                order
            }
            None => match self.create_contract(&policy, &travelers).await? {
                Ok(order) => order,
                Err(step) => return Ok(SagaOutcome::Failed(step)),
            },
        };

        if !is_confirmed(&events, &order.order_id) {
            if let Err(step) = self.confirm_contract(policy_id, &order.order_id).await? {
                return Ok(SagaOutcome::Failed(step));
            }
        }

        if let Err(step) = self.retrieve_document(&policy, &order.order_id).await? {
            return Ok(SagaOutcome::Failed(step));
        }

        Ok(SagaOutcome::Completed)
    }

    /// Step 1: create the underwriting contract
    async fn create_contract(
        &self,
        policy: &Policy,
        travelers: &[Traveler],
    ) -> Result<Result<ContractOrder, FulfillmentStep>, FulfillmentError> {
        match self.underwriting.create_contract(policy, travelers).await {
            Ok(order) => {
                self.events
                    .append(
                        policy.id,
                        LifecycleEvent::ContractCreated {
                            order_id: order.order_id.clone(),
                            policy_number: order.policy_number.clone(),
                            total_amount: order.total_amount,
                        },
                    )
                    .await?;
                info!(order_id = %order.order_id, "contract created");
                Ok(Ok(order))
            }
            Err(err) => {
                self.record_failure(policy.id, FulfillmentStep::ContractCreation, &err.to_string())
                    .await?;
                Ok(Err(FulfillmentStep::ContractCreation))
            }
        }
    }

    /// Step 2: confirm the contract
    async fn confirm_contract(
        &self,
        policy_id: PolicyId,
        order_id: &str,
    ) -> Result<Result<(), FulfillmentStep>, FulfillmentError> {
        match self.underwriting.confirm_contract(order_id).await {
            Ok(()) => {
                self.events
                    .append(
                        policy_id,
                        LifecycleEvent::ContractConfirmed {
                            order_id: order_id.to_string(),
                        },
                    )
                    .await?;
                info!(order_id, "contract confirmed");
                Ok(Ok(()))
            }
            Err(err) => {
                self.record_failure(
                    policy_id,
                    FulfillmentStep::ContractConfirmation,
                    &err.to_string(),
                )
                .await?;
                Ok(Err(FulfillmentStep::ContractConfirmation))
            }
        }
    }

    /// Step 3: fetch the policy document and persist it
    async fn retrieve_document(
        &self,
        policy: &Policy,
        order_id: &str,
    ) -> Result<Result<(), FulfillmentStep>, FulfillmentError> {
        let bytes = match self.underwriting.fetch_document(order_id).await {
            Ok(bytes) => bytes,
            Err(err) => {
                self.record_failure(
                    policy.id,
                    FulfillmentStep::DocumentRetrieval,
                    &err.to_string(),
                )
                .await?;
                return Ok(Err(FulfillmentStep::DocumentRetrieval));
            }
        };

        let document_path = match self
            .documents
            .store_policy_document(policy.id, &bytes)
            .await
        {
            Ok(path) => path,
            Err(err) => {
                self.record_failure(
                    policy.id,
                    FulfillmentStep::DocumentRetrieval,
                    &err.to_string(),
                )
                .await?;
                return Ok(Err(FulfillmentStep::DocumentRetrieval));
            }
        };

        self.events
            .append(
                policy.id,
                LifecycleEvent::Completed {
                    document_path: document_path.clone(),
                },
            )
            .await?;
        info!(document_path, "fulfillment completed");

        self.notifier.policy_confirmed(policy).await;
        Ok(Ok(()))
    }

    async fn record_failure(
        &self,
        policy_id: PolicyId,
        step: FulfillmentStep,
        message: &str,
    ) -> Result<(), FulfillmentError> {
        warn!(step = %step, message, "fulfillment step failed");
        self.events
            .append(
                policy_id,
                LifecycleEvent::Failed {
                    step,
                    error_message: message.to_string(),
                    created_by: None,
                },
            )
            .await?;
        Ok(())
    }
}

/// The order from the most recent `ContractCreated`, if any
fn latest_order(events: &[RecordedEvent]) -> Option<ContractOrder> {
    events
        .iter()
        .filter_map(|e| match &e.event {
            LifecycleEvent::ContractCreated {
                order_id,
                policy_number,
                total_amount,
            } => Some((
                e.recorded_at,
                ContractOrder {
                    order_id: order_id.clone(),
                    policy_number: policy_number.clone(),
                    total_amount: *total_amount,
                },
            )),
            _ => None,
        })
        .max_by_key(|(at, _)| *at)
        .map(|(_, order)| order)
}

/// Whether the log shows a confirmation for this order
fn is_confirmed(events: &[RecordedEvent], order_id: &str) -> bool {
    events.iter().any(|e| {
        matches!(&e.event, LifecycleEvent::ContractConfirmed { order_id: confirmed }
            if confirmed == order_id)
    })
}
