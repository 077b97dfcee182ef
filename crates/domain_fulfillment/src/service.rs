//! Policy lifecycle façade
//!
//! One service exposing exactly the operations callers get: purchase,
//! payment recording, state and history reads, operator retry, and refunds.
//! The interface layer stays a thin translation over this.

use std::sync::Arc;

use tracing::instrument;

use core_kernel::{Money, PolicyId};
use domain_policy::{EventStore, PolicyRepository, PolicyState, StateEntry, StateProjector};
use domain_underwriting::{Quote, QuoteRequest, UnderwritingApi, UnderwritingError};

use crate::dispatch::{JobDispatcher, WorkerPool};
use crate::error::FulfillmentError;
use crate::payment::{PaymentConfirmation, PaymentOutcome};
use crate::ports::{AccountDirectory, DocumentStore, PaymentGateway, PolicyNotifier};
use crate::purchase::{PurchaseOrchestrator, PurchaseReceipt, PurchaseRequest};
use crate::refund::RefundWorkflow;
use crate::saga::FulfillmentSaga;
use crate::singleflight::SagaLocks;

/// The policy lifecycle service
pub struct PolicyLifecycle {
    purchases: PurchaseOrchestrator,
    confirmation: PaymentConfirmation,
    projector: StateProjector,
    refunds: Arc<RefundWorkflow>,
    underwriting: Arc<dyn UnderwritingApi>,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl PolicyLifecycle {
    /// Wires the full service graph over the given ports
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        policies: Arc<dyn PolicyRepository>,
        events: Arc<dyn EventStore>,
        payments: Arc<dyn PaymentGateway>,
        underwriting: Arc<dyn UnderwritingApi>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn PolicyNotifier>,
    ) -> Self {
        let saga = Arc::new(FulfillmentSaga::new(
            Arc::clone(&policies),
            Arc::clone(&events),
            Arc::clone(&underwriting),
            documents,
            Arc::clone(&notifier),
            SagaLocks::new(),
        ));
        let refunds = Arc::new(RefundWorkflow::new(
            Arc::clone(&events),
            Arc::clone(&payments),
            notifier,
        ));
        let dispatcher: Arc<dyn JobDispatcher> =
            Arc::new(WorkerPool::new(saga, Arc::clone(&refunds)));

        Self {
            purchases: PurchaseOrchestrator::new(
                accounts,
                policies,
                Arc::clone(&events),
                payments,
            ),
            confirmation: PaymentConfirmation::new(
                Arc::clone(&events),
                Arc::clone(&dispatcher),
            ),
            projector: StateProjector::new(events),
            refunds,
            underwriting,
            dispatcher,
        }
    }

    /// Prices a trip via the underwriting service
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, UnderwritingError> {
        self.underwriting.quote_price(request).await
    }

    /// Purchases a policy and opens its checkout session
    pub async fn purchase(
        &self,
        request: PurchaseRequest,
    ) -> Result<PurchaseReceipt, FulfillmentError> {
        self.purchases.purchase(request).await
    }

    /// Records a checkout-completed notification, idempotently
    pub async fn record_payment(
        &self,
        policy_id: PolicyId,
        checkout_session_id: &str,
        payment_intent_id: &str,
        amount: Money,
    ) -> Result<PaymentOutcome, FulfillmentError> {
        self.confirmation
            .record_payment(policy_id, checkout_session_id, payment_intent_id, amount)
            .await
    }

    /// Returns the policy's derived current state, if it has any events
    pub async fn current_state(
        &self,
        policy_id: PolicyId,
    ) -> Result<Option<PolicyState>, FulfillmentError> {
        Ok(self.projector.current_state(policy_id).await?)
    }

    /// Returns the policy's full ordered state history
    pub async fn history(&self, policy_id: PolicyId) -> Result<Vec<StateEntry>, FulfillmentError> {
        Ok(self.projector.history(policy_id).await?)
    }

    /// Operator action: re-dispatches fulfillment for a failed policy
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the current state is `failed`.
    #[instrument(skip(self), fields(policy_id = %policy_id))]
    pub async fn retry_fulfillment(&self, policy_id: PolicyId) -> Result<(), FulfillmentError> {
        match self.projector.current_state(policy_id).await? {
            Some(PolicyState::Failed) => {
                self.dispatcher.dispatch_fulfillment(policy_id);
                Ok(())
            }
            other => Err(FulfillmentError::InvalidTransition(format!(
                "retry is only valid from failed, current state is {}",
                other.map(|s| s.as_str()).unwrap_or("absent")
            ))),
        }
    }

    /// Operator action: initiates a refund and dispatches its settlement
    pub async fn initiate_refund(
        &self,
        policy_id: PolicyId,
        reason: &str,
        initiated_by: &str,
    ) -> Result<(), FulfillmentError> {
        self.refunds
            .initiate_refund(policy_id, reason, initiated_by)
            .await?;
        self.dispatcher.dispatch_refund(policy_id);
        Ok(())
    }
}
