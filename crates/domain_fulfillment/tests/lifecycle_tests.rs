//! End-to-end lifecycle scenarios over in-memory ports

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use common::{
    CountingDispatcher, FakeGateway, MemoryDocs, MemoryEvents, MemoryPolicies, NullNotifier,
    ScriptedUnderwriting, StubAccounts,
};
use core_kernel::{Currency, Money, PolicyId};
use domain_fulfillment::{
    FulfillmentError, FulfillmentSaga, PaymentConfirmation, PaymentOutcome, PurchaseOrchestrator,
    PurchaseRequest, RefundWorkflow, SagaLocks, SagaOutcome, TravelerDetails,
};
use domain_policy::projector::{current_state, history};
use domain_policy::{EventStore, FulfillmentStep, PolicyState};
use domain_underwriting::UnderwritingError;

struct Harness {
    accounts: Arc<StubAccounts>,
    policies: Arc<MemoryPolicies>,
    events: Arc<MemoryEvents>,
    gateway: Arc<FakeGateway>,
    underwriting: Arc<ScriptedUnderwriting>,
    documents: Arc<MemoryDocs>,
    dispatcher: Arc<CountingDispatcher>,
    locks: SagaLocks,
}

impl Harness {
    fn new() -> Self {
        Self {
            accounts: Arc::new(StubAccounts::new()),
            policies: Arc::new(MemoryPolicies::new()),
            events: Arc::new(MemoryEvents::new()),
            gateway: Arc::new(FakeGateway::new()),
            underwriting: Arc::new(ScriptedUnderwriting::new()),
            documents: Arc::new(MemoryDocs::new()),
            dispatcher: Arc::new(CountingDispatcher::new()),
            locks: SagaLocks::new(),
        }
    }

    fn orchestrator(&self) -> PurchaseOrchestrator {
        PurchaseOrchestrator::new(
            self.accounts.clone(),
            self.policies.clone(),
            self.events.clone(),
            self.gateway.clone(),
        )
    }

    fn confirmation(&self) -> PaymentConfirmation {
        PaymentConfirmation::new(self.events.clone(), self.dispatcher.clone())
    }

    fn saga(&self) -> FulfillmentSaga {
        FulfillmentSaga::new(
            self.policies.clone(),
            self.events.clone(),
            self.underwriting.clone(),
            self.documents.clone(),
            Arc::new(NullNotifier),
            self.locks.clone(),
        )
    }

    fn refunds(&self) -> RefundWorkflow {
        RefundWorkflow::new(
            self.events.clone(),
            self.gateway.clone(),
            Arc::new(NullNotifier),
        )
    }

    async fn purchased_policy(&self) -> (PolicyId, String) {
        let receipt = self
            .orchestrator()
            .purchase(purchase_request())
            .await
            .expect("purchase should succeed");
        (receipt.policy.id, receipt.checkout.id)
    }

    async fn paid_policy(&self) -> PolicyId {
        let (policy_id, session) = self.purchased_policy().await;
        let outcome = self
            .confirmation()
            .record_payment(policy_id, &session, "pi_1", usd(129))
            .await
            .expect("payment should record");
        assert_eq!(outcome, PaymentOutcome::Recorded);
        policy_id
    }

    async fn states(&self, policy_id: PolicyId) -> Vec<PolicyState> {
        let events = self.events.events_for(policy_id).await.unwrap();
        history(&events).into_iter().map(|e| e.state).collect()
    }

    async fn state(&self, policy_id: PolicyId) -> Option<PolicyState> {
        let events = self.events.events_for(policy_id).await.unwrap();
        current_state(&events)
    }
}

fn usd(amount: i64) -> Money {
    Money::new(rust_decimal::Decimal::from(amount), Currency::USD)
}

fn purchase_request() -> PurchaseRequest {
    PurchaseRequest {
        email: "traveler@example.com".to_string(),
        trip_start: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        trip_end: NaiveDate::from_ymd_opt(2025, 9, 10).unwrap(),
        departure_country: "US".to_string(),
        destination_countries: vec!["JP".to_string()],
        tier_level: 2,
        locality_code: "APAC".to_string(),
        quoted_price: Money::new(dec!(129.00), Currency::USD),
        travelers: vec![TravelerDetails {
            first_name: "Noa".to_string(),
            last_name: "Tanaka".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1993, 11, 2).unwrap(),
            passport_number: "TR9913427".to_string(),
            passport_country: "US".to_string(),
        }],
    }
}

#[tokio::test]
async fn purchase_records_pending_payment() {
    let harness = Harness::new();
    let (policy_id, session) = harness.purchased_policy().await;

    assert!(session.starts_with("cs_"));
    assert_eq!(
        harness.state(policy_id).await,
        Some(PolicyState::PendingPayment)
    );
}

#[tokio::test]
async fn checkout_failure_leaves_no_pending_state() {
    let harness = Harness::new();
    harness
        .gateway
        .fail_checkout
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let err = harness
        .orchestrator()
        .purchase(purchase_request())
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::PaymentGateway(_)));
    // The policy row persists for retry, but no event was written
    assert_eq!(harness.policies.len(), 1);
    assert_eq!(harness.events.total_events(), 0);
}

#[tokio::test]
async fn duplicate_payment_notification_is_idempotent() {
    let harness = Harness::new();
    let (policy_id, session) = harness.purchased_policy().await;
    let confirmation = harness.confirmation();

    let first = confirmation
        .record_payment(policy_id, &session, "pi_1", usd(129))
        .await
        .unwrap();
    let second = confirmation
        .record_payment(policy_id, &session, "pi_1", usd(129))
        .await
        .unwrap();

    assert_eq!(first, PaymentOutcome::Recorded);
    assert_eq!(second, PaymentOutcome::AlreadyRecorded);

    let states = harness.states(policy_id).await;
    assert_eq!(
        states,
        vec![PolicyState::PendingPayment, PolicyState::PaymentReceived]
    );
    // Exactly one saga dispatch for the two deliveries
    assert_eq!(harness.dispatcher.fulfillment_count(), 1);
}

#[tokio::test]
async fn concurrent_payment_notifications_record_once() {
    let harness = Harness::new();
    let (policy_id, session) = harness.purchased_policy().await;
    let confirmation = Arc::new(harness.confirmation());

    let a = {
        let confirmation = confirmation.clone();
        let session = session.clone();
        tokio::spawn(async move {
            confirmation
                .record_payment(policy_id, &session, "pi_1", usd(129))
                .await
        })
    };
    let b = {
        let confirmation = confirmation.clone();
        let session = session.clone();
        tokio::spawn(async move {
            confirmation
                .record_payment(policy_id, &session, "pi_1", usd(129))
                .await
        })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

    // Both deliveries succeed, exactly one recorded and one dispatched
    let recorded = [a, b]
        .iter()
        .filter(|o| **o == PaymentOutcome::Recorded)
        .count();
    assert_eq!(recorded, 1);
    assert_eq!(harness.dispatcher.fulfillment_count(), 1);

    let states = harness.states(policy_id).await;
    assert_eq!(
        states
            .iter()
            .filter(|s| **s == PolicyState::PaymentReceived)
            .count(),
        1
    );
}

#[tokio::test]
async fn full_fulfillment_reaches_completed() {
    let harness = Harness::new();
    let policy_id = harness.paid_policy().await;

    let outcome = harness.saga().run(policy_id).await.unwrap();
    assert_eq!(outcome, SagaOutcome::Completed);

    assert_eq!(
        harness.states(policy_id).await,
        vec![
            PolicyState::PendingPayment,
            PolicyState::PaymentReceived,
            PolicyState::ContractCreated,
            PolicyState::ContractConfirmed,
            PolicyState::Completed,
        ]
    );
    assert_eq!(harness.documents.stored.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn business_rejection_halts_then_retry_resumes() {
    let harness = Harness::new();
    let policy_id = harness.paid_policy().await;

    // Step 2 rejects on the first run
    harness.underwriting.script_confirm(Err(
        UnderwritingError::rejected(Some("NOT_CONFIRMABLE".into()), "manual review required"),
    ));

    let saga = harness.saga();
    let outcome = saga.run(policy_id).await.unwrap();
    assert_eq!(
        outcome,
        SagaOutcome::Failed(FulfillmentStep::ContractConfirmation)
    );
    assert_eq!(harness.state(policy_id).await, Some(PolicyState::Failed));
    assert_eq!(
        harness.states(policy_id).await,
        vec![
            PolicyState::PendingPayment,
            PolicyState::PaymentReceived,
            PolicyState::ContractCreated,
            PolicyState::Failed,
        ]
    );

    // Operator retry: confirm now succeeds; the contract is never re-created
    let outcome = saga.run(policy_id).await.unwrap();
    assert_eq!(outcome, SagaOutcome::Completed);
    assert_eq!(harness.underwriting.created(), 1);
    assert_eq!(harness.underwriting.confirmed(), 2);
    assert_eq!(harness.underwriting.fetched(), 1);
    assert_eq!(harness.state(policy_id).await, Some(PolicyState::Completed));
}

#[tokio::test]
async fn transient_exhaustion_is_recorded_as_failure() {
    let harness = Harness::new();
    let policy_id = harness.paid_policy().await;

    harness.underwriting.script_create(Err(UnderwritingError::Transient {
        message: "connect timeout".into(),
        attempts: 3,
    }));

    let outcome = harness.saga().run(policy_id).await.unwrap();
    assert_eq!(
        outcome,
        SagaOutcome::Failed(FulfillmentStep::ContractCreation)
    );
    assert_eq!(harness.state(policy_id).await, Some(PolicyState::Failed));
}

#[tokio::test]
async fn saga_without_payment_is_not_eligible() {
    let harness = Harness::new();
    let (policy_id, _session) = harness.purchased_policy().await;

    let outcome = harness.saga().run(policy_id).await.unwrap();
    assert_eq!(outcome, SagaOutcome::NotEligible);
    assert_eq!(harness.underwriting.created(), 0);
}

#[tokio::test]
async fn saga_is_single_flight_per_policy() {
    let harness = Harness::new();
    let policy_id = harness.paid_policy().await;
    let events_before = harness.events.total_events();

    // Simulate an execution in flight by holding the claim
    let _claim = harness.locks.try_claim(policy_id).unwrap();

    let outcome = harness.saga().run(policy_id).await.unwrap();
    assert_eq!(outcome, SagaOutcome::AlreadyRunning);

    // The loser made no external calls and appended nothing
    assert_eq!(harness.underwriting.created(), 0);
    assert_eq!(harness.events.total_events(), events_before);
}

#[tokio::test]
async fn completed_policy_is_not_refulfilled() {
    let harness = Harness::new();
    let policy_id = harness.paid_policy().await;

    let saga = harness.saga();
    assert_eq!(saga.run(policy_id).await.unwrap(), SagaOutcome::Completed);
    assert_eq!(
        saga.run(policy_id).await.unwrap(),
        SagaOutcome::AlreadyCompleted
    );
    assert_eq!(harness.underwriting.created(), 1);
    assert_eq!(harness.underwriting.fetched(), 1);
}

#[tokio::test]
async fn refund_requires_a_recorded_payment() {
    let harness = Harness::new();
    let (policy_id, _session) = harness.purchased_policy().await;
    let events_before = harness.events.total_events();

    let err = harness
        .refunds()
        .initiate_refund(policy_id, "customer request", "ops@example.com")
        .await
        .unwrap_err();

    assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
    assert_eq!(harness.events.total_events(), events_before);
}

#[tokio::test]
async fn refund_settles_against_latest_payment() {
    let harness = Harness::new();
    let policy_id = harness.paid_policy().await;

    let refunds = harness.refunds();
    refunds
        .initiate_refund(policy_id, "trip cancelled", "ops@example.com")
        .await
        .unwrap();
    assert_eq!(
        harness.state(policy_id).await,
        Some(PolicyState::RefundInitiated)
    );

    refunds.process(policy_id).await.unwrap();
    assert_eq!(harness.state(policy_id).await, Some(PolicyState::Refunded));
    assert_eq!(harness.gateway.refund_calls(), 1);

    // Re-processing is a quiet no-op
    refunds.process(policy_id).await.unwrap();
    assert_eq!(harness.gateway.refund_calls(), 1);
}

#[tokio::test]
async fn second_refund_initiation_is_rejected() {
    let harness = Harness::new();
    let policy_id = harness.paid_policy().await;

    let refunds = harness.refunds();
    refunds
        .initiate_refund(policy_id, "trip cancelled", "ops@example.com")
        .await
        .unwrap();
    refunds.process(policy_id).await.unwrap();

    let err = refunds
        .initiate_refund(policy_id, "again", "ops@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::InvalidTransition(_)));
}
