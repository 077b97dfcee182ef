//! Test doubles for the fulfillment ports

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use core_kernel::{AccountId, Money, PolicyId};
use domain_fulfillment::{
    AccountDirectory, AccountError, CheckoutMetadata, CheckoutSession, DocumentError,
    DocumentStore, JobDispatcher, PaymentError, PaymentGateway, PolicyNotifier, RefundReceipt,
};
use domain_policy::{
    EventStore, LifecycleEvent, Policy, PolicyRepository, RecordedEvent, StoreError, Traveler,
};
use domain_underwriting::{ContractOrder, Quote, QuoteRequest, UnderwritingApi, UnderwritingError};

/// Event store over a mutex-guarded log, uniqueness checked under the lock
#[derive(Default)]
pub struct MemoryEvents {
    inner: Mutex<MemoryLog>,
}

#[derive(Default)]
struct MemoryLog {
    events: HashMap<PolicyId, Vec<RecordedEvent>>,
    payment_sessions: HashSet<(PolicyId, String)>,
}

impl MemoryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_events(&self) -> usize {
        let log = self.inner.lock().unwrap();
        log.events.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventStore for MemoryEvents {
    async fn append(
        &self,
        policy_id: PolicyId,
        event: LifecycleEvent,
    ) -> Result<RecordedEvent, StoreError> {
        let recorded = RecordedEvent::new(policy_id, event);
        let mut log = self.inner.lock().unwrap();
        if let Some(session) = recorded.event.payment_session_guard() {
            let key = (policy_id, session.to_string());
            if !log.payment_sessions.insert(key) {
                return Err(StoreError::DuplicatePayment {
                    checkout_session_id: session.to_string(),
                });
            }
        }
        log.events.entry(policy_id).or_default().push(recorded.clone());
        Ok(recorded)
    }

    async fn events_for(&self, policy_id: PolicyId) -> Result<Vec<RecordedEvent>, StoreError> {
        let log = self.inner.lock().unwrap();
        Ok(log.events.get(&policy_id).cloned().unwrap_or_default())
    }
}

/// Policy repository over a map
#[derive(Default)]
pub struct MemoryPolicies {
    inner: Mutex<HashMap<PolicyId, (Policy, Vec<Traveler>)>>,
}

impl MemoryPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[async_trait]
impl PolicyRepository for MemoryPolicies {
    async fn insert(&self, policy: &Policy, travelers: &[Traveler]) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .insert(policy.id, (policy.clone(), travelers.to_vec()));
        Ok(())
    }

    async fn get(
        &self,
        policy_id: PolicyId,
    ) -> Result<Option<(Policy, Vec<Traveler>)>, StoreError> {
        Ok(self.inner.lock().unwrap().get(&policy_id).cloned())
    }

    async fn find_by_account(&self, account_id: AccountId) -> Result<Vec<Policy>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|(p, _)| p.account_id == account_id)
            .map(|(p, _)| p.clone())
            .collect())
    }
}

/// Account directory handing out a stable id per email
#[derive(Default)]
pub struct StubAccounts {
    inner: Mutex<HashMap<String, AccountId>>,
}

impl StubAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for StubAccounts {
    async fn resolve_or_create(&self, email: &str) -> Result<AccountId, AccountError> {
        Ok(*self
            .inner
            .lock()
            .unwrap()
            .entry(email.to_string())
            .or_insert_with(AccountId::new))
    }
}

/// Payment gateway with a switchable checkout failure and counted refunds
#[derive(Default)]
pub struct FakeGateway {
    pub fail_checkout: AtomicBool,
    sessions: AtomicU32,
    refunds: AtomicU32,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refund_calls(&self) -> u32 {
        self.refunds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        _amount: Money,
        _metadata: CheckoutMetadata,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(PaymentError::Connection("gateway offline".to_string()));
        }
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CheckoutSession {
            id: format!("cs_{n}"),
            url: Some(format!("https://pay.example.com/cs_{n}")),
        })
    }

    async fn create_refund(
        &self,
        _payment_intent_id: &str,
        amount: Money,
    ) -> Result<RefundReceipt, PaymentError> {
        let n = self.refunds.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RefundReceipt {
            refund_id: format!("re_{n}"),
            amount,
        })
    }
}

/// Underwriting client with scripted step results and call counters
///
/// Unscripted calls succeed with deterministic data, so only the interesting
/// step needs scripting.
#[derive(Default)]
pub struct ScriptedUnderwriting {
    create_script: Mutex<VecDeque<Result<ContractOrder, UnderwritingError>>>,
    confirm_script: Mutex<VecDeque<Result<(), UnderwritingError>>>,
    fetch_script: Mutex<VecDeque<Result<Vec<u8>, UnderwritingError>>>,
    pub create_calls: AtomicU32,
    pub confirm_calls: AtomicU32,
    pub fetch_calls: AtomicU32,
}

impl ScriptedUnderwriting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_create(&self, result: Result<ContractOrder, UnderwritingError>) {
        self.create_script.lock().unwrap().push_back(result);
    }

    pub fn script_confirm(&self, result: Result<(), UnderwritingError>) {
        self.confirm_script.lock().unwrap().push_back(result);
    }

    pub fn script_fetch(&self, result: Result<Vec<u8>, UnderwritingError>) {
        self.fetch_script.lock().unwrap().push_back(result);
    }

    pub fn created(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn confirmed(&self) -> u32 {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn default_order() -> ContractOrder {
        ContractOrder {
            order_id: "ord-1".to_string(),
            policy_number: "TP-2025-0001".to_string(),
            total_amount: dec!(129.00),
        }
    }
}

#[async_trait]
impl UnderwritingApi for ScriptedUnderwriting {
    async fn quote_price(&self, _request: &QuoteRequest) -> Result<Quote, UnderwritingError> {
        Ok(Quote {
            price: Money::new(dec!(129.00), core_kernel::Currency::USD),
        })
    }

    async fn create_contract(
        &self,
        _policy: &Policy,
        _travelers: &[Traveler],
    ) -> Result<ContractOrder, UnderwritingError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::default_order()))
    }

    async fn confirm_contract(&self, _order_id: &str) -> Result<(), UnderwritingError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        self.confirm_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn fetch_document(&self, _order_id: &str) -> Result<Vec<u8>, UnderwritingError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(b"%PDF-1.7 issued".to_vec()))
    }

    async fn cancel_contract(&self, _order_id: &str) -> Result<(), UnderwritingError> {
        Ok(())
    }
}

/// Document store recording what it was given
#[derive(Default)]
pub struct MemoryDocs {
    pub stored: Mutex<Vec<(PolicyId, usize)>>,
}

impl MemoryDocs {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocs {
    async fn store_policy_document(
        &self,
        policy_id: PolicyId,
        bytes: &[u8],
    ) -> Result<String, DocumentError> {
        self.stored.lock().unwrap().push((policy_id, bytes.len()));
        Ok(format!("docs/{policy_id}.pdf"))
    }
}

/// Notifier that swallows everything
#[derive(Default)]
pub struct NullNotifier;

#[async_trait]
impl PolicyNotifier for NullNotifier {
    async fn policy_confirmed(&self, _policy: &Policy) {}
    async fn refund_processed(&self, _policy_id: PolicyId, _amount: Money) {}
}

/// Dispatcher that records instead of spawning
#[derive(Default)]
pub struct CountingDispatcher {
    pub fulfillments: Mutex<Vec<PolicyId>>,
    pub refunds: Mutex<Vec<PolicyId>>,
}

impl CountingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fulfillment_count(&self) -> usize {
        self.fulfillments.lock().unwrap().len()
    }
}

impl JobDispatcher for CountingDispatcher {
    fn dispatch_fulfillment(&self, policy_id: PolicyId) {
        self.fulfillments.lock().unwrap().push(policy_id);
    }

    fn dispatch_refund(&self, policy_id: PolicyId) {
        self.refunds.lock().unwrap().push(policy_id);
    }
}
