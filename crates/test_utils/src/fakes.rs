//! Programmable fakes for the collaborator ports
//!
//! Each fake succeeds with deterministic data unless told otherwise, and
//! counts its calls so tests can assert on interaction shape.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, PolicyId};
use domain_fulfillment::{
    CheckoutMetadata, CheckoutSession, DocumentError, DocumentStore, PaymentError, PaymentGateway,
    PolicyNotifier, RefundReceipt,
};
use domain_policy::{Policy, Traveler};
use domain_underwriting::{ContractOrder, Quote, QuoteRequest, UnderwritingApi, UnderwritingError};

/// Underwriting fake with scripted per-operation results and call counters
///
/// Unscripted calls succeed: quotes price at 129.00 USD, contracts are
/// issued as `ord-1`, documents come back as PDF bytes.
#[derive(Default)]
pub struct FakeUnderwriting {
    create_script: Mutex<VecDeque<Result<ContractOrder, UnderwritingError>>>,
    confirm_script: Mutex<VecDeque<Result<(), UnderwritingError>>>,
    fetch_script: Mutex<VecDeque<Result<Vec<u8>, UnderwritingError>>>,
    create_calls: AtomicU32,
    confirm_calls: AtomicU32,
    fetch_calls: AtomicU32,
}

impl FakeUnderwriting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next `create_contract` result
    pub fn script_create(&self, result: Result<ContractOrder, UnderwritingError>) {
        self.create_script
            .lock()
            .expect("script lock")
            .push_back(result);
    }

    /// Queues the next `confirm_contract` result
    pub fn script_confirm(&self, result: Result<(), UnderwritingError>) {
        self.confirm_script
            .lock()
            .expect("script lock")
            .push_back(result);
    }

    /// Queues the next `fetch_document` result
    pub fn script_fetch(&self, result: Result<Vec<u8>, UnderwritingError>) {
        self.fetch_script
            .lock()
            .expect("script lock")
            .push_back(result);
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn confirm_calls(&self) -> u32 {
        self.confirm_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UnderwritingApi for FakeUnderwriting {
    async fn quote_price(&self, _request: &QuoteRequest) -> Result<Quote, UnderwritingError> {
        Ok(Quote {
            price: Money::new(dec!(129.00), Currency::USD),
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
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| {
                Ok(ContractOrder {
                    order_id: "ord-1".to_string(),
                    policy_number: "TP-2025-0001".to_string(),
                    total_amount: dec!(129.00),
                })
            })
    }

    async fn confirm_contract(&self, _order_id: &str) -> Result<(), UnderwritingError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        self.confirm_script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn fetch_document(&self, _order_id: &str) -> Result<Vec<u8>, UnderwritingError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok(b"%PDF-1.7 issued".to_vec()))
    }

    async fn cancel_contract(&self, _order_id: &str) -> Result<(), UnderwritingError> {
        Ok(())
    }
}

/// Payment gateway fake with switchable checkout failure
#[derive(Default)]
pub struct FakePaymentGateway {
    /// When set, `create_checkout_session` fails with a connection error
    pub fail_checkout: AtomicBool,
    sessions: AtomicU32,
    refunds: AtomicU32,
}

impl FakePaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_checkout(&self) {
        self.fail_checkout.store(true, Ordering::SeqCst);
    }

    pub fn refund_calls(&self) -> u32 {
        self.refunds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    async fn create_checkout_session(
        &self,
        _amount: Money,
        _metadata: CheckoutMetadata,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail_checkout.swap(false, Ordering::SeqCst) {
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

/// Document store keeping bytes in memory
#[derive(Default)]
pub struct InMemoryDocumentStore {
    stored: Mutex<Vec<(PolicyId, Vec<u8>)>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored_count(&self) -> usize {
        self.stored.lock().expect("store lock").len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn store_policy_document(
        &self,
        policy_id: PolicyId,
        bytes: &[u8],
    ) -> Result<String, DocumentError> {
        self.stored
            .lock()
            .expect("store lock")
            .push((policy_id, bytes.to_vec()));
        Ok(format!("documents/{policy_id}.pdf"))
    }
}

/// Notifier counting what it was asked to send
#[derive(Default)]
pub struct CountingNotifier {
    confirmations: AtomicU32,
    refunds: AtomicU32,
}

impl CountingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmations(&self) -> u32 {
        self.confirmations.load(Ordering::SeqCst)
    }

    pub fn refund_notices(&self) -> u32 {
        self.refunds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyNotifier for CountingNotifier {
    async fn policy_confirmed(&self, _policy: &Policy) {
        self.confirmations.fetch_add(1, Ordering::SeqCst);
    }

    async fn refund_processed(&self, _policy_id: PolicyId, _amount: Money) {
        self.refunds.fetch_add(1, Ordering::SeqCst);
    }
}
