//! Policy Fulfillment
//!
//! Everything that moves a policy through its lifecycle: the purchase
//! orchestrator, the idempotent payment confirmation handler, the resumable
//! fulfillment saga, and the refund workflow.
//!
//! # Scheduling model
//!
//! Purchase and payment confirmation run synchronously inside the triggering
//! request. The saga and the refund's external-call phase run on the tokio
//! worker pool, dispatched only after the triggering event is durably
//! appended. At-least-once dispatch is safe: the saga is resumable and
//! protected by a per-policy single-flight claim.
//!
//! # Failure model
//!
//! Validation and invalid-transition errors return synchronously to the
//! caller. Underwriting errors inside the saga - business rejections
//! immediately, transient ones once the client's retry budget is spent -
//! are captured as `Failed` events, never raised to the worker pool.

pub mod ports;
pub mod purchase;
pub mod payment;
pub mod saga;
pub mod singleflight;
pub mod refund;
pub mod dispatch;
pub mod service;
pub mod adapters;
pub mod error;

pub use ports::{
    AccountDirectory, AccountError, CheckoutMetadata, CheckoutSession, DocumentError,
    DocumentStore, PaymentError, PaymentGateway, PolicyNotifier, RefundReceipt,
};
pub use purchase::{PurchaseOrchestrator, PurchaseReceipt, PurchaseRequest, TravelerDetails};
pub use payment::{PaymentConfirmation, PaymentOutcome};
pub use saga::{FulfillmentSaga, SagaOutcome};
pub use singleflight::{SagaClaim, SagaLocks};
pub use refund::RefundWorkflow;
pub use dispatch::{JobDispatcher, WorkerPool};
pub use service::PolicyLifecycle;
pub use error::FulfillmentError;
