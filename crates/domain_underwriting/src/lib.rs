//! Underwriting Service Integration
//!
//! A narrow client for the external underwriting service: price quoting,
//! contract creation and confirmation, refund-side cancellation, and policy
//! document retrieval.
//!
//! The domain owns the port (`UnderwritingApi`); the HTTP adapter implements
//! it with transport-level retry and backoff. Errors are split into a
//! transient kind (timeouts, connection failures, 429/5xx - retried up to a
//! bound) and a business kind (explicit rejection payloads - never retried),
//! so the fulfillment workflow can classify failures without inspecting
//! transport details.

pub mod ports;
pub mod types;
pub mod error;
pub mod adapters;

pub use ports::UnderwritingApi;
pub use types::{ContractOrder, Quote, QuoteRequest};
pub use error::UnderwritingError;
pub use adapters::http::{HttpUnderwritingClient, RetryPolicy, UnderwritingConfig};
