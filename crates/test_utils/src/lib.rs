//! Shared test utilities for the policy lifecycle test suite
//!
//! Builders construct domain values with sensible defaults; fakes stand in
//! for the external collaborators so suites can script underwriting and
//! payment behavior deterministically. The in-memory storage adapters come
//! from `infra_db` and are re-exported for convenience.

pub mod builders;
pub mod fakes;

pub use builders::{PurchaseRequestBuilder, RecordedEventBuilder, TravelerDetailsBuilder};
pub use fakes::{CountingNotifier, FakePaymentGateway, FakeUnderwriting, InMemoryDocumentStore};
pub use infra_db::{InMemoryAccountDirectory, InMemoryEventStore, InMemoryPolicyRepository};
