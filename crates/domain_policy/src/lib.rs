//! Travel Policy Domain
//!
//! This crate implements the policy lifecycle core: the immutable policy and
//! traveler records created at purchase time, the append-only lifecycle event
//! log, and the projector that derives a policy's current state and history
//! from its events.
//!
//! # Lifecycle
//!
//! ```text
//! pending_payment -> payment_received -> contract_created
//!     -> contract_confirmed -> completed
//!
//! failed            reachable from any fulfillment step, resumable
//! refund_initiated  -> refunded (operator triggered, requires a payment)
//! ```
//!
//! A policy's state is never stored; it is a pure function of its event set.
//! Events are appended, never updated or deleted.

pub mod policy;
pub mod events;
pub mod store;
pub mod projector;
pub mod error;

pub use policy::{Policy, PolicyBuilder, Traveler, CoverageTier};
pub use events::{LifecycleEvent, RecordedEvent, PolicyState, FulfillmentStep};
pub use store::{EventStore, PolicyRepository, StoreError};
pub use projector::{StateProjector, StateEntry, current_state, history};
pub use error::PolicyError;
