//! PostgreSQL repository implementations

pub mod events;
pub mod policies;

pub use events::PgEventStore;
pub use policies::{PgAccountDirectory, PgPolicyRepository};
