//! Storage Infrastructure
//!
//! PostgreSQL adapters for the domain storage ports: the append-only
//! lifecycle event log (one table, JSONB payloads, uniqueness guard for
//! payment events), policy and traveler records, and the account directory.
//! In-memory adapters with identical semantics back tests and development.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, PgEventStore};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! let events = PgEventStore::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::{PgAccountDirectory, PgEventStore, PgPolicyRepository};
pub use adapters::memory::{InMemoryAccountDirectory, InMemoryEventStore, InMemoryPolicyRepository};
