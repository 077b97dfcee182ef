//! Database error types

use thiserror::Error;

use domain_policy::StoreError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

impl DatabaseError {
    /// Checks if this error is a unique-constraint violation
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DatabaseError::DuplicateEntry(_))
    }
}

/// Maps SQLx errors by PostgreSQL error code
///
/// 23505 (unique_violation) is the one code with domain meaning here: it is
/// how the payment idempotency guard reports a redelivery.
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut => {
                DatabaseError::ConnectionFailed("connection pool exhausted".to_string())
            }
            sqlx::Error::Database(db_err) => {
                if db_err.code().as_deref() == Some("23505") {
                    DatabaseError::DuplicateEntry(db_err.message().to_string())
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(error.to_string()),
        }
    }
}

impl From<DatabaseError> for StoreError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::SerializationError(msg) => StoreError::Serialization(msg),
            other => StoreError::Connection(other.to_string()),
        }
    }
}
