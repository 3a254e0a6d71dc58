//! # Store Error Types
//!
//! Error types for cache database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (vela-sync) ← StorageUnavailable stays fatal,               │
//! │       │                  everything else fail-softs per step           │
//! │       ▼                                                                 │
//! │  App Initializer halts or degrades                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Cache store operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Persistent storage could not be opened or created.
    ///
    /// ## When This Occurs
    /// - Database file can't be created (permissions, disk full)
    /// - Platform denies persistent storage
    ///
    /// This is the only fatal store error: nothing else can proceed
    /// without a local store, so the App Initializer halts on it.
    #[error("Persistent storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A record destined for the cache has no usable `id` field.
    #[error("Record for table '{table}' is missing a string 'id' field")]
    InvalidRecord { table: String },

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Whole-table replace transaction failed; the previous snapshot is
    /// still intact.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Cached payload could not be (de)serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal store error.
    #[error("Internal store error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database      → QueryFailed (message preserved)
/// sqlx::Error::PoolTimedOut  → PoolExhausted
/// sqlx::Error::PoolClosed    → StorageUnavailable
/// sqlx::Error::Io            → StorageUnavailable
/// Other                      → Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => {
                StoreError::StorageUnavailable("Pool is closed".to_string())
            }
            sqlx::Error::Io(io) => StoreError::StorageUnavailable(io.to_string()),
            other => StoreError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl StoreError {
    /// Returns true when the app cannot function at all (no local storage).
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_storage_unavailable_is_fatal() {
        assert!(StoreError::StorageUnavailable("quota denied".into()).is_fatal());
        assert!(!StoreError::QueryFailed("syntax".into()).is_fatal());
        assert!(!StoreError::PoolExhausted.is_fatal());
    }
}
