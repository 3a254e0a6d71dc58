//! # Domain Error Types
//!
//! Errors produced by pure domain logic. I/O-level failures live in the
//! store and sync crates; this one only covers validation of domain data.

use thiserror::Error;

/// Errors from pure domain operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A table name that is not part of the cache registry.
    #[error("Unknown entity kind: '{0}'")]
    UnknownEntityKind(String),
}
