//! # Sync Error Types
//!
//! Error types for sync and search operations.
//!
//! ## Propagation Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Where Errors Stop                                 │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Storage init   │  │  Sync step      │  │  Search job             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Propagates to  │  │  Swallowed at   │  │  Never escapes the      │ │
//! │  │  AppInitializer │  │  engine level,  │  │  manager: becomes job   │ │
//! │  │  (the only one  │  │  becomes failed │  │  status = failed;       │ │
//! │  │  allowed to     │  │  StepOutcome    │  │  callers subscribe to   │ │
//! │  │  halt the app)  │  │                 │  │  status updates         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use vela_store::StoreError;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering sync, search, and startup failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid remote base URL.
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Connectivity / Remote Errors
    // =========================================================================
    /// The device is offline (or the backend is unreachable).
    #[error("Offline: remote API is unreachable")]
    Offline,

    /// Remote request failed (network-level).
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Remote returned a non-success status.
    #[error("Remote API error: HTTP {status}")]
    RemoteStatus { status: u16 },

    /// Remote response could not be decoded.
    #[error("Malformed remote response: {0}")]
    MalformedResponse(String),

    /// A sync step exceeded its time budget.
    #[error("Step '{step}' timed out after {seconds} seconds")]
    StepTimeout { step: String, seconds: u64 },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Local store failure. `StorageUnavailable` inside is the only fatal
    /// case; everything else fail-softs per step.
    #[error("Local store error: {0}")]
    Storage(#[from] StoreError),

    // =========================================================================
    // Startup Errors
    // =========================================================================
    /// Cold device with no connectivity and no cache: cannot become ready.
    #[error("No internet connection and no cached data")]
    NoDataNoNetwork,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::MalformedResponse(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            // Connection-level failures read as "offline" so callers can
            // fall back to the cache.
            SyncError::Offline
        } else if let Some(status) = err.status() {
            SyncError::RemoteStatus {
                status: status.as_u16(),
            }
        } else if err.is_decode() {
            SyncError::MalformedResponse(err.to_string())
        } else {
            SyncError::RequestFailed(err.to_string())
        }
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true for connectivity-class failures: the kind where the
    /// search manager falls back to the local cache and the sync engine
    /// treats the run as offline rather than broken.
    pub fn is_connectivity_error(&self) -> bool {
        matches!(
            self,
            SyncError::Offline | SyncError::RequestFailed(_) | SyncError::StepTimeout { .. }
        )
    }

    /// Returns true if this error is recoverable by retrying later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Offline
                | SyncError::RequestFailed(_)
                | SyncError::StepTimeout { .. }
                | SyncError::RemoteStatus { status: 500..=599 }
        )
    }

    /// Returns true when the app cannot run at all.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Storage(e) => e.is_fatal(),
            SyncError::NoDataNoNetwork => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::Offline.is_retryable());
        assert!(SyncError::RemoteStatus { status: 503 }.is_retryable());
        assert!(SyncError::StepTimeout {
            step: "products".into(),
            seconds: 30
        }
        .is_retryable());

        assert!(!SyncError::RemoteStatus { status: 404 }.is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(SyncError::Offline.is_connectivity_error());
        assert!(!SyncError::RemoteStatus { status: 500 }.is_connectivity_error());
        assert!(!SyncError::MalformedResponse("x".into()).is_connectivity_error());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(SyncError::Storage(StoreError::StorageUnavailable("denied".into())).is_fatal());
        assert!(!SyncError::Storage(StoreError::PoolExhausted).is_fatal());
        assert!(SyncError::NoDataNoNetwork.is_fatal());
    }
}
