//! # Sync Configuration
//!
//! TOML-backed configuration for the sync engine and search manager.
//!
//! ## Config File Location
//! - Linux: `~/.config/vela-pos/sync.toml`
//! - macOS: `~/Library/Application Support/com.vela.pos/sync.toml`
//! - Windows: `%APPDATA%\vela\pos\config\sync.toml`
//!
//! ## Example Config
//! ```toml
//! [remote]
//! base_url = "https://api.vela.example/v1"
//! page_size = 100
//! step_timeout_secs = 30
//!
//! [cache]
//! stale_after_secs = 300
//!
//! [search]
//! page_size = 25
//! progress_tick_ms = 400
//!
//! [device]
//! id = "generated-on-first-run"
//! name = "Front Counter"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Remote API Configuration
// =============================================================================

/// Configuration for the remote data API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote API (e.g., "https://api.vela.example/v1").
    pub base_url: String,

    /// Page size used by the sync engine when paginating a table.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Per-sync-step timeout in seconds. Converts a hung step into a
    /// failure so one bad table never blocks the others.
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
}

fn default_page_size() -> u32 {
    100
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_step_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            base_url: String::new(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            step_timeout_secs: default_step_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    /// Per-request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Per-step timeout as a Duration.
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

// =============================================================================
// Cache Configuration
// =============================================================================

/// Staleness configuration for cached tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Age in seconds beyond which a cached table is considered stale.
    /// Default: 300 (5 minutes).
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

fn default_stale_after_secs() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl CacheSettings {
    /// The staleness threshold as a Duration.
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

// =============================================================================
// Search Configuration
// =============================================================================

/// Configuration for background search jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Page size for search results.
    #[serde(default = "default_search_page_size")]
    pub page_size: u32,

    /// Interval between synthesized progress ticks while waiting on the
    /// network (cosmetic UX smoothing).
    #[serde(default = "default_progress_tick_ms")]
    pub progress_tick_ms: u64,
}

impl SearchSettings {
    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }
}

fn default_search_page_size() -> u32 {
    25
}

fn default_progress_tick_ms() -> u64 {
    400
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            page_size: default_search_page_size(),
            progress_tick_ms: default_progress_tick_ms(),
        }
    }
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity of this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn default_device_name() -> String {
    "Vela Terminal".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Sync Configuration (top level)
// =============================================================================

/// Top-level configuration for the offline data layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote API settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Cache staleness settings.
    #[serde(default)]
    pub cache: CacheSettings,

    /// Search job settings.
    #[serde(default)]
    pub search: SearchSettings,

    /// Device identity.
    #[serde(default)]
    pub device: DeviceConfig,
}

impl SyncConfig {
    /// Returns the default config file path for this platform.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vela", "pos")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    /// Loads configuration from the given path, or returns defaults when
    /// the file doesn't exist yet (first run).
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(PathBuf::from).or_else(Self::default_path) {
            Some(p) => p,
            None => {
                debug!("No config directory available, using defaults");
                return SyncConfig::default();
            }
        };

        match Self::load(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded sync config");
                config
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Config not loaded, using defaults");
                SyncConfig::default()
            }
        }
    }

    /// Loads configuration from a specific file.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SyncConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Saves configuration to a specific file, creating parent directories.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        info!(path = %path.display(), "Saved sync config");
        Ok(())
    }

    /// Validates the configuration before the engine starts.
    pub fn validate(&self) -> SyncResult<()> {
        if self.remote.base_url.is_empty() {
            return Err(SyncError::InvalidConfig(
                "remote.base_url is required".into(),
            ));
        }
        Url::parse(&self.remote.base_url)?;

        if self.remote.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "remote.page_size must be at least 1".into(),
            ));
        }
        if self.search.page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "search.page_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.remote.page_size, 100);
        assert_eq!(config.cache.stale_after_secs, 300);
        assert_eq!(config.search.page_size, 25);
        assert!(!config.device.id.is_empty());
    }

    #[test]
    fn test_validate_requires_base_url() {
        let config = SyncConfig::default();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.remote.base_url = "https://api.vela.example/v1".into();
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = SyncConfig::default();
        config.remote.base_url = "not a url".into();
        assert!(matches!(
            config.validate().unwrap_err(),
            SyncError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: SyncConfig = toml::from_str(
            r#"
            [remote]
            base_url = "https://api.vela.example/v1"
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.base_url, "https://api.vela.example/v1");
        assert_eq!(config.remote.page_size, 100);
        assert_eq!(config.cache.stale_after_secs, 300);
    }

    #[test]
    fn test_round_trip() {
        let mut config = SyncConfig::default();
        config.remote.base_url = "https://api.vela.example/v1".into();
        config.device.name = "Back Office".into();

        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed: SyncConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.device.name, "Back Office");
        assert_eq!(parsed.device.id, config.device.id);
    }
}
