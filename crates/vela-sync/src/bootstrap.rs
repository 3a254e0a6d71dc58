//! # App Initializer
//!
//! Decides, at startup, whether the app can open and in what mode. The
//! sequence reports progress step by step so a splash screen can follow
//! along, and it degrades instead of failing wherever the cache allows:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Initialization Sequence                      │
//! │                                                                 │
//! │  open local store ──► read cache stats ──► connectivity probe   │
//! │                                                  │              │
//! │                          online ◄────────────────┴───► offline  │
//! │                            │                             │      │
//! │                       full sync run               cache usable? │
//! │                            │                        │       │   │
//! │              all failed + empty cache?             yes      no  │
//! │                   │            │                    │       │   │
//! │                 halt         ready            ready(offline) halt
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The only hard failure is local storage being unusable; that propagates
//! as an error. Everything network-shaped degrades.

use std::sync::Arc;

use tracing::{error, info, warn};

use vela_core::ProgressTracker;
use vela_store::{CacheStats, LocalStore, StoreConfig};

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::engine::{SyncEngine, SyncEventEmitter, SyncReport};
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteApi;

// Steps: store, stats, connectivity, six entity tables, ready.
const TOTAL_STEPS: u32 = 10;

// =============================================================================
// Outcomes
// =============================================================================

/// Why initialization refused to open the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Cold start: no connectivity and nothing cached to fall back on.
    NoDataNoNetwork,
    /// We were online but every sync step failed, and the cache is empty.
    SyncFailedNoCache,
}

/// The app may open.
#[derive(Debug, Clone)]
pub struct ReadyState {
    /// Running from cache without a reachable backend.
    pub offline: bool,
    /// Something went wrong during sync but cached data carries the app.
    pub degraded: bool,
    pub stats: CacheStats,
    /// Present when a sync run was attempted.
    pub report: Option<SyncReport>,
}

/// Terminal outcome of one initialization run.
#[derive(Debug, Clone)]
pub enum StartupOutcome {
    Ready(ReadyState),
    Halted(HaltReason),
}

impl StartupOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, StartupOutcome::Ready(_))
    }

    pub fn as_ready(&self) -> Option<&ReadyState> {
        match self {
            StartupOutcome::Ready(state) => Some(state),
            StartupOutcome::Halted(_) => None,
        }
    }
}

/// A finished initialization: the opened store plus the decision.
///
/// The store is returned even on a halt so the caller can offer retry or
/// reset without re-opening it.
pub struct Startup {
    pub store: LocalStore,
    pub outcome: StartupOutcome,
}

// =============================================================================
// App Initializer
// =============================================================================

/// Orchestrates the startup sequence.
///
/// ## Usage
/// ```ignore
/// let init = AppInitializer::new(store_config, remote, config);
/// let startup = init.run().await?;
/// match startup.outcome {
///     StartupOutcome::Ready(state) => launch(startup.store, state),
///     StartupOutcome::Halted(reason) => show_blocking_screen(reason),
/// }
/// ```
pub struct AppInitializer {
    store_config: StoreConfig,
    remote: Arc<dyn RemoteApi>,
    config: Arc<SyncConfig>,
    emitter: Arc<dyn SyncEventEmitter>,
    monitor: ConnectivityMonitor,
}

impl AppInitializer {
    pub fn new(
        store_config: StoreConfig,
        remote: Arc<dyn RemoteApi>,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self::with_emitter(store_config, remote, config, Arc::new(crate::engine::NoOpEmitter))
    }

    pub fn with_emitter(
        store_config: StoreConfig,
        remote: Arc<dyn RemoteApi>,
        config: Arc<SyncConfig>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> Self {
        let monitor = ConnectivityMonitor::new(remote.clone());
        AppInitializer {
            store_config,
            remote,
            config,
            emitter,
            monitor,
        }
    }

    /// Connectivity state as observed by the most recent run.
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Runs the full initialization sequence. Calling it again after a
    /// halt is the retry path.
    ///
    /// Errors only on unusable local storage (or a storage fault while
    /// reading stats); network problems never surface as `Err`.
    pub async fn run(&self) -> SyncResult<Startup> {
        let mut tracker = ProgressTracker::new(TOTAL_STEPS);

        self.step(&mut tracker, "local_store", 0, "Opening local store");
        let store = match LocalStore::open(self.store_config.clone()).await {
            Ok(store) => store,
            Err(e) => {
                error!(error = %e, "Local store unusable, cannot start");
                let status = tracker.fail("local_store", e.to_string());
                self.emitter.emit_step(&status);
                return Err(e.into());
            }
        };

        self.step(&mut tracker, "cache_stats", 1, "Reading cached data");
        let stats = store.tables().stats().await?;

        self.step(&mut tracker, "connectivity", 2, "Checking connectivity");
        let online = self.monitor.probe().await;

        let outcome = if online {
            let engine = SyncEngine::with_emitter(
                store.clone(),
                self.remote.clone(),
                self.config.clone(),
                self.emitter.clone(),
            );
            let report = engine.run_full_with(&mut tracker).await?;
            if report.online {
                self.conclude_online(&mut tracker, report)
            } else {
                // Connectivity flapped between the probe and the run.
                self.monitor.observe(false);
                self.conclude_offline(&mut tracker, report.stats)
            }
        } else {
            self.conclude_offline(&mut tracker, stats)
        };

        Ok(Startup { store, outcome })
    }

    /// The "use app offline" override on the blocking screen. Only allowed
    /// when the cache can actually carry the app.
    pub async fn continue_offline(&self, store: &LocalStore) -> SyncResult<ReadyState> {
        let stats = store.tables().stats().await?;
        if !stats.has_minimal_data() {
            return Err(SyncError::NoDataNoNetwork);
        }
        info!("Continuing offline on cached data");
        Ok(ReadyState {
            offline: true,
            degraded: true,
            stats,
            report: None,
        })
    }

    /// The "reset local data" action: drops every cached table so the next
    /// run starts from a clean slate.
    pub async fn reset(&self, store: &LocalStore) -> SyncResult<()> {
        warn!("Resetting local cache");
        store.tables().clear_all().await?;
        Ok(())
    }

    fn conclude_online(&self, tracker: &mut ProgressTracker, report: SyncReport) -> StartupOutcome {
        let stats = report.stats.clone();

        if report.all_failed() && !stats.has_minimal_data() {
            error!("Every sync step failed and the cache is empty");
            let status = tracker.fail("ready", "Could not load any data");
            self.emitter.emit_step(&status);
            return StartupOutcome::Halted(HaltReason::SyncFailedNoCache);
        }

        let degraded = report.failed() > 0;
        if degraded {
            warn!(failed = report.failed(), "Starting in degraded mode");
        }
        self.step(tracker, "ready", TOTAL_STEPS, "Ready");
        StartupOutcome::Ready(ReadyState {
            offline: false,
            degraded,
            stats,
            report: Some(report),
        })
    }

    fn conclude_offline(&self, tracker: &mut ProgressTracker, stats: CacheStats) -> StartupOutcome {
        if stats.has_minimal_data() {
            info!(
                total_records = stats.total_records(),
                "Offline with usable cache, starting in offline mode"
            );
            self.step(tracker, "ready", TOTAL_STEPS, "Ready (offline)");
            return StartupOutcome::Ready(ReadyState {
                offline: true,
                degraded: true,
                stats,
                report: None,
            });
        }

        error!("No connectivity and no cached data");
        let status = tracker.fail("ready", "No internet connection and no local data");
        self.emitter.emit_step(&status);
        StartupOutcome::Halted(HaltReason::NoDataNoNetwork)
    }

    fn step(&self, tracker: &mut ProgressTracker, name: &str, position: u32, message: &str) {
        if let Some(status) = tracker.step(name, position, message) {
            self.emitter.emit_step(&status);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
