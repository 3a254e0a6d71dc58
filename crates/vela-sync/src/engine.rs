//! # Sync Engine
//!
//! Full-catalog synchronization from the remote backend into the local
//! cache. A run walks the entity tables in a fixed order, fetching every
//! page of each table and atomically replacing the cached snapshot.
//!
//! ```text
//!            ┌──────────────┐
//!            │  run_full()  │
//!            └──────┬───────┘
//!                   │ sequential (largest tables first)
//!          ┌────────▼────────┐
//!          │ products        │
//!          │ customers       │
//!          └────────┬────────┘
//!                   │ concurrent (small lookup tables)
//!    ┌──────────┬───┴──────┬─────────────┐
//!    ▼          ▼          ▼             ▼
//! branches  categories  accounts  recent sales
//! ```
//!
//! Failures are isolated per step: a table that times out or errors is
//! logged and reported, and every other table still syncs. The run as a
//! whole only errors on local storage faults, never on remote ones.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use vela_core::{EntityKind, ProgressTracker, StartupStatus};
use vela_store::{CacheStats, LocalStore};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteApi;

// =============================================================================
// Event Emitter
// =============================================================================

/// Receives progress updates and non-fatal warnings during a sync run.
///
/// The UI layer implements this to drive a splash/progress screen. Steps
/// within one run carry monotonically non-decreasing progress counters.
pub trait SyncEventEmitter: Send + Sync {
    fn emit_step(&self, status: &StartupStatus);
    fn emit_warning(&self, step: &str, message: &str);
}

/// Emitter that discards everything. Used by headless callers and tests.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_step(&self, _status: &StartupStatus) {}
    fn emit_warning(&self, _step: &str, _message: &str) {}
}

// =============================================================================
// Run Outcomes
// =============================================================================

/// Result of syncing one entity table.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub kind: EntityKind,
    pub success: bool,
    /// Records cached on success, 0 on failure.
    pub count: usize,
    pub error: Option<String>,
}

impl StepOutcome {
    fn ok(kind: EntityKind, count: usize) -> Self {
        StepOutcome {
            kind,
            success: true,
            count,
            error: None,
        }
    }

    fn failed(kind: EntityKind, error: &SyncError) -> Self {
        StepOutcome {
            kind,
            success: false,
            count: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Summary of a full sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Whether the backend was reachable when the run started. An offline
    /// run has no steps.
    pub online: bool,
    pub steps: Vec<StepOutcome>,
    /// Cache state after the run.
    pub stats: CacheStats,
}

impl SyncReport {
    /// True when we were online, attempted steps, and every one failed.
    /// The initializer escalates this to a halt if the cache is also empty.
    pub fn all_failed(&self) -> bool {
        self.online && !self.steps.is_empty() && self.steps.iter().all(|s| !s.success)
    }

    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.success).count()
    }

    pub fn failed(&self) -> usize {
        self.steps.iter().filter(|s| !s.success).count()
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// Orchestrates full and single-table syncs against the local cache.
#[derive(Clone)]
pub struct SyncEngine {
    store: LocalStore,
    remote: Arc<dyn RemoteApi>,
    config: Arc<SyncConfig>,
    emitter: Arc<dyn SyncEventEmitter>,
}

impl SyncEngine {
    pub fn new(store: LocalStore, remote: Arc<dyn RemoteApi>, config: Arc<SyncConfig>) -> Self {
        Self::with_emitter(store, remote, config, Arc::new(NoOpEmitter))
    }

    pub fn with_emitter(
        store: LocalStore,
        remote: Arc<dyn RemoteApi>,
        config: Arc<SyncConfig>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> Self {
        SyncEngine {
            store,
            remote,
            config,
            emitter,
        }
    }

    /// Runs a full sync with a fresh progress tracker sized to the entity
    /// table count.
    ///
    /// ## Usage
    /// ```ignore
    /// let report = engine.run_full().await?;
    /// if report.all_failed() {
    ///     warn!("sync produced no data");
    /// }
    /// ```
    pub async fn run_full(&self) -> SyncResult<SyncReport> {
        let mut tracker = ProgressTracker::new(EntityKind::ALL.len() as u32);
        self.run_full_with(&mut tracker).await
    }

    /// Runs a full sync reporting through the caller's tracker, so the
    /// entity steps land inside a larger run (the app initializer's) with
    /// one monotonic progress stream.
    pub async fn run_full_with(&self, tracker: &mut ProgressTracker) -> SyncResult<SyncReport> {
        if !self.remote.health_check().await {
            info!("Backend unreachable, skipping sync run");
            let stats = self.store.tables().stats().await?;
            return Ok(SyncReport {
                online: false,
                steps: Vec::new(),
                stats,
            });
        }

        let base = tracker.progress();
        let mut steps = Vec::with_capacity(EntityKind::ALL.len());

        // Largest tables first, one at a time, so a partial run still
        // leaves the most useful data behind.
        for (i, kind) in [EntityKind::Products, EntityKind::Customers]
            .into_iter()
            .enumerate()
        {
            self.emit_step(tracker, kind, base + i as u32);
            steps.push(self.guarded_sync(kind).await);
        }

        // The small lookup tables sync concurrently.
        let parallel = [
            EntityKind::Branches,
            EntityKind::Categories,
            EntityKind::PaymentAccounts,
            EntityKind::RecentTransactions,
        ];
        for kind in parallel {
            self.emit_step(tracker, kind, base + 2);
        }
        let (a, b, c, d) = tokio::join!(
            self.guarded_sync(parallel[0]),
            self.guarded_sync(parallel[1]),
            self.guarded_sync(parallel[2]),
            self.guarded_sync(parallel[3]),
        );
        steps.extend([a, b, c, d]);

        let stats = self.store.tables().stats().await?;
        let report = SyncReport {
            online: true,
            steps,
            stats,
        };

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            total_records = report.stats.total_records(),
            "Sync run finished"
        );
        Ok(report)
    }

    /// Syncs a single entity table with the same timeout and isolation
    /// rules as a full run.
    pub async fn sync_one(&self, kind: EntityKind) -> StepOutcome {
        self.guarded_sync(kind).await
    }

    fn emit_step(&self, tracker: &mut ProgressTracker, kind: EntityKind, position: u32) {
        if let Some(status) = tracker.step(
            kind.table_name(),
            position,
            format!("Syncing {}", kind.table_name()),
        ) {
            self.emitter.emit_step(&status);
        }
    }

    /// Runs one table sync under the per-step timeout. Never returns an
    /// error: failures become a failed [`StepOutcome`] so siblings proceed.
    async fn guarded_sync(&self, kind: EntityKind) -> StepOutcome {
        let step_timeout = self.config.remote.step_timeout();
        let result = match timeout(step_timeout, self.sync_table(kind)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::StepTimeout {
                step: kind.table_name().to_string(),
                seconds: step_timeout.as_secs(),
            }),
        };

        match result {
            Ok(count) => {
                debug!(table = kind.table_name(), count, "Table synced");
                StepOutcome::ok(kind, count)
            }
            Err(e) => {
                warn!(table = kind.table_name(), error = %e, "Table sync failed");
                self.emitter.emit_warning(kind.table_name(), &e.to_string());
                StepOutcome::failed(kind, &e)
            }
        }
    }

    /// Fetches every page of a table, then atomically replaces the cached
    /// snapshot. The old snapshot stays intact until the replace commits.
    async fn sync_table(&self, kind: EntityKind) -> SyncResult<usize> {
        let page_size = self.config.remote.page_size;
        let mut records = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self.remote.fetch(kind, page, page_size).await?;
            let total = batch.total_count as usize;
            let fetched = batch.records.len();
            records.extend(batch.records);

            if fetched == 0 || records.len() >= total {
                break;
            }
            page += 1;
        }

        self.store.tables().replace(kind, &records).await?;
        Ok(records.len())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
