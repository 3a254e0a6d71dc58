//! # Background Search Job Manager
//!
//! Runs remote searches as cancellable background jobs, one stream per
//! entity table. The invariant that matters: **only the newest job on a
//! stream may deliver results**. Starting a new search supersedes the old
//! one, and a stale response that arrives later is discarded at the
//! delivery boundary.
//!
//! ```text
//!   start_search("ab")   ──► job J1 (generation 1) ──► in flight…
//!   start_search("abc")  ──► J1 cancelled, job J2 (generation 2)
//!   J2 response          ──► delivered (generation matches)
//!   J1 response (late)   ──► discarded (generation stale, job terminal)
//! ```
//!
//! Supersession is enforced with a per-stream generation counter rather
//! than by relying on transport aborts, so correctness holds even when an
//! in-flight request cannot be torn down. A cancelled job's future keeps
//! running to its delivery check and drops its result there.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use vela_core::{EntityKind, Page, SearchJob, SearchJobStatus};
use vela_store::LocalStore;

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::remote::RemoteApi;

// =============================================================================
// Events and Results
// =============================================================================

/// Status update pushed to the UI for a search job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchUpdate {
    pub job_id: String,
    pub status: SearchJobStatus,
    pub progress: u8,
    /// Set on completion.
    pub result_count: Option<usize>,
}

/// Receives search job lifecycle updates.
pub trait SearchEventSink: Send + Sync {
    fn emit(&self, update: &SearchUpdate);
}

/// Sink that discards everything.
pub struct NoOpSink;

impl SearchEventSink for NoOpSink {
    fn emit(&self, _update: &SearchUpdate) {}
}

/// The delivered result set of a completed search.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub job_id: String,
    pub query: String,
    pub records: Vec<Value>,
    pub total_count: u64,
    /// True when the records came from the local cache because the remote
    /// was unreachable.
    pub from_cache: bool,
}

// =============================================================================
// Stream State
// =============================================================================

/// Mutable state of one search stream. All transitions happen under the
/// manager's lock; spawned jobs re-acquire it at their delivery boundary.
struct StreamState {
    /// Bumped on every `start_search`. A job may only deliver while its
    /// own generation is still the current one.
    generation: u64,
    /// Live jobs only: entries (and their task handles) are dropped at the
    /// delivery boundary once the job is terminal.
    jobs: HashMap<String, SearchJob>,
    current_job: Option<String>,
    /// Last successfully delivered result set. A failed or superseded job
    /// never clears this, so the UI keeps showing the last good results.
    latest_results: Option<SearchResults>,
    tasks: HashMap<String, JoinHandle<()>>,
}

// =============================================================================
// Search Job Manager
// =============================================================================

/// Manages background search jobs for one entity table.
///
/// ## Usage
/// ```ignore
/// let manager = SearchJobManager::new(EntityKind::Products, store, remote, config);
/// let job_id = manager.start_search("wireless").await;
/// // ... updates arrive through the sink; results land in latest_results()
/// ```
#[derive(Clone)]
pub struct SearchJobManager {
    kind: EntityKind,
    store: LocalStore,
    remote: Arc<dyn RemoteApi>,
    config: Arc<SyncConfig>,
    sink: Arc<dyn SearchEventSink>,
    state: Arc<Mutex<StreamState>>,
}

impl SearchJobManager {
    pub fn new(
        kind: EntityKind,
        store: LocalStore,
        remote: Arc<dyn RemoteApi>,
        config: Arc<SyncConfig>,
    ) -> Self {
        Self::with_sink(kind, store, remote, config, Arc::new(NoOpSink))
    }

    pub fn with_sink(
        kind: EntityKind,
        store: LocalStore,
        remote: Arc<dyn RemoteApi>,
        config: Arc<SyncConfig>,
        sink: Arc<dyn SearchEventSink>,
    ) -> Self {
        SearchJobManager {
            kind,
            store,
            remote,
            config,
            sink,
            state: Arc::new(Mutex::new(StreamState {
                generation: 0,
                jobs: HashMap::new(),
                current_job: None,
                latest_results: None,
                tasks: HashMap::new(),
            })),
        }
    }

    /// Starts a new search, superseding any job still running on this
    /// stream. Returns the new job's id.
    pub async fn start_search(&self, query: &str) -> String {
        let (job_id, generation) = {
            let mut state = self.state.lock().await;

            // Supersede the current job. Its in-flight request keeps
            // running; the stale generation stops it from delivering.
            if let Some(current_id) = state.current_job.clone() {
                if let Some(job) = state.jobs.get_mut(&current_id) {
                    if job.cancel() {
                        info!(job_id = %current_id, "Search superseded");
                        let update = Self::update_of(job, None);
                        self.sink.emit(&update);
                    }
                }
            }

            state.generation += 1;
            let generation = state.generation;
            let job = SearchJob::new(query, generation);
            let job_id = job.id.clone();

            self.sink.emit(&Self::update_of(&job, None));
            state.jobs.insert(job_id.clone(), job);
            state.current_job = Some(job_id.clone());
            (job_id, generation)
        };

        debug!(job_id = %job_id, generation, query, "Search job started");

        let manager = self.clone();
        let owned_query = query.to_string();
        let id_for_task = job_id.clone();
        let task = tokio::spawn(async move {
            manager.run_job(id_for_task, owned_query, generation).await;
        });
        {
            let mut state = self.state.lock().await;
            // A very fast job may already have delivered and been
            // discarded; retaining its handle would leak it.
            if state.jobs.contains_key(&job_id) {
                state.tasks.insert(job_id.clone(), task);
            }
        }

        job_id
    }

    /// Cancels a job by id. Safe to call repeatedly and for terminal or
    /// unknown jobs; returns whether this call changed anything.
    pub async fn cancel_search_job(&self, job_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(job) = state.jobs.get_mut(job_id) else {
            return false;
        };
        if !job.cancel() {
            return false;
        }
        info!(job_id, "Search job cancelled");
        let update = Self::update_of(job, None);
        self.sink.emit(&update);
        true
    }

    /// Applies an externally reported progress value to a job. Updates
    /// that would move progress backwards, or that arrive after the job
    /// is terminal, are dropped.
    pub async fn report_progress(&self, job_id: &str, percent: u8) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            if job.set_progress(percent) {
                let update = Self::update_of(job, None);
                self.sink.emit(&update);
            }
        }
    }

    /// Snapshot of a job's current state. Jobs are dropped from tracking
    /// once they are terminal and their task has reached its delivery
    /// check, so `None` also means "finished and discarded".
    pub async fn job(&self, job_id: &str) -> Option<SearchJob> {
        self.state.lock().await.jobs.get(job_id).cloned()
    }

    /// Number of jobs still tracked on this stream. Finished ones are
    /// discarded, so this stays bounded by the in-flight request count.
    pub async fn job_count(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    /// The most recently started job's id, while that job is still
    /// tracked (finished jobs are discarded).
    pub async fn current_job_id(&self) -> Option<String> {
        self.state.lock().await.current_job.clone()
    }

    /// Last delivered result set for this stream.
    pub async fn latest_results(&self) -> Option<SearchResults> {
        self.state.lock().await.latest_results.clone()
    }

    /// Waits for a job's background task to finish. Completion of the task
    /// does not imply the job succeeded; check the job's status.
    pub async fn wait_for(&self, job_id: &str) {
        let task = self.state.lock().await.tasks.remove(job_id);
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Aborts every outstanding task. Jobs already terminal are untouched.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        for (job_id, task) in state.tasks.drain() {
            debug!(job_id = %job_id, "Aborting search task on shutdown");
            task.abort();
        }
    }

    // =========================================================================
    // Job Execution
    // =========================================================================

    async fn run_job(self, job_id: String, query: String, generation: u64) {
        // Pending -> Processing, unless cancelled before we got scheduled.
        {
            let mut state = self.state.lock().await;
            match state.jobs.get_mut(&job_id) {
                Some(job) => {
                    if job.begin_processing() {
                        let update = Self::update_of(job, None);
                        self.sink.emit(&update);
                    } else {
                        Self::discard(&mut state, &job_id);
                        return;
                    }
                }
                None => {
                    Self::discard(&mut state, &job_id);
                    return;
                }
            }
        }

        // Tick synthetic progress while the request is in flight. Real
        // progress would need server support; the ticker just keeps the
        // UI's bar moving, capped below completion.
        let mut ticker = interval(self.config.search.progress_tick());
        ticker.tick().await; // first tick fires immediately
        let page_size = self.config.search.page_size;
        let search = self.remote.search(self.kind, &query, 1, page_size);
        tokio::pin!(search);

        let outcome = loop {
            tokio::select! {
                result = &mut search => break result,
                _ = ticker.tick() => {
                    self.bump_synthetic_progress(&job_id).await;
                }
            }
        };

        // Connectivity failures fall back to a local cache scan. Genuine
        // remote errors (bad request, server fault) do not.
        let outcome = match outcome {
            Err(e) if e.is_connectivity_error() => {
                debug!(job_id = %job_id, error = %e, "Remote search unreachable, using local cache");
                self.local_search(&query).await
            }
            other => other.map(|page| (page, false)),
        };

        self.deliver(&job_id, &query, generation, outcome).await;
    }

    /// The delivery boundary. Results are applied only if the job is still
    /// live and its generation is still current; otherwise they are
    /// discarded without touching `latest_results`. Either way the job is
    /// terminal afterwards, so its tracking entries are dropped here.
    async fn deliver(
        &self,
        job_id: &str,
        query: &str,
        generation: u64,
        outcome: SyncResult<(Page, bool)>,
    ) {
        let mut state = self.state.lock().await;
        self.apply_outcome(&mut state, job_id, query, generation, outcome);
        Self::discard(&mut state, job_id);
    }

    fn apply_outcome(
        &self,
        state: &mut StreamState,
        job_id: &str,
        query: &str,
        generation: u64,
        outcome: SyncResult<(Page, bool)>,
    ) {
        let current_generation = state.generation;

        let Some(job) = state.jobs.get_mut(job_id) else {
            return;
        };
        if job.is_terminal() {
            debug!(job_id, "Dropping result for terminal job");
            return;
        }
        if generation != current_generation {
            // Superseded between resolution and delivery.
            if job.cancel() {
                let update = Self::update_of(job, None);
                self.sink.emit(&update);
            }
            debug!(job_id, "Dropping result for superseded job");
            return;
        }

        match outcome {
            Ok((page, from_cache)) => {
                job.complete();
                let count = page.records.len();
                let update = Self::update_of(job, Some(count));
                info!(job_id, count, from_cache, "Search completed");

                state.latest_results = Some(SearchResults {
                    job_id: job_id.to_string(),
                    query: query.to_string(),
                    records: page.records,
                    total_count: page.total_count,
                    from_cache,
                });
                self.sink.emit(&update);
            }
            Err(e) => {
                job.fail();
                warn!(job_id, error = %e, "Search failed");
                let update = Self::update_of(job, None);
                // latest_results stays as-is: the UI keeps the last good set.
                self.sink.emit(&update);
            }
        }
    }

    /// Drops a terminal job's tracking entries so the maps stay bounded.
    /// Detaching the finished task handle is safe; a `wait_for` caller that
    /// already took the handle is unaffected.
    fn discard(state: &mut StreamState, job_id: &str) {
        state.jobs.remove(job_id);
        state.tasks.remove(job_id);
        if state.current_job.as_deref() == Some(job_id) {
            state.current_job = None;
        }
    }

    async fn bump_synthetic_progress(&self, job_id: &str) {
        let mut state = self.state.lock().await;
        if let Some(job) = state.jobs.get_mut(job_id) {
            // Creep toward 90 and hold; completion snaps to 100.
            let next = job.progress.saturating_add(10).min(90);
            if job.set_progress(next) {
                let update = Self::update_of(job, None);
                self.sink.emit(&update);
            }
        }
    }

    /// Case-insensitive substring scan over the cached table, used when
    /// the remote is unreachable.
    async fn local_search(&self, query: &str) -> SyncResult<(Page, bool)> {
        let table = self.store.tables().get(self.kind).await?;
        let needle = query.to_lowercase();
        let records: Vec<Value> = table
            .records
            .into_iter()
            .filter(|r| r.to_string().to_lowercase().contains(&needle))
            .collect();
        let total_count = records.len() as u64;
        Ok((
            Page {
                records,
                total_count,
            },
            true,
        ))
    }

    fn update_of(job: &SearchJob, result_count: Option<usize>) -> SearchUpdate {
        SearchUpdate {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            result_count,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockRemoteApi, SearchMode};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use vela_store::{LocalStore, StoreConfig};

    async fn test_store() -> LocalStore {
        LocalStore::open(StoreConfig::in_memory()).await.unwrap()
    }

    fn test_config() -> Arc<SyncConfig> {
        let mut config = SyncConfig::default();
        config.remote.base_url = "http://localhost:9".into();
        config.search.progress_tick_ms = 10;
        Arc::new(config)
    }

    fn products(names: &[&str]) -> Vec<Value> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| serde_json::json!({ "id": format!("p{i}"), "name": name }))
            .collect()
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: StdMutex<Vec<SearchUpdate>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(RecordingSink::default())
        }

        fn updates(&self) -> Vec<SearchUpdate> {
            self.updates.lock().unwrap().clone()
        }
    }

    impl SearchEventSink for RecordingSink {
        fn emit(&self, update: &SearchUpdate) {
            self.updates.lock().unwrap().push(update.clone());
        }
    }

    async fn wait_until_processing(manager: &SearchJobManager, job_id: &str) {
        for _ in 0..200 {
            if let Some(job) = manager.job(job_id).await {
                if job.status != SearchJobStatus::Pending {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {job_id} never left Pending");
    }

    #[tokio::test]
    async fn test_search_completes_and_delivers_results() {
        let remote = MockRemoteApi::new();
        remote.set_table(
            EntityKind::Products,
            products(&["Wireless Mouse", "Wired Mouse", "Keyboard"]),
        );

        let sink = RecordingSink::new();
        let manager = SearchJobManager::with_sink(
            EntityKind::Products,
            test_store().await,
            remote.clone(),
            test_config(),
            sink.clone(),
        );

        let job_id = manager.start_search("mouse").await;
        manager.wait_for(&job_id).await;

        // Finished jobs are discarded; the outcome lives in the results
        // slot and the emitted updates.
        assert!(manager.job(&job_id).await.is_none());
        assert_eq!(manager.job_count().await, 0);
        assert_eq!(remote.search_calls(), 1);

        let results = manager.latest_results().await.unwrap();
        assert_eq!(results.job_id, job_id);
        assert_eq!(results.records.len(), 2);
        assert!(!results.from_cache);

        let updates = sink.updates();
        assert_eq!(updates.first().unwrap().status, SearchJobStatus::Pending);
        let last = updates.last().unwrap();
        assert_eq!(last.status, SearchJobStatus::Completed);
        assert_eq!(last.progress, 100);
        assert_eq!(last.result_count, Some(2));
    }

    #[tokio::test]
    async fn test_new_search_supersedes_old_and_stale_result_is_discarded() {
        let remote = MockRemoteApi::new();
        remote.set_table(
            EntityKind::Products,
            products(&["Alpha Widget", "Alphabet Poster"]),
        );
        // Hold J1's response until after J2 has delivered.
        let gate = remote.gate_search("alpha");

        let manager = SearchJobManager::new(
            EntityKind::Products,
            test_store().await,
            remote,
            test_config(),
        );

        let j1 = manager.start_search("alpha").await;
        wait_until_processing(&manager, &j1).await;

        let j2 = manager.start_search("alphabet").await;
        // Supersession marks J1 cancelled immediately.
        assert_eq!(
            manager.job(&j1).await.unwrap().status,
            SearchJobStatus::Cancelled
        );

        manager.wait_for(&j2).await;
        let results = manager.latest_results().await.unwrap();
        assert_eq!(results.job_id, j2);
        assert_eq!(results.records.len(), 1);

        // J1's response now arrives late and must be dropped.
        gate.notify_one();
        manager.wait_for(&j1).await;

        let results = manager.latest_results().await.unwrap();
        assert_eq!(results.job_id, j2, "stale result overwrote newer one");
        // Once the dead job's task has run its delivery check, the job is
        // discarded entirely.
        assert!(manager.job(&j1).await.is_none());
        assert_eq!(manager.job_count().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let remote = MockRemoteApi::new();
        remote.set_table(EntityKind::Products, products(&["Thing"]));
        let gate = remote.gate_search("thing");

        let sink = RecordingSink::new();
        let manager = SearchJobManager::with_sink(
            EntityKind::Products,
            test_store().await,
            remote,
            test_config(),
            sink.clone(),
        );

        let job_id = manager.start_search("thing").await;
        wait_until_processing(&manager, &job_id).await;

        assert!(manager.cancel_search_job(&job_id).await);
        assert!(!manager.cancel_search_job(&job_id).await);
        assert!(!manager.cancel_search_job("no-such-job").await);

        // Cancelled but still tracked while its request is in flight.
        assert_eq!(
            manager.job(&job_id).await.unwrap().status,
            SearchJobStatus::Cancelled
        );

        gate.notify_one();
        manager.wait_for(&job_id).await;

        // The resolved response was dropped at the delivery boundary and
        // the job was discarded with it.
        assert!(manager.latest_results().await.is_none());
        assert!(manager.job(&job_id).await.is_none());

        let cancelled = sink
            .updates()
            .iter()
            .filter(|u| u.status == SearchJobStatus::Cancelled)
            .count();
        assert_eq!(cancelled, 1, "repeated cancels emitted duplicate events");
    }

    #[tokio::test]
    async fn test_failed_search_keeps_last_good_results() {
        let remote = MockRemoteApi::new();
        remote.set_table(EntityKind::Products, products(&["Lamp", "Desk Lamp"]));

        let sink = RecordingSink::new();
        let manager = SearchJobManager::with_sink(
            EntityKind::Products,
            test_store().await,
            remote.clone(),
            test_config(),
            sink.clone(),
        );

        let j1 = manager.start_search("lamp").await;
        manager.wait_for(&j1).await;
        assert_eq!(manager.latest_results().await.unwrap().records.len(), 2);

        remote.set_search_mode(SearchMode::ServerError);
        let j2 = manager.start_search("desk").await;
        manager.wait_for(&j2).await;

        let failed = sink
            .updates()
            .iter()
            .filter(|u| u.job_id == j2 && u.status == SearchJobStatus::Failed)
            .count();
        assert_eq!(failed, 1);
        assert!(manager.job(&j2).await.is_none());

        // Last good result set is still the one J1 delivered.
        let results = manager.latest_results().await.unwrap();
        assert_eq!(results.job_id, j1);
        assert_eq!(results.records.len(), 2);
    }

    #[tokio::test]
    async fn test_offline_search_falls_back_to_local_cache() {
        let store = test_store().await;
        store
            .tables()
            .replace(EntityKind::Products, &products(&["Cached Mug", "Plate"]))
            .await
            .unwrap();

        let remote = MockRemoteApi::new();
        remote.set_search_mode(SearchMode::Offline);

        let manager =
            SearchJobManager::new(EntityKind::Products, store, remote, test_config());

        let job_id = manager.start_search("mug").await;
        manager.wait_for(&job_id).await;

        let results = manager.latest_results().await.unwrap();
        assert_eq!(results.job_id, job_id);
        assert!(results.from_cache);
        assert_eq!(results.records.len(), 1);
    }

    #[tokio::test]
    async fn test_server_error_does_not_fall_back_to_cache() {
        let store = test_store().await;
        store
            .tables()
            .replace(EntityKind::Products, &products(&["Cached Mug"]))
            .await
            .unwrap();

        let remote = MockRemoteApi::new();
        remote.set_search_mode(SearchMode::ServerError);

        let manager =
            SearchJobManager::new(EntityKind::Products, store, remote, test_config());

        let job_id = manager.start_search("mug").await;
        manager.wait_for(&job_id).await;

        // Failed outright, no fallback: nothing was ever delivered.
        assert!(manager.job(&job_id).await.is_none());
        assert!(manager.latest_results().await.is_none());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_stops_at_terminal() {
        let remote = MockRemoteApi::new();
        remote.set_table(EntityKind::Products, products(&["Thing"]));
        let gate = remote.gate_search("thing");

        let sink = RecordingSink::new();
        let manager = SearchJobManager::with_sink(
            EntityKind::Products,
            test_store().await,
            remote,
            test_config(),
            sink.clone(),
        );

        let job_id = manager.start_search("thing").await;
        wait_until_processing(&manager, &job_id).await;

        manager.report_progress(&job_id, 40).await;
        manager.report_progress(&job_id, 20).await; // stale, dropped

        let job = manager.job(&job_id).await.unwrap();
        assert!(job.progress >= 40);

        gate.notify_one();
        manager.wait_for(&job_id).await;

        // The job is gone once terminal; a late progress report is a no-op
        // and emits nothing.
        manager.report_progress(&job_id, 50).await;
        assert!(manager.job(&job_id).await.is_none());

        let mut last = 0u8;
        for update in sink.updates() {
            assert!(update.progress >= last, "progress went backwards");
            last = update.progress;
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn test_terminal_jobs_are_discarded() {
        let remote = MockRemoteApi::new();
        remote.set_table(EntityKind::Products, products(&["Mug"]));

        let manager = SearchJobManager::new(
            EntityKind::Products,
            test_store().await,
            remote,
            test_config(),
        );

        // A session's worth of debounced queries must not accumulate
        // per-job state.
        for _ in 0..50 {
            let job_id = manager.start_search("mug").await;
            manager.wait_for(&job_id).await;
        }

        assert_eq!(manager.job_count().await, 0);
        assert!(manager.latest_results().await.is_some());
    }
}
