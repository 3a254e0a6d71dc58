//! Shared test doubles for the sync crate.
//!
//! `MockRemoteApi` simulates the backend with per-table fixture data,
//! injectable failures, and per-query gates that hold a search response
//! until the test releases it. The gates are what make the supersession
//! and cancellation tests deterministic.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use vela_core::{EntityKind, Page, StartupStatus};

use crate::engine::SyncEventEmitter;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteApi;

/// How the mock answers search requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchMode {
    /// Filter fixture records whose JSON contains the query (case-insensitive).
    Normal,
    /// Every search fails as a connectivity error.
    Offline,
    /// Every search fails with HTTP 500.
    ServerError,
}

pub(crate) struct MockRemoteApi {
    tables: Mutex<HashMap<EntityKind, Vec<Value>>>,
    failing: Mutex<HashSet<EntityKind>>,
    hanging: Mutex<HashSet<EntityKind>>,
    offline: AtomicBool,
    search_mode: Mutex<SearchMode>,
    search_gates: Mutex<HashMap<String, Arc<Notify>>>,
    fetch_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl MockRemoteApi {
    pub fn new() -> Arc<Self> {
        Arc::new(MockRemoteApi {
            tables: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            hanging: Mutex::new(HashSet::new()),
            offline: AtomicBool::new(false),
            search_mode: Mutex::new(SearchMode::Normal),
            search_gates: Mutex::new(HashMap::new()),
            fetch_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_table(&self, kind: EntityKind, records: Vec<Value>) {
        self.tables.lock().unwrap().insert(kind, records);
    }

    /// Fixture rows for every entity table, `count` rows each.
    pub fn seed_all(&self, count: usize) {
        for kind in EntityKind::ALL {
            let records = (0..count)
                .map(|i| {
                    serde_json::json!({
                        "id": format!("{}-{i}", kind.table_name()),
                        "name": format!("{} {i}", kind.table_name()),
                    })
                })
                .collect();
            self.set_table(kind, records);
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes `fetch` for this table fail with HTTP 500.
    pub fn fail_table(&self, kind: EntityKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    /// Makes `fetch` for this table never resolve.
    pub fn hang_table(&self, kind: EntityKind) {
        self.hanging.lock().unwrap().insert(kind);
    }

    pub fn set_search_mode(&self, mode: SearchMode) {
        *self.search_mode.lock().unwrap() = mode;
    }

    /// Holds any search for `query` until the returned handle is notified.
    pub fn gate_search(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.search_gates
            .lock()
            .unwrap()
            .insert(query.to_string(), gate.clone());
        gate
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn paged(records: &[Value], page: u32, page_size: u32) -> Page {
        let start = ((page.max(1) - 1) as usize) * page_size as usize;
        let slice = records
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();
        Page {
            records: slice,
            total_count: records.len() as u64,
        }
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    async fn fetch(&self, kind: EntityKind, page: u32, page_size: u32) -> SyncResult<Page> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Offline);
        }
        if self.hanging.lock().unwrap().contains(&kind) {
            std::future::pending::<()>().await;
            unreachable!();
        }
        if self.failing.lock().unwrap().contains(&kind) {
            return Err(SyncError::RemoteStatus { status: 500 });
        }

        let tables = self.tables.lock().unwrap();
        let records = tables.get(&kind).cloned().unwrap_or_default();
        Ok(Self::paged(&records, page, page_size))
    }

    async fn search(
        &self,
        kind: EntityKind,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> SyncResult<Page> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.search_gates.lock().unwrap().get(query).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mode = *self.search_mode.lock().unwrap();
        if self.offline.load(Ordering::SeqCst) || mode == SearchMode::Offline {
            return Err(SyncError::Offline);
        }
        if mode == SearchMode::ServerError {
            return Err(SyncError::RemoteStatus { status: 500 });
        }

        let needle = query.to_lowercase();
        let tables = self.tables.lock().unwrap();
        let matches: Vec<Value> = tables
            .get(&kind)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.to_string().to_lowercase().contains(&needle))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self::paged(&matches, page, page_size))
    }

    async fn health_check(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

/// Event emitter that records every status update for assertions.
#[derive(Default)]
pub(crate) struct RecordingEmitter {
    pub statuses: Mutex<Vec<StartupStatus>>,
    pub warnings: Mutex<Vec<(String, String)>>,
}

impl RecordingEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(RecordingEmitter::default())
    }

    pub fn statuses(&self) -> Vec<StartupStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn warnings(&self) -> Vec<(String, String)> {
        self.warnings.lock().unwrap().clone()
    }
}

impl SyncEventEmitter for RecordingEmitter {
    fn emit_step(&self, status: &StartupStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn emit_warning(&self, step: &str, message: &str) {
        self.warnings
            .lock()
            .unwrap()
            .push((step.to_string(), message.to_string()));
    }
}
