//! # Vela Sync
//!
//! The network-facing half of the offline-first data layer: full-catalog
//! synchronization, cancellable background search, connectivity tracking,
//! and the startup sequence that decides whether the app can open.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            vela-sync                                │
//! │                                                                     │
//! │  ┌──────────────┐   ┌─────────────┐   ┌────────────────────────┐    │
//! │  │ AppInitializer│──│ SyncEngine  │   │ SearchJobManager       │    │
//! │  └──────┬───────┘   └──────┬──────┘   │ (one per entity table) │    │
//! │         │                  │          └───────────┬────────────┘    │
//! │         │probe       ┌─────▼──────────────────────▼─────┐           │
//! │         └───────────►│          RemoteApi (HTTP)        │           │
//! │                      └─────────────────┬────────────────┘           │
//! │                                        │                            │
//! │                      ┌─────────────────▼────────────────┐           │
//! │                      │      vela-store (SQLite cache)   │           │
//! │                      └──────────────────────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

pub mod bootstrap;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod remote;
pub mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use bootstrap::{AppInitializer, HaltReason, ReadyState, Startup, StartupOutcome};
pub use config::{CacheSettings, DeviceConfig, RemoteConfig, SearchSettings, SyncConfig};
pub use connectivity::ConnectivityMonitor;
pub use engine::{NoOpEmitter, StepOutcome, SyncEngine, SyncEventEmitter, SyncReport};
pub use error::{SyncError, SyncResult};
pub use remote::{HttpRemoteApi, RemoteApi};
pub use search::{
    NoOpSink, SearchEventSink, SearchJobManager, SearchResults, SearchUpdate,
};
