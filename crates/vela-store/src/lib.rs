//! # vela-store: Local Cache Store for Vela POS
//!
//! This crate provides the on-device cache that lets the app keep working
//! without connectivity. It uses SQLite for durable storage with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vela POS Data Flow                               │
//! │                                                                         │
//! │  Sync Engine / UI pickers                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     vela-store (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  LocalStore   │    │ TableRepo     │    │ EntityCache  │  │   │
//! │  │   │  (store.rs)   │    │ (tables.rs)   │    │ (cache.rs)   │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ get/replace/  │◄───│ typed facade │  │   │
//! │  │   │ + migrations  │    │ stats/clear   │    │ + staleness  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (survives process restart)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Connection pool creation and configuration
//! - [`tables`] - Whole-table replace, snapshot reads, statistics
//! - [`cache`] - Typed per-entity facade with staleness policy
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vela_store::{EntityCache, LocalStore, StoreConfig};
//! use vela_core::Customer;
//!
//! let store = LocalStore::open(StoreConfig::new("vela-cache.db")).await?;
//! let customers: EntityCache<Customer> = EntityCache::new(store.clone());
//!
//! // Instant read of whatever is cached, stale or not
//! if let Some(cached) = customers.get_cached().await? {
//!     render(cached);
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod error;
pub mod migrations;
pub mod store;
pub mod tables;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::{CachePolicy, EntityCache, ReadThrough};
pub use error::{StoreError, StoreResult};
pub use store::{LocalStore, StoreConfig};
pub use tables::{CacheStats, CacheTable, TableRepository, TableStats};
