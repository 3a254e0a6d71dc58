//! # vela-core: Pure Domain Types
//!
//! This crate contains the domain model for the Vela POS offline data layer.
//! It is **pure**: no I/O, no async runtime, no database. Everything here is
//! plain data plus the state machines that guard it.
//!
//! ## Module Organization
//!
//! - [`types`] - Entity records, the [`EntityKind`] table registry, [`Page`]
//! - [`job`] - Search job state machine (pending → processing → terminal)
//! - [`progress`] - Startup step progress with monotonicity enforcement
//! - [`error`] - Domain error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vela_core::{EntityKind, SearchJob, SearchJobStatus};
//!
//! let mut job = SearchJob::new("coffee", 1);
//! job.begin_processing();
//! assert_eq!(job.status, SearchJobStatus::Processing);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod job;
pub mod progress;
pub mod types;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::CoreError;
pub use job::{SearchJob, SearchJobStatus};
pub use progress::{ProgressTracker, StartupStatus};
pub use types::{
    Branch, CacheRecord, Category, Customer, EntityKind, Page, PaymentAccount, Product,
    SaleRecord,
};
