//! # Search Job State Machine
//!
//! A [`SearchJob`] is one cancellable unit of background search work. The
//! state machine is deliberately strict: terminal states absorb every later
//! signal, so a network response that arrives after cancellation can never
//! resurrect a job.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Search Job Lifecycle                                │
//! │                                                                         │
//! │   start_search()          request issued                                │
//! │        │                       │                                        │
//! │        ▼                       ▼                                        │
//! │   ┌─────────┐           ┌────────────┐        ┌───────────┐             │
//! │   │ Pending │ ────────► │ Processing │ ─────► │ Completed │             │
//! │   └─────────┘           └────────────┘        └───────────┘             │
//! │        │                       │                                        │
//! │        │                       ├─────────────► ┌───────────┐            │
//! │        │                       │               │  Failed   │            │
//! │        │                       │               └───────────┘            │
//! │        │                       ▼                                        │
//! │        └───────────────► ┌───────────┐                                  │
//! │          (superseded)    │ Cancelled │  ◄── terminal, absorbs all       │
//! │                          └───────────┘      later transitions           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Search Job Status
// =============================================================================

/// Status of a background search job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchJobStatus {
    /// Created, request not yet issued.
    Pending,
    /// Request in flight.
    Processing,
    /// Results delivered.
    Completed,
    /// Request failed; caller decides whether to retry.
    Failed,
    /// Superseded by a newer job or cancelled explicitly.
    Cancelled,
}

impl SearchJobStatus {
    /// Returns true once the job can no longer change state.
    ///
    /// Pending and Processing are the only non-terminal states.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchJobStatus::Pending | SearchJobStatus::Processing)
    }
}

impl std::fmt::Display for SearchJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SearchJobStatus::Pending => "pending",
            SearchJobStatus::Processing => "processing",
            SearchJobStatus::Completed => "completed",
            SearchJobStatus::Failed => "failed",
            SearchJobStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Search Job
// =============================================================================

/// One cancellable in-flight search request.
///
/// All transition methods return whether the transition applied. Callers
/// never get an error for a late signal: a cancel on a completed job, or a
/// progress report on a cancelled one, is simply a no-op. That makes every
/// operation safe to call redundantly from racing tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJob {
    /// Opaque job token (UUID v4).
    pub id: String,

    /// The query this job is searching for.
    pub query: String,

    /// Current lifecycle status.
    pub status: SearchJobStatus,

    /// Progress percentage, 0-100, monotonic within the job.
    pub progress: u8,

    /// Stream generation at creation time. A job only delivers results
    /// while its generation is still the stream's current one.
    pub generation: u64,

    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

impl SearchJob {
    /// Creates a new job in `Pending` for the given stream generation.
    pub fn new(query: impl Into<String>, generation: u64) -> Self {
        SearchJob {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            status: SearchJobStatus::Pending,
            progress: 0,
            generation,
            created_at: Utc::now(),
        }
    }

    /// Returns true once the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending → Processing, as the request is issued.
    pub fn begin_processing(&mut self) -> bool {
        if self.status == SearchJobStatus::Pending {
            self.status = SearchJobStatus::Processing;
            true
        } else {
            false
        }
    }

    /// Marks the job completed and snaps progress to 100.
    pub fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = SearchJobStatus::Completed;
        self.progress = 100;
        true
    }

    /// Marks the job failed. Progress stays where it was.
    pub fn fail(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = SearchJobStatus::Failed;
        true
    }

    /// Marks the job cancelled. Idempotent: a second cancel (or a cancel
    /// after completion) is a no-op and returns false.
    pub fn cancel(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = SearchJobStatus::Cancelled;
        true
    }

    /// Records a progress report.
    ///
    /// Reports are monotonic within a job: out-of-order values and reports
    /// arriving after a terminal state are dropped silently (the job is
    /// already decided, so a late report is not an error). Values above 100
    /// clamp to 100.
    pub fn set_progress(&mut self, percent: u8) -> bool {
        if self.is_terminal() {
            return false;
        }
        let percent = percent.min(100);
        if percent <= self.progress {
            return false;
        }
        self.progress = percent;
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
