//! # Startup Progress Tracking
//!
//! [`StartupStatus`] is the step tracker the App Initializer and Sync Engine
//! report through. [`ProgressTracker`] wraps it so that UI-visible progress
//! counters are monotonically non-decreasing within one run, and an error
//! status is terminal for that run.

use serde::{Deserialize, Serialize};

// =============================================================================
// Startup Status
// =============================================================================

/// One progress update during initialization or a full sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupStatus {
    /// Name of the step being reported (e.g., "products", "connectivity").
    pub step: String,

    /// Steps completed so far.
    pub progress: u32,

    /// Total steps in this run.
    pub total: u32,

    /// True when the run has failed terminally.
    pub error: bool,

    /// Human-readable message for the splash screen.
    pub message: String,
}

// =============================================================================
// Progress Tracker
// =============================================================================

/// Enforces the reporting contract on a run's stream of status updates:
/// progress never decreases, and nothing is reported after an error.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u32,
    progress: u32,
    errored: bool,
}

impl ProgressTracker {
    /// Creates a tracker for a run with the given number of steps.
    pub fn new(total: u32) -> Self {
        ProgressTracker {
            total,
            progress: 0,
            errored: false,
        }
    }

    /// Reports a step at the given position. Positions lower than the
    /// current progress are lifted to it, keeping the stream monotonic.
    /// Returns `None` after the run has errored.
    pub fn step(
        &mut self,
        step: impl Into<String>,
        position: u32,
        message: impl Into<String>,
    ) -> Option<StartupStatus> {
        if self.errored {
            return None;
        }
        self.progress = self.progress.max(position.min(self.total));
        Some(StartupStatus {
            step: step.into(),
            progress: self.progress,
            total: self.total,
            error: false,
            message: message.into(),
        })
    }

    /// Reports a terminal error for this run. Further `step` calls return
    /// `None`.
    pub fn fail(
        &mut self,
        step: impl Into<String>,
        message: impl Into<String>,
    ) -> StartupStatus {
        self.errored = true;
        StartupStatus {
            step: step.into(),
            progress: self.progress,
            total: self.total,
            error: true,
            message: message.into(),
        }
    }

    /// Steps completed so far.
    pub fn progress(&self) -> u32 {
        self.progress
    }

    /// Whether the run has failed terminally.
    pub fn is_errored(&self) -> bool {
        self.errored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_never_decreases() {
        let mut tracker = ProgressTracker::new(5);

        let a = tracker.step("products", 2, "Syncing products").unwrap();
        assert_eq!(a.progress, 2);

        // A late-arriving lower position is lifted, not rewound.
        let b = tracker.step("customers", 1, "Syncing customers").unwrap();
        assert_eq!(b.progress, 2);

        let c = tracker.step("branches", 4, "Syncing branches").unwrap();
        assert_eq!(c.progress, 4);
    }

    #[test]
    fn test_error_is_terminal() {
        let mut tracker = ProgressTracker::new(3);
        tracker.step("store", 1, "Opening local store").unwrap();

        let err = tracker.fail("store", "Storage unavailable");
        assert!(err.error);
        assert!(tracker.is_errored());
        assert!(tracker.step("sync", 2, "unreachable").is_none());
    }

    #[test]
    fn test_position_clamped_to_total() {
        let mut tracker = ProgressTracker::new(3);
        let s = tracker.step("done", 9, "Ready").unwrap();
        assert_eq!(s.progress, 3);
    }
}
