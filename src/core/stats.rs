//! Scheduler statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Configured concurrency limit.
    pub concurrency: usize,
    /// Jobs currently running.
    pub running: usize,
    /// Jobs waiting to start.
    pub pending: usize,
    /// Jobs admitted since creation.
    pub submitted: u64,
    /// Jobs that finished without error.
    pub completed: u64,
    /// Jobs that finished with an error.
    pub failed: u64,
    /// Pending jobs dropped at dispatch because their cancellation had fired.
    pub skipped: u64,
    /// Whether dispatch is paused.
    pub paused: bool,
    /// Whether the scheduler was destroyed.
    pub destroyed: bool,
}

/// Lifetime counters, updated without taking the state lock.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub submitted: AtomicU64,
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub skipped: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters into `stats`.
    pub fn fill(&self, stats: &mut SchedulerStats) {
        stats.submitted = self.submitted.load(Ordering::Relaxed);
        stats.completed = self.completed.load(Ordering::Relaxed);
        stats.failed = self.failed.load(Ordering::Relaxed);
        stats.skipped = self.skipped.load(Ordering::Relaxed);
    }
}
