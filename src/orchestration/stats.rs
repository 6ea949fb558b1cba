use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Runtime counters for the scheduler worker
#[derive(Debug, Default)]
pub struct SchedulerStats {
    /// Poll iterations completed
    pub polls: AtomicU64,
    /// Pending-task queries that failed
    pub poll_errors: AtomicU64,
    pub batches_completed: AtomicU64,
    pub batches_failed: AtomicU64,
    /// Batches left `running` because the worker was stopped mid-way
    pub batches_interrupted: AtomicU64,
    /// Sub-tasks the engine accepted
    pub sub_tasks_submitted: AtomicU64,
    /// Sub-tasks recorded as `failed`, whether at submit or completion
    pub sub_tasks_failed: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatsSnapshot {
    pub polls: u64,
    pub poll_errors: u64,
    pub batches_completed: u64,
    pub batches_failed: u64,
    pub batches_interrupted: u64,
    pub sub_tasks_submitted: u64,
    pub sub_tasks_failed: u64,
}

impl SchedulerStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SchedulerStatsSnapshot {
        SchedulerStatsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            batches_completed: self.batches_completed.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            batches_interrupted: self.batches_interrupted.load(Ordering::Relaxed),
            sub_tasks_submitted: self.sub_tasks_submitted.load(Ordering::Relaxed),
            sub_tasks_failed: self.sub_tasks_failed.load(Ordering::Relaxed),
        }
    }
}
