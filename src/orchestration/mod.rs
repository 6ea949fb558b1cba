//! # Scheduler Loop
//!
//! The single-worker control loop that discovers pending batch tasks and
//! drives each one through the execution engine.
//!
//! ## Core Components
//!
//! - **BatchScheduler**: owns the background worker, its stop token, and the
//!   pending-task discovery cadence
//! - **BatchExecutor**: runs one batch: claim, expand, submit, await, record
//! - **SchedulerStats**: atomic counters describing worker activity
//!
//! ## Lifecycle
//!
//! ```text
//! pending ──claim──▶ running ──all sub-tasks processed──▶ completed
//!                       │
//!                       └──store error / bad config──▶ failed
//! ```
//!
//! Individual sub-task failures are recorded on the sub-task and do not
//! change the batch outcome.

pub mod batch_executor;
pub mod scheduler;
pub mod stats;

pub use batch_executor::{BatchExecutor, BatchRunOutcome};
pub use scheduler::BatchScheduler;
pub use stats::{SchedulerStats, SchedulerStatsSnapshot};
