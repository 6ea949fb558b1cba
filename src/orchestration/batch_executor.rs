//! # Batch Executor
//!
//! Drives one claimed batch through its sub-tasks, strictly one at a time:
//! expand, submit, await completion, record the outcome, advance progress.
//!
//! Sub-task failures are recorded and never abort the batch. Store failures
//! and an undecodable config abort it and mark it `failed`. When the stop
//! token fires between sub-tasks the batch is left `running` with its partial
//! progress.

use parking_lot::RwLock;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::stats::SchedulerStats;
use crate::error::{BatcherError, BatcherResult};
use crate::execution::ExecutionEngine;
use crate::expansion::{expand, Document};
use crate::logging::{log_batch_operation, log_sub_task_operation};
use crate::models::{BatchTask, SubTask};
use crate::state_machine::{determine_target_state, BatchTaskEvent, BatchTaskStatus, SubTaskStatus};

/// How a batch run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchRunOutcome {
    /// Every sub-task was processed; the batch is `completed`
    Completed { processed: i64 },
    /// Stopped between sub-tasks; the batch stays `running`
    Interrupted { processed: i64 },
    /// Batch-level error; the batch is `failed`
    Failed { reason: String },
    /// The batch was no longer pending when the worker reached it
    Skipped,
}

enum SubTaskLoop {
    Finished(i64),
    Stopped(i64),
}

/// Everything needed to run batches, shared with the scheduler loop
#[derive(Clone)]
pub struct BatchExecutor {
    pool: SqlitePool,
    engine: Arc<dyn ExecutionEngine>,
    submission_delay: Duration,
    completion_timeout: Duration,
    stats: Arc<SchedulerStats>,
    current_batch: Arc<RwLock<Option<i64>>>,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("submission_delay", &self.submission_delay)
            .field("completion_timeout", &self.completion_timeout)
            .field("current_batch", &*self.current_batch.read())
            .finish()
    }
}

impl BatchExecutor {
    pub fn new(
        pool: SqlitePool,
        engine: Arc<dyn ExecutionEngine>,
        submission_delay: Duration,
        completion_timeout: Duration,
        stats: Arc<SchedulerStats>,
        current_batch: Arc<RwLock<Option<i64>>>,
    ) -> Self {
        Self {
            pool,
            engine,
            submission_delay,
            completion_timeout,
            stats,
            current_batch,
        }
    }

    /// Run `batch` to a terminal state, or until `token` is cancelled
    ///
    /// Never returns an error: every failure is folded into the outcome and
    /// the persisted status.
    #[instrument(skip(self, batch, token), fields(batch_id = batch.id))]
    pub async fn execute(&self, batch: BatchTask, token: &CancellationToken) -> BatchRunOutcome {
        let batch_id = batch.id;

        if let Err(e) = determine_target_state(batch.status, &BatchTaskEvent::Start) {
            warn!(error = %e, "Refusing to start batch");
            return BatchRunOutcome::Skipped;
        }

        match BatchTask::claim(&self.pool, batch_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Batch no longer pending, skipping");
                return BatchRunOutcome::Skipped;
            }
            Err(e) => {
                let reason = format!("Failed to claim batch: {e}");
                return self.fail_batch(&batch, reason).await;
            }
        }

        *self.current_batch.write() = Some(batch_id);
        log_batch_operation(
            "started",
            batch_id,
            Some(&batch.name),
            BatchTaskStatus::Running.as_str(),
            Some(0),
            Some(batch.total_count),
        );

        let outcome = match self.run_sub_tasks(&batch, token).await {
            Ok(SubTaskLoop::Finished(processed)) => self.complete_batch(&batch, processed).await,
            Ok(SubTaskLoop::Stopped(processed)) => {
                SchedulerStats::incr(&self.stats.batches_interrupted);
                log_batch_operation(
                    "interrupted",
                    batch_id,
                    Some(&batch.name),
                    BatchTaskStatus::Running.as_str(),
                    Some(processed),
                    Some(batch.total_count),
                );
                BatchRunOutcome::Interrupted { processed }
            }
            Err(e) => self.fail_batch(&batch, e.to_string()).await,
        };

        *self.current_batch.write() = None;
        outcome
    }

    async fn run_sub_tasks(
        &self,
        batch: &BatchTask,
        token: &CancellationToken,
    ) -> BatcherResult<SubTaskLoop> {
        let config = batch.batch_config()?;
        let sub_tasks = SubTask::list_for_batch(&self.pool, batch.id).await?;

        debug!(
            nodes = config.workflow.len(),
            sub_tasks = sub_tasks.len(),
            "Loaded batch"
        );
        if config.workflow.is_empty() {
            warn!(batch_id = batch.id, "Batch template has no nodes");
        }

        let mut processed: i64 = 0;
        for sub_task in &sub_tasks {
            if token.is_cancelled() {
                return Ok(SubTaskLoop::Stopped(processed));
            }

            let document = expand(&config.workflow, &sub_task.overrides());
            let (status, result) = self.run_one(batch.id, sub_task.id, &document).await;

            SubTask::update(&self.pool, sub_task.id, status, Some(&result)).await?;
            processed += 1;

            let progress = processed.min(batch.total_count);
            let updated = BatchTask::update_status(
                &self.pool,
                batch.id,
                BatchTaskStatus::Running,
                Some(progress),
            )
            .await?;
            if !updated {
                return Err(BatcherError::NotFound(batch.id));
            }
            debug!(progress, total = batch.total_count, "Batch progress");

            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(self.submission_delay) => {}
            }
        }

        Ok(SubTaskLoop::Finished(processed))
    }

    /// Submit one document and wait for it; returns the sub-task's terminal
    /// status and result text
    async fn run_one(
        &self,
        batch_id: i64,
        sub_task_id: i64,
        document: &Document,
    ) -> (SubTaskStatus, String) {
        let handle = match self.engine.submit(document).await {
            Ok(handle) => handle,
            Err(e) => {
                SchedulerStats::incr(&self.stats.sub_tasks_failed);
                let reason = e.to_string();
                log_sub_task_operation(
                    "submit_failed",
                    batch_id,
                    sub_task_id,
                    None,
                    SubTaskStatus::Failed.as_str(),
                    Some(&reason),
                );
                return (SubTaskStatus::Failed, reason);
            }
        };
        SchedulerStats::incr(&self.stats.sub_tasks_submitted);

        let outcome = self
            .engine
            .await_completion(&handle, self.completion_timeout)
            .await;

        if outcome.is_success() {
            log_sub_task_operation(
                "completed",
                batch_id,
                sub_task_id,
                Some(&handle.job_id),
                SubTaskStatus::Completed.as_str(),
                None,
            );
            return (SubTaskStatus::Completed, handle.job_id);
        }

        SchedulerStats::incr(&self.stats.sub_tasks_failed);
        let reason = outcome
            .failure_reason()
            .unwrap_or_else(|| "Unknown failure".to_string());
        log_sub_task_operation(
            "failed",
            batch_id,
            sub_task_id,
            Some(&handle.job_id),
            SubTaskStatus::Failed.as_str(),
            Some(&reason),
        );
        (SubTaskStatus::Failed, reason)
    }

    async fn complete_batch(&self, batch: &BatchTask, processed: i64) -> BatchRunOutcome {
        let target = match determine_target_state(BatchTaskStatus::Running, &BatchTaskEvent::Complete) {
            Ok(target) => target,
            Err(e) => return self.fail_batch(batch, e.to_string()).await,
        };
        let final_count = processed.min(batch.total_count);

        match BatchTask::update_status(&self.pool, batch.id, target, Some(final_count)).await {
            Ok(false) => {
                self.fail_batch(batch, BatcherError::NotFound(batch.id).to_string())
                    .await
            }
            Ok(true) => {
                SchedulerStats::incr(&self.stats.batches_completed);
                log_batch_operation(
                    "completed",
                    batch.id,
                    Some(&batch.name),
                    target.as_str(),
                    Some(final_count),
                    Some(batch.total_count),
                );
                BatchRunOutcome::Completed { processed }
            }
            Err(e) => {
                self.fail_batch(batch, format!("Failed to record completion: {e}"))
                    .await
            }
        }
    }

    /// Mark the batch `failed`, leaving its progress counter untouched
    pub(crate) async fn fail_batch(&self, batch: &BatchTask, reason: String) -> BatchRunOutcome {
        SchedulerStats::incr(&self.stats.batches_failed);
        error!(batch_id = batch.id, error = %reason, "❌ Batch execution failed");

        let event = BatchTaskEvent::Fail(reason.clone());
        let target = determine_target_state(BatchTaskStatus::Running, &event)
            .unwrap_or(BatchTaskStatus::Failed);

        match BatchTask::update_status(&self.pool, batch.id, target, None).await {
            Ok(false) => warn!(
                batch_id = batch.id,
                "Batch row is gone; failure not recorded"
            ),
            Ok(true) => log_batch_operation(
                "failed",
                batch.id,
                Some(&batch.name),
                target.as_str(),
                None,
                Some(batch.total_count),
            ),
            Err(e) => error!(
                batch_id = batch.id,
                error = %e,
                "Failed to record batch failure"
            ),
        }

        BatchRunOutcome::Failed { reason }
    }

    pub(crate) fn clear_current_batch(&self) {
        *self.current_batch.write() = None;
    }
}

pub(crate) fn log_outcome(batch_id: i64, outcome: &BatchRunOutcome) {
    match outcome {
        BatchRunOutcome::Completed { processed } => {
            info!(batch_id, processed, "✅ Batch finished")
        }
        BatchRunOutcome::Interrupted { processed } => {
            info!(batch_id, processed, "Batch interrupted by shutdown")
        }
        BatchRunOutcome::Failed { reason } => {
            info!(batch_id, reason = %reason, "Batch marked failed")
        }
        BatchRunOutcome::Skipped => debug!(batch_id, "Batch skipped"),
    }
}
