//! # Batch Scheduler
//!
//! The single background worker. On a fixed cadence it queries pending
//! batches, runs the oldest one to completion on the worker itself, then
//! sleeps and repeats. At most one batch is `running` at any instant because
//! there is exactly one worker and it awaits each batch before polling again.
//!
//! Stopping is cooperative: [`BatchScheduler::stop`] cancels the worker's
//! token, which is observed once per poll and once per sub-task. A job
//! already submitted is never interrupted.

use parking_lot::{Mutex, RwLock};
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::batch_executor::{log_outcome, BatchExecutor, BatchRunOutcome};
use super::stats::{SchedulerStats, SchedulerStatsSnapshot};
use crate::config::SchedulerConfig;
use crate::error::BatcherResult;
use crate::execution::ExecutionEngine;
use crate::models::BatchTask;

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the poll loop worker and its shared state
pub struct BatchScheduler {
    scheduler_id: Uuid,
    pool: SqlitePool,
    config: SchedulerConfig,
    executor: BatchExecutor,
    stats: Arc<SchedulerStats>,
    current_batch: Arc<RwLock<Option<i64>>>,
    is_running: Arc<AtomicBool>,
    worker: Mutex<Option<Worker>>,
}

impl std::fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("scheduler_id", &self.scheduler_id)
            .field("config", &self.config)
            .field("is_running", &self.is_running.load(Ordering::Relaxed))
            .field("current_batch", &*self.current_batch.read())
            .finish()
    }
}

impl BatchScheduler {
    pub fn new(
        pool: SqlitePool,
        engine: Arc<dyn ExecutionEngine>,
        config: SchedulerConfig,
        completion_timeout: Duration,
    ) -> Self {
        let stats = Arc::new(SchedulerStats::default());
        let current_batch = Arc::new(RwLock::new(None));
        let executor = BatchExecutor::new(
            pool.clone(),
            engine,
            config.submission_delay(),
            completion_timeout,
            stats.clone(),
            current_batch.clone(),
        );

        Self {
            scheduler_id: Uuid::new_v4(),
            pool,
            config,
            executor,
            stats,
            current_batch,
            is_running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    /// Recover interrupted batches, then spawn the poll loop
    ///
    /// Calling `start` on a running scheduler is a no-op.
    pub async fn start(&self) -> BatcherResult<()> {
        if self.is_running() {
            debug!(scheduler_id = %self.scheduler_id, "Scheduler already running");
            return Ok(());
        }

        if self.config.fail_interrupted_on_start {
            self.recover_interrupted().await?;
        }

        let token = CancellationToken::new();
        self.is_running.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(run_loop(
            self.scheduler_id,
            self.pool.clone(),
            self.executor.clone(),
            self.config.poll_interval(),
            self.stats.clone(),
            self.current_batch.clone(),
            self.is_running.clone(),
            token.clone(),
        ));

        *self.worker.lock() = Some(Worker { token, handle });

        info!(
            scheduler_id = %self.scheduler_id,
            poll_interval_ms = self.config.poll_interval_ms,
            submission_delay_ms = self.config.submission_delay_ms,
            "🔄 Batch scheduler started"
        );
        Ok(())
    }

    /// Signal the worker to stop and wait up to the grace period for it
    ///
    /// Returns `true` if the worker exited within the grace period. A worker
    /// that overruns keeps going on its own until its in-flight job finishes.
    pub async fn stop(&self) -> bool {
        let Some(Worker { token, handle }) = self.worker.lock().take() else {
            return true;
        };

        info!(scheduler_id = %self.scheduler_id, "Stopping batch scheduler");
        token.cancel();

        let grace = self.config.shutdown_grace();
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(())) => {
                info!(scheduler_id = %self.scheduler_id, "Batch scheduler stopped");
                true
            }
            Ok(Err(join_error)) => {
                error!(scheduler_id = %self.scheduler_id, error = %join_error, "Scheduler worker ended abnormally");
                self.is_running.store(false, Ordering::SeqCst);
                true
            }
            Err(_) => {
                warn!(
                    scheduler_id = %self.scheduler_id,
                    grace_ms = grace.as_millis() as u64,
                    current_batch = ?self.current_batch_id(),
                    "Scheduler worker did not exit within grace period"
                );
                false
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Id of the batch the worker is executing right now
    pub fn current_batch_id(&self) -> Option<i64> {
        *self.current_batch.read()
    }

    pub fn stats(&self) -> SchedulerStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn scheduler_id(&self) -> Uuid {
        self.scheduler_id
    }

    /// Mark batches a previous process left `running` as `failed`
    pub async fn recover_interrupted(&self) -> BatcherResult<u64> {
        let recovered = BatchTask::fail_running(&self.pool).await?;
        if recovered > 0 {
            warn!(
                scheduler_id = %self.scheduler_id,
                recovered,
                "Marked interrupted batches as failed"
            );
        }
        Ok(recovered)
    }

    /// Run one poll iteration inline: execute the oldest pending batch, if any
    ///
    /// Returns `None` when nothing was pending.
    pub async fn poll_once(&self, token: &CancellationToken) -> Option<BatchRunOutcome> {
        poll_iteration(&self.pool, &self.executor, &self.stats, token).await
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop(
    scheduler_id: Uuid,
    pool: SqlitePool,
    executor: BatchExecutor,
    poll_interval: Duration,
    stats: Arc<SchedulerStats>,
    current_batch: Arc<RwLock<Option<i64>>>,
    is_running: Arc<AtomicBool>,
    token: CancellationToken,
) {
    info!(scheduler_id = %scheduler_id, "Scheduler loop running");

    while !token.is_cancelled() {
        poll_iteration(&pool, &executor, &stats, &token).await;

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    *current_batch.write() = None;
    is_running.store(false, Ordering::SeqCst);
    info!(scheduler_id = %scheduler_id, "Scheduler loop exited");
}

async fn poll_iteration(
    pool: &SqlitePool,
    executor: &BatchExecutor,
    stats: &Arc<SchedulerStats>,
    token: &CancellationToken,
) -> Option<BatchRunOutcome> {
    SchedulerStats::incr(&stats.polls);

    let pending = match BatchTask::list_pending(pool).await {
        Ok(pending) => pending,
        Err(e) => {
            SchedulerStats::incr(&stats.poll_errors);
            error!(error = %e, "Failed to query pending batches");
            return None;
        }
    };

    let batch = pending.into_iter().next()?;
    let batch_id = batch.id;
    debug!(batch_id, "Picked pending batch");

    // A panic inside execution fails this batch only.
    let task_executor = executor.clone();
    let task_token = token.clone();
    let fallback = batch.clone();
    let outcome = match tokio::spawn(async move { task_executor.execute(batch, &task_token).await })
        .await
    {
        Ok(outcome) => outcome,
        Err(join_error) => {
            let outcome = executor
                .fail_batch(&fallback, format!("Batch execution aborted: {join_error}"))
                .await;
            executor.clear_current_batch();
            outcome
        }
    };

    log_outcome(batch_id, &outcome);
    Some(outcome)
}
