use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use batcher_core::execution::{CompletionOutcome, ExecutionEngine, JobHandle, SubmitError};
use batcher_core::expansion::Document;
use batcher_core::models::BatchTask;
use batcher_core::state_machine::BatchTaskStatus;

/// What the mock engine does with one submission
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedOutcome {
    Complete,
    Fail(String),
    TimeOut,
    RejectSubmit(String),
}

/// Store state captured at the moment of a submission
#[derive(Debug, Clone)]
pub struct Observation {
    pub running_batch_ids: Vec<i64>,
    /// (batch id, completed_count, total_count) for every batch
    pub progress: Vec<(i64, i64, i64)>,
}

/// Scripted in-memory engine recording every submitted document
pub struct MockEngine {
    submissions: Mutex<Vec<Document>>,
    script: Mutex<VecDeque<ScriptedOutcome>>,
    default_outcome: ScriptedOutcome,
    latencies: Mutex<VecDeque<Duration>>,
    default_latency: Duration,
    outcomes: Mutex<HashMap<String, (ScriptedOutcome, Duration)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    observer: Option<SqlitePool>,
    observations: Mutex<Vec<Observation>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::with_default_outcome(ScriptedOutcome::Complete)
    }

    pub fn with_default_outcome(default_outcome: ScriptedOutcome) -> Self {
        Self {
            submissions: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            default_outcome,
            latencies: Mutex::new(VecDeque::new()),
            default_latency: Duration::ZERO,
            outcomes: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            observer: None,
            observations: Mutex::new(Vec::new()),
        }
    }

    /// Outcomes for the first submissions, in order; later ones use the default
    pub fn with_script(self, script: Vec<ScriptedOutcome>) -> Self {
        *self.script.lock() = script.into();
        self
    }

    /// Completion latency for the first submissions, in order
    pub fn with_latencies(self, latencies: Vec<Duration>) -> Self {
        *self.latencies.lock() = latencies.into();
        self
    }

    pub fn with_default_latency(mut self, latency: Duration) -> Self {
        self.default_latency = latency;
        self
    }

    /// Snapshot batch statuses from `pool` on every submission
    pub fn observing(mut self, pool: SqlitePool) -> Self {
        self.observer = Some(pool);
        self
    }

    pub fn submissions(&self) -> Vec<Document> {
        self.submissions.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    /// `inputs.seed` of node "3" for every submission, in submission order
    pub fn submitted_seeds(&self) -> Vec<Value> {
        self.submissions
            .lock()
            .iter()
            .map(|doc| doc["3"]["inputs"]["seed"].clone())
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().clone()
    }

    async fn observe(&self) {
        let Some(pool) = &self.observer else {
            return;
        };

        let running = BatchTask::list_by_status(pool, BatchTaskStatus::Running)
            .await
            .unwrap_or_default();
        let all = BatchTask::list_recent(pool, 1000).await.unwrap_or_default();

        self.observations.lock().push(Observation {
            running_batch_ids: running.iter().map(|t| t.id).collect(),
            progress: all
                .iter()
                .map(|t| (t.id, t.completed_count, t.total_count))
                .collect(),
        });
    }
}

#[async_trait]
impl ExecutionEngine for MockEngine {
    async fn submit(&self, document: &Document) -> Result<JobHandle, SubmitError> {
        self.observe().await;

        let job_number = {
            let mut submissions = self.submissions.lock();
            submissions.push(document.clone());
            submissions.len()
        };

        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_outcome.clone());
        let latency = self
            .latencies
            .lock()
            .pop_front()
            .unwrap_or(self.default_latency);

        if let ScriptedOutcome::RejectSubmit(body) = outcome {
            return Err(SubmitError::Status { status: 503, body });
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let job_id = format!("job-{job_number}");
        self.outcomes
            .lock()
            .insert(job_id.clone(), (outcome, latency));
        Ok(JobHandle::new(job_id, format!("mock-{job_number:08x}")))
    }

    async fn await_completion(&self, handle: &JobHandle, _timeout: Duration) -> CompletionOutcome {
        let entry = self.outcomes.lock().get(&handle.job_id).cloned();
        let (outcome, latency) = entry.unwrap_or((ScriptedOutcome::Complete, Duration::ZERO));

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match outcome {
            ScriptedOutcome::Complete => CompletionOutcome::Completed,
            ScriptedOutcome::Fail(reason) => CompletionOutcome::Failed(reason),
            ScriptedOutcome::TimeOut => CompletionOutcome::TimedOut,
            ScriptedOutcome::RejectSubmit(_) => CompletionOutcome::Failed("rejected".to_string()),
        }
    }
}
