//! Execution engine abstraction: the submit / await-completion seam the
//! scheduler drives.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::expansion::Document;

/// Handle to one submitted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    /// Engine-assigned job identifier
    pub job_id: String,
    /// Client-session id sent along with the submission
    pub client_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            client_id: client_id.into(),
        }
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_id)
    }
}

/// Submission failure; terminal for the sub-task, never retried
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Engine rejected submission with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed submission response: {0}")]
    MalformedResponse(String),
}

/// Terminal outcome of waiting on a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    /// The engine reported an error
    Failed(String),
    /// No terminal status within the timeout
    TimedOut,
}

impl CompletionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Free-text reason for a non-successful outcome
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Completed => None,
            Self::Failed(reason) => Some(reason.clone()),
            Self::TimedOut => Some("Timed out waiting for completion".to_string()),
        }
    }
}

/// An external engine that runs job documents asynchronously
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Submit one job document; a single attempt
    async fn submit(&self, document: &Document) -> Result<JobHandle, SubmitError>;

    /// Wait until the job reaches a terminal status or `timeout` elapses
    ///
    /// Transient status-query failures are not surfaced; they only delay the
    /// outcome.
    async fn await_completion(&self, handle: &JobHandle, timeout: Duration) -> CompletionOutcome;
}
