use serde::{Deserialize, Serialize};

/// Events that can trigger batch task state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BatchTaskEvent {
    /// Scheduler picked the batch up
    Start,
    /// Scheduler processed every sub-task
    Complete,
    /// Batch-level failure with error message
    Fail(String),
    /// Control surface queued the batch (again)
    Rearm,
}

impl BatchTaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Fail(_) => "fail",
            Self::Rearm => "rearm",
        }
    }
}
