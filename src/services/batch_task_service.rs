use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{BatcherError, BatcherResult};
use crate::expansion::{BatchConfig, Document, Overrides};
use crate::models::{BatchTask, NewBatchTask, SubTask};
use crate::state_machine::{determine_target_state, BatchTaskEvent, BatchTaskStatus};

pub const DEFAULT_BATCH_NAME: &str = "Untitled batch";

/// A batch task together with its sub-tasks
#[derive(Debug, Clone, Serialize)]
pub struct BatchTaskDetail {
    #[serde(flatten)]
    pub task: BatchTask,
    pub sub_tasks: Vec<SubTask>,
}

/// Control-surface operations over the job store
///
/// The only status write this service makes is the re-arm to `pending`;
/// every other transition belongs to the scheduler.
#[derive(Debug, Clone)]
pub struct BatchTaskService {
    pool: SqlitePool,
}

impl BatchTaskService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a pending batch and its sub-tasks atomically; returns the new id
    pub async fn create(&self, name: Option<&str>, config: BatchConfig) -> BatcherResult<i64> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_BATCH_NAME);

        let new_task = NewBatchTask::new(name, config);
        let id = BatchTask::create_with_sub_tasks(&self.pool, &new_task).await?;

        info!(
            batch_id = id,
            name = %name,
            sub_tasks = new_task.config.sub_task_count(),
            nodes = new_task.config.workflow.len(),
            "Created batch task"
        );
        Ok(id)
    }

    /// Create from loosely typed request parts
    ///
    /// `workflow` must be a JSON object when present. `params` may be a list of
    /// override entries or a single entry; entries that are not objects or
    /// lists are rejected.
    pub async fn create_from_json(
        &self,
        name: Option<&str>,
        workflow: Option<Value>,
        params: Option<Value>,
    ) -> BatcherResult<i64> {
        let config = parse_batch_config(workflow, params)?;
        self.create(name, config).await
    }

    /// Request execution: set `pending` unless the batch is running
    ///
    /// A running batch is left untouched and reported as a conflict.
    pub async fn trigger(&self, id: i64) -> BatcherResult<()> {
        if BatchTask::rearm(&self.pool, id).await? {
            info!(batch_id = id, "Batch task queued for execution");
            return Ok(());
        }

        match BatchTask::find_by_id(&self.pool, id).await? {
            None => Err(BatcherError::NotFound(id)),
            Some(task) => {
                let reason = determine_target_state(task.status, &BatchTaskEvent::Rearm)
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| format!("batch task {id} changed state concurrently"));
                warn!(batch_id = id, status = %task.status, "Refused to trigger batch task");
                Err(BatcherError::Conflict(format!(
                    "Batch task {id} is {}: {reason}",
                    task.status
                )))
            }
        }
    }

    pub async fn list(&self, limit: i64) -> BatcherResult<Vec<BatchTask>> {
        let limit = limit.max(1);
        let tasks = BatchTask::list_recent(&self.pool, limit).await?;
        debug!(limit, returned = tasks.len(), "Listed batch tasks");
        Ok(tasks)
    }

    pub async fn get(&self, id: i64) -> BatcherResult<BatchTaskDetail> {
        let task = BatchTask::find_by_id(&self.pool, id)
            .await?
            .ok_or(BatcherError::NotFound(id))?;
        let sub_tasks = SubTask::list_for_batch(&self.pool, id).await?;
        Ok(BatchTaskDetail { task, sub_tasks })
    }

    /// Delete a batch and its sub-tasks
    ///
    /// A running batch may be deleted; the worker abandons it at its next
    /// progress write.
    pub async fn delete(&self, id: i64) -> BatcherResult<()> {
        if !BatchTask::delete(&self.pool, id).await? {
            return Err(BatcherError::NotFound(id));
        }
        info!(batch_id = id, "Deleted batch task");
        Ok(())
    }

    pub async fn list_pending(&self) -> BatcherResult<Vec<BatchTask>> {
        Ok(BatchTask::list_by_status(&self.pool, BatchTaskStatus::Pending).await?)
    }
}

/// Build a [`BatchConfig`] from request JSON
pub fn parse_batch_config(
    workflow: Option<Value>,
    params: Option<Value>,
) -> BatcherResult<BatchConfig> {
    let workflow: Document = match workflow {
        None | Some(Value::Null) => Document::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(BatcherError::ValidationError(format!(
                "workflow must be a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    let entries = match params {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(single @ Value::Object(_)) => vec![single],
        Some(other) => {
            return Err(BatcherError::ValidationError(format!(
                "params must be a list, got {}",
                json_kind(&other)
            )))
        }
    };

    let params = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value::<Overrides>(entry).map_err(|e| {
                BatcherError::ValidationError(format!("params[{index}] is not an override: {e}"))
            })
        })
        .collect::<BatcherResult<Vec<_>>>()?;

    Ok(BatchConfig::new(workflow, params))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
