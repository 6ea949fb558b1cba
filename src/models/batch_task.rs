use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::error::{BatcherError, BatcherResult};
use crate::expansion::BatchConfig;
use crate::models::sub_task::SubTask;
use crate::state_machine::BatchTaskStatus;

const BATCH_TASK_COLUMNS: &str =
    "id, name, status, config, total_count, completed_count, created_at, updated_at";

/// BatchTask is one user-submitted batch: a template plus its override list
/// Maps to `batch_tasks` table
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct BatchTask {
    pub id: i64,
    pub name: String,
    pub status: BatchTaskStatus,
    /// Raw `BatchConfig` JSON text; rendered as a JSON value when it parses
    #[serde(serialize_with = "serialize_config")]
    pub config: String,
    pub total_count: i64,
    pub completed_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New BatchTask for creation (without generated fields)
#[derive(Debug, Clone)]
pub struct NewBatchTask {
    pub name: String,
    pub config: BatchConfig,
}

impl NewBatchTask {
    pub fn new(name: impl Into<String>, config: BatchConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

fn serialize_config<S>(config: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match serde_json::from_str::<Value>(config) {
        Ok(value) => value.serialize(serializer),
        Err(_) => serializer.serialize_str(config),
    }
}

impl BatchTask {
    /// Insert a bare batch row; sub-tasks are not created
    pub async fn create(
        pool: &SqlitePool,
        name: &str,
        config: &str,
        total_count: i64,
    ) -> Result<i64, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, name, config, total_count).await
    }

    /// Insert a batch and one pending sub-task per override entry in a single transaction
    pub async fn create_with_sub_tasks(
        pool: &SqlitePool,
        new_task: &NewBatchTask,
    ) -> BatcherResult<i64> {
        let config_text = serde_json::to_string(&new_task.config)?;
        let params: Vec<String> = new_task
            .config
            .params
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<_, _>>()?;

        let mut tx = pool.begin().await?;
        let id = Self::insert(&mut tx, &new_task.name, &config_text, params.len() as i64).await?;
        SubTask::create_many(&mut tx, id, &params).await?;
        tx.commit().await?;

        Ok(id)
    }

    async fn insert(
        conn: &mut SqliteConnection,
        name: &str,
        config: &str,
        total_count: i64,
    ) -> Result<i64, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO batch_tasks (name, status, config, total_count, completed_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(name)
        .bind(BatchTaskStatus::Pending)
        .bind(config)
        .bind(total_count)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Find a batch task by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<BatchTask>, sqlx::Error> {
        sqlx::query_as::<_, BatchTask>(&format!(
            "SELECT {BATCH_TASK_COLUMNS} FROM batch_tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Most recently created first
    pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<BatchTask>, sqlx::Error> {
        sqlx::query_as::<_, BatchTask>(&format!(
            "SELECT {BATCH_TASK_COLUMNS} FROM batch_tasks ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Pending batches in queue order (oldest first, ties by id)
    pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<BatchTask>, sqlx::Error> {
        Self::list_by_status(pool, BatchTaskStatus::Pending).await
    }

    pub async fn list_by_status(
        pool: &SqlitePool,
        status: BatchTaskStatus,
    ) -> Result<Vec<BatchTask>, sqlx::Error> {
        sqlx::query_as::<_, BatchTask>(&format!(
            "SELECT {BATCH_TASK_COLUMNS} FROM batch_tasks WHERE status = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Set the status, and the progress counter when given
    ///
    /// The counter is clamped to `[0, total_count]` in SQL. Returns whether a
    /// row was updated.
    pub async fn update_status(
        pool: &SqlitePool,
        id: i64,
        status: BatchTaskStatus,
        completed_count: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE batch_tasks
            SET status = ?,
                completed_count = COALESCE(MAX(0, MIN(?, total_count)), completed_count),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(completed_count)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a `pending` batch to `running` with zero progress
    ///
    /// Returns `false` if the batch was deleted or changed status since it
    /// was read.
    pub async fn claim(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE batch_tasks
            SET status = ?, completed_count = 0, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(BatchTaskStatus::Running)
        .bind(Utc::now())
        .bind(id)
        .bind(BatchTaskStatus::Pending)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Re-queue a batch unless it is currently running
    ///
    /// Resets progress and returns the batch's sub-tasks to `pending`.
    /// Returns `false` when the row is missing or running. The status check
    /// and the write are one conditional UPDATE.
    pub async fn rearm(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE batch_tasks
            SET status = ?, completed_count = 0, updated_at = ?
            WHERE id = ? AND status != ?
            "#,
        )
        .bind(BatchTaskStatus::Pending)
        .bind(Utc::now())
        .bind(id)
        .bind(BatchTaskStatus::Running)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        SubTask::reset_for_batch(&mut tx, id).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Mark every `running` batch as `failed`; returns how many were touched
    pub async fn fail_running(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE batch_tasks SET status = ?, updated_at = ? WHERE status = ?")
            .bind(BatchTaskStatus::Failed)
            .bind(Utc::now())
            .bind(BatchTaskStatus::Running)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete a batch and its sub-tasks; returns whether the batch existed
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM sub_tasks WHERE batch_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM batch_tasks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Decode the stored configuration
    pub fn batch_config(&self) -> BatcherResult<BatchConfig> {
        serde_json::from_str(&self.config).map_err(|e| {
            BatcherError::ValidationError(format!(
                "Batch task {} has an undecodable config: {e}",
                self.id
            ))
        })
    }
}
