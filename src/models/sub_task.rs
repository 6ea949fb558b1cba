use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::expansion::{OverrideSpec, Overrides};
use crate::state_machine::SubTaskStatus;

const SUB_TASK_COLUMNS: &str = "id, batch_id, status, params, result, created_at";

/// SubTask is one concrete submission derived from its batch's template
/// Maps to `sub_tasks` table
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SubTask {
    pub id: i64,
    pub batch_id: i64,
    pub status: SubTaskStatus,
    /// Raw override JSON: one `{node_id, field, value}` object or a list of them
    #[serde(serialize_with = "serialize_params")]
    pub params: String,
    /// Engine job id on success, failure reason otherwise
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn serialize_params<S>(params: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match serde_json::from_str::<Value>(params) {
        Ok(value) => value.serialize(serializer),
        Err(_) => serializer.serialize_str(params),
    }
}

impl SubTask {
    /// Bulk-insert pending sub-tasks, one per params blob, in order
    ///
    /// Takes a connection so callers can run it inside the batch's transaction.
    pub async fn create_many(
        conn: &mut SqliteConnection,
        batch_id: i64,
        params_list: &[String],
    ) -> Result<Vec<i64>, sqlx::Error> {
        let now = Utc::now();
        let mut ids = Vec::with_capacity(params_list.len());

        for params in params_list {
            let result = sqlx::query(
                "INSERT INTO sub_tasks (batch_id, status, params, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(batch_id)
            .bind(SubTaskStatus::Pending)
            .bind(params)
            .bind(now)
            .execute(&mut *conn)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        Ok(ids)
    }

    /// Sub-tasks of a batch in creation order
    pub async fn list_for_batch(
        pool: &SqlitePool,
        batch_id: i64,
    ) -> Result<Vec<SubTask>, sqlx::Error> {
        sqlx::query_as::<_, SubTask>(&format!(
            "SELECT {SUB_TASK_COLUMNS} FROM sub_tasks WHERE batch_id = ? ORDER BY id ASC"
        ))
        .bind(batch_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<SubTask>, sqlx::Error> {
        sqlx::query_as::<_, SubTask>(&format!(
            "SELECT {SUB_TASK_COLUMNS} FROM sub_tasks WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Record a sub-task outcome
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        status: SubTaskStatus,
        result: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query("UPDATE sub_tasks SET status = ?, result = ? WHERE id = ?")
            .bind(status)
            .bind(result)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(outcome.rows_affected() > 0)
    }

    /// Return every sub-task of a batch to `pending` with no result
    pub async fn reset_for_batch(
        conn: &mut SqliteConnection,
        batch_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let outcome = sqlx::query("UPDATE sub_tasks SET status = ?, result = NULL WHERE batch_id = ?")
            .bind(SubTaskStatus::Pending)
            .bind(batch_id)
            .execute(&mut *conn)
            .await?;

        Ok(outcome.rows_affected())
    }

    /// Normalized overrides for expansion
    ///
    /// Unparseable or oddly shaped params yield no overrides, so the sub-task
    /// is submitted with the unmodified template.
    pub fn overrides(&self) -> Vec<OverrideSpec> {
        serde_json::from_str::<Value>(&self.params)
            .map(|value| Overrides::normalize(&value))
            .unwrap_or_default()
    }
}
