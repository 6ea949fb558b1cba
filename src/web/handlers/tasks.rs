//! # Batch Task Handlers
//!
//! Create, trigger, list, inspect and delete batch tasks.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::BatchTask;
use crate::services::BatchTaskDetail;
use crate::state_machine::BatchTaskStatus;
use crate::web::errors::{ApiError, ApiResponse, ApiResult};
use crate::web::state::AppState;

/// Body of `POST /tasks`
#[derive(Debug, Default, Deserialize)]
pub struct CreateBatchTaskRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Template document; an object keyed by node id
    #[serde(default)]
    pub workflow: Option<Value>,
    /// One override entry per sub-task
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TaskIdResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub id: i64,
    pub status: BatchTaskStatus,
}

fn task_id(path: Result<Path<i64>, PathRejection>) -> ApiResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// List recent batch tasks: GET /tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<ListTasksQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Vec<BatchTask>>>> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let limit = query.limit.unwrap_or(state.config.list_limit);
    let tasks = state.service.list(limit).await?;
    Ok(ApiResponse::ok(tasks))
}

/// Get one batch task with its sub-tasks: GET /tasks/:id
pub async fn get_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<BatchTaskDetail>>> {
    let id = task_id(path)?;
    let detail = state.service.get(id).await?;
    Ok(ApiResponse::ok(detail))
}

/// Create a batch task: POST /tasks
pub async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<CreateBatchTaskRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<TaskIdResponse>>> {
    let Json(request) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    debug!(name = ?request.name, "Creating batch task");

    let id = state
        .service
        .create_from_json(request.name.as_deref(), request.workflow, request.params)
        .await?;
    Ok(ApiResponse::ok(TaskIdResponse { id }))
}

/// Delete a batch task and its sub-tasks: DELETE /tasks/:id
pub async fn delete_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<TaskIdResponse>>> {
    let id = task_id(path)?;
    state.service.delete(id).await?;
    Ok(ApiResponse::ok(TaskIdResponse { id }))
}

/// Queue a batch task for execution: POST /tasks/:id/run
///
/// 404 for unknown ids, 409 while the batch is running.
pub async fn run_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<ApiResponse<TriggerResponse>>> {
    let id = task_id(path)?;
    state.service.trigger(id).await?;
    Ok(ApiResponse::ok(TriggerResponse {
        id,
        status: BatchTaskStatus::Pending,
    }))
}
