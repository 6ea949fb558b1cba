//! # Health Check Handler

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::orchestration::SchedulerStatsSnapshot;
use crate::web::errors::ApiResponse;
use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: bool,
    pub scheduler: Option<SchedulerHealth>,
}

#[derive(Debug, Serialize)]
pub struct SchedulerHealth {
    pub scheduler_id: Uuid,
    pub running: bool,
    pub current_batch_id: Option<i64>,
    pub stats: SchedulerStatsSnapshot,
}

/// Service health: GET /health
///
/// 503 when the database is unreachable.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let database = match state.database.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            error!(error = %e, "Database health check failed");
            false
        }
    };

    let scheduler = state.scheduler.as_ref().map(|scheduler| SchedulerHealth {
        scheduler_id: scheduler.scheduler_id(),
        running: scheduler.is_running(),
        current_batch_id: scheduler.current_batch_id(),
        stats: scheduler.stats(),
    });

    let status_code = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if database { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        database,
        scheduler,
    };

    (status_code, ApiResponse::ok(response))
}
