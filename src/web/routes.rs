//! # Route Definitions

use axum::routing::{get, post};
use axum::Router;

use crate::web::handlers;
use crate::web::state::AppState;

/// Path prefix every control-surface route lives under
pub const API_PREFIX: &str = "/mini-batcher/api";

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(handlers::tasks::get_task).delete(handlers::tasks::delete_task),
        )
        .route("/tasks/:id/run", post(handlers::tasks::run_task))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
