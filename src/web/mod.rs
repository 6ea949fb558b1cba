//! # Web API Module
//!
//! Axum-based HTTP control surface for batch tasks.
//!
//! ## Endpoints (under `/mini-batcher/api`)
//!
//! - `GET /tasks?limit=N` - list recent batch tasks
//! - `POST /tasks` - create a batch task from `{name, workflow, params}`
//! - `GET /tasks/:id` - one batch task with its sub-tasks
//! - `DELETE /tasks/:id` - delete a batch task and its sub-tasks
//! - `POST /tasks/:id/run` - queue a batch task for execution
//! - `GET /health` - database and scheduler health
//!
//! Responses use the envelope `{"success": true, "data": ...}` or
//! `{"success": false, "error": "..."}`.

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

use state::AppState;

/// Create the Axum application with all routes and shared state
pub fn create_app(app_state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::task_routes())
        .merge(routes::health_routes());

    Router::new()
        .nest(routes::API_PREFIX, api)
        .with_state(app_state)
}

/// Serve the control surface on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, prefix = routes::API_PREFIX, "🌐 Control surface listening");

    axum::serve(listener, create_app(app_state))
        .with_graceful_shutdown(shutdown)
        .await
}
