//! # Batcher Service
//!
//! Runs the scheduler worker and the HTTP control surface in one process.
//!
//! Configuration comes from `config/batcher.toml`, the environment-specific
//! overlay, and `BATCHER__*` environment variables. Ctrl-C stops the HTTP
//! server first, then the scheduler.

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use batcher_core::config::ConfigManager;
use batcher_core::database::{DatabaseConnection, DatabaseMigrations};
use batcher_core::execution::{EngineClient, ExecutionEngine};
use batcher_core::logging::init_structured_logging;
use batcher_core::orchestration::BatchScheduler;
use batcher_core::web::{self, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = ConfigManager::load().context("failed to load configuration")?;
    let config = manager.config().clone();
    init_structured_logging(manager.environment(), &config.logging);

    info!(
        environment = %manager.environment(),
        config_dir = %manager.config_directory().display(),
        version = env!("CARGO_PKG_VERSION"),
        "🚀 Starting batcher"
    );

    let database = DatabaseConnection::new(&config.database)
        .await
        .context("failed to open job store")?;
    DatabaseMigrations::run_all(database.pool())
        .await
        .context("failed to migrate job store")?;

    let engine: Arc<dyn ExecutionEngine> =
        Arc::new(EngineClient::new(config.engine.clone()).context("invalid engine configuration")?);

    let scheduler = Arc::new(BatchScheduler::new(
        database.pool().clone(),
        engine,
        config.scheduler.clone(),
        config.engine.completion_timeout(),
    ));
    scheduler
        .start()
        .await
        .context("failed to start scheduler")?;

    if config.web.enabled {
        let listener = TcpListener::bind(&config.web.bind_address)
            .await
            .with_context(|| format!("failed to bind {}", config.web.bind_address))?;
        let app_state =
            AppState::new(database.clone(), config.web.clone()).with_scheduler(scheduler.clone());

        if let Err(e) = web::serve(listener, app_state, shutdown_signal()).await {
            error!(error = %e, "Control surface terminated with an error");
        }
    } else {
        info!("Control surface disabled; running scheduler only");
        shutdown_signal().await;
    }

    if !scheduler.stop().await {
        warn!("Scheduler still finishing an in-flight job at exit");
    }
    database.close().await;

    info!("👋 Batcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
