//! # Structured Logging Module
//!
//! Environment-aware structured logging for the scheduler worker and the
//! control surface.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// `RUST_LOG` wins over the configured level, which wins over the
/// environment default. Safe to call more than once.
pub fn init_structured_logging(environment: &str, logging: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let log_level = logging
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(environment).to_string());
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let layer = if logging.json {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // An embedding host may already own the global subscriber
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            level = %log_level,
            json = logging.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for batch task lifecycle operations
pub fn log_batch_operation(
    operation: &str,
    batch_id: i64,
    batch_name: Option<&str>,
    status: &str,
    completed_count: Option<i64>,
    total_count: Option<i64>,
) {
    tracing::info!(
        operation = %operation,
        batch_id = batch_id,
        batch_name = batch_name,
        status = %status,
        completed_count = completed_count,
        total_count = total_count,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 BATCH_OPERATION"
    );
}

/// Log structured data for sub-task submissions
pub fn log_sub_task_operation(
    operation: &str,
    batch_id: i64,
    sub_task_id: i64,
    job_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        batch_id = batch_id,
        sub_task_id = sub_task_id,
        job_id = job_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 SUB_TASK_OPERATION"
    );
}
