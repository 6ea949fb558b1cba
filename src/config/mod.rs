//! # Batcher Configuration System
//!
//! Layered TOML configuration with environment overrides, loaded through the
//! `config` crate by [`ConfigManager`].
//!
//! ## Sources (lowest to highest precedence)
//!
//! 1. Built-in defaults (every field has one)
//! 2. `config/batcher.toml`
//! 3. `config/batcher.{environment}.toml`
//! 4. Environment variables such as `BATCHER__SCHEDULER__POLL_INTERVAL_MS`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batcher_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let poll_interval = manager.config().scheduler.poll_interval();
//! let engine_url = &manager.config().engine.base_url;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/batcher.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BatcherConfig {
    /// SQLite job store settings
    pub database: DatabaseConfig,

    /// Poll loop cadence and shutdown behavior
    pub scheduler: SchedulerConfig,

    /// External execution engine endpoint and timeouts
    pub engine: EngineConfig,

    /// HTTP control surface
    pub web: WebConfig,

    /// Logging output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL, e.g. `sqlite://data/batcher.db`
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/batcher.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5000,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay between pending-task discovery polls
    pub poll_interval_ms: u64,
    /// Pause after each sub-task before submitting the next one
    pub submission_delay_ms: u64,
    /// How long `stop()` waits for the worker to exit
    pub shutdown_grace_ms: u64,
    /// Mark batches left `running` by a previous process as `failed` on start
    pub fail_interrupted_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            submission_delay_ms: 500,
            shutdown_grace_ms: 5000,
            fail_interrupted_on_start: true,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn submission_delay(&self) -> Duration {
        Duration::from_millis(self.submission_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the external execution engine
    pub base_url: String,
    /// HTTP timeout for a single submit request
    pub submit_timeout_ms: u64,
    /// HTTP timeout for a single status request
    pub poll_request_timeout_ms: u64,
    /// Delay between status polls for one job
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for one job to finish
    pub completion_timeout_ms: u64,
    /// Prefix of generated client-session identifiers
    pub client_id_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8188".to_string(),
            submit_timeout_ms: 30_000,
            poll_request_timeout_ms: 10_000,
            poll_interval_ms: 1000,
            completion_timeout_ms: 300_000,
            client_id_prefix: "batcher".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn poll_request_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_request_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub bind_address: String,
    /// Default page size for task listings
    pub list_limit: i64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8189".to_string(),
            list_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; falls back to the environment's default level
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl BatcherConfig {
    /// Reject values that would stall the scheduler or break the engine client
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.database.url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "database.url",
                "database configuration",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be greater than 0",
            ));
        }

        if self.scheduler.poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "scheduler.poll_interval_ms",
                "0",
                "poll interval must be greater than 0",
            ));
        }

        if self.engine.base_url.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "engine.base_url",
                "engine configuration",
            ));
        }

        if let Err(e) = reqwest::Url::parse(&self.engine.base_url) {
            return Err(ConfigurationError::invalid_value(
                "engine.base_url",
                self.engine.base_url.clone(),
                e.to_string(),
            ));
        }

        for (field, value) in [
            ("engine.submit_timeout_ms", self.engine.submit_timeout_ms),
            (
                "engine.poll_request_timeout_ms",
                self.engine.poll_request_timeout_ms,
            ),
            ("engine.poll_interval_ms", self.engine.poll_interval_ms),
            (
                "engine.completion_timeout_ms",
                self.engine.completion_timeout_ms,
            ),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "timeouts and intervals must be greater than 0",
                ));
            }
        }

        if self.web.enabled && self.web.bind_address.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "web.bind_address",
                "web configuration",
            ));
        }

        if self.web.list_limit <= 0 {
            return Err(ConfigurationError::invalid_value(
                "web.list_limit",
                self.web.list_limit.to_string(),
                "list limit must be positive",
            ));
        }

        Ok(())
    }
}
