//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles file discovery,
//! environment detection, and layering of environment variable overrides.

use super::error::{ConfigResult, ConfigurationError};
use super::BatcherConfig;
use config::{Config, Environment, File};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_FILE_STEM: &str = "batcher";
const ENV_PREFIX: &str = "BATCHER";

/// Loaded configuration plus the context it was loaded from
#[derive(Debug)]
pub struct ConfigManager {
    config: BatcherConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            database_url = %config.database.url,
            engine_url = %config.engine.base_url,
            poll_interval_ms = config.scheduler.poll_interval_ms,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BatcherConfig {
        &self.config
    }

    /// Get the environment the configuration was loaded for
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<BatcherConfig> {
        let base_path = config_directory.join(format!("{BASE_FILE_STEM}.toml"));
        let env_path = config_directory.join(format!("{BASE_FILE_STEM}.{environment}.toml"));

        debug!(
            base = %base_path.display(),
            overrides = %env_path.display(),
            "Resolving configuration sources"
        );

        let settings = Config::builder()
            .add_source(File::from(base_path.as_path()).required(false))
            .add_source(File::from(env_path.as_path()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::LoadError {
                source_description: config_directory.display().to_string(),
                error: e.to_string(),
            })?;

        Ok(settings.try_deserialize::<BatcherConfig>()?)
    }

    /// Detect the current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("BATCHER_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    /// `BATCHER_CONFIG_DIR` if set, otherwise `./config`
    fn default_config_directory() -> PathBuf {
        env::var("BATCHER_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }
}
