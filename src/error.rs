//! Error types for the batch scheduler.
//!

use thiserror::Error;

use crate::config::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BatcherError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Batch task {0} not found")]
    NotFound(i64),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for BatcherError {
    fn from(err: sqlx::Error) -> Self {
        BatcherError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for BatcherError {
    fn from(error: serde_json::Error) -> Self {
        BatcherError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

impl From<ConfigurationError> for BatcherError {
    fn from(error: ConfigurationError) -> Self {
        BatcherError::ConfigurationError(error.to_string())
    }
}

pub type BatcherResult<T> = std::result::Result<T, BatcherError>;
