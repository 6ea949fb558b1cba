//! Configuration Error Types
//!
//! Error handling for configuration loading and validation.

use thiserror::Error;

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Layered sources could not be read or merged
    #[error("Failed to load configuration from '{source_description}': {error}")]
    LoadError {
        source_description: String,
        error: String,
    },

    /// Merged sources did not deserialize into the configuration model
    #[error("Failed to deserialize configuration: {error}")]
    DeserializeError { error: String },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },
}

impl ConfigurationError {
    /// Create a missing required field error
    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::DeserializeError {
            error: error.to_string(),
        }
    }
}
