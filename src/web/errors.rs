//! # Web API Error Types
//!
//! Error type for the control surface and its HTTP response conversion. Every
//! error renders as `{"success": false, "error": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::BatcherError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Database operation failed: {operation}")]
    DatabaseError { operation: String },

    #[error("Internal server error")]
    Internal,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::DatabaseError { .. } | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let body = json!({
            "success": false,
            "error": self.to_string(),
        });

        (status_code, Json(body)).into_response()
    }
}

impl From<BatcherError> for ApiError {
    fn from(err: BatcherError) -> Self {
        match err {
            BatcherError::NotFound(_) => ApiError::not_found(err.to_string()),
            BatcherError::Conflict(message) => ApiError::Conflict { message },
            BatcherError::ValidationError(message) => ApiError::BadRequest { message },
            BatcherError::DatabaseError(message) => {
                error!(error = %message, "Database error while serving request");
                ApiError::DatabaseError {
                    operation: "Database error".to_string(),
                }
            }
            other => {
                error!(error = %other, "Unexpected error while serving request");
                ApiError::Internal
            }
        }
    }
}

/// Success envelope: `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}
