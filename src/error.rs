use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::validation::ValidationError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Taxonomy
///
/// | Variant | Status | Logged |
/// |---|---|---|
/// | `Validation`, `InvalidArgument`, `MalformedBody` | 400 | debug |
/// | `NotFound` | 404 | debug |
/// | `ServiceUnavailable` | 503 | warn |
/// | `QueueError`, `StoreError`, `SerializationError`, `Internal`, `ConfigError` | 500 | error |
///
/// Clients only ever see a sanitized `error` message. The underlying cause of
/// a 5xx is attached to the response as an [`ErrorDetail`] extension, which
/// the development-only middleware may surface as `details`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("No data found for sensor")]
    NotFound { sensor_id: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Queue operation failed: {0}")]
    QueueError(String),

    #[error("Store operation failed: {0}")]
    StoreError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidArgument(_) | AppError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::QueueError(_)
            | AppError::StoreError(_)
            | AppError::SerializationError(_)
            | AppError::Internal(_)
            | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::MalformedBody(rejection.body_text())
        }
    }
}

/// Underlying cause of a server-side failure, stored in response extensions.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sensor_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            // Client errors - the message is user-facing
            AppError::Validation(e) => {
                tracing::debug!(error = %e, "Rejected invalid reading");
                ErrorResponse {
                    error: e.to_string(),
                    sensor_id: None,
                }
            }
            AppError::InvalidArgument(msg) => {
                tracing::debug!(error = %msg, "Rejected invalid argument");
                ErrorResponse {
                    error: msg.clone(),
                    sensor_id: None,
                }
            }
            AppError::MalformedBody(msg) => {
                tracing::debug!(error = %msg, "Rejected malformed body");
                ErrorResponse {
                    error: "Malformed JSON in request body".to_string(),
                    sensor_id: None,
                }
            }
            AppError::PayloadTooLarge(msg) => {
                tracing::debug!(error = %msg, "Rejected oversized body");
                ErrorResponse {
                    error: "Request body too large".to_string(),
                    sensor_id: None,
                }
            }
            AppError::NotFound { sensor_id } => {
                tracing::debug!(sensor_id = %sensor_id, "No readings found");
                ErrorResponse {
                    error: self.to_string(),
                    sensor_id: Some(sensor_id.clone()),
                }
            }

            // Dependency not ready - safe to retry later
            AppError::ServiceUnavailable(_) => {
                tracing::warn!(error = %self, "Dependency unavailable");
                ErrorResponse {
                    error: "Service temporarily unavailable".to_string(),
                    sensor_id: None,
                }
            }

            // Internal errors - never expose internal details to clients
            AppError::QueueError(_)
            | AppError::StoreError(_)
            | AppError::SerializationError(_)
            | AppError::Internal(_)
            | AppError::ConfigError(_) => {
                tracing::error!(error = %self, "Request failed");
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    sensor_id: None,
                }
            }
        };

        let mut response = (status, axum::Json(body)).into_response();
        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(ErrorDetail(self.to_string()));
        }
        response
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
