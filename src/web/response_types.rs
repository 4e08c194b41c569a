//! # Web API Response Types
//!
//! The success envelope and error types for the analytics API, with HTTP
//! conversions via Axum's `IntoResponse`. Every payload carries a `meta`
//! block reporting cache status, timing, and the request id.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;

/// Serving metadata attached to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub cached: bool,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
}

impl ResponseMeta {
    pub fn new(cached: bool, execution_time_ms: u64, request_id: Uuid) -> Self {
        Self {
            cached,
            execution_time_ms,
            timestamp: Utc::now(),
            request_id,
        }
    }
}

/// The uniform success envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T, meta: ResponseMeta) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            meta,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Web API errors with HTTP status code mappings.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found")]
    NotFound,

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Circuit breaker is open")]
    CircuitBreakerOpen,

    #[error("Database operation failed: {operation}")]
    DatabaseError { operation: String },

    #[error("Export failed: {reason}")]
    ExportError { reason: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn database_error(operation: impl Into<String>) -> Self {
        Self::DatabaseError {
            operation: operation.into(),
        }
    }

    pub fn export_error(reason: impl Into<String>) -> Self {
        Self::ExportError {
            reason: reason.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_code, message) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "Resource not found"),

            ApiError::BadRequest { message } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", message.as_str())
            }

            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable",
            ),

            ApiError::Timeout => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT", "Request timeout"),

            ApiError::CircuitBreakerOpen => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CIRCUIT_BREAKER_OPEN",
                "Service temporarily unavailable",
            ),

            ApiError::DatabaseError { operation } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                operation.as_str(),
            ),

            ApiError::ExportError { reason } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "EXPORT_ERROR",
                reason.as_str(),
            ),

            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error",
            ),
        };

        let error_response = json!({
            "success": false,
            "message": message,
            "code": error_code,
            "meta": {
                "timestamp": Utc::now(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::PoolTimedOut => ApiError::Timeout,
            _ => ApiError::database_error("Database operation failed"),
        }
    }
}

impl From<uuid::Error> for ApiError {
    fn from(_: uuid::Error) -> Self {
        ApiError::bad_request("Invalid UUID format")
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(message) => ApiError::BadRequest { message },
            CoreError::Database(operation) => ApiError::DatabaseError { operation },
            CoreError::Cache(_) => ApiError::ServiceUnavailable,
            CoreError::Export(reason) => ApiError::ExportError { reason },
            CoreError::Configuration(_) | CoreError::Serialization(_) => ApiError::Internal,
        }
    }
}

/// Result type alias for web API operations.
pub type ApiResult<T> = Result<T, ApiError>;
