//! Crate-wide error types.
//!
//! Library code returns `CoreError`; the web layer maps these into
//! `web::response_types::ApiError` at the handler boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<crate::cache::CacheError> for CoreError {
    fn from(err: crate::cache::CacheError) -> Self {
        CoreError::Cache(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
