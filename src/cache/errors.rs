//! Cache error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to connect to the cache backend
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// Failed to serialize or deserialize a cached value
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// Generic backend error
    #[error("Cache backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
