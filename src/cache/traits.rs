//! Cache service trait definition.

use super::errors::CacheResult;
use std::time::Duration;

/// Operations every cache backend must support.
///
/// Values are opaque strings; callers own (de)serialization. There is no
/// pattern invalidation: the report cache relies exclusively on TTL expiry.
pub trait CacheService: Send + Sync {
    /// Get a value by key. `Ok(None)` is a cache miss.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<String>>> + Send;

    /// Set a value with a per-entry TTL.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Delete a key. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Check whether the backend is reachable.
    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Backend name for logging and health reporting.
    fn provider_name(&self) -> &'static str;

    /// Whether state is shared across instances (Redis) or process-local (Moka).
    fn is_distributed(&self) -> bool;
}
