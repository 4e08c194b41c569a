//! No-op cache backend.
//!
//! Always misses on read, always succeeds on write. Used when caching is
//! disabled or when the configured backend is unavailable at startup.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct NoOpCacheService;

impl NoOpCacheService {
    pub fn new() -> Self {
        Self
    }
}

impl CacheService for NoOpCacheService {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }

    fn is_distributed(&self) -> bool {
        // No state to diverge between instances.
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_get_always_misses() {
        let svc = NoOpCacheService::new();
        assert_eq!(svc.get("any_key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn noop_set_then_get_still_misses() {
        let svc = NoOpCacheService::new();
        svc.set("key", "value", Duration::from_secs(60)).await.unwrap();
        assert_eq!(svc.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn noop_delete_and_health_check_succeed() {
        let svc = NoOpCacheService::new();
        svc.delete("key").await.unwrap();
        assert!(svc.health_check().await.unwrap());
        assert_eq!(svc.provider_name(), "noop");
    }
}
