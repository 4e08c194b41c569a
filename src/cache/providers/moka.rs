//! In-process cache backend built on Moka.
//!
//! Each entry records its own absolute deadline so that report topics with
//! different TTLs can share one cache. Moka's cache-level TTL acts only as an
//! eviction upper bound; reads check the per-entry deadline.
//!
//! Not distributed: each process sees its own cache state. Acceptable for the
//! analytics use case where brief divergence between instances only means a
//! report is recomputed.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;
use crate::config::MokaConfig;
use std::time::{Duration, Instant};
use tracing::debug;

/// A value plus the instant it stops being served.
#[derive(Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct MokaCacheService {
    cache: moka::future::Cache<String, Entry>,
}

impl std::fmt::Debug for MokaCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheService")
            .field("max_capacity", &self.cache.policy().max_capacity())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MokaCacheService {
    /// Create a cache service from configuration.
    ///
    /// `max_ttl` bounds how long any entry can survive regardless of its own
    /// deadline, keeping memory use predictable.
    pub fn from_config(config: &MokaConfig, max_ttl: Duration) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(max_ttl.max(Duration::from_secs(1)))
            .build();

        debug!(
            max_capacity = config.max_capacity,
            max_ttl_seconds = max_ttl.as_secs(),
            "Moka in-process cache created"
        );

        Self { cache }
    }

    /// Convenience constructor for tests and single-purpose callers.
    pub fn new(max_capacity: u64, max_ttl: Duration) -> Self {
        Self::from_config(&MokaConfig { max_capacity }, max_ttl)
    }
}

impl CacheService for MokaCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self.cache.get(key).await {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!(key = key, "Cache HIT (moka)");
                Ok(Some(entry.value))
            }
            Some(_) => {
                // Past its per-entry deadline; drop it eagerly.
                self.cache.invalidate(key).await;
                debug!(key = key, "Cache EXPIRED (moka)");
                Ok(None)
            }
            None => {
                debug!(key = key, "Cache MISS (moka)");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        debug!(key = key, ttl_seconds = ttl.as_secs(), "Cache SET (moka)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.cache.invalidate(key).await;
        debug!(key = key, "Cache DEL (moka)");
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "moka"
    }

    fn is_distributed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_none_on_miss() {
        let svc = MokaCacheService::new(100, Duration::from_secs(60));
        assert_eq!(svc.get("nonexistent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let svc = MokaCacheService::new(100, Duration::from_secs(60));
        svc.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(svc.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn per_entry_ttl_expires_independently() {
        let svc = MokaCacheService::new(100, Duration::from_secs(60));
        svc.set("short", "v", Duration::from_millis(20)).await.unwrap();
        svc.set("long", "v", Duration::from_secs(60)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(svc.get("short").await.unwrap(), None);
        assert_eq!(svc.get("long").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let svc = MokaCacheService::new(100, Duration::from_secs(60));
        svc.set("k", "v", Duration::from_secs(60)).await.unwrap();
        svc.delete("k").await.unwrap();
        assert_eq!(svc.get("k").await.unwrap(), None);
    }
}
