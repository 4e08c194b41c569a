//! Cache provider with enum dispatch and graceful degradation.
//!
//! Consumers hold a `CacheProvider` and never see the concrete backend. A
//! backend that cannot be reached at startup is replaced by NoOp so the
//! service comes up without caching rather than not at all.

use super::errors::CacheResult;
use super::providers::NoOpCacheService;
use super::traits::CacheService;
use crate::config::CacheConfig;
use std::time::Duration;
use tracing::{info, warn};

#[cfg(feature = "cache-moka")]
use super::providers::MokaCacheService;

#[cfg(feature = "cache-redis")]
use super::providers::RedisCacheService;

/// Internal backend enum. Implementation detail of `CacheProvider`.
#[derive(Debug, Clone)]
enum CacheBackend {
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisCacheService>),

    #[cfg(feature = "cache-moka")]
    Moka(Box<MokaCacheService>),

    NoOp(NoOpCacheService),
}

#[derive(Debug, Clone)]
pub struct CacheProvider {
    backend: CacheBackend,
}

impl CacheProvider {
    /// Build a provider from configuration, degrading to NoOp on any failure.
    ///
    /// `max_entry_ttl` is the longest lifetime any caller will request; it
    /// bounds backends that enforce a cache-level maximum (Moka). Distributed
    /// backends honor per-entry TTLs natively and ignore it.
    pub async fn from_config_graceful(config: &CacheConfig, max_entry_ttl: Duration) -> Self {
        if !config.enabled {
            info!("Caching disabled by configuration");
            return Self::noop();
        }

        let backend = match config.backend.as_str() {
            "redis" | "dragonfly" => Self::create_redis_backend(config).await,
            "moka" | "memory" | "in-memory" => Self::create_moka_backend(config, max_entry_ttl),
            "noop" => CacheBackend::NoOp(NoOpCacheService::new()),
            other => {
                warn!(backend = other, "Unknown cache backend, falling back to NoOp");
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        };

        Self { backend }
    }

    #[cfg(feature = "cache-redis")]
    async fn create_redis_backend(config: &CacheConfig) -> CacheBackend {
        let redis_config = match &config.redis {
            Some(rc) => rc,
            None => {
                warn!("Redis backend selected but no redis config present, falling back to NoOp");
                return CacheBackend::NoOp(NoOpCacheService::new());
            }
        };

        match RedisCacheService::from_config(redis_config).await {
            Ok(service) => {
                info!(backend = "redis", "Cache provider initialized");
                CacheBackend::Redis(Box::new(service))
            }
            Err(e) => {
                warn!(error = %e, "Failed to connect to Redis, falling back to NoOp cache");
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn create_redis_backend(_config: &CacheConfig) -> CacheBackend {
        warn!("Redis backend requested but 'cache-redis' feature not enabled, using NoOp");
        CacheBackend::NoOp(NoOpCacheService::new())
    }

    #[cfg(feature = "cache-moka")]
    fn create_moka_backend(config: &CacheConfig, max_entry_ttl: Duration) -> CacheBackend {
        let moka_config = config.moka.clone().unwrap_or_default();
        let max_ttl = max_entry_ttl.max(Duration::from_secs(config.default_ttl_seconds));

        let service = MokaCacheService::from_config(&moka_config, max_ttl);
        info!(
            backend = "moka",
            max_capacity = moka_config.max_capacity,
            "Cache provider initialized"
        );
        CacheBackend::Moka(Box::new(service))
    }

    #[cfg(not(feature = "cache-moka"))]
    fn create_moka_backend(_config: &CacheConfig, _max_entry_ttl: Duration) -> CacheBackend {
        warn!("Moka backend requested but 'cache-moka' feature not enabled, using NoOp");
        CacheBackend::NoOp(NoOpCacheService::new())
    }

    /// Always-miss provider for explicit opt-out.
    pub fn noop() -> Self {
        Self {
            backend: CacheBackend::NoOp(NoOpCacheService::new()),
        }
    }

    /// In-process provider backed by Moka. Primarily for tests.
    #[cfg(feature = "cache-moka")]
    pub fn in_memory(max_capacity: u64, max_ttl: Duration) -> Self {
        Self {
            backend: CacheBackend::Moka(Box::new(MokaCacheService::new(max_capacity, max_ttl))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, CacheBackend::NoOp(_))
    }

    pub fn provider_name(&self) -> &'static str {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.provider_name(),
            #[cfg(feature = "cache-moka")]
            CacheBackend::Moka(s) => s.provider_name(),
            CacheBackend::NoOp(s) => s.provider_name(),
        }
    }

    pub fn is_distributed(&self) -> bool {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.is_distributed(),
            #[cfg(feature = "cache-moka")]
            CacheBackend::Moka(s) => s.is_distributed(),
            CacheBackend::NoOp(s) => s.is_distributed(),
        }
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.get(key).await,
            #[cfg(feature = "cache-moka")]
            CacheBackend::Moka(s) => s.get(key).await,
            CacheBackend::NoOp(s) => s.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.set(key, value, ttl).await,
            #[cfg(feature = "cache-moka")]
            CacheBackend::Moka(s) => s.set(key, value, ttl).await,
            CacheBackend::NoOp(s) => s.set(key, value, ttl).await,
        }
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.delete(key).await,
            #[cfg(feature = "cache-moka")]
            CacheBackend::Moka(s) => s.delete(key).await,
            CacheBackend::NoOp(s) => s.delete(key).await,
        }
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        match &self.backend {
            #[cfg(feature = "cache-redis")]
            CacheBackend::Redis(s) => s.health_check().await,
            #[cfg(feature = "cache-moka")]
            CacheBackend::Moka(s) => s.health_check().await,
            CacheBackend::NoOp(s) => s.health_check().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_provider_is_not_enabled() {
        let provider = CacheProvider::noop();
        assert!(!provider.is_enabled());
        assert_eq!(provider.provider_name(), "noop");
    }

    #[tokio::test]
    async fn from_config_disabled_yields_noop() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let provider =
            CacheProvider::from_config_graceful(&config, Duration::from_secs(3600)).await;
        assert!(!provider.is_enabled());
    }

    #[tokio::test]
    async fn from_config_unknown_backend_yields_noop() {
        let config = CacheConfig {
            enabled: true,
            backend: "etcd".to_string(),
            ..CacheConfig::default()
        };
        let provider =
            CacheProvider::from_config_graceful(&config, Duration::from_secs(3600)).await;
        assert!(!provider.is_enabled());
    }

    #[cfg(feature = "cache-moka")]
    #[tokio::test]
    async fn from_config_moka_and_aliases() {
        for backend in ["moka", "memory", "in-memory"] {
            let config = CacheConfig {
                enabled: true,
                backend: backend.to_string(),
                ..CacheConfig::default()
            };
            let provider =
            CacheProvider::from_config_graceful(&config, Duration::from_secs(3600)).await;
            assert!(provider.is_enabled());
            assert_eq!(provider.provider_name(), "moka");
            assert!(!provider.is_distributed());
        }
    }

    #[cfg(feature = "cache-redis")]
    #[tokio::test]
    async fn from_config_redis_without_url_yields_noop() {
        let config = CacheConfig {
            enabled: true,
            backend: "redis".to_string(),
            redis: None,
            ..CacheConfig::default()
        };
        let provider =
            CacheProvider::from_config_graceful(&config, Duration::from_secs(3600)).await;
        assert!(!provider.is_enabled());
    }
}
