//! # Configuration
//!
//! Explicit, serde-backed configuration with environment-specific defaults.
//! Values come from environment variables with documented fallbacks; report
//! TTLs are a per-topic policy choice, not a global constant.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub web: WebConfig,
    pub report_ttls: ReportTtlConfig,
}

/// Database pool configuration for the analytics read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

/// Cache backend selection and connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// One of "redis", "moka" (aliases: "memory", "in-memory"), "noop".
    pub backend: String,
    pub default_ttl_seconds: u64,
    pub redis: Option<RedisConfig>,
    pub moka: Option<MokaConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MokaConfig {
    pub max_capacity: u64,
}

impl Default for MokaConfig {
    fn default() -> Self {
        Self { max_capacity: 10_000 }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub bind_address: String,
    pub request_timeout_seconds: u64,
    pub cors_enabled: bool,
}

/// Time-to-live policy per report topic.
///
/// The dashboard overview refreshes twice an hour, detailed breakdowns hourly,
/// and realtime stats every five minutes. Exports live for one hour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTtlConfig {
    pub dashboard_seconds: u64,
    pub users_seconds: u64,
    pub courses_seconds: u64,
    pub revenue_seconds: u64,
    pub engagement_seconds: u64,
    pub realtime_seconds: u64,
    pub export_seconds: u64,
}

impl Default for ReportTtlConfig {
    fn default() -> Self {
        Self {
            dashboard_seconds: 1800,
            users_seconds: 3600,
            courses_seconds: 3600,
            revenue_seconds: 3600,
            engagement_seconds: 3600,
            realtime_seconds: 300,
            export_seconds: 3600,
        }
    }
}

impl ReportTtlConfig {
    pub fn export_ttl(&self) -> Duration {
        Duration::from_secs(self.export_seconds)
    }

    /// Largest configured TTL across topics and exports. Backends that
    /// enforce a cache-level maximum lifetime must be bounded by at least
    /// this, or entries for the longest-lived topic would expire early.
    pub fn max_seconds(&self) -> u64 {
        [
            self.dashboard_seconds,
            self.users_seconds,
            self.courses_seconds,
            self.revenue_seconds,
            self.engagement_seconds,
            self.realtime_seconds,
            self.export_seconds,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 2,
            connection_timeout_seconds: 10,
            idle_timeout_seconds: 300,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "moka".to_string(),
            default_ttl_seconds: 3600,
            redis: None,
            moka: Some(MokaConfig::default()),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_seconds: 120,
            cors_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// `DATABASE_URL` is required. `REDIS_URL`, when present, selects the
    /// Redis cache backend; otherwise the in-process Moka backend is used.
    pub fn from_env() -> Result<Self> {
        let environment = crate::logging::environment();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| CoreError::Configuration("DATABASE_URL is not set".to_string()))?;

        let mut cache = CacheConfig::default();
        if let Ok(redis_url) = std::env::var("REDIS_URL") {
            cache.backend = "redis".to_string();
            cache.redis = Some(RedisConfig { url: redis_url });
        }

        let bind_address = std::env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| WebConfig::default().bind_address);

        Ok(Self {
            environment,
            database: DatabaseConfig {
                url: database_url,
                ..DatabaseConfig::default()
            },
            cache,
            web: WebConfig {
                bind_address,
                ..WebConfig::default()
            },
            report_ttls: ReportTtlConfig::default(),
        })
    }

    /// Test configuration with rapid cache expiry for deterministic feedback.
    pub fn for_test() -> Self {
        Self {
            environment: "test".to_string(),
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").unwrap_or_default(),
                max_connections: 5,
                min_connections: 1,
                connection_timeout_seconds: 5,
                idle_timeout_seconds: 60,
            },
            cache: CacheConfig {
                enabled: true,
                backend: "moka".to_string(),
                default_ttl_seconds: 60,
                redis: None,
                moka: Some(MokaConfig { max_capacity: 100 }),
            },
            web: WebConfig {
                bind_address: "127.0.0.1:0".to_string(),
                request_timeout_seconds: 30,
                cors_enabled: false,
            },
            report_ttls: ReportTtlConfig {
                dashboard_seconds: 60,
                users_seconds: 60,
                courses_seconds: 60,
                revenue_seconds: 60,
                engagement_seconds: 60,
                realtime_seconds: 5,
                export_seconds: 60,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttls_match_policy() {
        let ttls = ReportTtlConfig::default();
        assert_eq!(ttls.dashboard_seconds, 1800);
        assert_eq!(ttls.users_seconds, 3600);
        assert_eq!(ttls.realtime_seconds, 300);
        assert_eq!(ttls.export_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn max_ttl_tracks_the_largest_topic() {
        let mut ttls = ReportTtlConfig::default();
        assert_eq!(ttls.max_seconds(), 3600);

        // Raising one topic above the rest must raise the bound with it.
        ttls.engagement_seconds = 7200;
        assert_eq!(ttls.max_seconds(), 7200);
    }

    #[test]
    fn test_config_uses_moka_backend() {
        let config = AppConfig::for_test();
        assert_eq!(config.cache.backend, "moka");
        assert!(config.cache.enabled);
    }
}
