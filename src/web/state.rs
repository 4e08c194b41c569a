//! Shared application state for the analytics API.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::info;

use crate::analytics::{ExportSpooler, ReportAssembler, ReportCache};
use crate::cache::CacheProvider;
use crate::config::AppConfig;
use crate::database::{connect_pool, AggregateQueryExecutor};
use crate::error::CoreError;
use crate::resilience::DatabaseCircuitBreaker;

/// Cloned into every handler. All members are cheap handles.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: PgPool,
    pub report_cache: Arc<ReportCache>,
    pub exports: Arc<ExportSpooler>,
    db_circuit_breaker: Arc<DatabaseCircuitBreaker>,
}

impl AppState {
    /// Build the full state graph: database pool, cache provider (degrading
    /// to no-op when the backend is unreachable), report cache, export
    /// spooler, and the database circuit breaker.
    pub async fn from_config(config: AppConfig) -> Result<Self, CoreError> {
        let db_pool = connect_pool(&config.database).await?;

        // An in-process backend caps entry lifetimes at a cache-level TTL,
        // so the cap must cover the longest-lived topic, not just the
        // default.
        let max_entry_ttl = Duration::from_secs(
            config
                .cache
                .default_ttl_seconds
                .max(config.report_ttls.max_seconds()),
        );
        let provider = CacheProvider::from_config_graceful(&config.cache, max_entry_ttl).await;

        info!(
            environment = %config.environment,
            cache_backend = provider.provider_name(),
            "Application state initialized"
        );

        let report_cache = ReportCache::new(provider.clone(), config.report_ttls.clone());
        let exports = ExportSpooler::new(provider, config.report_ttls.export_ttl());

        Ok(Self {
            config: Arc::new(config),
            db_pool,
            report_cache: Arc::new(report_cache),
            exports: Arc::new(exports),
            db_circuit_breaker: Arc::new(DatabaseCircuitBreaker::new(
                5,
                Duration::from_secs(30),
                "analytics_database",
            )),
        })
    }

    /// State wired to an existing pool, for tests.
    pub fn for_test(config: AppConfig, db_pool: PgPool) -> Self {
        let provider = CacheProvider::noop();
        let report_cache = ReportCache::new(provider.clone(), config.report_ttls.clone());
        let exports = ExportSpooler::new(provider, config.report_ttls.export_ttl());

        Self {
            config: Arc::new(config),
            db_pool,
            report_cache: Arc::new(report_cache),
            exports: Arc::new(exports),
            db_circuit_breaker: Arc::new(DatabaseCircuitBreaker::disabled()),
        }
    }

    pub fn assembler(&self) -> ReportAssembler {
        ReportAssembler::new(AggregateQueryExecutor::new(self.db_pool.clone()))
    }

    pub fn is_database_healthy(&self) -> bool {
        !self.db_circuit_breaker.is_circuit_open()
    }

    pub fn record_database_success(&self) {
        self.db_circuit_breaker.record_success();
    }

    pub fn record_database_failure(&self) {
        self.db_circuit_breaker.record_failure();
    }

    pub fn circuit_state(&self) -> crate::resilience::CircuitState {
        self.db_circuit_breaker.current_state()
    }
}
