//! # Database Layer
//!
//! Read-only aggregate queries over the platform's transactional tables.
//! The analytics core never writes to these tables; every method here is a
//! bounded aggregate with parameter binding.

pub mod queries;

pub use queries::AggregateQueryExecutor;

use crate::config::DatabaseConfig;
use crate::error::{CoreError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::debug;

/// Build the analytics connection pool from configuration.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool> {
    debug!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        connection_timeout = config.connection_timeout_seconds,
        "Creating analytics database pool"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .test_before_acquire(true)
        .connect(&config.url)
        .await
        .map_err(|e| CoreError::Database(format!("Failed to create database pool: {e}")))
}
