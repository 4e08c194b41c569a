//! # Health Check Handlers
//!
//! Kubernetes-compatible health endpoints. `/health` answers whenever the
//! process is up; `/ready` gates on database connectivity, with cache and
//! circuit breaker status reported as informational checks.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{debug, error};

use crate::web::response_types::ApiError;
use crate::web::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: String,
    timestamp: String,
    checks: HashMap<String, HealthCheck>,
    info: HealthInfo,
}

#[derive(Serialize)]
pub struct HealthCheck {
    status: String,
    message: Option<String>,
    duration_ms: u64,
}

#[derive(Serialize)]
pub struct HealthInfo {
    version: String,
    environment: String,
    database_pool_size: u32,
    cache_backend: String,
    circuit_breaker_state: String,
}

/// Basic health check endpoint: GET /health
pub async fn basic_health(_state: State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Kubernetes readiness probe: GET /ready
///
/// Database connectivity is the only hard gate; the service stays ready on
/// cache failure because reports degrade to direct assembly.
pub async fn readiness_probe(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    debug!("Performing readiness probe");

    let mut checks = HashMap::new();

    let db_check = check_database_health(&state).await;
    let db_healthy = db_check.status == "healthy";
    checks.insert("database".to_string(), db_check);

    checks.insert("cache".to_string(), check_cache_health(&state).await);
    checks.insert(
        "circuit_breaker".to_string(),
        check_circuit_breaker_health(&state),
    );

    let response = ReadinessResponse {
        status: if db_healthy { "ready" } else { "not_ready" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
        info: create_health_info(&state),
    };

    if db_healthy {
        Ok(Json(response))
    } else {
        Err(ApiError::ServiceUnavailable)
    }
}

async fn check_database_health(state: &AppState) -> HealthCheck {
    let start = std::time::Instant::now();

    match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => HealthCheck {
            status: "healthy".to_string(),
            message: None,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => {
            error!(error = %e, "Database health check failed");
            HealthCheck {
                status: "unhealthy".to_string(),
                message: Some(format!("Database connection failed: {e}")),
                duration_ms: start.elapsed().as_millis() as u64,
            }
        }
    }
}

async fn check_cache_health(state: &AppState) -> HealthCheck {
    let start = std::time::Instant::now();
    let provider = state.report_cache.provider();

    match provider.health_check().await {
        Ok(reachable) => HealthCheck {
            status: if reachable { "healthy" } else { "degraded" }.to_string(),
            message: Some(format!("Backend: {}", provider.provider_name())),
            duration_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => HealthCheck {
            status: "degraded".to_string(),
            message: Some(format!("Cache backend unavailable: {e}")),
            duration_ms: start.elapsed().as_millis() as u64,
        },
    }
}

fn check_circuit_breaker_health(state: &AppState) -> HealthCheck {
    let start = std::time::Instant::now();
    let is_healthy = state.is_database_healthy();

    HealthCheck {
        status: if is_healthy { "healthy" } else { "degraded" }.to_string(),
        message: Some(format!("Circuit breaker state: {:?}", state.circuit_state())),
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

fn create_health_info(state: &AppState) -> HealthInfo {
    HealthInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        database_pool_size: state.db_pool.size(),
        cache_backend: state.report_cache.provider().provider_name().to_string(),
        circuit_breaker_state: format!("{:?}", state.circuit_state()),
    }
}
