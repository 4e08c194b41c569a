//! Circuit breaker helpers for the web layer.
//!
//! Wraps database-backed operations so handlers get a uniform 503 when the
//! database breaker is open, and record success or failure without repeating
//! the bookkeeping in every handler.

use tracing::error;

use crate::web::response_types::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Execute a database operation behind the circuit breaker.
///
/// Rejects immediately with `CircuitBreakerOpen` when the breaker is open,
/// otherwise runs the operation and records the outcome.
pub async fn execute_with_circuit_breaker<T, E, F, Fut>(
    state: &AppState,
    operation: F,
) -> ApiResult<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    if !state.is_database_healthy() {
        return Err(ApiError::CircuitBreakerOpen);
    }

    match operation().await {
        Ok(result) => {
            state.record_database_success();
            Ok(result)
        }
        Err(e) => {
            state.record_database_failure();
            error!(error = %e, "Database operation failed");
            Err(ApiError::database_error(format!("Operation failed: {e}")))
        }
    }
}
