//! # Web API Route Definitions
//!
//! Routes are organized into the versioned analytics API and unversioned
//! health probes.

use axum::routing::{get, post};
use axum::Router;

use crate::web::handlers;
use crate::web::state::AppState;

/// Create API v1 routes, all prefixed with `/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Report endpoints (read-through cached)
        .route(
            "/analytics/dashboard",
            get(handlers::analytics::get_dashboard),
        )
        .route("/analytics/users", get(handlers::analytics::get_users))
        .route("/analytics/courses", get(handlers::analytics::get_courses))
        .route("/analytics/revenue", get(handlers::analytics::get_revenue))
        .route(
            "/analytics/engagement",
            get(handlers::analytics::get_engagement),
        )
        .route(
            "/analytics/realtime",
            get(handlers::analytics::get_realtime),
        )
        // Export API
        .route("/analytics/export", post(handlers::export::create_export))
        .route(
            "/analytics/download/:export_id",
            get(handlers::export::download_export),
        )
}

/// Health probe routes at the root level.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::basic_health))
        .route("/ready", get(handlers::health::readiness_probe))
}
