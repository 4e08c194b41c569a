//! # Web API Module
//!
//! Axum-based REST surface for the analytics service.
//!
//! ## Core Components
//!
//! - [`routes`] - HTTP route definitions
//! - [`handlers`] - Request handlers per endpoint group
//! - [`middleware`] - Request id, timeout, CORS, and tracing layers
//! - [`state`] - Shared application state
//! - [`circuit_breaker`] - Database circuit breaker wrapper for handlers
//! - [`response_types`] - Response envelope and API error types

pub mod circuit_breaker;
pub mod handlers;
pub mod middleware;
pub mod response_types;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;

/// Create the Axum application with all routes and middleware.
pub fn create_app(app_state: AppState) -> Router {
    let router = Router::new()
        .merge(routes::health_routes())
        .nest("/v1", routes::api_v1_routes());

    middleware::apply_middleware_stack(router, &app_state.config.web).with_state(app_state)
}
