//! # Web API Middleware
//!
//! Middleware stack for the analytics API: request id generation, tracing,
//! CORS, and request timeouts.

pub mod request_id;

use std::time::Duration;

use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::WebConfig;
use crate::web::state::AppState;

/// Apply the middleware stack, outermost first:
/// 1. Request tracing
/// 2. CORS handling (when enabled)
/// 3. Request ID generation and failure-envelope stamping
/// 4. Request timeout
pub fn apply_middleware_stack(router: Router<AppState>, web: &WebConfig) -> Router<AppState> {
    // Later `.layer` calls wrap earlier ones, so the request id layer is
    // added after the timeout and sees every response below it.
    let router = router
        .layer(TimeoutLayer::new(Duration::from_secs(
            web.request_timeout_seconds,
        )))
        .layer(middleware::from_fn(request_id::add_request_id));

    let router = if web.cors_enabled {
        router.layer(create_cors_layer())
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
