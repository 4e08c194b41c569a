//! # Analytics Report Handlers
//!
//! Read-only report endpoints. Each handler resolves the period token, goes
//! through the report cache, and on a miss assembles the report behind the
//! database circuit breaker. The `refresh=true` query parameter bypasses the
//! cached copy and overwrites it with a fresh assembly.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::Extension;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::analytics::assembler::{
    CourseReport, DashboardReport, EngagementReport, RealtimeReport, RevenueReport, UserReport,
};
use crate::analytics::{Grouping, Period, ReportTopic};
use crate::web::circuit_breaker::execute_with_circuit_breaker;
use crate::web::middleware::request_id::RequestId;
use crate::web::response_types::{ApiResponse, ApiResult, ResponseMeta};
use crate::web::state::AppState;

/// Query parameters shared by the report endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    /// Period token: "7d", "30d", "90d", or "1y". Unknown tokens fall back
    /// to "30d".
    pub period: Option<String>,
    /// Skip the cached copy and reassemble.
    pub refresh: Option<bool>,
    /// Category filter, only meaningful for the courses report.
    pub category_id: Option<Uuid>,
    /// Trend bucket ("day", "week", "month"), only meaningful for the
    /// revenue report. Unknown tokens fall back to "month".
    pub group_by: Option<String>,
}

/// Get the dashboard overview: GET /v1/analytics/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<ApiResponse<DashboardReport>> {
    info!("Retrieving dashboard analytics");
    let started = Instant::now();

    let window = Period::parse(params.period.as_deref()).resolve();
    let refresh = params.refresh.unwrap_or(false);
    let filters = BTreeMap::new();

    let (report, cached) = state
        .report_cache
        .read_through(ReportTopic::Dashboard, window.token(), &filters, refresh, || async {
            execute_with_circuit_breaker(&state, || async {
                state.assembler().dashboard(&window).await
            })
            .await
        })
        .await?;

    Ok(ApiResponse::ok(
        "Dashboard analytics retrieved",
        report,
        ResponseMeta::new(cached, started.elapsed().as_millis() as u64, request_id),
    ))
}

/// Get user analytics: GET /v1/analytics/users
pub async fn get_users(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<ApiResponse<UserReport>> {
    info!("Retrieving user analytics");
    let started = Instant::now();

    let window = Period::parse(params.period.as_deref()).resolve();
    let refresh = params.refresh.unwrap_or(false);
    let filters = BTreeMap::new();

    let (report, cached) = state
        .report_cache
        .read_through(ReportTopic::Users, window.token(), &filters, refresh, || async {
            execute_with_circuit_breaker(&state, || async {
                state.assembler().users(&window).await
            })
            .await
        })
        .await?;

    Ok(ApiResponse::ok(
        "User analytics retrieved",
        report,
        ResponseMeta::new(cached, started.elapsed().as_millis() as u64, request_id),
    ))
}

/// Get course analytics: GET /v1/analytics/courses
///
/// An optional `category` filter participates in the cache key, so filtered
/// and unfiltered reports never collide.
pub async fn get_courses(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<ApiResponse<CourseReport>> {
    info!(category_id = ?params.category_id, "Retrieving course analytics");
    let started = Instant::now();

    let window = Period::parse(params.period.as_deref()).resolve();
    let refresh = params.refresh.unwrap_or(false);
    let mut filters = BTreeMap::new();
    if let Some(category_id) = params.category_id {
        filters.insert("category_id".to_string(), category_id.to_string());
    }

    let (report, cached) = state
        .report_cache
        .read_through(ReportTopic::Courses, window.token(), &filters, refresh, || async {
            execute_with_circuit_breaker(&state, || async {
                state.assembler().courses(&window, params.category_id).await
            })
            .await
        })
        .await?;

    Ok(ApiResponse::ok(
        "Course analytics retrieved",
        report,
        ResponseMeta::new(cached, started.elapsed().as_millis() as u64, request_id),
    ))
}

/// Get revenue analytics: GET /v1/analytics/revenue
///
/// The `groupBy` bucket participates in the cache key, so daily and monthly
/// trends are cached independently.
pub async fn get_revenue(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<ApiResponse<RevenueReport>> {
    info!(group_by = ?params.group_by, "Retrieving revenue analytics");
    let started = Instant::now();

    let window = Period::parse(params.period.as_deref()).resolve();
    let grouping = Grouping::parse(params.group_by.as_deref());
    let refresh = params.refresh.unwrap_or(false);
    let mut filters = BTreeMap::new();
    filters.insert("group_by".to_string(), grouping.token().to_string());

    let (report, cached) = state
        .report_cache
        .read_through(ReportTopic::Revenue, window.token(), &filters, refresh, || async {
            execute_with_circuit_breaker(&state, || async {
                state.assembler().revenue(&window, grouping).await
            })
            .await
        })
        .await?;

    Ok(ApiResponse::ok(
        "Revenue analytics retrieved",
        report,
        ResponseMeta::new(cached, started.elapsed().as_millis() as u64, request_id),
    ))
}

/// Get engagement analytics: GET /v1/analytics/engagement
pub async fn get_engagement(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<ApiResponse<EngagementReport>> {
    info!("Retrieving engagement analytics");
    let started = Instant::now();

    let window = Period::parse(params.period.as_deref()).resolve();
    let refresh = params.refresh.unwrap_or(false);
    let filters = BTreeMap::new();

    let (report, cached) = state
        .report_cache
        .read_through(ReportTopic::Engagement, window.token(), &filters, refresh, || async {
            execute_with_circuit_breaker(&state, || async {
                state.assembler().engagement(&window).await
            })
            .await
        })
        .await?;

    Ok(ApiResponse::ok(
        "Engagement analytics retrieved",
        report,
        ResponseMeta::new(cached, started.elapsed().as_millis() as u64, request_id),
    ))
}

/// Get realtime platform stats: GET /v1/analytics/realtime
///
/// Period-free, cached on a short TTL.
pub async fn get_realtime(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<ApiResponse<RealtimeReport>> {
    info!("Retrieving realtime analytics");
    let started = Instant::now();

    let refresh = params.refresh.unwrap_or(false);
    let filters = BTreeMap::new();

    let (report, cached) = state
        .report_cache
        .read_through(ReportTopic::Realtime, "now", &filters, refresh, || async {
            execute_with_circuit_breaker(&state, || async {
                state.assembler().realtime().await
            })
            .await
        })
        .await?;

    Ok(ApiResponse::ok(
        "Realtime analytics retrieved",
        report,
        ResponseMeta::new(cached, started.elapsed().as_millis() as u64, request_id),
    ))
}
