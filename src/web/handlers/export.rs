//! # Export Handlers
//!
//! Two-phase export flow: `create_export` materializes a dataset and spools
//! it under a download id, `download_export` replays it as JSON or CSV. A
//! download after the spool TTL elapses is a 404, indistinguishable from an
//! id that never existed.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analytics::export::render_csv;
use crate::analytics::{ExportFormat, ExportOptions, ExportRecord, ExportType, Period};
use crate::web::circuit_breaker::execute_with_circuit_breaker;
use crate::web::middleware::request_id::RequestId;
use crate::web::response_types::{ApiError, ApiResponse, ApiResult, ResponseMeta};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[serde(rename = "type")]
    pub export_type: String,
    pub period: Option<String>,
    pub format: Option<String>,
    #[serde(default)]
    pub include_details: bool,
    pub category_id: Option<Uuid>,
    pub instructor_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportCreated {
    pub export_id: Uuid,
    pub export_type: ExportType,
    pub period: String,
    pub format: ExportFormat,
    pub record_count: usize,
    pub download_url: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Optional format override; defaults to the format the export was
    /// created with.
    pub format: Option<String>,
}

/// Create an export: POST /v1/analytics/export
pub async fn create_export(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(request): Json<ExportRequest>,
) -> ApiResult<ApiResponse<ExportCreated>> {
    let started = Instant::now();

    let export_type: ExportType = request.export_type.parse()?;
    let format = match request.format.as_deref() {
        Some(raw) => raw.parse()?,
        None => ExportFormat::default(),
    };
    let window = Period::parse(request.period.as_deref()).resolve();

    info!(
        export_type = %export_type,
        period = window.token(),
        "Creating analytics export"
    );

    let options = ExportOptions {
        include_details: request.include_details,
        category_id: request.category_id,
        instructor_id: request.instructor_id,
    };

    let data = execute_with_circuit_breaker(&state, || async {
        state
            .assembler()
            .export_dataset(export_type, &window, &options)
            .await
    })
    .await?;

    let mut filters = BTreeMap::new();
    if let Some(category_id) = request.category_id {
        filters.insert("category_id".to_string(), category_id.to_string());
    }
    if let Some(instructor_id) = request.instructor_id {
        filters.insert("instructor_id".to_string(), instructor_id.to_string());
    }
    if request.include_details {
        filters.insert("include_details".to_string(), "true".to_string());
    }

    let record = ExportRecord {
        export_id: Uuid::new_v4(),
        export_type,
        period: window.token().to_string(),
        format,
        filters,
        record_count: data.record_count(),
        generated_at: Utc::now(),
        generated_by: None,
        data,
    };

    // Unlike report caching, a failed spool write must fail the request: the
    // caller would otherwise receive a download id that can never resolve.
    state.exports.store(&record).await?;

    let created = ExportCreated {
        export_id: record.export_id,
        export_type,
        period: record.period.clone(),
        format,
        record_count: record.record_count,
        download_url: format!("/v1/analytics/download/{}", record.export_id),
        expires_in_seconds: state.config.report_ttls.export_seconds,
    };

    Ok(ApiResponse::ok(
        "Export created",
        created,
        ResponseMeta::new(false, started.elapsed().as_millis() as u64, request_id),
    ))
}

/// Download a spooled export: GET /v1/analytics/download/:export_id
pub async fn download_export(
    State(state): State<AppState>,
    Path(export_id): Path<Uuid>,
    Query(params): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let record = state
        .exports
        .load(&export_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let format = match params.format.as_deref() {
        Some(raw) => raw.parse()?,
        None => record.format,
    };

    info!(export_id = %export_id, format = ?format, "Serving export download");

    let filename_stem = format!("{}-{}", record.export_type, record.period);
    match format {
        ExportFormat::Json => {
            let body = serde_json::to_string_pretty(&record)
                .map_err(|e| ApiError::export_error(format!("serialization failed: {e}")))?;
            Ok(file_response(
                body,
                "application/json",
                &format!("{filename_stem}.json"),
            ))
        }
        ExportFormat::Csv => {
            let body = render_csv(&record.data)?;
            Ok(file_response(body, "text/csv", &format!("{filename_stem}.csv")))
        }
    }
}

fn file_response(body: String, content_type: &str, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
