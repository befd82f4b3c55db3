pub mod integrations;
pub mod notifications;
pub mod pagination;
pub mod patterns;
pub mod projects;
pub mod teams;
pub mod webhooks;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use devnotify_ingest::error::IngestError;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// API error response.
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Error code.
    pub err_code: i32,
    /// Error message.
    pub err_msg: String,
    /// Trace ID for log correlation.
    pub trace_id: String,
}

/// Unified response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// Error code (0 on success).
    pub err_code: i32,
    /// Error message ("success" on success).
    pub err_msg: String,
    /// Trace ID for log correlation.
    pub trace_id: String,
    /// Payload, when the operation returns one.
    pub data: Option<T>,
}

/// Paginated payload.
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: usize,
    offset: usize,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "incomplete_payload" => 1101,
        "unsupported_event" => 1102,
        "unsupported_service" => 1103,
        "invalid_config" => 1104,
        "storage_error" => 1501,
        "internal_error" => 1500,
        "upstream_error" => 1502,
        "upstream_timeout" => 1503,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

/// Map an ingest failure to an HTTP response, keeping the upstream's
/// literal message in the body.
pub fn ingest_error_response(trace_id: &str, err: &IngestError) -> Response {
    let (status, code) = match err {
        IngestError::IncompletePayload { .. } => (StatusCode::BAD_REQUEST, "incomplete_payload"),
        IngestError::UnsupportedEventKind(_) => (StatusCode::BAD_REQUEST, "unsupported_event"),
        IngestError::UnsupportedService(_) => (StatusCode::BAD_REQUEST, "unsupported_service"),
        IngestError::Validation(_) | IngestError::Json(_) => {
            (StatusCode::BAD_REQUEST, "bad_request")
        }
        IngestError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        IngestError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
        IngestError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
        IngestError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    };
    error_response(status, trace_id, code, &err.to_string())
}

pub fn storage_error_response(trace_id: &str, err: &anyhow::Error) -> Response {
    tracing::error!(error = %err, "storage operation failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        trace_id,
        "storage_error",
        "Database error",
    )
}

/// Health check response.
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// Service version.
    version: String,
    /// Uptime in seconds.
    uptime_secs: i64,
    /// Storage status.
    storage_status: String,
}

/// Service health status.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status: "ok".to_string(),
        },
    )
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health))
}
