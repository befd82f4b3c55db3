use crate::api::notifications::ScopeParams;
use crate::api::{storage_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use devnotify_common::types::NotificationPattern;
use devnotify_engine::PatternConfig;
use devnotify_storage::NotificationFilter;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Detected notification patterns, recomputed from the store per request.
///
/// Patterns are derived data and are never persisted; two identical feeds
/// always yield the same patterns.
#[utoipa::path(
    get,
    path = "/api/v1/patterns",
    tag = "Patterns",
    params(ScopeParams),
    responses(
        (status = 200, description = "Detected patterns", body = Vec<NotificationPattern>)
    )
)]
async fn list_patterns(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
) -> Response {
    let filter = NotificationFilter {
        project_id: scope.project_id,
        ..Default::default()
    };
    let notifications = match state.store.list_notifications_in_creation_order(&filter).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, &e),
    };
    let patterns = devnotify_engine::detect_patterns(&notifications, &PatternConfig::default());
    success_response(StatusCode::OK, &trace_id, patterns)
}

pub fn pattern_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(list_patterns))
}
