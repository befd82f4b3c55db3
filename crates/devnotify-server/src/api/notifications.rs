use crate::api::pagination::PaginationParams;
use crate::api::{
    error_response, storage_error_response, success_empty_response, success_paginated_response,
    success_response, ApiError,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use devnotify_common::types::{
    Category, CategoryCounts, NotificationStats, NotificationType, NotificationView,
    ResolveRequest,
};
use devnotify_storage::{NotificationFilter, TransitionOutcome};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    /// Category filter: infrastructure | ci_cd | security | database | application.
    #[param(required = false)]
    pub category: Option<String>,
    /// Type filter: critical | warning | info | success.
    #[param(required = false)]
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    #[param(required = false)]
    pub service: Option<String>,
    /// Impact score 1-5.
    #[param(required = false)]
    pub severity: Option<u8>,
    #[param(required = false)]
    pub resolved: Option<bool>,
    #[param(required = false)]
    pub is_read: Option<bool>,
    #[param(required = false)]
    pub project_id: Option<String>,
    #[param(required = false)]
    pub integration_id: Option<String>,
    /// Inclusive lower bound on creation time (RFC 3339).
    #[param(required = false)]
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time (RFC 3339).
    #[param(required = false)]
    pub end_time: Option<DateTime<Utc>>,
    /// Substring match against title, description and service.
    #[param(required = false)]
    pub search: Option<String>,
}

impl NotificationQuery {
    fn into_filter(self, trace_id: &str) -> Result<NotificationFilter, Response> {
        let category = match self.category {
            Some(ref s) => Some(s.parse::<Category>().map_err(|e| {
                error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", &e)
            })?),
            None => None,
        };
        let notification_type = match self.notification_type {
            Some(ref s) => Some(s.parse::<NotificationType>().map_err(|e| {
                error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", &e)
            })?),
            None => None,
        };
        Ok(NotificationFilter {
            category,
            notification_type,
            service: self.service,
            severity: self.severity,
            resolved: self.resolved,
            is_read: self.is_read,
            project_id: self.project_id,
            integration_id: self.integration_id,
            start_time: self.start_time,
            end_time: self.end_time,
            search: self.search,
        })
    }
}

/// Paginated notification feed, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    params(NotificationQuery, PaginationParams),
    responses(
        (status = 200, description = "Notification page", body = Vec<NotificationView>),
        (status = 400, description = "Invalid filter value", body = ApiError)
    )
)]
async fn list_notifications(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Response {
    let limit = pagination.limit();
    let offset = pagination.offset();
    let filter = match query.into_filter(&trace_id) {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    let total = match state.store.count_notifications(&filter).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, &e),
    };
    let notifications = match state.store.list_notifications(&filter, limit, offset).await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, &e),
    };

    let now = Utc::now();
    let items: Vec<NotificationView> = notifications
        .into_iter()
        .map(|n| NotificationView::at(n, now))
        .collect();
    success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
}

/// Fetch one notification.
#[utoipa::path(
    get,
    path = "/api/v1/notifications/{id}",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification", body = NotificationView),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn get_notification(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_notification_by_id(&id).await {
        Ok(Some(n)) => success_response(
            StatusCode::OK,
            &trace_id,
            NotificationView::at(n, Utc::now()),
        ),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Notification not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Mark one notification as read. Idempotent.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn mark_read(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.mark_notification_read(&id).await {
        Ok(TransitionOutcome::Applied) => {
            success_empty_response(StatusCode::OK, &trace_id, "marked as read")
        }
        Ok(TransitionOutcome::AlreadyDone) => {
            success_empty_response(StatusCode::OK, &trace_id, "already read")
        }
        Ok(TransitionOutcome::NotFound) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Notification not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ScopeParams {
    /// Restrict the operation to one project.
    #[param(required = false)]
    pub project_id: Option<String>,
}

/// Mark every unread notification as read, optionally scoped to a project.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/read-all",
    tag = "Notifications",
    params(ScopeParams),
    responses(
        (status = 200, description = "Count of notifications transitioned")
    )
)]
async fn mark_all_read(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
) -> Response {
    match state
        .store
        .mark_all_notifications_read(scope.project_id.as_deref())
        .await
    {
        Ok(count) => success_response(
            StatusCode::OK,
            &trace_id,
            serde_json::json!({ "updated": count }),
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Resolve a notification, recording who resolved it and when.
///
/// Resolution wins exactly once: a second resolve is a no-op that keeps the
/// first actor and timestamp.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/resolve",
    tag = "Notifications",
    params(("id" = String, Path, description = "Notification id")),
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Resolved (or already resolved)", body = NotificationView),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn resolve_notification(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Response {
    if req.actor.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "actor is required",
        );
    }

    let now = Utc::now();
    let outcome = match state.store.resolve_notification(&id, &req.actor, now).await {
        Ok(outcome) => outcome,
        Err(e) => return storage_error_response(&trace_id, &e),
    };
    if outcome == TransitionOutcome::NotFound {
        return error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Notification not found",
        );
    }

    // Both Applied and AlreadyDone return the stored record; on the no-op
    // path it carries the original resolver.
    match state.store.get_notification_by_id(&id).await {
        Ok(Some(n)) => success_response(StatusCode::OK, &trace_id, NotificationView::at(n, now)),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Notification not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Summary statistics over the (optionally project-scoped) feed.
#[utoipa::path(
    get,
    path = "/api/v1/notifications/stats",
    tag = "Notifications",
    params(ScopeParams),
    responses(
        (status = 200, description = "Totals by type and resolution", body = NotificationStats)
    )
)]
async fn notification_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
) -> Response {
    let filter = NotificationFilter {
        project_id: scope.project_id,
        ..Default::default()
    };
    match state.store.list_notifications_in_creation_order(&filter).await {
        Ok(notifications) => success_response(
            StatusCode::OK,
            &trace_id,
            devnotify_engine::stats(&notifications, None),
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Per-category counts; every category is present, zero-filled.
#[utoipa::path(
    get,
    path = "/api/v1/notifications/counts",
    tag = "Notifications",
    params(ScopeParams),
    responses(
        (status = 200, description = "Counts keyed by category", body = CategoryCounts)
    )
)]
async fn notification_counts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(scope): Query<ScopeParams>,
) -> Response {
    let filter = NotificationFilter {
        project_id: scope.project_id,
        ..Default::default()
    };
    match state.store.list_notifications_in_creation_order(&filter).await {
        Ok(notifications) => success_response(
            StatusCode::OK,
            &trace_id,
            devnotify_engine::counts_by_category(&notifications, None),
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

pub fn notification_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_notifications))
        .routes(routes!(notification_stats))
        .routes(routes!(notification_counts))
        .routes(routes!(mark_all_read))
        .routes(routes!(get_notification))
        .routes(routes!(mark_read))
        .routes(routes!(resolve_notification))
}
