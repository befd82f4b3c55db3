use crate::api::{
    error_response, ingest_error_response, storage_error_response, success_response, ApiError,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use devnotify_common::types::NotificationView;
use devnotify_ingest::normalize::{normalize, NormalizeContext, SourceKind};
use serde::Deserialize;
use serde_json::Value;
use utoipa::IntoParams;
use utoipa_axum::{router::OpenApiRouter, routes};

const DEFAULT_PROJECT_ID: &str = "default";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct WebhookParams {
    /// Project to attach the notification to (default "default").
    #[param(required = false)]
    pub project_id: Option<String>,
    /// Integration that delivered the event, when known.
    #[param(required = false)]
    pub integration_id: Option<String>,
}

/// Receive a GitHub webhook, normalize it and persist the notification.
///
/// The event kind comes from the `x-github-event` header. Unsupported kinds
/// and payloads with missing required fields are rejected with 400 and no
/// notification is stored.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/github",
    tag = "Webhooks",
    params(WebhookParams),
    responses(
        (status = 201, description = "Notification created", body = NotificationView),
        (status = 400, description = "Unsupported event or incomplete payload", body = ApiError)
    )
)]
async fn receive_github_webhook(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<WebhookParams>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    let event = match headers.get("x-github-event").and_then(|v| v.to_str().ok()) {
        Some(event) => event,
        None => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                "Missing x-github-event header",
            )
        }
    };

    let kind = match SourceKind::from_github_event(event) {
        Ok(kind) => kind,
        Err(e) => return ingest_error_response(&trace_id, &e),
    };

    let ctx = NormalizeContext {
        project_id: params
            .project_id
            .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
        integration_id: params.integration_id,
    };

    let now = Utc::now();
    let notification = match normalize(kind, &payload, &ctx, now) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(trace_id = %*trace_id, event, error = %e, "webhook rejected");
            return ingest_error_response(&trace_id, &e);
        }
    };

    match state.store.insert_notification(&notification).await {
        Ok(stored) => {
            tracing::info!(
                trace_id = %*trace_id,
                id = %stored.id,
                kind = %kind,
                "webhook notification stored"
            );
            success_response(
                StatusCode::CREATED,
                &trace_id,
                NotificationView::at(stored, now),
            )
        }
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

pub fn webhook_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(receive_github_webhook))
}
