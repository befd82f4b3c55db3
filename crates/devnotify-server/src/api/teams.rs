use crate::api::{
    error_response, storage_error_response, success_empty_response, success_response, ApiError,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use devnotify_common::types::{CreateTeamRequest, Team, UpdateTeamRequest};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Create a team.
#[utoipa::path(
    post,
    path = "/api/v1/teams",
    tag = "Teams",
    request_body = CreateTeamRequest,
    responses(
        (status = 201, description = "Team created", body = Team),
        (status = 400, description = "Invalid request", body = ApiError)
    )
)]
async fn create_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateTeamRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "name is required",
        );
    }
    match state.store.insert_team(&req).await {
        Ok(team) => {
            tracing::info!(trace_id = %*trace_id, id = %team.id, name = %team.name, "team created");
            success_response(StatusCode::CREATED, &trace_id, team)
        }
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// List teams.
#[utoipa::path(
    get,
    path = "/api/v1/teams",
    tag = "Teams",
    responses(
        (status = 200, description = "Teams", body = Vec<Team>)
    )
)]
async fn list_teams(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    match state.store.list_teams().await {
        Ok(teams) => success_response(StatusCode::OK, &trace_id, teams),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Fetch one team.
#[utoipa::path(
    get,
    path = "/api/v1/teams/{id}",
    tag = "Teams",
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team", body = Team),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn get_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_team_by_id(&id).await {
        Ok(Some(team)) => success_response(StatusCode::OK, &trace_id, team),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Team not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Apply a partial update; unset fields keep their values.
#[utoipa::path(
    put,
    path = "/api/v1/teams/{id}",
    tag = "Teams",
    params(("id" = String, Path, description = "Team id")),
    request_body = UpdateTeamRequest,
    responses(
        (status = 200, description = "Team updated", body = Team),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn update_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTeamRequest>,
) -> Response {
    match state.store.update_team(&id, &req).await {
        Ok(Some(team)) => success_response(StatusCode::OK, &trace_id, team),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Team not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Delete a team. Member projects are not touched.
#[utoipa::path(
    delete,
    path = "/api/v1/teams/{id}",
    tag = "Teams",
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Team deleted"),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn delete_team(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.delete_team(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "team deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Team not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

pub fn team_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_team, list_teams))
        .routes(routes!(get_team, update_team, delete_team))
}
