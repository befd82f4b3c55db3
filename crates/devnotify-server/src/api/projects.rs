use crate::api::{
    error_response, storage_error_response, success_empty_response, success_response, ApiError,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use devnotify_common::types::{
    CreateProjectRequest, Project, ProjectView, UpdateProjectRequest,
};
use utoipa_axum::{router::OpenApiRouter, routes};

async fn view_for(state: &AppState, trace_id: &str, project: Project) -> Result<ProjectView, Response> {
    let counts = state
        .store
        .project_alert_counts(&project.id)
        .await
        .map_err(|e| storage_error_response(trace_id, &e))?;
    Ok(ProjectView {
        project,
        critical_alerts: counts.critical,
        warning_alerts: counts.warning,
    })
}

/// Create a project. New projects start active.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectView),
        (status = 400, description = "Invalid request", body = ApiError)
    )
)]
async fn create_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateProjectRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "name is required",
        );
    }
    let project = match state.store.insert_project(&req).await {
        Ok(p) => p,
        Err(e) => return storage_error_response(&trace_id, &e),
    };
    tracing::info!(trace_id = %*trace_id, id = %project.id, name = %project.name, "project created");
    match view_for(&state, &trace_id, project).await {
        Ok(view) => success_response(StatusCode::CREATED, &trace_id, view),
        Err(resp) => resp,
    }
}

/// List projects with live alert counters.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    responses(
        (status = 200, description = "Projects", body = Vec<ProjectView>)
    )
)]
async fn list_projects(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    let projects = match state.store.list_projects().await {
        Ok(v) => v,
        Err(e) => return storage_error_response(&trace_id, &e),
    };
    let mut views = Vec::with_capacity(projects.len());
    for project in projects {
        match view_for(&state, &trace_id, project).await {
            Ok(view) => views.push(view),
            Err(resp) => return resp,
        }
    }
    success_response(StatusCode::OK, &trace_id, views)
}

/// Fetch one project.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project", body = ProjectView),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn get_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_project_by_id(&id).await {
        Ok(Some(project)) => match view_for(&state, &trace_id, project).await {
            Ok(view) => success_response(StatusCode::OK, &trace_id, view),
            Err(resp) => resp,
        },
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Project not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Apply a partial update; unset fields keep their values.
#[utoipa::path(
    put,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(("id" = String, Path, description = "Project id")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Project updated", body = ProjectView),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn update_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> Response {
    match state.store.update_project(&id, &req).await {
        Ok(Some(project)) => match view_for(&state, &trace_id, project).await {
            Ok(view) => success_response(StatusCode::OK, &trace_id, view),
            Err(resp) => resp,
        },
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Project not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Delete a project. Its notifications stay; they keep the project id for
/// the audit trail.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(("id" = String, Path, description = "Project id")),
    responses(
        (status = 200, description = "Project deleted"),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn delete_project(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.delete_project(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "project deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Project not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

pub fn project_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_project, list_projects))
        .routes(routes!(get_project, update_project, delete_project))
}
