use crate::api::{
    error_response, ingest_error_response, storage_error_response, success_empty_response,
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
    AwsConfig, CreateIntegrationRequest, DockerConfig, GithubConfig, Integration,
    IntegrationKind, IntegrationStatus, UpdateIntegrationRequest,
};
use devnotify_ingest::aws::AwsProber;
use devnotify_ingest::docker::DockerClient;
use devnotify_ingest::error::Result as IngestResult;
use devnotify_ingest::github::{GithubClient, GithubCommit, GithubIssueSummary};
use devnotify_ingest::retry::retry_with_cap;
use devnotify_storage::IntegrationFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Keys replaced with a placeholder before a config leaves the server.
const SECRET_KEYS: [&str; 5] = ["token", "secretAccessKey", "clientKey", "clientCert", "caCert"];

fn redact_config(config: &Value) -> Value {
    let mut redacted = config.clone();
    if let Some(map) = redacted.as_object_mut() {
        for key in SECRET_KEYS {
            if map.get(key).is_some_and(|v| !v.is_null()) {
                map.insert(key.to_string(), Value::String("***".to_string()));
            }
        }
    }
    redacted
}

fn redact_integration(mut integration: Integration) -> Integration {
    integration.config = redact_config(&integration.config);
    integration
}

/// Reject configs that do not match the kind's schema. Unknown extra keys
/// are tolerated; missing required keys are not.
fn validate_config(kind: IntegrationKind, config: &Value) -> Result<(), String> {
    let result = match kind {
        IntegrationKind::Github => {
            serde_json::from_value::<GithubConfig>(config.clone()).map(|_| ())
        }
        IntegrationKind::Docker => {
            serde_json::from_value::<DockerConfig>(config.clone()).map(|_| ())
        }
        IntegrationKind::Aws => serde_json::from_value::<AwsConfig>(config.clone()).map(|_| ()),
        // No typed schema for the remaining kinds yet; accept any object.
        _ => {
            if config.is_object() {
                Ok(())
            } else {
                return Err(format!("config for {kind} must be an object"));
            }
        }
    };
    result.map_err(|e| format!("invalid {kind} config: {e}"))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationQuery {
    #[param(required = false)]
    pub project_id: Option<String>,
    /// Kind filter: github | aws | docker | kubernetes | postgresql | jenkins | datadog.
    #[param(required = false)]
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Status filter: connected | disconnected | error.
    #[param(required = false)]
    pub status: Option<String>,
}

/// Create an integration. The config is validated against the kind's
/// schema; new integrations start disconnected until tested.
#[utoipa::path(
    post,
    path = "/api/v1/integrations",
    tag = "Integrations",
    request_body = CreateIntegrationRequest,
    responses(
        (status = 201, description = "Integration created", body = Integration),
        (status = 400, description = "Invalid config", body = ApiError)
    )
)]
async fn create_integration(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateIntegrationRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "name is required",
        );
    }
    if let Err(msg) = validate_config(req.kind, &req.config) {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg);
    }
    match state.store.insert_integration(&req).await {
        Ok(integration) => {
            tracing::info!(
                trace_id = %*trace_id,
                id = %integration.id,
                kind = %integration.kind,
                "integration created"
            );
            success_response(StatusCode::CREATED, &trace_id, redact_integration(integration))
        }
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// List integrations. Secrets in configs are redacted.
#[utoipa::path(
    get,
    path = "/api/v1/integrations",
    tag = "Integrations",
    params(IntegrationQuery),
    responses(
        (status = 200, description = "Integrations", body = Vec<Integration>),
        (status = 400, description = "Invalid filter value", body = ApiError)
    )
)]
async fn list_integrations(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<IntegrationQuery>,
) -> Response {
    let kind = match query.kind {
        Some(ref s) => match s.parse::<IntegrationKind>() {
            Ok(kind) => Some(kind),
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e)
            }
        },
        None => None,
    };
    let status = match query.status {
        Some(ref s) => match s.parse::<IntegrationStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &e)
            }
        },
        None => None,
    };
    let filter = IntegrationFilter {
        project_id: query.project_id,
        kind,
        status,
    };
    match state.store.list_integrations(&filter).await {
        Ok(integrations) => success_response(
            StatusCode::OK,
            &trace_id,
            integrations
                .into_iter()
                .map(redact_integration)
                .collect::<Vec<_>>(),
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Fetch one integration, config redacted.
#[utoipa::path(
    get,
    path = "/api/v1/integrations/{id}",
    tag = "Integrations",
    params(("id" = String, Path, description = "Integration id")),
    responses(
        (status = 200, description = "Integration", body = Integration),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn get_integration(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.get_integration_by_id(&id).await {
        Ok(Some(integration)) => {
            success_response(StatusCode::OK, &trace_id, redact_integration(integration))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Integration not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Update name, config or status. A replaced config is validated again.
#[utoipa::path(
    put,
    path = "/api/v1/integrations/{id}",
    tag = "Integrations",
    params(("id" = String, Path, description = "Integration id")),
    request_body = UpdateIntegrationRequest,
    responses(
        (status = 200, description = "Integration updated", body = Integration),
        (status = 400, description = "Invalid config", body = ApiError),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn update_integration(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateIntegrationRequest>,
) -> Response {
    if let Some(ref config) = req.config {
        let existing = match state.store.get_integration_by_id(&id).await {
            Ok(Some(i)) => i,
            Ok(None) => {
                return error_response(
                    StatusCode::NOT_FOUND,
                    &trace_id,
                    "not_found",
                    "Integration not found",
                )
            }
            Err(e) => return storage_error_response(&trace_id, &e),
        };
        if let Err(msg) = validate_config(existing.kind, config) {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "invalid_config", &msg);
        }
    }
    match state.store.update_integration(&id, &req).await {
        Ok(Some(integration)) => {
            success_response(StatusCode::OK, &trace_id, redact_integration(integration))
        }
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Integration not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Delete an integration. Notifications it produced stay.
#[utoipa::path(
    delete,
    path = "/api/v1/integrations/{id}",
    tag = "Integrations",
    params(("id" = String, Path, description = "Integration id")),
    responses(
        (status = 200, description = "Integration deleted"),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn delete_integration(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.store.delete_integration(&id).await {
        Ok(true) => success_empty_response(StatusCode::OK, &trace_id, "integration deleted"),
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            "Integration not found",
        ),
        Err(e) => storage_error_response(&trace_id, &e),
    }
}

/// Typed GitHub config of an integration, or why there is none.
fn github_config_of(integration: &Integration) -> Result<GithubConfig, String> {
    if integration.kind != IntegrationKind::Github {
        return Err(format!(
            "GitHub activity not available for {} integrations",
            integration.kind
        ));
    }
    serde_json::from_value(integration.config.clone())
        .map_err(|e| format!("invalid github config: {e}"))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Max entries to return (default 10, cap 50).
    #[param(required = false)]
    pub limit: Option<usize>,
}

impl ActivityQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(10).min(50)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommitView {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub date: Option<DateTime<Utc>>,
    pub html_url: String,
}

impl From<GithubCommit> for CommitView {
    fn from(c: GithubCommit) -> Self {
        Self {
            sha: c.sha,
            message: c.message,
            author_name: c.author_name,
            author_email: c.author_email,
            date: c.date,
            html_url: c.html_url,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user_login: String,
    pub html_url: String,
}

impl From<GithubIssueSummary> for IssueView {
    fn from(i: GithubIssueSummary) -> Self {
        Self {
            id: i.id,
            number: i.number,
            title: i.title,
            state: i.state,
            user_login: i.user_login,
            html_url: i.html_url,
        }
    }
}

/// Recent commits on the integration's configured branch.
#[utoipa::path(
    get,
    path = "/api/v1/integrations/{id}/commits",
    tag = "Integrations",
    params(("id" = String, Path, description = "Integration id"), ActivityQuery),
    responses(
        (status = 200, description = "Recent commits", body = Vec<CommitView>),
        (status = 400, description = "Not a GitHub integration", body = ApiError),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn list_integration_commits(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActivityQuery>,
) -> Response {
    let integration = match state.store.get_integration_by_id(&id).await {
        Ok(Some(i)) => i,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Integration not found",
            )
        }
        Err(e) => return storage_error_response(&trace_id, &e),
    };
    let config = match github_config_of(&integration) {
        Ok(c) => c,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "unsupported_service", &msg)
        }
    };
    let client = GithubClient::for_config(state.http.clone(), &config, state.adapter_timeout());
    let limit = query.limit();
    match retry_with_cap(state.retry_policy(), || client.recent_commits(&config, limit)).await {
        Ok(commits) => success_response(
            StatusCode::OK,
            &trace_id,
            commits.into_iter().map(CommitView::from).collect::<Vec<_>>(),
        ),
        Err(e) => ingest_error_response(&trace_id, &e),
    }
}

/// Open issues on the integration's repository.
#[utoipa::path(
    get,
    path = "/api/v1/integrations/{id}/issues",
    tag = "Integrations",
    params(("id" = String, Path, description = "Integration id"), ActivityQuery),
    responses(
        (status = 200, description = "Open issues", body = Vec<IssueView>),
        (status = 400, description = "Not a GitHub integration", body = ApiError),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn list_integration_issues(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ActivityQuery>,
) -> Response {
    let integration = match state.store.get_integration_by_id(&id).await {
        Ok(Some(i)) => i,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Integration not found",
            )
        }
        Err(e) => return storage_error_response(&trace_id, &e),
    };
    let config = match github_config_of(&integration) {
        Ok(c) => c,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "unsupported_service", &msg)
        }
    };
    let client = GithubClient::for_config(state.http.clone(), &config, state.adapter_timeout());
    let limit = query.limit();
    match retry_with_cap(state.retry_policy(), || client.open_issues(&config, limit)).await {
        Ok(issues) => success_response(
            StatusCode::OK,
            &trace_id,
            issues.into_iter().map(IssueView::from).collect::<Vec<_>>(),
        ),
        Err(e) => ingest_error_response(&trace_id, &e),
    }
}

/// Connectivity test outcome. On failure `message` carries the upstream's
/// literal error text; the operator's next action depends on it.
#[derive(Debug, Serialize, ToSchema)]
pub struct IntegrationTestResult {
    pub success: bool,
    pub message: String,
}

async fn test_github(state: &AppState, config: &Value) -> IngestResult<String> {
    let config: GithubConfig = serde_json::from_value(config.clone())?;
    let client = GithubClient::for_config(state.http.clone(), &config, state.adapter_timeout());
    if config.token.is_some() {
        let user = client.validate_credentials().await?;
        let repo = client.validate_repository(&config).await?;
        Ok(format!(
            "Authenticated as {}; repository {} reachable",
            user.login, repo.full_name
        ))
    } else {
        let repo = client.validate_repository(&config).await?;
        Ok(format!("Repository {} reachable (no token)", repo.full_name))
    }
}

async fn test_docker(state: &AppState, config: &Value) -> IngestResult<String> {
    let config: DockerConfig = serde_json::from_value(config.clone())?;
    let client = DockerClient::new(state.http.clone(), &config, state.adapter_timeout());
    let version = client.test_connection().await?;
    Ok(format!(
        "Docker {} (API {}) reachable",
        version.version, version.api_version
    ))
}

async fn test_aws(state: &AppState, config: &Value) -> IngestResult<String> {
    let config: AwsConfig = serde_json::from_value(config.clone())?;
    let prober = AwsProber::new(state.http.clone(), config, state.adapter_timeout())?;
    let identity = prober.validate_credentials().await?;
    let message = prober.probe_service().await?;
    Ok(format!("{} ({})", message, identity.arn))
}

/// Run the kind-specific connectivity test and record the outcome on the
/// integration's status.
#[utoipa::path(
    post,
    path = "/api/v1/integrations/{id}/test",
    tag = "Integrations",
    params(("id" = String, Path, description = "Integration id")),
    responses(
        (status = 200, description = "Test outcome", body = IntegrationTestResult),
        (status = 400, description = "Kind has no connectivity test", body = ApiError),
        (status = 404, description = "Unknown id", body = ApiError)
    )
)]
async fn test_integration(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let integration = match state.store.get_integration_by_id(&id).await {
        Ok(Some(i)) => i,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                "Integration not found",
            )
        }
        Err(e) => return storage_error_response(&trace_id, &e),
    };

    let outcome = match integration.kind {
        IntegrationKind::Github => test_github(&state, &integration.config).await,
        IntegrationKind::Docker => test_docker(&state, &integration.config).await,
        IntegrationKind::Aws => test_aws(&state, &integration.config).await,
        other => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "unsupported_service",
                &format!("Connectivity test not supported for {other}"),
            )
        }
    };

    let (status, result) = match outcome {
        Ok(message) => (
            IntegrationStatus::Connected,
            IntegrationTestResult {
                success: true,
                message,
            },
        ),
        Err(e) => {
            tracing::warn!(trace_id = %*trace_id, id = %id, error = %e, "integration test failed");
            (
                IntegrationStatus::Error,
                IntegrationTestResult {
                    success: false,
                    message: e.to_string(),
                },
            )
        }
    };

    let last_sync = result.success.then(Utc::now);
    if let Err(e) = state.store.set_integration_status(&id, status, last_sync).await {
        return storage_error_response(&trace_id, &e);
    }
    success_response(StatusCode::OK, &trace_id, result)
}

pub fn integration_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_integration, list_integrations))
        .routes(routes!(get_integration, update_integration, delete_integration))
        .routes(routes!(test_integration))
        .routes(routes!(list_integration_commits))
        .routes(routes!(list_integration_issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_redact_secret_keys_only() {
        let config = json!({
            "username": "octocat",
            "repository": "hello",
            "token": "ghp_secret",
        });
        let redacted = redact_config(&config);
        assert_eq!(redacted["token"], "***");
        assert_eq!(redacted["username"], "octocat");
    }

    #[test]
    fn should_leave_absent_secrets_alone() {
        let config = json!({"host": "localhost", "port": 2375});
        let redacted = redact_config(&config);
        assert!(redacted.get("token").is_none());
    }

    #[test]
    fn should_validate_config_per_kind() {
        let github = json!({"username": "octocat", "repository": "hello"});
        assert!(validate_config(IntegrationKind::Github, &github).is_ok());

        let missing_repo = json!({"username": "octocat"});
        assert!(validate_config(IntegrationKind::Github, &missing_repo).is_err());

        let docker = json!({"host": "localhost", "port": 2375});
        assert!(validate_config(IntegrationKind::Docker, &docker).is_ok());
        assert!(validate_config(IntegrationKind::Aws, &docker).is_err());

        // kinds without a typed schema accept any object
        assert!(validate_config(IntegrationKind::Jenkins, &docker).is_ok());
        assert!(validate_config(IntegrationKind::Jenkins, &json!("text")).is_err());
    }

    fn integration(kind: IntegrationKind, config: Value) -> Integration {
        Integration {
            id: "int-1".to_string(),
            kind,
            name: "test".to_string(),
            status: IntegrationStatus::Connected,
            config,
            last_sync: None,
            project_id: "proj-1".to_string(),
        }
    }

    #[test]
    fn should_expose_github_activity_only_for_github_integrations() {
        let github = integration(
            IntegrationKind::Github,
            json!({"username": "octocat", "repository": "hello"}),
        );
        let config = github_config_of(&github).unwrap();
        assert_eq!(config.username, "octocat");
        assert_eq!(config.repository, "hello");

        let docker = integration(
            IntegrationKind::Docker,
            json!({"host": "localhost", "port": 2375}),
        );
        let err = github_config_of(&docker).unwrap_err();
        assert!(err.contains("docker"));
    }

    #[test]
    fn should_cap_activity_limit() {
        assert_eq!(ActivityQuery::default().limit(), 10);
        assert_eq!(ActivityQuery { limit: Some(3) }.limit(), 3);
        assert_eq!(ActivityQuery { limit: Some(500) }.limit(), 50);
    }
}
