use crate::state::AppState;
use crate::{api, logging};
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "DevNotify API",
        description = "Developer notification dashboard REST API",
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Webhooks", description = "Inbound event receivers"),
        (name = "Notifications", description = "Notification feed and state"),
        (name = "Patterns", description = "Derived notification patterns"),
        (name = "Projects", description = "Project management"),
        (name = "Teams", description = "Team management"),
        (name = "Integrations", description = "External system connections")
    )
)]
struct ApiDoc;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        // Development mode: no origin list configured
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn build_http_app(state: AppState) -> Router {
    let (router, spec) = api::public_routes()
        .merge(api::webhooks::webhook_routes())
        .merge(api::notifications::notification_routes())
        .merge(api::patterns::pattern_routes())
        .merge(api::projects::project_routes())
        .merge(api::teams::team_routes())
        .merge(api::integrations::integration_routes())
        .split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(spec);

    let cors = cors_layer(&state.config.cors.allowed_origins);

    router
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api/v1/openapi.json", merged_spec))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
