use anyhow::Result;
use devnotify_server::config::ServerConfig;
use devnotify_server::poller::DockerPollScheduler;
use devnotify_server::state::AppState;
use devnotify_server::app;
use devnotify_storage::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    devnotify_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("devnotify=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = match ServerConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %config_path, error = %e, "config not loaded, using defaults");
            ServerConfig::default()
        }
    };

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        db = %config.database.path,
        poller = config.docker_poller.enabled,
        "devnotify-server starting"
    );

    let store = Arc::new(Store::new(&config.database.connection_url()).await?);
    let config = Arc::new(config);
    let state = AppState::new(store, config.clone());

    let poller_handle = if config.docker_poller.enabled {
        let scheduler = DockerPollScheduler::new(&state);
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("docker poll scheduler disabled");
        None
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(http = %addr, "server started");

    axum::serve(listener, app::build_http_app(state))
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("shutting down gracefully");
        })
        .await?;

    if let Some(handle) = poller_handle {
        handle.abort();
    }
    tracing::info!("server stopped");

    Ok(())
}
