use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use devnotify_ingest::retry::RetryPolicy;
use devnotify_storage::Store;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    /// Shared outbound HTTP client; per-request timeouts come from
    /// [`AppState::adapter_timeout`].
    pub http: reqwest::Client,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: Arc<ServerConfig>) -> Self {
        Self {
            store,
            http: reqwest::Client::new(),
            config,
            start_time: Utc::now(),
        }
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.config.adapters.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.config.adapters.retry_max_attempts,
            Duration::from_millis(self.config.adapters.retry_backoff_ms),
        )
    }
}
