use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub docker_poller: DockerPollerConfig,
    #[serde(default)]
    pub adapters: AdapterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.path)
    }
}

/// CORS allowed origins; empty list allows all origins (development mode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerPollerConfig {
    #[serde(default = "default_poller_enabled")]
    pub enabled: bool,
    #[serde(default = "default_poller_interval_secs")]
    pub interval_secs: u64,
}

impl Default for DockerPollerConfig {
    fn default() -> Self {
        Self {
            enabled: default_poller_enabled(),
            interval_secs: default_poller_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Upper bound for every outbound adapter call, in seconds.
    #[serde(default = "default_adapter_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_adapter_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "data/devnotify.db".to_string()
}

fn default_poller_enabled() -> bool {
    true
}

fn default_poller_interval_secs() -> u64 {
    300
}

fn default_adapter_timeout_secs() -> u64 {
    10
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_fill_defaults_for_empty_config() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "data/devnotify.db");
        assert!(config.cors.allowed_origins.is_empty());
        assert!(config.docker_poller.enabled);
        assert_eq!(config.adapters.timeout_secs, 10);
        assert_eq!(config.adapters.retry_max_attempts, 3);
    }

    #[test]
    fn should_keep_explicit_values() {
        let config: ServerConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [docker_poller]
            enabled = false
            interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(!config.docker_poller.enabled);
        assert_eq!(config.docker_poller.interval_secs, 60);
        // untouched sections still default
        assert_eq!(config.adapters.retry_backoff_ms, 500);
    }

    #[test]
    fn should_build_sqlite_connection_url() {
        let db = DatabaseConfig {
            path: "data/devnotify.db".to_string(),
        };
        assert_eq!(db.connection_url(), "sqlite://data/devnotify.db?mode=rwc");
    }
}
