//! Docker daemon adapter: connection test, container and image listings,
//! and event synthesis for the poll scheduler.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use devnotify_common::types::DockerConfig;
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::payload::DockerEventPayload;

const SERVICE: &str = "docker";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DockerVersion {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "ApiVersion")]
    pub api_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Daemon state string: "running", "exited", ...
    pub state: String,
    pub ports: Vec<String>,
    pub created: DateTime<Utc>,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub size: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug)]
pub struct DockerClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DockerClient {
    pub fn new(http: reqwest::Client, config: &DockerConfig, timeout: Duration) -> Self {
        let scheme = if config.use_tls.unwrap_or(false) {
            "https"
        } else {
            "http"
        };
        Self {
            http,
            base_url: format!("{scheme}://{}:{}", config.host, config.port),
            timeout,
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| IngestError::from_reqwest(SERVICE, e))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IngestError::Upstream {
                service: SERVICE.to_string(),
                message: if body.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    body
                },
            });
        }
        resp.json()
            .await
            .map_err(|e| IngestError::from_reqwest(SERVICE, e))
    }

    /// `GET /version` as a reachability test.
    pub async fn test_connection(&self) -> Result<DockerVersion> {
        self.get("/version").await
    }

    /// `GET /containers/json?all=true`: every container, all states.
    pub async fn list_containers(&self) -> Result<Vec<ContainerSummary>> {
        let raw: Vec<RawContainer> = self.get("/containers/json?all=true").await?;
        Ok(raw.into_iter().map(RawContainer::into_summary).collect())
    }

    /// `GET /images/json`.
    pub async fn list_images(&self) -> Result<Vec<ImageSummary>> {
        let raw: Vec<RawImage> = self.get("/images/json").await?;
        Ok(raw.into_iter().map(RawImage::into_summary).collect())
    }
}

/// Build event payloads from a daemon snapshot: one `start` per running
/// container, one `pull` per image. The daemon's own event stream is not
/// consumed; the poller works from state deltas alone.
pub fn synthesize_events(
    containers: &[ContainerSummary],
    images: &[ImageSummary],
) -> Vec<DockerEventPayload> {
    let mut events = Vec::new();
    for container in containers.iter().filter(|c| c.state == "running") {
        events.push(DockerEventPayload {
            action: Some("start".to_string()),
            container_id: Some(container.id.clone()),
            container_name: Some(container.name.clone()),
            image_id: None,
            image_name: Some(container.image.clone()),
            exit_code: None,
            timestamp: Some(container.created),
        });
    }
    for image in images {
        events.push(DockerEventPayload {
            action: Some("pull".to_string()),
            container_id: None,
            container_name: None,
            image_id: Some(image.id.clone()),
            image_name: Some(format!("{}:{}", image.repository, image.tag)),
            exit_code: None,
            timestamp: Some(image.created),
        });
    }
    events
}

pub fn format_bytes(bytes: i64) -> String {
    if bytes <= 0 {
        return "0 B".to_string();
    }
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[derive(Debug, Deserialize)]
struct RawContainer {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Created")]
    created: i64,
    #[serde(rename = "Ports", default)]
    ports: Vec<RawPort>,
    #[serde(rename = "SizeRw", default)]
    size_rw: i64,
}

#[derive(Debug, Deserialize)]
struct RawPort {
    #[serde(rename = "IP")]
    ip: Option<String>,
    #[serde(rename = "PrivatePort")]
    private_port: u16,
    #[serde(rename = "PublicPort")]
    public_port: Option<u16>,
    #[serde(rename = "Type")]
    kind: String,
}

impl RawContainer {
    fn into_summary(self) -> ContainerSummary {
        let name = self
            .names
            .first()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| self.id.clone());
        let ports = self
            .ports
            .iter()
            .map(|p| match (p.ip.as_deref(), p.public_port) {
                (Some(ip), Some(public)) => {
                    format!("{ip}:{public}->{}/{}", p.private_port, p.kind)
                }
                _ => format!("{}/{}", p.private_port, p.kind),
            })
            .collect();
        ContainerSummary {
            id: self.id,
            name,
            image: self.image,
            state: self.state,
            ports,
            created: Utc.timestamp_opt(self.created, 0).single().unwrap_or_default(),
            size_bytes: self.size_rw,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Vec<String>,
    #[serde(rename = "Created")]
    created: i64,
    #[serde(rename = "Size", default)]
    size: i64,
}

impl RawImage {
    fn into_summary(self) -> ImageSummary {
        let (repository, tag) = self
            .repo_tags
            .first()
            .and_then(|t| t.split_once(':'))
            .map(|(r, t)| (r.to_string(), t.to_string()))
            .unwrap_or_else(|| ("<none>".to_string(), "<none>".to_string()));
        ImageSummary {
            id: self.id,
            repository,
            tag,
            size: format_bytes(self.size),
            created: Utc.timestamp_opt(self.created, 0).single().unwrap_or_default(),
        }
    }
}
