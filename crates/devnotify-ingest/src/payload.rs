//! Raw payload schemas, one per source kind.
//!
//! Webhook JSON and probe results are duck-typed at the wire; these structs
//! turn field access into explicit presence checks so a missing field
//! surfaces as `IncompletePayload` instead of a null dereference downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// Pull an optional field out of a payload or fail with the field name.
pub(crate) fn require<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or(IngestError::IncompletePayload { field })
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubPushPayload {
    pub repository: Option<GithubRepositoryRef>,
    pub sender: Option<GithubActor>,
    pub head_commit: Option<GithubHeadCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubRepositoryRef {
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubActor {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubHeadCommit {
    pub id: Option<String>,
    pub message: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub author: Option<GithubCommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubPullRequestPayload {
    pub action: Option<String>,
    pub repository: Option<GithubRepositoryRef>,
    pub pull_request: Option<GithubItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssuesPayload {
    pub action: Option<String>,
    pub repository: Option<GithubRepositoryRef>,
    pub issue: Option<GithubItem>,
}

/// Shared shape of the nested `pull_request` / `issue` objects.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubItem {
    pub title: Option<String>,
    pub user: Option<GithubActor>,
    pub html_url: Option<String>,
    pub number: Option<u64>,
}

/// A container or image lifecycle transition observed on a Docker daemon.
/// Synthesized by the poller as well as accepted directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerEventPayload {
    /// "start", "stop", "pull", "destroy", "die", ...
    pub action: Option<String>,
    pub container_id: Option<String>,
    pub container_name: Option<String>,
    pub image_id: Option<String>,
    pub image_name: Option<String>,
    pub exit_code: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Outcome of one AWS credential or service-reachability probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsProbeResultPayload {
    pub service_type: String,
    pub region: String,
    pub success: bool,
    /// Confirmation text on success, e.g. "S3 access confirmed".
    pub message: Option<String>,
    /// Literal upstream error text on failure. Never replaced with a
    /// generic string; the operator's next action depends on it.
    pub error: Option<String>,
}
