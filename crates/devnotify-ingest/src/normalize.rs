//! Event normalizer: converts one source-specific payload into exactly one
//! canonical [`Notification`], or reports why it cannot.
//!
//! The normalizer is pure. It performs no I/O and never retries; persistence
//! and retry policy belong to the caller.

use chrono::{DateTime, Utc};
use devnotify_common::types::{Category, Notification, NotificationType};
use devnotify_common::id;
use serde_json::Value;

use crate::error::{IngestError, Result};
use crate::payload::{
    require, AwsProbeResultPayload, DockerEventPayload, GithubIssuesPayload,
    GithubPullRequestPayload, GithubPushPayload,
};

/// Recognized event kinds. Anything else is `UnsupportedEventKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    GithubPush,
    GithubPullRequest,
    GithubIssues,
    DockerEvent,
    AwsProbeResult,
}

impl SourceKind {
    /// Map the `x-github-event` header value to a kind.
    pub fn from_github_event(event: &str) -> Result<Self> {
        match event {
            "push" => Ok(SourceKind::GithubPush),
            "pull_request" => Ok(SourceKind::GithubPullRequest),
            "issues" => Ok(SourceKind::GithubIssues),
            other => Err(IngestError::UnsupportedEventKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::GithubPush => write!(f, "github_push"),
            SourceKind::GithubPullRequest => write!(f, "github_pull_request"),
            SourceKind::GithubIssues => write!(f, "github_issues"),
            SourceKind::DockerEvent => write!(f, "docker_event"),
            SourceKind::AwsProbeResult => write!(f, "aws_probe_result"),
        }
    }
}

/// Fixed (source kind -> category) lookup. Category is never inferred from
/// payload content. Code-change events (push, PR, issue) are CI/CD concerns;
/// daemon and cloud probes are infrastructure.
pub fn category_for(kind: SourceKind) -> Category {
    match kind {
        SourceKind::GithubPush | SourceKind::GithubPullRequest | SourceKind::GithubIssues => {
            Category::CiCd
        }
        SourceKind::DockerEvent | SourceKind::AwsProbeResult => Category::Infrastructure,
    }
}

/// Impact score 1-5 per severity class.
pub fn severity_for(kind: NotificationType) -> u8 {
    match kind {
        NotificationType::Critical => 5,
        NotificationType::Warning => 3,
        NotificationType::Success => 2,
        NotificationType::Info => 1,
    }
}

/// Ownership context for the produced notification. `project_id` is
/// required on every notification; `integration_id` is absent for
/// system-generated events.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub project_id: String,
    pub integration_id: Option<String>,
}

/// Convert `(kind, raw)` into one fully populated notification with a fresh
/// id, `is_read = false`, `resolved = false`.
pub fn normalize(
    kind: SourceKind,
    raw: &Value,
    ctx: &NormalizeContext,
    now: DateTime<Utc>,
) -> Result<Notification> {
    match kind {
        SourceKind::GithubPush => {
            let payload: GithubPushPayload = serde_json::from_value(raw.clone())?;
            normalize_github_push(&payload, ctx)
        }
        SourceKind::GithubPullRequest => {
            let payload: GithubPullRequestPayload = serde_json::from_value(raw.clone())?;
            normalize_github_pull_request(&payload, ctx, now)
        }
        SourceKind::GithubIssues => {
            let payload: GithubIssuesPayload = serde_json::from_value(raw.clone())?;
            normalize_github_issues(&payload, ctx, now)
        }
        SourceKind::DockerEvent => {
            let payload: DockerEventPayload = serde_json::from_value(raw.clone())?;
            normalize_docker_event(&payload, ctx, now)
        }
        SourceKind::AwsProbeResult => {
            let payload: AwsProbeResultPayload = serde_json::from_value(raw.clone())?;
            Ok(normalize_aws_probe(&payload, ctx, now))
        }
    }
}

fn base_notification(
    kind: SourceKind,
    source: &str,
    service: String,
    notification_type: NotificationType,
    title: String,
    description: String,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    ctx: &NormalizeContext,
) -> Notification {
    Notification {
        id: id::next_id(),
        source: source.to_string(),
        service,
        category: category_for(kind),
        notification_type,
        severity: severity_for(notification_type),
        title,
        description,
        created_at,
        project_id: ctx.project_id.clone(),
        integration_id: ctx.integration_id.clone(),
        tags,
        is_read: false,
        resolved: false,
        resolved_at: None,
        resolved_by: None,
    }
}

fn normalize_github_push(
    payload: &GithubPushPayload,
    ctx: &NormalizeContext,
) -> Result<Notification> {
    let repo = require(payload.repository.as_ref(), "repository")?;
    let full_name = require(repo.full_name.as_deref(), "repository.full_name")?;
    let sender = require(payload.sender.as_ref(), "sender")?;
    let login = require(sender.login.as_deref(), "sender.login")?;
    // Branch deletions and empty pushes arrive without head_commit; those
    // events produce no notification.
    let commit = require(payload.head_commit.as_ref(), "head_commit")?;
    let message = require(commit.message.as_deref(), "head_commit.message")?;
    let commit_id = require(commit.id.as_deref(), "head_commit.id")?;
    let author = require(commit.author.as_ref(), "head_commit.author")?;
    require(author.name.as_deref(), "head_commit.author.name")?;
    require(author.email.as_deref(), "head_commit.author.email")?;
    require(commit.url.as_deref(), "head_commit.url")?;
    // The commit's own timestamp is the notification instant; a push event
    // without one is incomplete rather than "happened just now".
    let timestamp = require(commit.timestamp, "head_commit.timestamp")?;

    let summary = message.lines().next().unwrap_or(message);
    Ok(base_notification(
        SourceKind::GithubPush,
        "github",
        "GitHub".to_string(),
        NotificationType::Info,
        format!("New push to {full_name}"),
        format!("{login} pushed: \"{summary}\""),
        vec![
            "github".to_string(),
            "push".to_string(),
            commit_id.get(..7).unwrap_or(commit_id).to_string(),
        ],
        timestamp,
        ctx,
    ))
}

fn normalize_github_pull_request(
    payload: &GithubPullRequestPayload,
    ctx: &NormalizeContext,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let action = require(payload.action.as_deref(), "action")?;
    let pr = require(payload.pull_request.as_ref(), "pull_request")?;
    let title = require(pr.title.as_deref(), "pull_request.title")?;
    let user = require(pr.user.as_ref(), "pull_request.user")?;
    let login = require(user.login.as_deref(), "pull_request.user.login")?;
    require(pr.html_url.as_deref(), "pull_request.html_url")?;
    let repo = require(payload.repository.as_ref(), "repository")?;
    let full_name = require(repo.full_name.as_deref(), "repository.full_name")?;

    Ok(base_notification(
        SourceKind::GithubPullRequest,
        "github",
        "GitHub".to_string(),
        NotificationType::Info,
        format!("Pull request {action} in {full_name}"),
        format!("\"{title}\" by {login}"),
        vec![
            "github".to_string(),
            "pull_request".to_string(),
            action.to_string(),
        ],
        now,
        ctx,
    ))
}

fn normalize_github_issues(
    payload: &GithubIssuesPayload,
    ctx: &NormalizeContext,
    now: DateTime<Utc>,
) -> Result<Notification> {
    let action = require(payload.action.as_deref(), "action")?;
    let issue = require(payload.issue.as_ref(), "issue")?;
    let title = require(issue.title.as_deref(), "issue.title")?;
    let user = require(issue.user.as_ref(), "issue.user")?;
    let login = require(user.login.as_deref(), "issue.user.login")?;
    require(issue.html_url.as_deref(), "issue.html_url")?;
    let repo = require(payload.repository.as_ref(), "repository")?;
    let full_name = require(repo.full_name.as_deref(), "repository.full_name")?;

    Ok(base_notification(
        SourceKind::GithubIssues,
        "github",
        "GitHub".to_string(),
        NotificationType::Info,
        format!("Issue {action} in {full_name}"),
        format!("\"{title}\" by {login}"),
        vec!["github".to_string(), "issue".to_string(), action.to_string()],
        now,
        ctx,
    ))
}

fn normalize_docker_event(
    payload: &DockerEventPayload,
    ctx: &NormalizeContext,
    now: DateTime<Utc>,
) -> Result<Notification> {
    if payload.container_id.is_none() && payload.image_id.is_none() {
        return Err(IngestError::IncompletePayload {
            field: "container_id or image_id",
        });
    }
    let action = require(payload.action.as_deref(), "action")?;

    let abnormal_exit = action == "die" && payload.exit_code.unwrap_or(0) != 0;
    let notification_type = if action == "destroy" || abnormal_exit {
        NotificationType::Warning
    } else {
        NotificationType::Info
    };

    let (title, description) = if let Some(container_id) = payload.container_id.as_deref() {
        let name = payload
            .container_name
            .as_deref()
            .unwrap_or(container_id);
        let mut description = format!("Container {name}");
        if let Some(image) = payload.image_name.as_deref() {
            description.push_str(&format!(" (image {image})"));
        }
        if let Some(code) = payload.exit_code {
            description.push_str(&format!(" exited with code {code}"));
        }
        (format!("Container {name} {action}"), description)
    } else {
        let name = payload
            .image_name
            .as_deref()
            .or(payload.image_id.as_deref())
            .unwrap_or("unknown");
        (
            format!("Image {name} {action}"),
            format!("Image {name}"),
        )
    };

    Ok(base_notification(
        SourceKind::DockerEvent,
        "docker",
        "Docker".to_string(),
        notification_type,
        title,
        description,
        vec!["docker".to_string(), action.to_string()],
        payload.timestamp.unwrap_or(now),
        ctx,
    ))
}

fn normalize_aws_probe(
    payload: &AwsProbeResultPayload,
    ctx: &NormalizeContext,
    now: DateTime<Utc>,
) -> Notification {
    let service = format!("AWS {}", payload.service_type.to_uppercase());
    let (notification_type, title, description) = if payload.success {
        (
            NotificationType::Success,
            format!("{service} probe succeeded"),
            payload
                .message
                .clone()
                .unwrap_or_else(|| format!("{service} reachable in {}", payload.region)),
        )
    } else {
        (
            NotificationType::Critical,
            format!("{service} probe failed"),
            // The literal provider error, not a generic failure message.
            payload
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        )
    };

    base_notification(
        SourceKind::AwsProbeResult,
        "aws",
        service,
        notification_type,
        title,
        description,
        vec![
            "aws".to_string(),
            payload.service_type.clone(),
            payload.region.clone(),
        ],
        now,
        ctx,
    )
}
