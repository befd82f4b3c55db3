//! GitHub REST adapter: credential and repository validation plus the
//! commit/issue queries the dashboard's integration test panel shows.
//!
//! Non-2xx responses surface the provider's `message` field verbatim so the
//! operator can tell "Bad credentials" from a rate limit.

use std::time::Duration;

use devnotify_common::types::GithubConfig;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{IngestError, Result};

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "DevNotify-Backend";
const SERVICE: &str = "github";

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct GithubUser {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub public_repos: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct GithubRepository {
    pub id: u64,
    pub full_name: String,
    pub description: Option<String>,
    pub private: bool,
    pub default_branch: String,
    pub html_url: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GithubCommit {
    pub sha: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub date: Option<chrono::DateTime<chrono::Utc>>,
    pub html_url: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GithubIssueSummary {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user_login: String,
    pub html_url: String,
}

#[derive(Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    token: Option<String>,
    timeout: Duration,
}

impl GithubClient {
    pub fn new(http: reqwest::Client, token: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            token,
            timeout,
        }
    }

    pub fn for_config(http: reqwest::Client, config: &GithubConfig, timeout: Duration) -> Self {
        Self::new(http, config.token.clone(), timeout)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let mut req = self
            .http
            .get(format!("{API_BASE}{path}"))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .timeout(self.timeout);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| IngestError::from_reqwest(SERVICE, e))?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| IngestError::from_reqwest(SERVICE, e))?;
        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(IngestError::Upstream {
                service: SERVICE.to_string(),
                message,
            });
        }
        Ok(body)
    }

    /// `GET /user`: verifies the token by fetching its owner.
    pub async fn validate_credentials(&self) -> Result<GithubUser> {
        if self.token.is_none() {
            return Err(IngestError::Validation("Token is required".to_string()));
        }
        let body = self.get("/user").await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /repos/{owner}/{repo}`: verifies the repository exists and is
    /// accessible with the configured credentials.
    pub async fn validate_repository(&self, config: &GithubConfig) -> Result<GithubRepository> {
        if config.username.is_empty() || config.repository.is_empty() {
            return Err(IngestError::Validation(
                "Username and repository are required".to_string(),
            ));
        }
        let body = self
            .get(&format!("/repos/{}/{}", config.username, config.repository))
            .await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn recent_commits(
        &self,
        config: &GithubConfig,
        limit: usize,
    ) -> Result<Vec<GithubCommit>> {
        let branch = config.branch.as_deref().unwrap_or("main");
        let body = self
            .get(&format!(
                "/repos/{}/{}/commits?sha={branch}&per_page={limit}",
                config.username, config.repository
            ))
            .await?;
        let raw: Vec<RawCommit> = serde_json::from_value(body)?;
        Ok(raw.into_iter().map(RawCommit::flatten).collect())
    }

    pub async fn open_issues(
        &self,
        config: &GithubConfig,
        limit: usize,
    ) -> Result<Vec<GithubIssueSummary>> {
        let body = self
            .get(&format!(
                "/repos/{}/{}/issues?state=open&per_page={limit}",
                config.username, config.repository
            ))
            .await?;
        let raw: Vec<RawIssue> = serde_json::from_value(body)?;
        Ok(raw.into_iter().map(RawIssue::flatten).collect())
    }
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    sha: String,
    commit: RawCommitDetail,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct RawCommitDetail {
    message: String,
    author: RawCommitAuthor,
}

#[derive(Debug, Deserialize)]
struct RawCommitAuthor {
    name: String,
    email: String,
    date: Option<chrono::DateTime<chrono::Utc>>,
}

impl RawCommit {
    fn flatten(self) -> GithubCommit {
        GithubCommit {
            sha: self.sha,
            message: self.commit.message,
            author_name: self.commit.author.name,
            author_email: self.commit.author.email,
            date: self.commit.author.date,
            html_url: self.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    id: u64,
    number: u64,
    title: String,
    state: String,
    user: RawIssueUser,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct RawIssueUser {
    login: String,
}

impl RawIssue {
    fn flatten(self) -> GithubIssueSummary {
        GithubIssueSummary {
            id: self.id,
            number: self.number,
            title: self.title,
            state: self.state,
            user_login: self.user.login,
            html_url: self.html_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_require_token_for_credential_validation() {
        let client = GithubClient::new(reqwest::Client::new(), None, Duration::from_secs(5));
        let err = client.validate_credentials().await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
        assert!(err.to_string().contains("Token is required"));
    }

    #[tokio::test]
    async fn should_require_owner_and_repository() {
        let client = GithubClient::new(
            reqwest::Client::new(),
            Some("t".to_string()),
            Duration::from_secs(5),
        );
        let config = GithubConfig {
            username: String::new(),
            repository: "repo".to_string(),
            token: Some("t".to_string()),
            branch: None,
            auto_deploy: None,
        };
        let err = client.validate_repository(&config).await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn should_flatten_raw_commit() {
        let raw: RawCommit = serde_json::from_value(serde_json::json!({
            "sha": "abc123",
            "commit": {
                "message": "fix bug",
                "author": { "name": "Jose", "email": "j@x.com", "date": "2024-01-01T00:00:00Z" }
            },
            "html_url": "https://github.com/org/repo/commit/abc123"
        }))
        .unwrap();
        let commit = raw.flatten();
        assert_eq!(commit.sha, "abc123");
        assert_eq!(commit.author_name, "Jose");
        assert_eq!(commit.message, "fix bug");
    }
}
