use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Notification category, assigned by the normalizer from the event source.
///
/// # Examples
///
/// ```
/// use devnotify_common::types::Category;
///
/// let cat: Category = "ci_cd".parse().unwrap();
/// assert_eq!(cat, Category::CiCd);
/// assert_eq!(cat.to_string(), "ci_cd");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Infrastructure,
    CiCd,
    Security,
    Database,
    Application,
}

impl Category {
    /// Every category value, in a fixed order. Aggregation output always
    /// covers all of these, zero-filled.
    pub const ALL: [Category; 5] = [
        Category::Infrastructure,
        Category::CiCd,
        Category::Security,
        Category::Database,
        Category::Application,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Infrastructure => write!(f, "infrastructure"),
            Category::CiCd => write!(f, "ci_cd"),
            Category::Security => write!(f, "security"),
            Category::Database => write!(f, "database"),
            Category::Application => write!(f, "application"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "infrastructure" => Ok(Category::Infrastructure),
            "ci_cd" => Ok(Category::CiCd),
            "security" => Ok(Category::Security),
            "database" => Ok(Category::Database),
            "application" => Ok(Category::Application),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

/// Severity class of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Critical,
    Warning,
    Info,
    Success,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::Critical => write!(f, "critical"),
            NotificationType::Warning => write!(f, "warning"),
            NotificationType::Info => write!(f, "info"),
            NotificationType::Success => write!(f, "success"),
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(NotificationType::Critical),
            "warning" => Ok(NotificationType::Warning),
            "info" => Ok(NotificationType::Info),
            "success" => Ok(NotificationType::Success),
            _ => Err(format!("unknown notification type: {s}")),
        }
    }
}

/// Canonical notification record produced by the normalizer.
///
/// Invariant: `resolved == true` implies `resolved_at` and `resolved_by` are
/// both set; `resolved == false` implies both are `None`. Only the resolve
/// operation on the store mutates those three fields, atomically.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Originating system, e.g. "github", "docker", "aws".
    pub source: String,
    /// Human-facing service name, e.g. "GitHub Actions", "AWS EC2".
    pub service: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// 1-5, increasing with impact. Independent of `notification_type`.
    pub severity: u8,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub project_id: String,
    pub integration_id: Option<String>,
    pub tags: Vec<String>,
    pub is_read: bool,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

/// Notification as returned to clients: the record plus the derived
/// relative-time string, which is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    /// Derived display string, e.g. "5 minutes ago".
    pub time: String,
}

impl NotificationView {
    pub fn at(notification: Notification, now: DateTime<Utc>) -> Self {
        let time = crate::timefmt::relative_from(notification.created_at, now);
        Self { notification, time }
    }
}

/// Derived pattern kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Recurring,
    Escalating,
    CommonError,
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternType::Recurring => write!(f, "recurring"),
            PatternType::Escalating => write!(f, "escalating"),
            PatternType::CommonError => write!(f, "common_error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PatternSeverity {
    Low,
    Medium,
    High,
}

/// Derived grouping of notifications sharing a service/category signature.
/// Recomputed from the notification set, never authoritative on its own.
///
/// Invariant: `frequency == related_notifications.len()`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPattern {
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    pub service: String,
    pub category: Category,
    pub frequency: usize,
    pub last_occurrence: DateTime<Utc>,
    pub related_notifications: Vec<String>,
    pub severity: PatternSeverity,
    pub suggestion: String,
}

/// Counts per category. Always carries all five categories, zero-filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryCounts {
    pub infrastructure: u64,
    pub ci_cd: u64,
    pub security: u64,
    pub database: u64,
    pub application: u64,
}

impl CategoryCounts {
    pub fn get(&self, category: Category) -> u64 {
        match category {
            Category::Infrastructure => self.infrastructure,
            Category::CiCd => self.ci_cd,
            Category::Security => self.security,
            Category::Database => self.database,
            Category::Application => self.application,
        }
    }

    pub fn bump(&mut self, category: Category) {
        match category {
            Category::Infrastructure => self.infrastructure += 1,
            Category::CiCd => self.ci_cd += 1,
            Category::Security => self.security += 1,
            Category::Database => self.database += 1,
            Category::Application => self.application += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.infrastructure + self.ci_cd + self.security + self.database + self.application
    }
}

/// Headline tallies over a notification scope. `critical` and `warning`
/// count by type and are not exclusive with `resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationStats {
    pub total: u64,
    pub critical: u64,
    pub warning: u64,
    pub resolved: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Maintenance,
    Archived,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectStatus::Active => write!(f, "active"),
            ProjectStatus::Maintenance => write!(f, "maintenance"),
            ProjectStatus::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ProjectStatus::Active),
            "maintenance" => Ok(ProjectStatus::Maintenance),
            "archived" => Ok(ProjectStatus::Archived),
            _ => Err(format!("unknown project status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Display hint for the dashboard, e.g. "#3b82f6".
    pub color: String,
    pub status: ProjectStatus,
    pub team_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Project as returned to clients. Alert counters are live counts over
/// unresolved notifications, computed at read time; they are never stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub critical_alerts: u64,
    pub warning_alerts: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_project_color")]
    pub color: String,
    pub team_id: Option<String>,
    pub created_by: String,
}

fn default_project_color() -> String {
    "#3b82f6".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub status: Option<ProjectStatus>,
    pub team_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationKind {
    Github,
    Aws,
    Docker,
    Kubernetes,
    Postgresql,
    Jenkins,
    Datadog,
}

impl std::fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationKind::Github => write!(f, "github"),
            IntegrationKind::Aws => write!(f, "aws"),
            IntegrationKind::Docker => write!(f, "docker"),
            IntegrationKind::Kubernetes => write!(f, "kubernetes"),
            IntegrationKind::Postgresql => write!(f, "postgresql"),
            IntegrationKind::Jenkins => write!(f, "jenkins"),
            IntegrationKind::Datadog => write!(f, "datadog"),
        }
    }
}

impl std::str::FromStr for IntegrationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(IntegrationKind::Github),
            "aws" => Ok(IntegrationKind::Aws),
            "docker" => Ok(IntegrationKind::Docker),
            "kubernetes" => Ok(IntegrationKind::Kubernetes),
            "postgresql" => Ok(IntegrationKind::Postgresql),
            "jenkins" => Ok(IntegrationKind::Jenkins),
            "datadog" => Ok(IntegrationKind::Datadog),
            _ => Err(format!("unknown integration kind: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationStatus {
    Connected,
    Disconnected,
    Error,
}

impl std::fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationStatus::Connected => write!(f, "connected"),
            IntegrationStatus::Disconnected => write!(f, "disconnected"),
            IntegrationStatus::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for IntegrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "connected" => Ok(IntegrationStatus::Connected),
            "disconnected" => Ok(IntegrationStatus::Disconnected),
            "error" => Ok(IntegrationStatus::Error),
            _ => Err(format!("unknown integration status: {s}")),
        }
    }
}

/// A configured connection to one external system, owned by a project.
/// `config` shape depends on `kind`; see the typed config structs below.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IntegrationKind,
    pub name: String,
    pub status: IntegrationStatus,
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
    pub last_sync: Option<DateTime<Utc>>,
    pub project_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GithubConfig {
    pub username: String,
    pub repository: String,
    pub token: Option<String>,
    pub branch: Option<String>,
    pub auto_deploy: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfig {
    pub host: String,
    pub port: u16,
    #[serde(rename = "useTLS")]
    pub use_tls: Option<bool>,
    pub ca_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub service_type: String,
    pub bucket_name: Option<String>,
    pub cluster_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntegrationRequest {
    #[serde(rename = "type")]
    pub kind: IntegrationKind,
    pub name: String,
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
    pub project_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIntegrationRequest {
    pub name: Option<String>,
    #[schema(value_type = Object)]
    pub config: Option<serde_json::Value>,
    pub status: Option<IntegrationStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<String>,
    pub project_ids: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub members: Option<Vec<String>>,
    pub project_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolveRequest {
    /// Actor recorded as `resolvedBy`.
    pub actor: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for cat in Category::ALL {
            let parsed: Category = cat.to_string().parse().unwrap();
            assert_eq!(parsed, cat);
        }
        assert!("observability".parse::<Category>().is_err());
    }

    #[test]
    fn test_notification_type_parse() {
        let t: NotificationType = "CRITICAL".parse().unwrap();
        assert_eq!(t, NotificationType::Critical);
        assert_eq!(t.to_string(), "critical");
    }

    #[test]
    fn test_category_counts_total() {
        let mut counts = CategoryCounts::default();
        counts.bump(Category::CiCd);
        counts.bump(Category::CiCd);
        counts.bump(Category::Security);
        assert_eq!(counts.get(Category::CiCd), 2);
        assert_eq!(counts.get(Category::Infrastructure), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_notification_serializes_camel_case() {
        let n = Notification {
            id: "1".to_string(),
            source: "github".to_string(),
            service: "GitHub Actions".to_string(),
            category: Category::CiCd,
            notification_type: NotificationType::Info,
            severity: 1,
            title: "t".to_string(),
            description: "d".to_string(),
            created_at: Utc::now(),
            project_id: "p1".to_string(),
            integration_id: None,
            tags: vec![],
            is_read: false,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["projectId"], "p1");
        assert_eq!(json["type"], "info");
        assert_eq!(json["category"], "ci_cd");
        assert!(json["resolvedAt"].is_null());
    }
}
