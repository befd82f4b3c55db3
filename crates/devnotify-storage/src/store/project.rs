use anyhow::Result;
use chrono::Utc;
use devnotify_common::id;
use devnotify_common::types::{
    CreateProjectRequest, Project, ProjectStatus, UpdateProjectRequest,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder,
};

use crate::entities::notification::{Column as NotifCol, Entity as NotifEntity};
use crate::entities::project::{self, Column as ProjectCol, Entity as ProjectEntity};
use crate::store::Store;

/// Live alert counters for one project, computed over unresolved
/// notifications at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectAlertCounts {
    pub critical: u64,
    pub warning: u64,
}

fn model_to_project(m: project::Model) -> Result<Project> {
    let status: ProjectStatus = m.status.parse().map_err(anyhow::Error::msg)?;
    Ok(Project {
        id: m.id,
        name: m.name,
        description: m.description,
        color: m.color,
        status,
        team_id: m.team_id,
        created_by: m.created_by,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

impl Store {
    pub async fn insert_project(&self, req: &CreateProjectRequest) -> Result<Project> {
        let am = project::ActiveModel {
            id: Set(id::next_id()),
            name: Set(req.name.clone()),
            description: Set(req.description.clone()),
            color: Set(req.color.clone()),
            status: Set(ProjectStatus::Active.to_string()),
            team_id: Set(req.team_id.clone()),
            created_by: Set(req.created_by.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        model_to_project(model)
    }

    pub async fn get_project_by_id(&self, id: &str) -> Result<Option<Project>> {
        let model = ProjectEntity::find_by_id(id).one(self.db()).await?;
        model.map(model_to_project).transpose()
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = ProjectEntity::find()
            .order_by(ProjectCol::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_project).collect()
    }

    /// Apply a partial update. Unset fields keep their stored values;
    /// `team_id: Some(None)` detaches the project from its team.
    pub async fn update_project(
        &self,
        id: &str,
        req: &UpdateProjectRequest,
    ) -> Result<Option<Project>> {
        let Some(model) = ProjectEntity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut am: project::ActiveModel = model.into();
        if let Some(ref name) = req.name {
            am.name = Set(name.clone());
        }
        if let Some(ref description) = req.description {
            am.description = Set(description.clone());
        }
        if let Some(ref color) = req.color {
            am.color = Set(color.clone());
        }
        if let Some(status) = req.status {
            am.status = Set(status.to_string());
        }
        if let Some(ref team_id) = req.team_id {
            am.team_id = Set(team_id.clone());
        }
        let model = am.update(self.db()).await?;
        model_to_project(model).map(Some)
    }

    pub async fn delete_project(&self, id: &str) -> Result<bool> {
        let res = ProjectEntity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }

    /// Count the project's unresolved critical and warning notifications.
    pub async fn project_alert_counts(&self, project_id: &str) -> Result<ProjectAlertCounts> {
        let critical = NotifEntity::find()
            .filter(NotifCol::ProjectId.eq(project_id))
            .filter(NotifCol::Resolved.eq(false))
            .filter(NotifCol::NotificationType.eq("critical"))
            .count(self.db())
            .await?;
        let warning = NotifEntity::find()
            .filter(NotifCol::ProjectId.eq(project_id))
            .filter(NotifCol::Resolved.eq(false))
            .filter(NotifCol::NotificationType.eq("warning"))
            .count(self.db())
            .await?;
        Ok(ProjectAlertCounts { critical, warning })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::setup;
    use devnotify_common::types::{Category, Notification, NotificationType};

    fn create_request(name: &str) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.to_string(),
            description: "backend services".to_string(),
            color: "#3b82f6".to_string(),
            team_id: None,
            created_by: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn should_create_and_list_projects() {
        let (_dir, store) = setup().await;
        let p1 = store.insert_project(&create_request("api")).await.unwrap();
        let p2 = store.insert_project(&create_request("frontend")).await.unwrap();
        assert_ne!(p1.id, p2.id);
        assert_eq!(p1.status, ProjectStatus::Active);

        let all = store.list_projects().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "api");
    }

    #[tokio::test]
    async fn should_apply_partial_updates() {
        let (_dir, store) = setup().await;
        let p = store.insert_project(&create_request("api")).await.unwrap();

        let updated = store
            .update_project(
                &p.id,
                &UpdateProjectRequest {
                    status: Some(ProjectStatus::Maintenance),
                    color: Some("#ef4444".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ProjectStatus::Maintenance);
        assert_eq!(updated.color, "#ef4444");
        // untouched fields survive
        assert_eq!(updated.name, "api");
        assert_eq!(updated.created_by, "alice");

        let missing = store
            .update_project("missing", &UpdateProjectRequest::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn should_detach_team_with_explicit_null() {
        let (_dir, store) = setup().await;
        let mut req = create_request("api");
        req.team_id = Some("team-1".to_string());
        let p = store.insert_project(&req).await.unwrap();
        assert_eq!(p.team_id.as_deref(), Some("team-1"));

        let updated = store
            .update_project(
                &p.id,
                &UpdateProjectRequest {
                    team_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.team_id.is_none());
    }

    #[tokio::test]
    async fn should_count_only_unresolved_alerts() {
        let (_dir, store) = setup().await;
        let p = store.insert_project(&create_request("api")).await.unwrap();

        let mut base = Notification {
            id: String::new(),
            source: "docker".to_string(),
            service: "Docker".to_string(),
            category: Category::Infrastructure,
            notification_type: NotificationType::Critical,
            severity: 5,
            title: "container died".to_string(),
            description: "exit code 137".to_string(),
            created_at: Utc::now(),
            project_id: p.id.clone(),
            integration_id: None,
            tags: vec![],
            is_read: false,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        };
        for (id, nt, sev) in [
            ("n1", NotificationType::Critical, 5),
            ("n2", NotificationType::Critical, 5),
            ("n3", NotificationType::Warning, 3),
            ("n4", NotificationType::Info, 1),
        ] {
            base.id = id.to_string();
            base.notification_type = nt;
            base.severity = sev;
            store.insert_notification(&base).await.unwrap();
        }
        store
            .resolve_notification("n2", "alice", Utc::now())
            .await
            .unwrap();

        let counts = store.project_alert_counts(&p.id).await.unwrap();
        assert_eq!(counts, ProjectAlertCounts { critical: 1, warning: 1 });

        let empty = store.project_alert_counts("other").await.unwrap();
        assert_eq!(empty, ProjectAlertCounts::default());
    }
}
