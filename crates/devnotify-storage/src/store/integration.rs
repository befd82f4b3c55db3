use anyhow::Result;
use chrono::{DateTime, Utc};
use devnotify_common::id;
use devnotify_common::types::{
    CreateIntegrationRequest, Integration, IntegrationKind, IntegrationStatus,
    UpdateIntegrationRequest,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, Order, QueryFilter,
    QueryOrder, Select,
};

use crate::entities::integration::{self, Column as IntCol, Entity as IntEntity};
use crate::store::Store;

/// Integration filter conditions, AND-combined.
#[derive(Debug, Clone, Default)]
pub struct IntegrationFilter {
    pub project_id: Option<String>,
    pub kind: Option<IntegrationKind>,
    pub status: Option<IntegrationStatus>,
}

fn apply_integration_filter(
    mut q: Select<IntEntity>,
    filter: &IntegrationFilter,
) -> Select<IntEntity> {
    if let Some(ref project_id) = filter.project_id {
        q = q.filter(IntCol::ProjectId.eq(project_id.as_str()));
    }
    if let Some(kind) = filter.kind {
        q = q.filter(IntCol::Kind.eq(kind.to_string()));
    }
    if let Some(status) = filter.status {
        q = q.filter(IntCol::Status.eq(status.to_string()));
    }
    q
}

fn model_to_integration(m: integration::Model) -> Result<Integration> {
    let kind: IntegrationKind = m.kind.parse().map_err(anyhow::Error::msg)?;
    let status: IntegrationStatus = m.status.parse().map_err(anyhow::Error::msg)?;
    let config: serde_json::Value = serde_json::from_str(&m.config_json)?;
    Ok(Integration {
        id: m.id,
        kind,
        name: m.name,
        status,
        config,
        last_sync: m.last_sync.map(|t| t.with_timezone(&Utc)),
        project_id: m.project_id,
    })
}

impl Store {
    /// New integrations start disconnected; a successful connectivity test
    /// flips them to connected via [`Store::set_integration_status`].
    pub async fn insert_integration(
        &self,
        req: &CreateIntegrationRequest,
    ) -> Result<Integration> {
        let am = integration::ActiveModel {
            id: Set(id::next_id()),
            kind: Set(req.kind.to_string()),
            name: Set(req.name.clone()),
            status: Set(IntegrationStatus::Disconnected.to_string()),
            config_json: Set(serde_json::to_string(&req.config)?),
            last_sync: Set(None),
            project_id: Set(req.project_id.clone()),
        };
        let model = am.insert(self.db()).await?;
        model_to_integration(model)
    }

    pub async fn get_integration_by_id(&self, id: &str) -> Result<Option<Integration>> {
        let model = IntEntity::find_by_id(id).one(self.db()).await?;
        model.map(model_to_integration).transpose()
    }

    pub async fn list_integrations(
        &self,
        filter: &IntegrationFilter,
    ) -> Result<Vec<Integration>> {
        let rows = apply_integration_filter(IntEntity::find(), filter)
            .order_by(IntCol::Id, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_integration).collect()
    }

    pub async fn update_integration(
        &self,
        id: &str,
        req: &UpdateIntegrationRequest,
    ) -> Result<Option<Integration>> {
        let Some(model) = IntEntity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut am: integration::ActiveModel = model.into();
        if let Some(ref name) = req.name {
            am.name = Set(name.clone());
        }
        if let Some(ref config) = req.config {
            am.config_json = Set(serde_json::to_string(config)?);
        }
        if let Some(status) = req.status {
            am.status = Set(status.to_string());
        }
        let model = am.update(self.db()).await?;
        model_to_integration(model).map(Some)
    }

    /// Record the outcome of a connectivity test or sync pass.
    pub async fn set_integration_status(
        &self,
        id: &str,
        status: IntegrationStatus,
        last_sync: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let Some(model) = IntEntity::find_by_id(id).one(self.db()).await? else {
            return Ok(false);
        };
        let mut am: integration::ActiveModel = model.into();
        am.status = Set(status.to_string());
        if let Some(t) = last_sync {
            am.last_sync = Set(Some(t.fixed_offset()));
        }
        am.update(self.db()).await?;
        Ok(true)
    }

    pub async fn delete_integration(&self, id: &str) -> Result<bool> {
        let res = IntEntity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::setup;
    use serde_json::json;

    fn create_request(kind: IntegrationKind, project_id: &str) -> CreateIntegrationRequest {
        CreateIntegrationRequest {
            kind,
            name: format!("{kind} link"),
            config: json!({"host": "localhost", "port": 2375}),
            project_id: project_id.to_string(),
        }
    }

    #[tokio::test]
    async fn should_start_disconnected_with_no_sync() {
        let (_dir, store) = setup().await;
        let i = store
            .insert_integration(&create_request(IntegrationKind::Docker, "proj-1"))
            .await
            .unwrap();
        assert_eq!(i.status, IntegrationStatus::Disconnected);
        assert!(i.last_sync.is_none());
        assert_eq!(i.config["host"], "localhost");
    }

    #[tokio::test]
    async fn should_filter_by_project_and_kind() {
        let (_dir, store) = setup().await;
        store
            .insert_integration(&create_request(IntegrationKind::Docker, "proj-1"))
            .await
            .unwrap();
        store
            .insert_integration(&create_request(IntegrationKind::Github, "proj-1"))
            .await
            .unwrap();
        store
            .insert_integration(&create_request(IntegrationKind::Docker, "proj-2"))
            .await
            .unwrap();

        let filter = IntegrationFilter {
            project_id: Some("proj-1".to_string()),
            kind: Some(IntegrationKind::Docker),
            ..Default::default()
        };
        let found = store.list_integrations(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].project_id, "proj-1");
        assert_eq!(found[0].kind, IntegrationKind::Docker);

        let all = store
            .list_integrations(&IntegrationFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn should_record_status_transitions() {
        let (_dir, store) = setup().await;
        let i = store
            .insert_integration(&create_request(IntegrationKind::Aws, "proj-1"))
            .await
            .unwrap();

        let synced_at = Utc::now();
        assert!(store
            .set_integration_status(&i.id, IntegrationStatus::Connected, Some(synced_at))
            .await
            .unwrap());
        let fetched = store.get_integration_by_id(&i.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, IntegrationStatus::Connected);
        assert!(fetched.last_sync.is_some());

        // an error keeps the last successful sync time
        assert!(store
            .set_integration_status(&i.id, IntegrationStatus::Error, None)
            .await
            .unwrap());
        let fetched = store.get_integration_by_id(&i.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, IntegrationStatus::Error);
        assert!(fetched.last_sync.is_some());

        assert!(!store
            .set_integration_status("missing", IntegrationStatus::Connected, None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn should_update_config_in_place() {
        let (_dir, store) = setup().await;
        let i = store
            .insert_integration(&create_request(IntegrationKind::Github, "proj-1"))
            .await
            .unwrap();

        let updated = store
            .update_integration(
                &i.id,
                &UpdateIntegrationRequest {
                    config: Some(json!({"username": "octocat", "repository": "hello"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.config["username"], "octocat");
        assert_eq!(updated.name, i.name);
    }
}
