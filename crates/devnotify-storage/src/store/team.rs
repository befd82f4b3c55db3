use anyhow::Result;
use chrono::Utc;
use devnotify_common::id;
use devnotify_common::types::{CreateTeamRequest, Team, UpdateTeamRequest};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, EntityTrait, Order, QueryOrder,
};

use crate::entities::team::{self, Column as TeamCol, Entity as TeamEntity};
use crate::store::Store;

fn model_to_team(m: team::Model) -> Result<Team> {
    let members: Vec<String> = serde_json::from_str(&m.members).unwrap_or_default();
    let project_ids: Vec<String> = serde_json::from_str(&m.project_ids).unwrap_or_default();
    Ok(Team {
        id: m.id,
        name: m.name,
        description: m.description,
        members,
        project_ids,
        created_by: m.created_by,
        created_at: m.created_at.with_timezone(&Utc),
    })
}

impl Store {
    pub async fn insert_team(&self, req: &CreateTeamRequest) -> Result<Team> {
        let am = team::ActiveModel {
            id: Set(id::next_id()),
            name: Set(req.name.clone()),
            description: Set(req.description.clone()),
            members: Set(serde_json::to_string(&req.members)?),
            project_ids: Set("[]".to_string()),
            created_by: Set(req.created_by.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        };
        let model = am.insert(self.db()).await?;
        model_to_team(model)
    }

    pub async fn get_team_by_id(&self, id: &str) -> Result<Option<Team>> {
        let model = TeamEntity::find_by_id(id).one(self.db()).await?;
        model.map(model_to_team).transpose()
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>> {
        let rows = TeamEntity::find()
            .order_by(TeamCol::CreatedAt, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_team).collect()
    }

    pub async fn update_team(&self, id: &str, req: &UpdateTeamRequest) -> Result<Option<Team>> {
        let Some(model) = TeamEntity::find_by_id(id).one(self.db()).await? else {
            return Ok(None);
        };
        let mut am: team::ActiveModel = model.into();
        if let Some(ref name) = req.name {
            am.name = Set(name.clone());
        }
        if let Some(ref description) = req.description {
            am.description = Set(description.clone());
        }
        if let Some(ref members) = req.members {
            am.members = Set(serde_json::to_string(members)?);
        }
        if let Some(ref project_ids) = req.project_ids {
            am.project_ids = Set(serde_json::to_string(project_ids)?);
        }
        let model = am.update(self.db()).await?;
        model_to_team(model).map(Some)
    }

    pub async fn delete_team(&self, id: &str) -> Result<bool> {
        let res = TeamEntity::delete_by_id(id).exec(self.db()).await?;
        Ok(res.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::setup;

    fn create_request(name: &str) -> CreateTeamRequest {
        CreateTeamRequest {
            name: name.to_string(),
            description: "platform crew".to_string(),
            members: vec!["alice".to_string(), "bob".to_string()],
            created_by: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn should_create_and_fetch_team() {
        let (_dir, store) = setup().await;
        let t = store.insert_team(&create_request("platform")).await.unwrap();
        assert_eq!(t.members.len(), 2);
        assert!(t.project_ids.is_empty());

        let fetched = store.get_team_by_id(&t.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "platform");
        assert_eq!(fetched.members, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[tokio::test]
    async fn should_update_membership_and_projects() {
        let (_dir, store) = setup().await;
        let t = store.insert_team(&create_request("platform")).await.unwrap();

        let updated = store
            .update_team(
                &t.id,
                &UpdateTeamRequest {
                    members: Some(vec!["carol".to_string()]),
                    project_ids: Some(vec!["proj-1".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.members, vec!["carol".to_string()]);
        assert_eq!(updated.project_ids, vec!["proj-1".to_string()]);
        assert_eq!(updated.description, "platform crew");

        assert!(store
            .update_team("missing", &UpdateTeamRequest::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn should_delete_team() {
        let (_dir, store) = setup().await;
        let t = store.insert_team(&create_request("platform")).await.unwrap();
        assert!(store.delete_team(&t.id).await.unwrap());
        assert!(!store.delete_team(&t.id).await.unwrap());
        assert!(store.get_team_by_id(&t.id).await.unwrap().is_none());
    }
}
