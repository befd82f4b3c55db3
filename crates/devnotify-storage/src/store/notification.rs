use anyhow::Result;
use chrono::{DateTime, Utc};
use devnotify_common::types::{Category, Notification, NotificationType};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};

use crate::entities::notification::{self, Column as NotifCol, Entity as NotifEntity};
use crate::store::{Store, TransitionOutcome};

/// Notification filter conditions. Every field is optional; set fields are
/// combined with AND.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    pub category: Option<Category>,
    pub notification_type: Option<NotificationType>,
    pub service: Option<String>,
    pub severity: Option<u8>,
    pub resolved: Option<bool>,
    pub is_read: Option<bool>,
    pub project_id: Option<String>,
    pub integration_id: Option<String>,
    /// Inclusive bounds on `created_at`.
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Substring match against title, description and service.
    pub search: Option<String>,
}

fn apply_notification_filter(
    mut q: Select<NotifEntity>,
    filter: &NotificationFilter,
) -> Select<NotifEntity> {
    if let Some(category) = filter.category {
        q = q.filter(NotifCol::Category.eq(category.to_string()));
    }
    if let Some(notification_type) = filter.notification_type {
        q = q.filter(NotifCol::NotificationType.eq(notification_type.to_string()));
    }
    if let Some(ref service) = filter.service {
        q = q.filter(NotifCol::Service.eq(service.as_str()));
    }
    if let Some(severity) = filter.severity {
        q = q.filter(NotifCol::Severity.eq(severity as i32));
    }
    if let Some(resolved) = filter.resolved {
        q = q.filter(NotifCol::Resolved.eq(resolved));
    }
    if let Some(is_read) = filter.is_read {
        q = q.filter(NotifCol::IsRead.eq(is_read));
    }
    if let Some(ref project_id) = filter.project_id {
        q = q.filter(NotifCol::ProjectId.eq(project_id.as_str()));
    }
    if let Some(ref integration_id) = filter.integration_id {
        q = q.filter(NotifCol::IntegrationId.eq(integration_id.as_str()));
    }
    if let Some(start) = filter.start_time {
        q = q.filter(NotifCol::CreatedAt.gte(start.fixed_offset()));
    }
    if let Some(end) = filter.end_time {
        q = q.filter(NotifCol::CreatedAt.lte(end.fixed_offset()));
    }
    if let Some(ref search) = filter.search {
        q = q.filter(
            Condition::any()
                .add(NotifCol::Title.contains(search.as_str()))
                .add(NotifCol::Description.contains(search.as_str()))
                .add(NotifCol::Service.contains(search.as_str())),
        );
    }
    q
}

fn model_to_notification(m: notification::Model) -> Result<Notification> {
    let category: Category = m.category.parse().map_err(anyhow::Error::msg)?;
    let notification_type: NotificationType =
        m.notification_type.parse().map_err(anyhow::Error::msg)?;
    let tags: Vec<String> = serde_json::from_str(&m.tags).unwrap_or_default();
    Ok(Notification {
        id: m.id,
        source: m.source,
        service: m.service,
        category,
        notification_type,
        severity: m.severity as u8,
        title: m.title,
        description: m.description,
        created_at: m.created_at.with_timezone(&Utc),
        project_id: m.project_id,
        integration_id: m.integration_id,
        tags,
        is_read: m.is_read,
        resolved: m.resolved,
        resolved_at: m.resolved_at.map(|t| t.with_timezone(&Utc)),
        resolved_by: m.resolved_by,
    })
}

impl Store {
    /// Persist one normalized notification. The record arrives fully
    /// formed from the normalizer, id included.
    pub async fn insert_notification(&self, n: &Notification) -> Result<Notification> {
        let am = notification::ActiveModel {
            id: Set(n.id.clone()),
            source: Set(n.source.clone()),
            service: Set(n.service.clone()),
            category: Set(n.category.to_string()),
            notification_type: Set(n.notification_type.to_string()),
            severity: Set(n.severity as i32),
            title: Set(n.title.clone()),
            description: Set(n.description.clone()),
            created_at: Set(n.created_at.fixed_offset()),
            project_id: Set(n.project_id.clone()),
            integration_id: Set(n.integration_id.clone()),
            tags: Set(serde_json::to_string(&n.tags)?),
            is_read: Set(n.is_read),
            resolved: Set(n.resolved),
            resolved_at: Set(n.resolved_at.map(|t| t.fixed_offset())),
            resolved_by: Set(n.resolved_by.clone()),
        };
        let model = am.insert(self.db()).await?;
        model_to_notification(model)
    }

    pub async fn get_notification_by_id(&self, id: &str) -> Result<Option<Notification>> {
        let model = NotifEntity::find_by_id(id).one(self.db()).await?;
        model.map(model_to_notification).transpose()
    }

    /// Newest first, for feed pages.
    pub async fn list_notifications(
        &self,
        filter: &NotificationFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Notification>> {
        let rows = apply_notification_filter(NotifEntity::find(), filter)
            .order_by(NotifCol::CreatedAt, Order::Desc)
            .order_by(NotifCol::Id, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_notification).collect()
    }

    /// Creation order, for the aggregation and pattern components, which
    /// treat the store's order as authoritative.
    pub async fn list_notifications_in_creation_order(
        &self,
        filter: &NotificationFilter,
    ) -> Result<Vec<Notification>> {
        let rows = apply_notification_filter(NotifEntity::find(), filter)
            .order_by(NotifCol::CreatedAt, Order::Asc)
            .order_by(NotifCol::Id, Order::Asc)
            .all(self.db())
            .await?;
        rows.into_iter().map(model_to_notification).collect()
    }

    pub async fn count_notifications(&self, filter: &NotificationFilter) -> Result<u64> {
        Ok(apply_notification_filter(NotifEntity::find(), filter)
            .count(self.db())
            .await?)
    }

    /// Unread -> Read. Idempotent; reading state never reverts.
    pub async fn mark_notification_read(&self, id: &str) -> Result<TransitionOutcome> {
        let res = NotifEntity::update_many()
            .col_expr(NotifCol::IsRead, Expr::value(true))
            .filter(NotifCol::Id.eq(id))
            .filter(NotifCol::IsRead.eq(false))
            .exec(self.db())
            .await?;
        if res.rows_affected > 0 {
            return Ok(TransitionOutcome::Applied);
        }
        let exists = NotifEntity::find_by_id(id).one(self.db()).await?.is_some();
        if exists {
            Ok(TransitionOutcome::AlreadyDone)
        } else {
            Ok(TransitionOutcome::NotFound)
        }
    }

    /// Mark every unread notification in scope as read. Returns the number
    /// of records transitioned.
    pub async fn mark_all_notifications_read(&self, project_id: Option<&str>) -> Result<u64> {
        let mut q = NotifEntity::update_many()
            .col_expr(NotifCol::IsRead, Expr::value(true))
            .filter(NotifCol::IsRead.eq(false));
        if let Some(project_id) = project_id {
            q = q.filter(NotifCol::ProjectId.eq(project_id));
        }
        let res = q.exec(self.db()).await?;
        Ok(res.rows_affected)
    }

    /// Open -> Resolved, as a conditional update on `resolved = false` so
    /// two racing resolvers cannot both win. On the idempotent no-op path
    /// `resolved_at` / `resolved_by` keep their original values.
    pub async fn resolve_notification(
        &self,
        id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let res = NotifEntity::update_many()
            .col_expr(NotifCol::Resolved, Expr::value(true))
            .col_expr(NotifCol::ResolvedAt, Expr::value(Some(now.fixed_offset())))
            .col_expr(NotifCol::ResolvedBy, Expr::value(Some(actor.to_string())))
            .filter(NotifCol::Id.eq(id))
            .filter(NotifCol::Resolved.eq(false))
            .exec(self.db())
            .await?;
        if res.rows_affected > 0 {
            return Ok(TransitionOutcome::Applied);
        }
        let exists = NotifEntity::find_by_id(id).one(self.db()).await?.is_some();
        if exists {
            Ok(TransitionOutcome::AlreadyDone)
        } else {
            Ok(TransitionOutcome::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::setup;
    use chrono::Duration;

    fn notification(id: &str, project_id: &str, created_at: DateTime<Utc>) -> Notification {
        Notification {
            id: id.to_string(),
            source: "github".to_string(),
            service: "GitHub".to_string(),
            category: Category::CiCd,
            notification_type: NotificationType::Info,
            severity: 1,
            title: format!("event {id}"),
            description: "a push happened".to_string(),
            created_at,
            project_id: project_id.to_string(),
            integration_id: None,
            tags: vec!["github".to_string(), "push".to_string()],
            is_read: false,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        }
    }

    #[tokio::test]
    async fn should_insert_and_fetch_notification() {
        let (_dir, store) = setup().await;
        let n = notification("n1", "proj-1", Utc::now());
        store.insert_notification(&n).await.unwrap();

        let fetched = store.get_notification_by_id("n1").await.unwrap().unwrap();
        assert_eq!(fetched.id, "n1");
        assert_eq!(fetched.category, Category::CiCd);
        assert_eq!(fetched.tags, vec!["github".to_string(), "push".to_string()]);
        assert!(!fetched.is_read);
        assert!(!fetched.resolved);
        assert!(fetched.resolved_at.is_none());
        assert!(fetched.resolved_by.is_none());
    }

    #[tokio::test]
    async fn should_filter_and_order_listings() {
        let (_dir, store) = setup().await;
        let t0 = Utc::now() - Duration::hours(3);
        for (i, project) in [(0, "proj-1"), (1, "proj-2"), (2, "proj-1")] {
            let mut n = notification(&format!("n{i}"), project, t0 + Duration::hours(i));
            if i == 2 {
                n.notification_type = NotificationType::Critical;
                n.severity = 5;
            }
            store.insert_notification(&n).await.unwrap();
        }

        let all = store
            .list_notifications(&NotificationFilter::default(), 100, 0)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        // newest first
        assert_eq!(all[0].id, "n2");

        let in_order = store
            .list_notifications_in_creation_order(&NotificationFilter::default())
            .await
            .unwrap();
        assert_eq!(in_order[0].id, "n0");
        assert_eq!(in_order[2].id, "n2");

        let filter = NotificationFilter {
            project_id: Some("proj-1".to_string()),
            notification_type: Some(NotificationType::Critical),
            ..Default::default()
        };
        let filtered = store.list_notifications(&filter, 100, 0).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "n2");
        assert_eq!(store.count_notifications(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn should_search_across_title_description_service() {
        let (_dir, store) = setup().await;
        let mut n = notification("n1", "proj-1", Utc::now());
        n.description = "Connection refused by daemon".to_string();
        store.insert_notification(&n).await.unwrap();

        let filter = NotificationFilter {
            search: Some("refused".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_notifications(&filter).await.unwrap(), 1);

        let filter = NotificationFilter {
            search: Some("nothing-here".to_string()),
            ..Default::default()
        };
        assert_eq!(store.count_notifications(&filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_mark_read_idempotently() {
        let (_dir, store) = setup().await;
        store
            .insert_notification(&notification("n1", "proj-1", Utc::now()))
            .await
            .unwrap();

        assert_eq!(
            store.mark_notification_read("n1").await.unwrap(),
            TransitionOutcome::Applied
        );
        assert_eq!(
            store.mark_notification_read("n1").await.unwrap(),
            TransitionOutcome::AlreadyDone
        );
        assert!(store.get_notification_by_id("n1").await.unwrap().unwrap().is_read);

        assert_eq!(
            store.mark_notification_read("missing").await.unwrap(),
            TransitionOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn should_mark_all_read_within_scope() {
        let (_dir, store) = setup().await;
        let t = Utc::now();
        store.insert_notification(&notification("n1", "proj-1", t)).await.unwrap();
        store.insert_notification(&notification("n2", "proj-1", t)).await.unwrap();
        store.insert_notification(&notification("n3", "proj-2", t)).await.unwrap();

        let transitioned = store.mark_all_notifications_read(Some("proj-1")).await.unwrap();
        assert_eq!(transitioned, 2);
        assert!(!store.get_notification_by_id("n3").await.unwrap().unwrap().is_read);

        // second pass finds nothing unread in scope
        let transitioned = store.mark_all_notifications_read(Some("proj-1")).await.unwrap();
        assert_eq!(transitioned, 0);

        let transitioned = store.mark_all_notifications_read(None).await.unwrap();
        assert_eq!(transitioned, 1);
    }

    #[tokio::test]
    async fn should_resolve_once_and_keep_first_metadata() {
        let (_dir, store) = setup().await;
        store
            .insert_notification(&notification("n1", "proj-1", Utc::now()))
            .await
            .unwrap();

        let t1 = Utc::now();
        assert_eq!(
            store.resolve_notification("n1", "alice", t1).await.unwrap(),
            TransitionOutcome::Applied
        );
        let after_first = store.get_notification_by_id("n1").await.unwrap().unwrap();
        assert!(after_first.resolved);
        assert_eq!(after_first.resolved_by.as_deref(), Some("alice"));
        let first_resolved_at = after_first.resolved_at.unwrap();

        // second resolve with a different actor is a no-op
        let t2 = t1 + Duration::minutes(5);
        assert_eq!(
            store.resolve_notification("n1", "bob", t2).await.unwrap(),
            TransitionOutcome::AlreadyDone
        );
        let after_second = store.get_notification_by_id("n1").await.unwrap().unwrap();
        assert_eq!(after_second.resolved_by.as_deref(), Some("alice"));
        assert_eq!(after_second.resolved_at.unwrap(), first_resolved_at);
    }

    #[tokio::test]
    async fn should_report_not_found_without_partial_effect() {
        let (_dir, store) = setup().await;
        assert_eq!(
            store
                .resolve_notification("nonexistent-id", "alice", Utc::now())
                .await
                .unwrap(),
            TransitionOutcome::NotFound
        );
        assert_eq!(
            store
                .count_notifications(&NotificationFilter::default())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn should_record_exactly_one_winner_for_racing_resolvers() {
        let (_dir, store) = setup().await;
        store
            .insert_notification(&notification("n1", "proj-1", Utc::now()))
            .await
            .unwrap();

        let now = Utc::now();
        let (a, b) = tokio::join!(
            store.resolve_notification("n1", "alice", now),
            store.resolve_notification("n1", "bob", now),
        );
        let outcomes = [a.unwrap(), b.unwrap()];
        let wins = outcomes
            .iter()
            .filter(|o| **o == TransitionOutcome::Applied)
            .count();
        assert_eq!(wins, 1);

        let resolved_by = store
            .get_notification_by_id("n1")
            .await
            .unwrap()
            .unwrap()
            .resolved_by
            .unwrap();
        assert!(resolved_by == "alice" || resolved_by == "bob");
    }
}
