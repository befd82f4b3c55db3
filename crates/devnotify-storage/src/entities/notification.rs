use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub source: String,
    pub service: String,
    pub category: String,
    pub notification_type: String,
    pub severity: i32,
    pub title: String,
    pub description: String,
    pub created_at: DateTimeWithTimeZone,
    pub project_id: String,
    pub integration_id: Option<String>,
    /// JSON array of strings.
    pub tags: String,
    pub is_read: bool,
    pub resolved: bool,
    pub resolved_at: Option<DateTimeWithTimeZone>,
    pub resolved_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
