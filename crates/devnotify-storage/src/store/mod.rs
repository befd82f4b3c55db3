use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod integration;
pub mod notification;
pub mod project;
pub mod team;

pub use integration::IntegrationFilter;
pub use notification::NotificationFilter;
pub use project::ProjectAlertCounts;

/// Outcome of a monotonic state transition (mark-as-read, resolve).
///
/// `AlreadyDone` is the idempotent no-op case: the record exists and was
/// transitioned earlier, and none of its transition metadata was touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    AlreadyDone,
    NotFound,
}

/// Unified access layer for the dashboard database.
///
/// All methods are `async fn` over SeaORM + SQLite.
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// Connect and initialize the database.
    ///
    /// `db_url` is a full connection URL, e.g.
    /// `sqlite:///data/devnotify.db?mode=rwc`. Migrations run on every
    /// startup so the schema is always current.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        // WAL mode only applies to SQLite
        if db_url.starts_with("sqlite:") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;
        tracing::info!("database schema up to date");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Store;
    use tempfile::TempDir;

    pub async fn setup() -> (TempDir, Store) {
        devnotify_common::id::init(1, 1);
        let dir = TempDir::new().unwrap();
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("devnotify.db").display());
        let store = Store::new(&db_url).await.unwrap();
        (dir, store)
    }
}
