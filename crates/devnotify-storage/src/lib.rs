//! Durable keyed storage for notifications, projects, teams and
//! integrations, backed by SQLite through SeaORM.
//!
//! The store is the only shared mutable resource in the pipeline; every
//! component goes through this interface rather than holding its own cache
//! as the record of truth.

pub mod entities;
pub mod store;

pub use store::{
    IntegrationFilter, NotificationFilter, ProjectAlertCounts, Store, TransitionOutcome,
};
