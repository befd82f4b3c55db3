pub mod integration;
pub mod notification;
pub mod project;
pub mod team;
