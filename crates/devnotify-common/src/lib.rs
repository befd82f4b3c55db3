pub mod id;
pub mod timefmt;
pub mod types;
