//! Read-only views over the notification set: filtering, aggregation, and
//! pattern detection.
//!
//! Everything here is pure and synchronous. Identical inputs yield identical
//! outputs; the only instant that matters is the one the caller passes in.

pub mod filter;
pub mod pattern;

pub use filter::{counts_by_category, filter_by, stats, FilterCriteria};
pub use pattern::{detect_patterns, suggestion_for, PatternConfig};
