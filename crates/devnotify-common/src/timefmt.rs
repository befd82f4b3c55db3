//! Relative-time display strings derived from a creation instant.
//!
//! The display string is never persisted; it is recomputed from
//! `created_at` every time a notification is read.

use chrono::{DateTime, Utc};

/// Format the distance between `instant` and `now` as a coarse
/// human-readable string, e.g. "5 minutes ago".
///
/// Instants in the future (clock skew between producers) render as
/// "just now" rather than a negative duration.
pub fn relative_from(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - instant).num_seconds();
    if secs < 60 {
        return "just now".to_string();
    }
    let minutes = secs / 60;
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }
    let days = hours / 24;
    if days < 30 {
        return plural(days, "day");
    }
    instant.format("%Y-%m-%d").to_string()
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
