//! Pattern detection: groups notifications by (service, category) and
//! surfaces recurring, escalating, and common-error signatures.
//!
//! The detector is pure with respect to its input set. Callers recompute
//! after any change to the set; nothing here is incremental or stateful.

use std::collections::{BTreeMap, HashSet};

use chrono::Duration;
use devnotify_common::types::{
    Category, Notification, NotificationPattern, NotificationType, PatternSeverity, PatternType,
};

#[derive(Debug, Clone)]
pub struct PatternConfig {
    /// Recurring when occurrences span at least this many distinct days.
    pub min_distinct_days: usize,
    /// ... or when this many occurrences fall within `burst_window`.
    pub burst_min: usize,
    pub burst_window: Duration,
    /// Number of most recent occurrences examined for an escalation trend.
    pub escalation_len: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_distinct_days: 3,
            burst_min: 2,
            burst_window: Duration::hours(24),
            escalation_len: 3,
        }
    }
}

/// Static suggestion text per pattern type. Deliberately not computed from
/// payload content.
pub fn suggestion_for(pattern_type: PatternType) -> &'static str {
    match pattern_type {
        PatternType::Recurring => {
            "This notification keeps coming back. Review the service configuration or add an automated remediation."
        }
        PatternType::Escalating => {
            "Severity is trending upward. Investigate now, before the next occurrence becomes critical."
        }
        PatternType::CommonError => {
            "Multiple notifications share the same error text. Look for a single root cause."
        }
    }
}

/// Detect all patterns in the given set. Output order is deterministic:
/// groups sorted by (service, category), rule order fixed within a group.
pub fn detect_patterns(
    notifications: &[Notification],
    config: &PatternConfig,
) -> Vec<NotificationPattern> {
    let mut groups: BTreeMap<(String, Category), Vec<&Notification>> = BTreeMap::new();
    for n in notifications {
        groups
            .entry((n.service.clone(), n.category))
            .or_default()
            .push(n);
    }

    let mut patterns = Vec::new();
    for ((service, category), mut group) in groups {
        group.sort_by_key(|n| n.created_at);

        if let Some(p) = recurring_pattern(&service, category, &group, config) {
            patterns.push(p);
        }
        if let Some(p) = escalating_pattern(&service, category, &group, config) {
            patterns.push(p);
        }
        patterns.extend(common_error_patterns(&service, category, &group));
    }
    patterns
}

fn recurring_pattern(
    service: &str,
    category: Category,
    group: &[&Notification],
    config: &PatternConfig,
) -> Option<NotificationPattern> {
    if group.len() < 2 {
        return None;
    }
    let distinct_days: HashSet<_> = group.iter().map(|n| n.created_at.date_naive()).collect();
    // windows(0) panics; a zero burst_min means every occurrence counts
    let burst = group
        .windows(config.burst_min.max(1))
        .any(|w| w[w.len() - 1].created_at - w[0].created_at <= config.burst_window);
    if distinct_days.len() >= config.min_distinct_days || burst {
        Some(build_pattern(PatternType::Recurring, service, category, group))
    } else {
        None
    }
}

fn escalating_pattern(
    service: &str,
    category: Category,
    group: &[&Notification],
    config: &PatternConfig,
) -> Option<NotificationPattern> {
    if group.len() < config.escalation_len {
        return None;
    }
    let recent = &group[group.len() - config.escalation_len..];
    let non_decreasing = recent.windows(2).all(|w| w[0].severity <= w[1].severity);
    let strictly_rising = recent[recent.len() - 1].severity > recent[0].severity;
    if non_decreasing && strictly_rising {
        Some(build_pattern(PatternType::Escalating, service, category, recent))
    } else {
        None
    }
}

fn common_error_patterns(
    service: &str,
    category: Category,
    group: &[&Notification],
) -> Vec<NotificationPattern> {
    let mut by_description: BTreeMap<String, Vec<&Notification>> = BTreeMap::new();
    for n in group {
        if matches!(
            n.notification_type,
            NotificationType::Critical | NotificationType::Warning
        ) {
            by_description
                .entry(n.description.trim().to_lowercase())
                .or_default()
                .push(n);
        }
    }
    by_description
        .into_values()
        .filter(|bucket| bucket.len() >= 2)
        .map(|bucket| build_pattern(PatternType::CommonError, service, category, &bucket))
        .collect()
}

fn build_pattern(
    pattern_type: PatternType,
    service: &str,
    category: Category,
    related: &[&Notification],
) -> NotificationPattern {
    let last_occurrence = related
        .iter()
        .map(|n| n.created_at)
        .max()
        .unwrap_or_default();
    let frequency = related.len();
    NotificationPattern {
        pattern_type,
        service: service.to_string(),
        category,
        frequency,
        last_occurrence,
        related_notifications: related.iter().map(|n| n.id.clone()).collect(),
        severity: derive_severity(related, frequency),
        suggestion: suggestion_for(pattern_type).to_string(),
    }
}

/// High if any related severity is 4+ or the pattern fired 10+ times;
/// medium if it fired 5+ times or any severity is 3+; else low.
fn derive_severity(related: &[&Notification], frequency: usize) -> PatternSeverity {
    let max_severity = related.iter().map(|n| n.severity).max().unwrap_or(0);
    if max_severity >= 4 || frequency >= 10 {
        PatternSeverity::High
    } else if frequency >= 5 || max_severity >= 3 {
        PatternSeverity::Medium
    } else {
        PatternSeverity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn notification(
        id: &str,
        service: &str,
        notification_type: NotificationType,
        severity: u8,
        description: &str,
        created_at: DateTime<Utc>,
    ) -> Notification {
        Notification {
            id: id.to_string(),
            source: service.to_lowercase(),
            service: service.to_string(),
            category: Category::Infrastructure,
            notification_type,
            severity,
            title: format!("{service} {id}"),
            description: description.to_string(),
            created_at,
            project_id: "proj-1".to_string(),
            integration_id: None,
            tags: vec![],
            is_read: false,
            resolved: false,
            resolved_at: None,
            resolved_by: None,
        }
    }

    fn base() -> DateTime<Utc> {
        "2024-03-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn should_detect_recurring_across_distinct_days() {
        let t = base();
        let list = vec![
            notification("n1", "Docker", NotificationType::Info, 1, "restart", t),
            notification(
                "n2",
                "Docker",
                NotificationType::Info,
                1,
                "restart",
                t + Duration::days(2),
            ),
            notification(
                "n3",
                "Docker",
                NotificationType::Info,
                1,
                "restart",
                t + Duration::days(4),
            ),
        ];
        let patterns = detect_patterns(&list, &PatternConfig::default());
        let recurring: Vec<_> = patterns
            .iter()
            .filter(|p| p.pattern_type == PatternType::Recurring)
            .collect();
        assert_eq!(recurring.len(), 1);
        assert_eq!(recurring[0].frequency, 3);
        assert_eq!(recurring[0].last_occurrence, t + Duration::days(4));
    }

    #[test]
    fn should_detect_recurring_within_a_day() {
        let t = base();
        let list = vec![
            notification("n1", "Docker", NotificationType::Info, 1, "restart", t),
            notification(
                "n2",
                "Docker",
                NotificationType::Info,
                1,
                "restart",
                t + Duration::hours(3),
            ),
        ];
        let patterns = detect_patterns(&list, &PatternConfig::default());
        assert!(patterns
            .iter()
            .any(|p| p.pattern_type == PatternType::Recurring));
    }

    #[test]
    fn should_not_flag_sparse_occurrences_as_recurring() {
        let t = base();
        let list = vec![
            notification("n1", "Docker", NotificationType::Info, 1, "restart", t),
            notification(
                "n2",
                "Docker",
                NotificationType::Info,
                1,
                "restart",
                t + Duration::days(2),
            ),
        ];
        let patterns = detect_patterns(&list, &PatternConfig::default());
        assert!(!patterns
            .iter()
            .any(|p| p.pattern_type == PatternType::Recurring));
    }

    #[test]
    fn should_detect_escalating_trend() {
        let t = base();
        let list = vec![
            notification("n1", "AWS EC2", NotificationType::Info, 1, "cpu", t),
            notification(
                "n2",
                "AWS EC2",
                NotificationType::Warning,
                3,
                "cpu",
                t + Duration::days(2),
            ),
            notification(
                "n3",
                "AWS EC2",
                NotificationType::Critical,
                5,
                "cpu high",
                t + Duration::days(4),
            ),
        ];
        let patterns = detect_patterns(&list, &PatternConfig::default());
        let escalating: Vec<_> = patterns
            .iter()
            .filter(|p| p.pattern_type == PatternType::Escalating)
            .collect();
        assert_eq!(escalating.len(), 1);
        assert_eq!(escalating[0].frequency, 3);
        assert_eq!(escalating[0].severity, PatternSeverity::High);
    }

    #[test]
    fn should_not_flag_flat_or_decreasing_severities_as_escalating() {
        let t = base();
        let flat = vec![
            notification("n1", "AWS EC2", NotificationType::Warning, 3, "cpu", t),
            notification(
                "n2",
                "AWS EC2",
                NotificationType::Warning,
                3,
                "cpu",
                t + Duration::days(2),
            ),
            notification(
                "n3",
                "AWS EC2",
                NotificationType::Warning,
                3,
                "cpu",
                t + Duration::days(4),
            ),
        ];
        let patterns = detect_patterns(&flat, &PatternConfig::default());
        assert!(!patterns
            .iter()
            .any(|p| p.pattern_type == PatternType::Escalating));
    }

    #[test]
    fn should_group_common_errors_by_normalized_description() {
        let t = base();
        let list = vec![
            notification(
                "n1",
                "Docker",
                NotificationType::Critical,
                5,
                "Connection refused",
                t,
            ),
            notification(
                "n2",
                "Docker",
                NotificationType::Warning,
                3,
                "  connection REFUSED ",
                t + Duration::hours(1),
            ),
            // info-level text never forms a common-error pattern
            notification(
                "n3",
                "Docker",
                NotificationType::Info,
                1,
                "connection refused",
                t + Duration::hours(2),
            ),
        ];
        let patterns = detect_patterns(&list, &PatternConfig::default());
        let common: Vec<_> = patterns
            .iter()
            .filter(|p| p.pattern_type == PatternType::CommonError)
            .collect();
        assert_eq!(common.len(), 1);
        assert_eq!(common[0].frequency, 2);
        assert!(common[0].related_notifications.contains(&"n1".to_string()));
        assert!(common[0].related_notifications.contains(&"n2".to_string()));
    }

    #[test]
    fn should_keep_frequency_equal_to_related_count() {
        let t = base();
        let mut list = Vec::new();
        for i in 0..6 {
            list.push(notification(
                &format!("n{i}"),
                "GitHub",
                NotificationType::Info,
                1,
                "push",
                t + Duration::days(i),
            ));
        }
        let patterns = detect_patterns(&list, &PatternConfig::default());
        assert!(!patterns.is_empty());
        for p in &patterns {
            assert_eq!(p.frequency, p.related_notifications.len());
            for id in &p.related_notifications {
                let related = list.iter().find(|n| &n.id == id).unwrap();
                assert_eq!(related.service, p.service);
                assert_eq!(related.category, p.category);
            }
        }
    }

    #[test]
    fn should_derive_pattern_severity_from_frequency_and_severities() {
        let t = base();
        let low = vec![
            notification("n1", "Docker", NotificationType::Info, 1, "a", t),
            notification("n2", "Docker", NotificationType::Info, 1, "a", t + Duration::hours(1)),
        ];
        let p = detect_patterns(&low, &PatternConfig::default());
        assert_eq!(p[0].severity, PatternSeverity::Low);

        let medium = vec![
            notification("n1", "Docker", NotificationType::Warning, 3, "a", t),
            notification("n2", "Docker", NotificationType::Info, 1, "a", t + Duration::hours(1)),
        ];
        let p = detect_patterns(&medium, &PatternConfig::default());
        assert_eq!(p[0].severity, PatternSeverity::Medium);

        let mut many = Vec::new();
        for i in 0..10 {
            many.push(notification(
                &format!("n{i}"),
                "Docker",
                NotificationType::Info,
                1,
                "a",
                t + Duration::minutes(i),
            ));
        }
        let p = detect_patterns(&many, &PatternConfig::default());
        assert_eq!(p[0].severity, PatternSeverity::High);
    }

    #[test]
    fn should_return_no_patterns_for_empty_input() {
        assert!(detect_patterns(&[], &PatternConfig::default()).is_empty());
    }

    #[test]
    fn should_tolerate_zero_burst_min() {
        let t = base();
        let list = vec![
            notification("n1", "Docker", NotificationType::Info, 1, "restart", t),
            notification(
                "n2",
                "Docker",
                NotificationType::Info,
                1,
                "restart",
                t + Duration::days(2),
            ),
        ];
        let config = PatternConfig {
            burst_min: 0,
            ..Default::default()
        };
        let patterns = detect_patterns(&list, &config);
        assert!(patterns
            .iter()
            .any(|p| p.pattern_type == PatternType::Recurring));
    }
}
