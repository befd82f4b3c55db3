//! Conjunctive filtering and aggregation over a notification slice.

use chrono::{DateTime, Utc};
use devnotify_common::types::{
    Category, CategoryCounts, Notification, NotificationStats, NotificationType,
};

/// Filter criteria, combined with AND. An absent criterion constrains
/// nothing; `FilterCriteria::default()` matches every notification.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    pub categories: Option<Vec<Category>>,
    pub types: Option<Vec<NotificationType>>,
    pub services: Option<Vec<String>>,
    pub severities: Option<Vec<u8>>,
    pub resolved: Option<bool>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match against title, description and
    /// service. The derived relative-time string is never searched.
    pub search: Option<String>,
    pub project_id: Option<String>,
}

impl FilterCriteria {
    pub fn matches(&self, n: &Notification) -> bool {
        if let Some(categories) = &self.categories {
            if !categories.contains(&n.category) {
                return false;
            }
        }
        if let Some(types) = &self.types {
            if !types.contains(&n.notification_type) {
                return false;
            }
        }
        if let Some(services) = &self.services {
            if !services.iter().any(|s| s == &n.service) {
                return false;
            }
        }
        if let Some(severities) = &self.severities {
            if !severities.contains(&n.severity) {
                return false;
            }
        }
        if let Some(resolved) = self.resolved {
            if n.resolved != resolved {
                return false;
            }
        }
        if let Some(from) = self.from {
            if n.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if n.created_at > to {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let haystack = format!("{} {} {}", n.title, n.description, n.service).to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        if let Some(project_id) = &self.project_id {
            if &n.project_id != project_id {
                return false;
            }
        }
        true
    }
}

/// Keep the subsequence satisfying all criteria, preserving input order.
pub fn filter_by<'a>(
    notifications: &'a [Notification],
    criteria: &FilterCriteria,
) -> Vec<&'a Notification> {
    notifications.iter().filter(|n| criteria.matches(n)).collect()
}

/// Counts per category within the given scope. All five categories are
/// always present, zero-filled.
pub fn counts_by_category(notifications: &[Notification], project_id: Option<&str>) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for n in scoped(notifications, project_id) {
        counts.bump(n.category);
    }
    counts
}

/// Headline tallies. `critical` and `warning` count by type; a resolved
/// critical notification counts in both `critical` and `resolved`.
pub fn stats(notifications: &[Notification], project_id: Option<&str>) -> NotificationStats {
    let mut out = NotificationStats::default();
    for n in scoped(notifications, project_id) {
        out.total += 1;
        match n.notification_type {
            NotificationType::Critical => out.critical += 1,
            NotificationType::Warning => out.warning += 1,
            _ => {}
        }
        if n.resolved {
            out.resolved += 1;
        }
    }
    out
}

fn scoped<'a>(
    notifications: &'a [Notification],
    project_id: Option<&'a str>,
) -> impl Iterator<Item = &'a Notification> {
    notifications
        .iter()
        .filter(move |n| project_id.map_or(true, |p| n.project_id == p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn notification(
        id: &str,
        service: &str,
        category: Category,
        notification_type: NotificationType,
        severity: u8,
        created_at: DateTime<Utc>,
    ) -> Notification {
        Notification {
            id: id.to_string(),
            source: service.to_lowercase(),
            service: service.to_string(),
            category,
            notification_type,
            severity,
            title: format!("{service} event {id}"),
            description: "something happened".to_string(),
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

    fn sample() -> Vec<Notification> {
        let t0 = Utc::now() - Duration::hours(10);
        let mut list = vec![
            notification("n1", "GitHub", Category::CiCd, NotificationType::Info, 1, t0),
            notification(
                "n2",
                "Docker",
                Category::Infrastructure,
                NotificationType::Warning,
                3,
                t0 + Duration::hours(1),
            ),
            notification(
                "n3",
                "AWS EC2",
                Category::Infrastructure,
                NotificationType::Critical,
                5,
                t0 + Duration::hours(2),
            ),
            notification(
                "n4",
                "GitHub",
                Category::CiCd,
                NotificationType::Success,
                2,
                t0 + Duration::hours(3),
            ),
        ];
        list[2].resolved = true;
        list[2].resolved_at = Some(t0 + Duration::hours(4));
        list[2].resolved_by = Some("alice".to_string());
        list[3].project_id = "proj-2".to_string();
        list
    }

    #[test]
    fn should_return_everything_in_order_for_empty_criteria() {
        let list = sample();
        let out = filter_by(&list, &FilterCriteria::default());
        let ids: Vec<&str> = out.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3", "n4"]);
    }

    #[test]
    fn should_apply_criteria_as_conjunction() {
        let list = sample();
        let criteria = FilterCriteria {
            categories: Some(vec![Category::Infrastructure]),
            types: Some(vec![NotificationType::Critical]),
            ..Default::default()
        };
        let out = filter_by(&list, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "n3");
    }

    #[test]
    fn should_search_case_insensitively() {
        let list = sample();
        let criteria = FilterCriteria {
            search: Some("aws ec2".to_string()),
            ..Default::default()
        };
        let out = filter_by(&list, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "n3");
    }

    #[test]
    fn should_treat_date_range_as_inclusive() {
        let list = sample();
        let criteria = FilterCriteria {
            from: Some(list[1].created_at),
            to: Some(list[2].created_at),
            ..Default::default()
        };
        let ids: Vec<&str> = filter_by(&list, &criteria)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["n2", "n3"]);
    }

    #[test]
    fn should_scope_by_project() {
        let list = sample();
        let criteria = FilterCriteria {
            project_id: Some("proj-2".to_string()),
            ..Default::default()
        };
        let out = filter_by(&list, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "n4");
    }

    #[test]
    fn should_filter_by_resolved_flag() {
        let list = sample();
        let criteria = FilterCriteria {
            resolved: Some(true),
            ..Default::default()
        };
        let out = filter_by(&list, &criteria);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "n3");
    }

    #[test]
    fn should_zero_fill_category_counts_and_sum_to_total() {
        let list = sample();
        let counts = counts_by_category(&list, None);
        assert_eq!(counts.infrastructure, 2);
        assert_eq!(counts.ci_cd, 2);
        assert_eq!(counts.security, 0);
        assert_eq!(counts.database, 0);
        assert_eq!(counts.application, 0);
        assert_eq!(counts.total(), list.len() as u64);

        let scoped = counts_by_category(&list, Some("proj-2"));
        assert_eq!(scoped.ci_cd, 1);
        assert_eq!(scoped.total(), 1);
    }

    #[test]
    fn should_count_resolved_and_critical_non_exclusively() {
        let list = sample();
        let s = stats(&list, None);
        assert_eq!(s.total, 4);
        // n3 is critical AND resolved; it counts in both tallies
        assert_eq!(s.critical, 1);
        assert_eq!(s.warning, 1);
        assert_eq!(s.resolved, 1);
    }
}
