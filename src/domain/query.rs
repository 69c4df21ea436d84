use crate::domain::models::Task;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    All,
    Active,
    Completed,
    Overdue,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        }
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        Self::All
    }
}

/// Derived view over a task snapshot: status filter, then case-insensitive
/// search over text and category, then priority sort with newest-first
/// tie-break. The input order is never written back; the stored manual
/// order stays authoritative for the unsorted listing.
pub fn filter_and_sort(
    tasks: &[Task],
    filter: StatusFilter,
    search: &str,
    now: DateTime<FixedOffset>,
) -> Vec<Task> {
    let today = now.date_naive();
    let query = search.trim().to_lowercase();

    let mut selected = tasks
        .iter()
        .filter(|task| match filter {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
            StatusFilter::Overdue => task.is_overdue(today),
        })
        .filter(|task| {
            query.is_empty()
                || task.text.to_lowercase().contains(&query)
                || task.category.to_lowercase().contains(&query)
        })
        .cloned()
        .collect::<Vec<_>>();

    selected.sort_by(|left, right| {
        left.priority
            .rank()
            .cmp(&right.priority.rank())
            .then_with(|| right.created_at.cmp(&left.created_at))
    });
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Priority;
    use chrono::{Duration, NaiveDate, Utc};
    use proptest::prelude::*;

    fn fixed_now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-02-16T12:00:00+00:00").expect("valid datetime")
    }

    fn task(id: &str, text: &str, priority: Priority, due: Option<NaiveDate>, completed: bool) -> Task {
        let created_at = fixed_now().with_timezone(&Utc) - Duration::hours(id.len() as i64);
        Task {
            id: id.to_string(),
            text: text.to_string(),
            due_date: due,
            category: "General".to_string(),
            priority,
            completed,
            created_at,
            completed_at: completed.then(|| fixed_now().with_timezone(&Utc)),
        }
    }

    #[test]
    fn all_filter_sorts_by_priority_then_newest() {
        let yesterday = fixed_now().date_naive() - Duration::days(1);
        let tasks = vec![
            task("b", "B", Priority::Low, None, false),
            task("a", "A", Priority::High, Some(yesterday), false),
        ];

        let view = filter_and_sort(&tasks, StatusFilter::All, "", fixed_now());
        assert_eq!(
            view.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["A", "B"]
        );

        let overdue = filter_and_sort(&tasks, StatusFilter::Overdue, "", fixed_now());
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].text, "A");
    }

    #[test]
    fn equal_priority_breaks_tie_newest_first() {
        let base = fixed_now().with_timezone(&Utc);
        let mut older = task("old", "Older", Priority::Medium, None, false);
        older.created_at = base - Duration::hours(2);
        let mut newer = task("new", "Newer", Priority::Medium, None, false);
        newer.created_at = base - Duration::hours(1);

        let view = filter_and_sort(&[older, newer], StatusFilter::All, "", fixed_now());
        assert_eq!(
            view.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["Newer", "Older"]
        );
    }

    #[test]
    fn search_matches_text_or_category_case_insensitive() {
        let mut history = task("h", "Essay draft", Priority::Medium, None, false);
        history.category = "History".to_string();
        let math = task("m", "Integrals", Priority::Medium, None, false);

        let tasks = vec![history, math];
        let by_category = filter_and_sort(&tasks, StatusFilter::All, "hIsToRy", fixed_now());
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].text, "Essay draft");

        let by_text = filter_and_sort(&tasks, StatusFilter::All, "integrals", fixed_now());
        assert_eq!(by_text.len(), 1);

        let everything = filter_and_sort(&tasks, StatusFilter::All, "   ", fixed_now());
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn active_and_completed_filters_split_the_set() {
        let tasks = vec![
            task("a", "Open", Priority::Medium, None, false),
            task("b", "Done", Priority::Medium, None, true),
        ];

        let active = filter_and_sort(&tasks, StatusFilter::Active, "", fixed_now());
        assert_eq!(active.len(), 1);
        assert!(!active[0].completed);

        let completed = filter_and_sort(&tasks, StatusFilter::Completed, "", fixed_now());
        assert_eq!(completed.len(), 1);
        assert!(completed[0].completed);
    }

    #[test]
    fn no_match_returns_empty_vec() {
        let tasks = vec![task("a", "Open", Priority::Medium, None, false)];
        let view = filter_and_sort(&tasks, StatusFilter::All, "zzz", fixed_now());
        assert!(view.is_empty());
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = fixed_now().date_naive();
        let tasks = vec![task("a", "Due today", Priority::Medium, Some(today), false)];
        let overdue = filter_and_sort(&tasks, StatusFilter::Overdue, "", fixed_now());
        assert!(overdue.is_empty());
    }

    proptest! {
        #[test]
        fn overdue_never_returns_completed_or_undated(
            seeds in proptest::collection::vec((any::<bool>(), any::<bool>(), 0i64..40), 0..24)
        ) {
            let today = fixed_now().date_naive();
            let tasks = seeds
                .iter()
                .enumerate()
                .map(|(index, (completed, has_due, days_back))| {
                    let due = has_due.then(|| today - Duration::days(*days_back));
                    task(&format!("t{index}"), "t", Priority::Medium, due, *completed)
                })
                .collect::<Vec<_>>();

            let view = filter_and_sort(&tasks, StatusFilter::Overdue, "", fixed_now());
            for selected in view {
                prop_assert!(!selected.completed);
                prop_assert!(selected.due_date.is_some());
                prop_assert!(selected.due_date.expect("due") < today);
            }
        }
    }
}
