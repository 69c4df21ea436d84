use crate::domain::models::{Session, Task};
use crate::domain::stats::{progress_percent, streak};
use chrono::{DateTime, FixedOffset};
use std::fmt::Write;

/// Plain-text snapshot report for the export collaborator. Tasks appear in
/// stored (manual) order.
pub fn render_report(tasks: &[Task], sessions: &[Session], now: DateTime<FixedOffset>) -> String {
    let today = now.date_naive();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let overdue = tasks.iter().filter(|task| task.is_overdue(today)).count();
    let total_focus_minutes: u64 = sessions
        .iter()
        .map(|session| u64::from(session.duration_minutes))
        .sum();
    let streak_days = streak(tasks, sessions, now);

    let mut report = String::new();
    let _ = writeln!(report, "Study Tracker Report");
    let _ = writeln!(report, "Generated on: {}", now.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(report);
    let _ = writeln!(
        report,
        "Summary: Total: {} | Completed: {} | Overdue: {} | Progress: {}%",
        tasks.len(),
        completed,
        overdue,
        progress_percent(tasks)
    );
    let _ = writeln!(report);
    let _ = writeln!(report, "Tasks:");
    if tasks.is_empty() {
        let _ = writeln!(report, "(none)");
    }
    for task in tasks {
        let status = if task.completed { "[x]" } else { "[ ]" };
        let due = task
            .due_date
            .map(|date| format!(" | Due: {date}"))
            .unwrap_or_default();
        let _ = writeln!(
            report,
            "{status} {} [{}] [{}]{due}",
            task.text,
            task.priority.as_str().to_uppercase(),
            task.category
        );
    }
    let _ = writeln!(report);
    let _ = writeln!(
        report,
        "Focus: Sessions: {} | Minutes: {} | Streak: {} day(s)",
        sessions.len(),
        total_focus_minutes,
        streak_days
    );
    report
}
