use crate::domain::models::{calendar_day, Session, Task};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::HashSet;

/// Streak lookback window; a streak can never exceed this many days.
pub const STREAK_WINDOW_DAYS: i64 = 30;

pub const DEFAULT_SUBJECTS: [&str; 4] = ["math", "science", "english", "history"];

pub fn progress_percent(tasks: &[Task]) -> u32 {
    if tasks.is_empty() {
        return 0;
    }
    let completed = tasks.iter().filter(|task| task.completed).count();
    ((completed as f64 / tasks.len() as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MotivationTier {
    NoTasks,
    Beginning,
    Started,
    Halfway,
    AlmostThere,
    Complete,
}

impl MotivationTier {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoTasks => "Start adding tasks!",
            Self::Beginning => "Just beginning? Every step counts!",
            Self::Started => "Getting started! Push forward!",
            Self::Halfway => "Halfway! You've got this!",
            Self::AlmostThere => "Almost there! Keep going!",
            Self::Complete => "All done! Amazing!",
        }
    }

    /// The rendering collaborator owns the celebration effect itself.
    pub fn is_celebration(self) -> bool {
        self == Self::Complete
    }
}

pub fn motivation_tier(percent: u32, has_any_task: bool) -> MotivationTier {
    if !has_any_task {
        MotivationTier::NoTasks
    } else if percent >= 100 {
        MotivationTier::Complete
    } else if percent >= 75 {
        MotivationTier::AlmostThere
    } else if percent >= 50 {
        MotivationTier::Halfway
    } else if percent >= 25 {
        MotivationTier::Started
    } else {
        MotivationTier::Beginning
    }
}

/// Consecutive active days walking back from today. A day is active when a
/// task or a session was completed on that calendar date. An inactive today
/// does not end the walk; any older gap does.
pub fn streak(tasks: &[Task], sessions: &[Session], now: DateTime<FixedOffset>) -> u32 {
    let active_days = active_days(tasks, sessions, &now);
    let today = now.date_naive();

    let mut count = 0;
    for offset in 0..STREAK_WINDOW_DAYS {
        let day = today - Duration::days(offset);
        if active_days.contains(&day) {
            count += 1;
        } else if offset > 0 {
            break;
        }
    }
    count
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubjectStats {
    pub subject: String,
    pub completed: usize,
    pub total: usize,
    pub percent: u32,
}

pub fn subject_breakdown(tasks: &[Task], subjects: &[&str]) -> Vec<SubjectStats> {
    subjects
        .iter()
        .map(|subject| {
            let in_subject = tasks
                .iter()
                .filter(|task| task.category.eq_ignore_ascii_case(subject))
                .collect::<Vec<_>>();
            let total = in_subject.len();
            let completed = in_subject.iter().filter(|task| task.completed).count();
            let percent = if total == 0 {
                0
            } else {
                ((completed as f64 / total as f64) * 100.0).round() as u32
            };
            SubjectStats {
                subject: (*subject).to_string(),
                completed,
                total,
                percent,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub focus_minutes: u64,
    pub completed_tasks: usize,
}

/// The last seven calendar days, oldest first.
pub fn weekly_series(tasks: &[Task], sessions: &[Session], now: DateTime<FixedOffset>) -> Vec<DayActivity> {
    let today = now.date_naive();
    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let focus_minutes = sessions
                .iter()
                .filter(|session| calendar_day(session.completed_at, &now) == date)
                .map(|session| u64::from(session.duration_minutes))
                .sum();
            let completed_tasks = tasks
                .iter()
                .filter(|task| {
                    task.completed_at
                        .is_some_and(|at| calendar_day(at, &now) == date)
                })
                .count();
            DayActivity {
                date,
                focus_minutes,
                completed_tasks,
            }
        })
        .collect()
}

fn active_days(tasks: &[Task], sessions: &[Session], now: &DateTime<FixedOffset>) -> HashSet<NaiveDate> {
    let mut days = HashSet::new();
    for task in tasks {
        if let Some(at) = task.completed_at {
            days.insert(calendar_day(at, now));
        }
    }
    for session in sessions {
        days.insert(calendar_day(session.completed_at, now));
    }
    days
}
