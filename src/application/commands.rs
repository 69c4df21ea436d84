use crate::application::bootstrap::bootstrap_workspace;
use crate::application::export::render_report;
use crate::application::stores::{SessionStore, SettingsStore, TaskStore};
use crate::application::timer::{FocusTimer, TickOutcome, TimerPhase};
use crate::domain::models::{Priority, Session, Settings, Task, Theme};
use crate::domain::query::{filter_and_sort, StatusFilter};
use crate::domain::stats::{
    motivation_tier, progress_percent, streak, subject_breakdown, weekly_series, DayActivity,
    MotivationTier, SubjectStats, DEFAULT_SUBJECTS,
};
use crate::infrastructure::error::AppError;
use crate::infrastructure::kv_store::SqliteKeyValueStore;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Which part of the runtime a mutation touched. Rendering collaborators
/// subscribe and recompute their derived views on notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    Tasks,
    Sessions,
    Settings,
    Timer,
}

type Listener = Box<dyn Fn(StoreChange) + Send + Sync>;

pub struct AppState {
    database_path: PathBuf,
    logs_dir: PathBuf,
    runtime: Mutex<RuntimeState>,
    listeners: Mutex<Vec<Listener>>,
    log_guard: Mutex<()>,
}

struct RuntimeState {
    tasks: TaskStore,
    sessions: SessionStore,
    settings: SettingsStore,
    timer: FocusTimer,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, AppError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let logs_dir = workspace_root.join("logs");

        let storage = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        let tasks = TaskStore::load(storage.clone());
        let sessions = SessionStore::load(storage.clone());
        let settings = SettingsStore::load(storage);
        let timer = FocusTimer::new(settings.settings().focus_duration_minutes);

        Ok(Self {
            database_path: bootstrap.database_path,
            logs_dir,
            runtime: Mutex::new(RuntimeState {
                tasks,
                sessions,
                settings,
                timer,
            }),
            listeners: Mutex::new(Vec::new()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Registers a store-changed listener. Listeners are called after the
    /// triggering mutation has been persisted.
    pub fn subscribe(&self, listener: impl Fn(StoreChange) + Send + Sync + 'static) {
        let Ok(mut listeners) = self.listeners.lock() else {
            return;
        };
        listeners.push(Box::new(listener));
    }

    fn notify(&self, change: StoreChange) {
        let Ok(listeners) = self.listeners.lock() else {
            return;
        };
        for listener in listeners.iter() {
            listener(change);
        }
    }

    pub fn command_error(&self, command: &str, error: &AppError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerStateResponse {
    pub phase: String,
    pub remaining_seconds: u32,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TickResponse {
    pub timer: TimerStateResponse,
    /// Present exactly when this tick expired the countdown.
    pub completed_session: Option<Session>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatisticsResponse {
    pub percent: u32,
    pub tier: MotivationTier,
    pub motivation: String,
    pub celebrate: bool,
    pub streak_days: u32,
    pub subjects: Vec<SubjectStats>,
    pub weekly: Vec<DayActivity>,
}

pub fn create_task_impl(
    state: &AppState,
    text: String,
    due_date: Option<String>,
    category: Option<String>,
    priority: Option<String>,
) -> Result<Task, AppError> {
    let due_date = parse_due_date(due_date.as_deref())?;
    let priority = match priority.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => parse_priority(raw)?,
        None => Priority::default(),
    };

    let task = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.create(
            &text,
            due_date,
            category.as_deref().unwrap_or(""),
            priority,
            Utc::now(),
        )?
    };

    state.log_info("create_task", &format!("created task_id={}", task.id));
    state.notify(StoreChange::Tasks);
    Ok(task)
}

/// The stored manual order, untouched by any derived sort.
pub fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.tasks.tasks().to_vec())
}

pub fn filter_tasks_impl(
    state: &AppState,
    filter: Option<String>,
    search: Option<String>,
) -> Result<Vec<Task>, AppError> {
    let filter = match filter.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => parse_filter(raw)?,
        None => StatusFilter::default(),
    };
    let search = search.unwrap_or_default();

    let runtime = lock_runtime(state)?;
    Ok(filter_and_sort(runtime.tasks.tasks(), filter, &search, local_now()))
}

pub fn toggle_task_impl(state: &AppState, task_id: String) -> Result<Option<Task>, AppError> {
    let toggled = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.toggle_complete(task_id.trim(), Utc::now())?
    };

    match &toggled {
        Some(task) => {
            state.log_info(
                "toggle_task",
                &format!("task_id={} completed={}", task.id, task.completed),
            );
            state.notify(StoreChange::Tasks);
        }
        None => state.log_info("toggle_task", &format!("task not found: {}", task_id.trim())),
    }
    Ok(toggled)
}

pub fn delete_task_impl(state: &AppState, task_id: String) -> Result<bool, AppError> {
    let removed = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.delete(task_id.trim())?
    };

    if removed {
        state.log_info("delete_task", &format!("deleted task_id={}", task_id.trim()));
        state.notify(StoreChange::Tasks);
    }
    Ok(removed)
}

pub fn reorder_tasks_impl(state: &AppState, ordered_ids: Vec<String>) -> Result<Vec<Task>, AppError> {
    let tasks = {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.reorder(&ordered_ids)?;
        runtime.tasks.tasks().to_vec()
    };

    state.log_info("reorder_tasks", &format!("applied sequence of {}", ordered_ids.len()));
    state.notify(StoreChange::Tasks);
    Ok(tasks)
}

pub fn todays_sessions_impl(state: &AppState) -> Result<Vec<Session>, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.sessions.todays_sessions(&local_now()))
}

pub fn recent_sessions_impl(state: &AppState, count: usize) -> Result<Vec<Session>, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.sessions.recent_sessions(&local_now(), count))
}

pub fn get_settings_impl(state: &AppState) -> Result<Settings, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.settings.settings().clone())
}

pub fn set_theme_impl(state: &AppState, theme: String) -> Result<Settings, AppError> {
    let theme = parse_theme(theme.trim())?;
    let settings = {
        let mut runtime = lock_runtime(state)?;
        runtime.settings.set_theme(theme)?
    };

    state.log_info("set_theme", &format!("theme={}", settings.theme.as_str()));
    state.notify(StoreChange::Settings);
    Ok(settings)
}

pub fn set_focus_duration_impl(state: &AppState, minutes: u32) -> Result<Settings, AppError> {
    let (settings, timer_reloaded) = {
        let mut runtime = lock_runtime(state)?;
        let settings = runtime.settings.set_focus_duration(minutes)?;
        let reloaded = runtime.timer.phase() == TimerPhase::Idle;
        runtime.timer.set_duration(minutes);
        (settings, reloaded)
    };

    state.log_info("set_focus_duration", &format!("minutes={minutes}"));
    state.notify(StoreChange::Settings);
    if timer_reloaded {
        state.notify(StoreChange::Timer);
    }
    Ok(settings)
}

pub fn get_timer_state_impl(state: &AppState) -> Result<TimerStateResponse, AppError> {
    let runtime = lock_runtime(state)?;
    Ok(to_timer_state_response(&runtime.timer))
}

pub fn start_timer_impl(state: &AppState) -> Result<TimerStateResponse, AppError> {
    let response = {
        let mut runtime = lock_runtime(state)?;
        runtime.timer.start();
        to_timer_state_response(&runtime.timer)
    };

    state.log_info("start_timer", "countdown running");
    state.notify(StoreChange::Timer);
    Ok(response)
}

pub fn pause_timer_impl(state: &AppState) -> Result<TimerStateResponse, AppError> {
    let response = {
        let mut runtime = lock_runtime(state)?;
        runtime.timer.pause();
        to_timer_state_response(&runtime.timer)
    };

    state.log_info("pause_timer", "countdown paused");
    state.notify(StoreChange::Timer);
    Ok(response)
}

pub fn reset_timer_impl(state: &AppState) -> Result<TimerStateResponse, AppError> {
    let response = {
        let mut runtime = lock_runtime(state)?;
        let configured = runtime.settings.settings().focus_duration_minutes;
        runtime.timer.reset(configured);
        to_timer_state_response(&runtime.timer)
    };

    state.log_info("reset_timer", "countdown reloaded");
    state.notify(StoreChange::Timer);
    Ok(response)
}

/// One externally scheduled one-second tick. On expiry a session is
/// recorded with the duration the countdown ran with, linked to the first
/// incomplete task when one exists.
pub fn tick_timer_impl(state: &AppState) -> Result<TickResponse, AppError> {
    let (response, timer_changed) = {
        let mut runtime = lock_runtime(state)?;
        match runtime.timer.tick() {
            TickOutcome::Inactive => (
                TickResponse {
                    timer: to_timer_state_response(&runtime.timer),
                    completed_session: None,
                },
                false,
            ),
            TickOutcome::Counting { .. } => (
                TickResponse {
                    timer: to_timer_state_response(&runtime.timer),
                    completed_session: None,
                },
                true,
            ),
            TickOutcome::Expired => {
                let duration = runtime.timer.duration_minutes();
                let linked_task = runtime.tasks.first_incomplete().map(|task| task.id.clone());
                let session = runtime
                    .sessions
                    .record_completion(duration, linked_task, Utc::now())?;
                let configured = runtime.settings.settings().focus_duration_minutes;
                runtime.timer.reset(configured);
                (
                    TickResponse {
                        timer: to_timer_state_response(&runtime.timer),
                        completed_session: Some(session),
                    },
                    true,
                )
            }
        }
    };

    if let Some(session) = &response.completed_session {
        state.log_info(
            "tick_timer",
            &format!("recorded session_id={} duration={}", session.id, session.duration_minutes),
        );
        state.notify(StoreChange::Sessions);
    }
    if timer_changed {
        state.notify(StoreChange::Timer);
    }
    Ok(response)
}

pub fn get_statistics_impl(state: &AppState) -> Result<StatisticsResponse, AppError> {
    let runtime = lock_runtime(state)?;
    let tasks = runtime.tasks.tasks();
    let sessions = runtime.sessions.sessions();
    let now = local_now();

    let percent = progress_percent(tasks);
    let tier = motivation_tier(percent, !tasks.is_empty());
    Ok(StatisticsResponse {
        percent,
        tier,
        motivation: tier.message().to_string(),
        celebrate: tier.is_celebration(),
        streak_days: streak(tasks, sessions, now),
        subjects: subject_breakdown(tasks, &DEFAULT_SUBJECTS),
        weekly: weekly_series(tasks, sessions, now),
    })
}

pub fn export_report_impl(state: &AppState) -> Result<String, AppError> {
    let report = {
        let runtime = lock_runtime(state)?;
        render_report(runtime.tasks.tasks(), runtime.sessions.sessions(), local_now())
    };

    state.log_info("export_report", "rendered snapshot report");
    Ok(report)
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, AppError> {
    state
        .runtime
        .lock()
        .map_err(|error| AppError::State(format!("runtime lock poisoned: {error}")))
}

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

fn to_timer_state_response(timer: &FocusTimer) -> TimerStateResponse {
    TimerStateResponse {
        phase: timer.phase().as_str().to_string(),
        remaining_seconds: timer.remaining_seconds(),
        duration_minutes: timer.duration_minutes(),
    }
}

fn parse_priority(value: &str) -> Result<Priority, AppError> {
    match value.to_lowercase().as_str() {
        "high" => Ok(Priority::High),
        "medium" => Ok(Priority::Medium),
        "low" => Ok(Priority::Low),
        other => Err(AppError::Validation(format!("unknown priority: {other}"))),
    }
}

fn parse_theme(value: &str) -> Result<Theme, AppError> {
    match value.to_lowercase().as_str() {
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        other => Err(AppError::Validation(format!("unknown theme: {other}"))),
    }
}

fn parse_filter(value: &str) -> Result<StatusFilter, AppError> {
    match value.to_lowercase().as_str() {
        "all" => Ok(StatusFilter::All),
        "active" => Ok(StatusFilter::Active),
        "completed" => Ok(StatusFilter::Completed),
        "overdue" => Ok(StatusFilter::Overdue),
        other => Err(AppError::Validation(format!("unknown filter: {other}"))),
    }
}

fn parse_due_date(value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    let Some(raw) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|error| AppError::Validation(format!("due date must be YYYY-MM-DD: {error}")))?;
    Ok(Some(parsed))
}
