pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::commands::{
    create_task_impl, delete_task_impl, export_report_impl, filter_tasks_impl,
    get_settings_impl, get_statistics_impl, get_timer_state_impl, list_tasks_impl,
    pause_timer_impl, recent_sessions_impl, reorder_tasks_impl, reset_timer_impl,
    set_focus_duration_impl, set_theme_impl, start_timer_impl, tick_timer_impl,
    todays_sessions_impl, toggle_task_impl, AppState, StatisticsResponse, StoreChange,
    TickResponse, TimerStateResponse,
};
pub use application::export::render_report;
pub use application::stores::{SessionStore, SettingsStore, TaskStore};
pub use application::timer::{FocusTimer, TickOutcome, TimerPhase};
pub use domain::models::{Priority, Session, Settings, Task, Theme};
pub use domain::query::{filter_and_sort, StatusFilter};
pub use domain::stats::{
    motivation_tier, progress_percent, streak, subject_breakdown, weekly_series, DayActivity,
    MotivationTier, SubjectStats,
};
pub use infrastructure::error::AppError;
pub use infrastructure::kv_store::{InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore};
