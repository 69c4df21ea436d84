use crate::domain::models::{calendar_day, Priority, Session, Settings, Task, Theme, DEFAULT_CATEGORY};
use crate::infrastructure::error::AppError;
use crate::infrastructure::kv_store::{load_or_default, KeyValueStore};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const TASKS_KEY: &str = "tasks";
pub const SESSIONS_KEY: &str = "sessions";
pub const SETTINGS_KEY: &str = "settings";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Owns the ordered task collection. The stored sequence is the manual
/// order; derived sorted views never write back into it. Every mutation
/// persists the full collection before returning.
pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Arc<dyn KeyValueStore>,
}

impl TaskStore {
    pub fn new(initial: Vec<Task>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            tasks: initial,
            storage,
        }
    }

    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let initial = load_or_default(storage.as_ref(), TASKS_KEY);
        Self::new(initial, storage)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn first_incomplete(&self) -> Option<&Task> {
        self.tasks.iter().find(|task| !task.completed)
    }

    pub fn create(
        &mut self,
        text: &str,
        due_date: Option<NaiveDate>,
        category: &str,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<Task, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("task text must not be empty".to_string()));
        }

        let category = category.trim();
        let task = Task {
            id: next_id("tsk"),
            text: text.to_string(),
            due_date,
            category: if category.is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category.to_string()
            },
            priority,
            completed: false,
            created_at: now,
            completed_at: None,
        };

        self.tasks.push(task.clone());
        self.persist()?;
        Ok(task)
    }

    /// Flips completion and maintains the completed-at timestamp.
    /// An absent id is a silent no-op.
    pub fn toggle_complete(&mut self, task_id: &str, now: DateTime<Utc>) -> Result<Option<Task>, AppError> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == task_id) else {
            return Ok(None);
        };

        task.completed = !task.completed;
        task.completed_at = task.completed.then_some(now);
        let toggled = task.clone();
        self.persist()?;
        Ok(Some(toggled))
    }

    /// Idempotent; deleting an absent id changes nothing.
    pub fn delete(&mut self, task_id: &str) -> Result<bool, AppError> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        if self.tasks.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Repositions tasks to match the given full or partial id sequence.
    /// Unknown ids are ignored; unmentioned tasks keep their relative
    /// order after the mentioned ones.
    pub fn reorder(&mut self, sequence: &[String]) -> Result<(), AppError> {
        let position: HashMap<&str, usize> = sequence
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect();

        let mut mentioned = Vec::new();
        let mut unmentioned = Vec::new();
        for task in self.tasks.drain(..) {
            if position.contains_key(task.id.as_str()) {
                mentioned.push(task);
            } else {
                unmentioned.push(task);
            }
        }
        mentioned.sort_by_key(|task| position[task.id.as_str()]);

        self.tasks = mentioned;
        self.tasks.extend(unmentioned);
        self.persist()
    }

    fn persist(&self) -> Result<(), AppError> {
        let raw = serde_json::to_string(&self.tasks)?;
        self.storage.save(TASKS_KEY, &raw)
    }
}

/// Append-only record of completed focus sessions.
pub struct SessionStore {
    sessions: Vec<Session>,
    storage: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(initial: Vec<Session>, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            sessions: initial,
            storage,
        }
    }

    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let initial = load_or_default(storage.as_ref(), SESSIONS_KEY);
        Self::new(initial, storage)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn record_completion(
        &mut self,
        duration_minutes: u32,
        linked_task: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let session = Session {
            id: next_id("ses"),
            duration_minutes,
            completed_at: now,
            linked_task,
        };
        self.sessions.push(session.clone());
        self.persist()?;
        Ok(session)
    }

    /// Sessions completed on the current calendar day, by date equality
    /// rather than a rolling 24-hour window.
    pub fn todays_sessions(&self, now: &DateTime<FixedOffset>) -> Vec<Session> {
        let today = now.date_naive();
        self.sessions
            .iter()
            .filter(|session| calendar_day(session.completed_at, now) == today)
            .cloned()
            .collect()
    }

    /// The most recent `count` of today's sessions, oldest first.
    pub fn recent_sessions(&self, now: &DateTime<FixedOffset>, count: usize) -> Vec<Session> {
        let todays = self.todays_sessions(now);
        let start = todays.len().saturating_sub(count);
        todays[start..].to_vec()
    }

    fn persist(&self) -> Result<(), AppError> {
        let raw = serde_json::to_string(&self.sessions)?;
        self.storage.save(SESSIONS_KEY, &raw)
    }
}

/// User preferences; persisted as a single JSON object.
pub struct SettingsStore {
    settings: Settings,
    storage: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(initial: Settings, storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            settings: initial,
            storage,
        }
    }

    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let initial = load_or_default(storage.as_ref(), SETTINGS_KEY);
        Self::new(initial, storage)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<Settings, AppError> {
        self.settings.theme = theme;
        self.persist()?;
        Ok(self.settings.clone())
    }

    pub fn set_focus_duration(&mut self, minutes: u32) -> Result<Settings, AppError> {
        if minutes == 0 {
            return Err(AppError::Validation(
                "focus duration must be a positive number of minutes".to_string(),
            ));
        }
        self.settings.focus_duration_minutes = minutes;
        self.persist()?;
        Ok(self.settings.clone())
    }

    fn persist(&self) -> Result<(), AppError> {
        let raw = serde_json::to_string(&self.settings)?;
        self.storage.save(SETTINGS_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kv_store::InMemoryKeyValueStore;

    fn storage() -> Arc<dyn KeyValueStore> {
        Arc::new(InMemoryKeyValueStore::default())
    }

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn fixed_now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-02-16T12:00:00+00:00").expect("valid datetime")
    }

    #[test]
    fn create_appends_an_incomplete_task() {
        let mut store = TaskStore::load(storage());
        let created = store
            .create("Read chapter 4", None, "science", Priority::High, Utc::now())
            .expect("create task");

        assert_eq!(store.tasks().len(), 1);
        assert!(!created.completed);
        assert_eq!(created.completed_at, None);
        assert_eq!(created.category, "science");
    }

    #[test]
    fn create_rejects_whitespace_text() {
        let mut store = TaskStore::load(storage());
        let result = store.create("   ", None, "math", Priority::Medium, Utc::now());
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn blank_category_defaults_to_general() {
        let mut store = TaskStore::load(storage());
        let created = store
            .create("Flashcards", None, "  ", Priority::Low, Utc::now())
            .expect("create task");
        assert_eq!(created.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn task_ids_are_unique() {
        let mut store = TaskStore::load(storage());
        let first = store
            .create("One", None, "", Priority::Medium, Utc::now())
            .expect("create task");
        let second = store
            .create("Two", None, "", Priority::Medium, Utc::now())
            .expect("create task");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn toggle_twice_restores_original_state() {
        let mut store = TaskStore::load(storage());
        let created = store
            .create("Essay outline", None, "english", Priority::Medium, Utc::now())
            .expect("create task");

        let done = store
            .toggle_complete(&created.id, fixed_time("2026-02-16T10:00:00Z"))
            .expect("toggle")
            .expect("task found");
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(fixed_time("2026-02-16T10:00:00Z")));

        let undone = store
            .toggle_complete(&created.id, fixed_time("2026-02-16T11:00:00Z"))
            .expect("toggle")
            .expect("task found");
        assert!(!undone.completed);
        assert_eq!(undone.completed_at, None);
    }

    #[test]
    fn toggle_absent_id_is_a_silent_no_op() {
        let mut store = TaskStore::load(storage());
        let result = store.toggle_complete("missing", Utc::now()).expect("toggle");
        assert_eq!(result, None);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = TaskStore::load(storage());
        let created = store
            .create("Lab report", None, "science", Priority::High, Utc::now())
            .expect("create task");

        assert!(store.delete(&created.id).expect("first delete"));
        assert!(!store.delete(&created.id).expect("second delete"));
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn reorder_applies_partial_sequences_and_ignores_unknown_ids() {
        let mut store = TaskStore::load(storage());
        let a = store.create("A", None, "", Priority::Medium, Utc::now()).expect("a");
        let b = store.create("B", None, "", Priority::Medium, Utc::now()).expect("b");
        let c = store.create("C", None, "", Priority::Medium, Utc::now()).expect("c");

        store
            .reorder(&[c.id.clone(), "ghost".to_string(), a.id.clone()])
            .expect("reorder");

        let order = store.tasks().iter().map(|task| task.id.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec![c.id.as_str(), a.id.as_str(), b.id.as_str()]);
    }

    #[test]
    fn tasks_roundtrip_through_storage() {
        let shared = storage();
        let mut store = TaskStore::load(Arc::clone(&shared));
        store
            .create("Persisted", Some(NaiveDate::from_ymd_opt(2026, 3, 1).expect("date")), "math", Priority::High, Utc::now())
            .expect("create task");
        store.create("Second", None, "", Priority::Low, Utc::now()).expect("create task");

        let reloaded = TaskStore::load(shared);
        assert_eq!(reloaded.tasks(), store.tasks());
    }

    #[test]
    fn sessions_record_and_query_by_day() {
        let shared = storage();
        let mut store = SessionStore::load(Arc::clone(&shared));

        store
            .record_completion(25, None, fixed_time("2026-02-15T22:00:00Z"))
            .expect("yesterday");
        store
            .record_completion(25, Some("tsk-1".to_string()), fixed_time("2026-02-16T09:00:00Z"))
            .expect("today early");
        store
            .record_completion(50, None, fixed_time("2026-02-16T11:00:00Z"))
            .expect("today late");

        let todays = store.todays_sessions(&fixed_now());
        assert_eq!(todays.len(), 2);

        let recent = store.recent_sessions(&fixed_now(), 1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].duration_minutes, 50);

        let reloaded = SessionStore::load(shared);
        assert_eq!(reloaded.sessions(), store.sessions());
    }

    #[test]
    fn recent_sessions_keep_chronological_order() {
        let mut store = SessionStore::load(storage());
        store.record_completion(10, None, fixed_time("2026-02-16T08:00:00Z")).expect("s1");
        store.record_completion(20, None, fixed_time("2026-02-16T09:00:00Z")).expect("s2");
        store.record_completion(30, None, fixed_time("2026-02-16T10:00:00Z")).expect("s3");

        let recent = store.recent_sessions(&fixed_now(), 2);
        assert_eq!(
            recent.iter().map(|session| session.duration_minutes).collect::<Vec<_>>(),
            vec![20, 30]
        );
    }

    #[test]
    fn settings_update_and_roundtrip() {
        let shared = storage();
        let mut store = SettingsStore::load(Arc::clone(&shared));
        assert_eq!(store.settings(), &Settings::default());

        store.set_theme(Theme::Dark).expect("set theme");
        store.set_focus_duration(50).expect("set duration");

        let reloaded = SettingsStore::load(shared);
        assert_eq!(reloaded.settings().theme, Theme::Dark);
        assert_eq!(reloaded.settings().focus_duration_minutes, 50);
    }

    #[test]
    fn settings_reject_zero_duration() {
        let mut store = SettingsStore::load(storage());
        let result = store.set_focus_duration(0);
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.settings().focus_duration_minutes, 25);
    }
}
