use crate::infrastructure::error::AppError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable mapping from string keys to JSON text. A save fully overwrites
/// the prior value for the key.
pub trait KeyValueStore: Send + Sync {
    fn save(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn load(&self, key: &str) -> Result<Option<String>, AppError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, AppError> {
        Connection::open(&self.db_path).map_err(AppError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        let connection = self.connect()?;
        let value: Option<String> = connection
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn save(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| AppError::State(format!("kv store lock poisoned: {error}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self
            .entries
            .lock()
            .map_err(|error| AppError::State(format!("kv store lock poisoned: {error}")))?;
        Ok(entries.get(key).cloned())
    }
}

/// Reads and deserializes the value stored under `key`. An absent key,
/// a read failure or malformed JSON all fall back to the default value.
pub fn load_or_default<T: DeserializeOwned + Default>(storage: &dyn KeyValueStore, key: &str) -> T {
    match storage.load(key) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
        _ => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::initialize_database;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "studytrack-kv-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            let path = dir.join("store.sqlite");
            initialize_database(&path).expect("initialize database");
            Self { dir, path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn sqlite_store_roundtrips_and_overwrites() {
        let database = TempDatabase::new();
        let store = SqliteKeyValueStore::new(&database.path);

        assert_eq!(store.load("tasks").expect("load"), None);

        store.save("tasks", "[1,2,3]").expect("save");
        assert_eq!(store.load("tasks").expect("load"), Some("[1,2,3]".to_string()));

        store.save("tasks", "[]").expect("overwrite");
        assert_eq!(store.load("tasks").expect("load"), Some("[]".to_string()));
    }

    #[test]
    fn in_memory_store_roundtrips() {
        let store = InMemoryKeyValueStore::default();
        store.save("settings", "{}").expect("save");
        assert_eq!(store.load("settings").expect("load"), Some("{}".to_string()));
        assert_eq!(store.load("missing").expect("load"), None);
    }

    #[test]
    fn load_or_default_recovers_from_missing_key() {
        let store = InMemoryKeyValueStore::default();
        let loaded: Vec<u32> = load_or_default(&store, "tasks");
        assert!(loaded.is_empty());
    }

    #[test]
    fn load_or_default_recovers_from_malformed_json() {
        let store = InMemoryKeyValueStore::default();
        store.save("tasks", "{not json").expect("save");
        let loaded: Vec<u32> = load_or_default(&store, "tasks");
        assert!(loaded.is_empty());
    }
}
