//! Persistent key-value storage for update state.
//!
//! The engine remembers two things across launches: whether the optional
//! patch-update prompt was already shown, and which version last ran. Any
//! backend implementing [`KeyValueStore`] can hold them; the default is a
//! single-table SQLite database.
//!
//! The database is stored in the platform data directory as `update-overlay.db`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::error::{Error, Result};

/// Sentinel key guarding the optional (patch-level) prompt
pub const AVAILABLE_UPDATE_KEY: &str = "availableUpdate";

/// Last version the app recorded as running
pub const STORED_VERSION_KEY: &str = "storedVersion";

/// Value written under [`AVAILABLE_UPDATE_KEY`] once the prompt was shown
pub const SHOWN_SENTINEL: &str = "shown";

/// Async string storage keyed by tag
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// A stored entry with its last write time
#[derive(Debug, Clone, Serialize)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed key-value store. Clones share one connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Get the database file path
    pub fn db_path() -> anyhow::Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "update-overlay", "UpdateOverlay")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(data_dir.join("update-overlay.db"))
    }

    /// Open or create the database at the default location
    pub fn open() -> anyhow::Result<Self> {
        let path = Self::db_path()?;
        Ok(Self::open_at(&path)?)
    }

    /// Open or create the database at `path`
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self::from_connection(conn)?;

        tracing::info!("Opened database at {:?}", path);
        Ok(db)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                ",
            )
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
        Ok(f(&conn)?)
    }

    /// Look up a value by key
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
    }

    /// Insert or replace a value
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)",
                params![key, value, now],
            )
        })?;
        Ok(())
    }

    /// Delete a key. Deleting a missing key is not an error.
    pub fn remove_value(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| conn.execute("DELETE FROM kv_store WHERE key = ?", params![key]))?;
        Ok(())
    }

    /// All stored entries, ordered by key
    pub fn entries(&self) -> Result<Vec<StoredEntry>> {
        let rows = self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT key, value, updated_at FROM kv_store ORDER BY key")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        Ok(rows
            .into_iter()
            .map(|(key, value, updated_at)| StoredEntry {
                key,
                value,
                updated_at: DateTime::parse_from_rfc3339(&updated_at)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_default(),
            })
            .collect())
    }

    /// Remove every entry (explicit storage reset). Returns the count removed.
    pub fn clear(&self) -> Result<usize> {
        let removed = self.with_conn(|conn| conn.execute("DELETE FROM kv_store", []))?;
        tracing::info!("Cleared {} stored entries", removed);
        Ok(removed)
    }
}

impl Database {
    /// Run a blocking call on the blocking thread pool
    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| Error::StorageUnavailable(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.run_blocking(move |db| db.get_value(&key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.run_blocking(move |db| db.set_value(&key, &value)).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.run_blocking(move |db| db.remove_value(&key)).await
    }
}

/// In-process store, lost when dropped.
///
/// Reads and writes can be made to fail to exercise degraded paths.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the stored value for `key`
    pub fn peek(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|e| Error::StorageUnavailable(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable(format!("read of {} rejected", key)));
        }
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable(format!("write of {} rejected", key)));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::StorageUnavailable(format!("remove of {} rejected", key)));
        }
        self.lock()?.remove(key);
        Ok(())
    }
}
