//! # Persisted State
//!
//! The app keeps three values between launches: the pace scalar, the visit
//! collection (a JSON array) and the avatar image reference. All of them go
//! through the opaque [`KeyValueStore`] contract; the services that own the
//! values decide how to encode them and how to recover from bad data.
//!
//! Two stores are provided:
//! - [`MemoryStore`] - process-local, used by tests and as a last-resort fallback
//! - [`SqliteStore`] - a single `kv` table in SQLite (feature `persistence`)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::{Result, WalkError};

/// Key holding the learned pace, meters per minute, as a decimal string.
pub const PACE_KEY: &str = "pace_m_per_min_v1";
/// Key holding the visit collection as a JSON array.
pub const VISITS_KEY: &str = "VISITS_V1";
/// Key holding the avatar image reference.
pub const AVATAR_KEY: &str = "DOG_PROFILE_IMAGE_URI";

/// Opaque string key-value persistence.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| WalkError::persistence("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// SQLite-backed store with a single key-value table.
#[cfg(feature = "persistence")]
pub struct SqliteStore {
    db: Mutex<rusqlite::Connection>,
}

#[cfg(feature = "persistence")]
impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = rusqlite::Connection::open(db_path).map_err(WalkError::persistence)?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &rusqlite::Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
        "#,
        )
        .map_err(WalkError::persistence)
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let db = self
            .db
            .lock()
            .map_err(|_| WalkError::persistence("sqlite store lock poisoned"))?;
        f(&db).map_err(WalkError::persistence)
    }
}

#[cfg(feature = "persistence")]
impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;

        self.with_db(|db| {
            db.query_row(
                "SELECT value FROM kv WHERE key = ?",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_db(|db| {
            db.execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, strftime('%s', 'now'))",
                rusqlite::params![key, value],
            )
            .map(|_| ())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_db(|db| {
            db.execute("DELETE FROM kv WHERE key = ?", rusqlite::params![key])
                .map(|_| ())
        })
    }
}

/// Avatar image reference shown on the map marker.
pub struct AvatarStore {
    store: Arc<dyn KeyValueStore>,
}

impl AvatarStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The saved reference, if any. Read failures count as no avatar.
    pub fn load(&self) -> Option<String> {
        match self.store.get(AVATAR_KEY) {
            Ok(uri) => uri.filter(|u| !u.is_empty()),
            Err(e) => {
                warn!("[AvatarStore] Failed to load avatar reference: {}", e);
                None
            }
        }
    }

    pub fn save(&self, uri: &str) -> Result<()> {
        self.store.set(AVATAR_KEY, uri)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(AVATAR_KEY)
    }
}
