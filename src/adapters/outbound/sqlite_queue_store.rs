//! SQLite Queue Store
//!
//! Implements QueueStore on a single key-value table. Each queue is stored
//! as one JSON array, so every `set` replaces the whole sequence atomically.

use crate::domain::entities::DeferredRequest;
use crate::domain::errors::StoreError;
use crate::domain::ports::QueueStore;
use crate::domain::value_objects::QueueKey;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";

/// SQLite-backed queue store.
///
/// Blocking SQLite calls run on the blocking thread pool.
pub struct SqliteQueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQueueStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        Self::init(conn)
    }

    /// Private in-memory database (tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode = WAL;").map_err(backend)?;
        conn.execute(SCHEMA, []).map_err(backend)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn load(conn: &Connection, key: QueueKey) -> Result<Option<String>, StoreError> {
        conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![key.as_str()],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(backend)
    }

    fn store(conn: &Connection, key: QueueKey, value: &str) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key.as_str(), value],
        )
        .map_err(backend)?;
        Ok(())
    }
}

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn get(&self, key: QueueKey) -> Result<Option<Vec<DeferredRequest>>, StoreError> {
        let conn = self.conn.clone();
        let raw = tokio::task::spawn_blocking(move || Self::load(&conn.lock(), key))
            .await
            .map_err(|e| StoreError::Backend(format!("spawn_blocking error: {}", e)))??;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: QueueKey, records: &[DeferredRequest]) -> Result<(), StoreError> {
        let json = serde_json::to_string(records)?;
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || Self::store(&conn.lock(), key, &json))
            .await
            .map_err(|e| StoreError::Backend(format!("spawn_blocking error: {}", e)))?
    }
}
