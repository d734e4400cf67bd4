//! SQLite-backed key-value store

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{KeyValueStore, StoreStats};
use crate::error::StoreError;

/// Schema version - increment to trigger nuke-and-rebuild
const SCHEMA_VERSION: i32 = 1;

const DB_FILE: &str = "store.db";

type Result<T> = std::result::Result<T, StoreError>;

/// Key-value store persisted in a single SQLite table.
///
/// The connection is wrapped in a Mutex so the store can be shared across
/// tasks; every call holds the lock only for one statement.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create the store inside `dir`
    pub fn open_at(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| StoreError::Io(format!("Failed to create store dir: {}", e)))?;

        let db_path = dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |r| r.get(0))
            .unwrap_or(0);

        if version != 0 && version != SCHEMA_VERSION {
            log::info!(
                "Store schema version mismatch ({} != {}), rebuilding",
                version,
                SCHEMA_VERSION
            );
            drop(conn);
            std::fs::remove_file(&db_path)
                .map_err(|e| StoreError::Io(format!("Failed to remove store DB: {}", e)))?;
            return Self::open_at(dir);
        }

        Self::init(conn, Some(db_path))
    }

    /// Open a throwaway in-memory store
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Location of the database file (`None` for in-memory stores)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Io("store connection lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<String> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()?
        .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = self.lock()?;
        // substr instead of LIKE: key prefixes contain `_`
        let deleted = conn.execute(
            "DELETE FROM kv WHERE substr(key, 1, length(?1)) = ?1",
            [prefix],
        )?;
        Ok(deleted)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let (total, size, oldest, newest): (i64, i64, Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(length(value)), 0), MIN(updated_at), MAX(updated_at)
                 FROM kv",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )?;

        Ok(StoreStats {
            total_entries: total as usize,
            total_size_bytes: size as usize,
            oldest_update: oldest,
            newest_update: newest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open_at(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_get() {
        let (store, _dir) = test_store();

        store.put("key1", r#"{"a":1}"#).await.unwrap();

        assert_eq!(store.get("key1").await.unwrap(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let (store, _dir) = test_store();

        let err = store.get("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let (store, _dir) = test_store();

        store.put("k", "first").await.unwrap();
        store.put("k", "second").await.unwrap();

        assert_eq!(store.get("k").await.unwrap(), "second");
        assert_eq!(store.stats().await.unwrap().total_entries, 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = SqliteStore::open_at(dir.path()).unwrap();
            store.put("config", r#"{"apps":[]}"#).await.unwrap();
        }

        let store = SqliteStore::open_at(dir.path()).unwrap();
        assert_eq!(store.get("config").await.unwrap(), r#"{"apps":[]}"#);
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _dir) = test_store();

        store.put("k", "v").await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(store.get("k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_prefix_treats_underscore_literally() {
        let (store, _dir) = test_store();

        store.put("gdata_a", "1").await.unwrap();
        store.put("gdata_b", "2").await.unwrap();
        store.put("gdataXc", "3").await.unwrap();
        store.put("app_a", "4").await.unwrap();

        let removed = store.delete_prefix("gdata_").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get("gdataXc").await.is_ok());
        assert!(store.get("app_a").await.is_ok());
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, _dir) = test_store();

        store.put("k1", "data1").await.unwrap();
        store.put("k2", "data2").await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_size_bytes, 10);
        assert!(stats.oldest_update.is_some());
        assert!(stats.newest_update >= stats.oldest_update);
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let store = SqliteStore::in_memory().unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_size_bytes, 0);
        assert!(stats.oldest_update.is_none());
    }
}
