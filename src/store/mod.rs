//! Durable key-value store
//!
//! The store is the only state that survives a restart: watched apps,
//! canonical app records, last-change stamps and every TTL cache entry
//! live here as JSON strings under namespaced keys (see [`keys`]).

pub mod keys;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;

pub use sqlite::SqliteStore;

type Result<T> = std::result::Result<T, StoreError>;

/// String-keyed persistence with NotFound-on-miss semantics.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, failing with [`StoreError::NotFound`] when absent
    async fn get(&self, key: &str) -> Result<String>;

    /// Insert or replace a value
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete one key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Delete every key starting with `prefix`, returning the count removed
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    /// Summary of what the store holds
    async fn stats(&self) -> Result<StoreStats>;
}

/// Read a key, mapping NotFound to `None` and propagating everything else.
pub async fn get_optional(store: &dyn KeyValueStore, key: &str) -> Result<Option<String>> {
    match store.get(key).await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Statistics about store state
#[derive(Debug)]
pub struct StoreStats {
    pub total_entries: usize,
    pub total_size_bytes: usize,
    pub oldest_update: Option<i64>,
    pub newest_update: Option<i64>,
}
