//! TTL memoisation over the durable store
//!
//! [`TtlCache::wrap`] wraps an async producer: a fresh entry is served from
//! the store, anything else invokes the producer once and persists its
//! result with an expiry. A producer yielding no result leaves a tombstone
//! (`expiresAt = 0`, no data), which is always a miss on the next read.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{Result, StoreError};
use crate::store::{self, KeyValueStore};

/// Cache TTL configuration per data type
pub struct CacheTtl;

impl CacheTtl {
    /// Fully resolved app record - the sweep runs hourly, manual refreshes
    /// inside this window reuse the last resolution
    pub const RESOLVED_APP: Duration = Duration::from_secs(2 * 60); // 2 min

    /// AppBrain allows ~500 calls a month, keep these to a minimum
    pub const APPBRAIN: Duration = Duration::from_secs(24 * 60 * 60); // 24 hr

    // APKPure pages
    pub const APKPURE_SEARCH: Duration = Duration::from_secs(24 * 60 * 60); // 24 hr
    pub const APKPURE_DETAIL: Duration = Duration::from_secs(60 * 60); // 1 hr
}

/// Stored cache entry.
///
/// An entry is fresh while `expires_at > now` (epoch milliseconds); one
/// expiring exactly now is already a miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub expires_at: i64,
}

impl CacheEntry {
    /// Entry recording that the producer had nothing to return
    pub fn tombstone() -> Self {
        Self {
            data: None,
            expires_at: 0,
        }
    }

    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}

/// Memoising wrapper over a [`KeyValueStore`].
///
/// Two concurrent misses on the same key both run the producer; the last
/// write wins.
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
}

impl TtlCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Return the fresh cached value for `key`, or run `producer` and cache
    /// what it yields for `ttl`.
    ///
    /// `Ok(None)` means the producer had no result; that outcome is
    /// tombstoned rather than cached, so the next call asks again. Producer
    /// errors and store failures other than NotFound propagate.
    pub async fn wrap<T, F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        if let Some(entry) = self.lookup(key).await? {
            if entry.is_fresh_at(now_ms()) {
                match entry.data.map(serde_json::from_value::<T>).transpose() {
                    Ok(value) => {
                        log::debug!("Cache hit: {}", key);
                        return Ok(value);
                    }
                    Err(e) => log::debug!("Cached {} has unexpected shape ({}), refetching", key, e),
                }
            }
        }

        log::debug!("Cache miss: {}", key);
        let Some(value) = producer().await? else {
            self.write(key, &CacheEntry::tombstone()).await?;
            return Ok(None);
        };

        let data = serde_json::to_value(&value)?;
        let entry = CacheEntry {
            data: Some(data.clone()),
            expires_at: now_ms() + ttl.as_millis() as i64,
        };
        self.write(key, &entry).await?;

        // Hand back the serialized form so a miss looks exactly like a hit
        Ok(Some(serde_json::from_value(data)?))
    }

    /// Read and parse an entry; NotFound and unparsable entries are misses.
    async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some(raw) = store::get_optional(self.store.as_ref(), key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                log::debug!("Ignoring unparsable cache entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let raw = serde_json::to_string(entry)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.put(key, &raw).await?;
        Ok(())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, SourceError};
    use crate::store::{SqliteStore, StoreStats};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Payload {
        version: String,
        tags: Vec<String>,
    }

    fn payload(version: &str) -> Payload {
        Payload {
            version: version.to_string(),
            tags: vec!["a".to_string()],
        }
    }

    fn produced(p: Payload) -> Result<Option<Payload>> {
        Ok(Some(p))
    }

    fn nothing() -> Result<Option<Payload>> {
        Ok(None)
    }

    fn test_cache() -> (TtlCache, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (TtlCache::new(store.clone()), store)
    }

    /// Store that fails every operation with a non-NotFound error
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> std::result::Result<String, StoreError> {
            Err(StoreError::Io("disk on fire".to_string()))
        }
        async fn put(&self, _key: &str, _value: &str) -> std::result::Result<(), StoreError> {
            Err(StoreError::Io("disk on fire".to_string()))
        }
        async fn delete(&self, _key: &str) -> std::result::Result<bool, StoreError> {
            Ok(false)
        }
        async fn delete_prefix(&self, _prefix: &str) -> std::result::Result<usize, StoreError> {
            Ok(0)
        }
        async fn stats(&self) -> std::result::Result<StoreStats, StoreError> {
            Err(StoreError::Io("disk on fire".to_string()))
        }
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_a_hit() {
        let (cache, _store) = test_cache();
        let calls = AtomicUsize::new(0);

        let first = cache
            .wrap("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                produced(payload("1.0"))
            })
            .await
            .unwrap();
        let second = cache
            .wrap("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                produced(payload("2.0"))
            })
            .await
            .unwrap();

        assert_eq!(first, Some(payload("1.0")));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_never_a_hit() {
        let (cache, store) = test_cache();
        let stale = CacheEntry {
            data: Some(serde_json::to_value(payload("old")).unwrap()),
            expires_at: now_ms() - 1_000,
        };
        store
            .put("k", &serde_json::to_string(&stale).unwrap())
            .await
            .unwrap();

        for _ in 0..2 {
            let calls = AtomicUsize::new(0);
            let value = cache
                .wrap("k", Duration::from_secs(0), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    produced(payload("new"))
                })
                .await
                .unwrap();
            assert_eq!(value, Some(payload("new")));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_entry_expiring_now_is_stale() {
        let entry = CacheEntry {
            data: Some(serde_json::json!(1)),
            expires_at: 5_000,
        };

        assert!(entry.is_fresh_at(4_999));
        assert!(!entry.is_fresh_at(5_000));
        assert!(!entry.is_fresh_at(5_001));
        assert!(!CacheEntry::tombstone().is_fresh_at(0));
    }

    #[tokio::test]
    async fn test_no_result_leaves_tombstone_and_is_retried() {
        let (cache, store) = test_cache();
        let calls = AtomicUsize::new(0);

        let first: Option<Payload> = cache
            .wrap("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                nothing()
            })
            .await
            .unwrap();
        assert_eq!(first, None);

        let raw = store.get("k").await.unwrap();
        let entry: CacheEntry = serde_json::from_str(&raw).unwrap();
        assert_eq!(entry.expires_at, 0);
        assert!(entry.data.is_none());

        let second = cache
            .wrap("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                produced(payload("1.0"))
            })
            .await
            .unwrap();
        assert_eq!(second, Some(payload("1.0")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stored_entry_uses_epoch_millis() {
        let (cache, store) = test_cache();
        let before = now_ms();

        cache
            .wrap("k", Duration::from_secs(120), || async { produced(payload("1.0")) })
            .await
            .unwrap();

        let entry: CacheEntry = serde_json::from_str(&store.get("k").await.unwrap()).unwrap();
        assert!(entry.expires_at >= before + 120_000);
        assert!(entry.expires_at <= now_ms() + 120_000);
    }

    #[tokio::test]
    async fn test_unparsable_entry_is_a_miss() {
        let (cache, store) = test_cache();
        store.put("k", "not json").await.unwrap();

        let value = cache
            .wrap("k", Duration::from_secs(60), || async { produced(payload("1.0")) })
            .await
            .unwrap();

        assert_eq!(value, Some(payload("1.0")));
    }

    #[tokio::test]
    async fn test_producer_error_propagates_without_writing() {
        let (cache, store) = test_cache();

        let result = cache
            .wrap("k", Duration::from_secs(60), || async {
                Err::<Option<Payload>, Error>(SourceError::Network("down".to_string()).into())
            })
            .await;

        assert!(matches!(result, Err(Error::Source(_))));
        assert!(store.get("k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let cache = TtlCache::new(Arc::new(BrokenStore));
        let calls = AtomicUsize::new(0);

        let result = cache
            .wrap("k", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                produced(payload("1.0"))
            })
            .await;

        assert!(matches!(result, Err(Error::Store(StoreError::Io(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tombstone_is_never_fresh() {
        assert!(!CacheEntry::tombstone().is_fresh_at(now_ms()));
    }
}
