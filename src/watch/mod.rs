//! Watch-set configuration persisted in the durable store
//!
//! The document lives under the `config` key as a JSON object whose `apps`
//! array is the watch set; any other keys are free-form scalars set through
//! [`WatchConfigCache::set`]. The in-memory copy is reloaded from the store
//! on the first read after any mutation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{ConfigError, Result};
use crate::store::{self, KeyValueStore, keys};

const APPS_KEY: &str = "apps";

/// Persisted watch configuration document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchConfig {
    doc: Map<String, Value>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        let mut doc = Map::new();
        doc.insert(APPS_KEY.to_string(), Value::Array(Vec::new()));
        Self { doc }
    }
}

impl WatchConfig {
    /// Watched app ids, in insertion order. Non-string entries are skipped.
    pub fn apps(&self) -> Vec<String> {
        self.doc
            .get(APPS_KEY)
            .and_then(Value::as_array)
            .map(|apps| {
                apps.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.doc.get(key)
    }

    /// Append `value` to the array at `key`, creating the array if needed.
    fn push_unique(&mut self, key: &str, value: Value) -> Result<()> {
        let entry = self
            .doc
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        let Value::Array(items) = entry else {
            return Err(ConfigError::Invalid(format!("{} is not a list", key)).into());
        };

        if items.contains(&value) {
            let shown = value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Err(ConfigError::DuplicateWatchEntry(shown).into());
        }

        items.push(value);
        Ok(())
    }

    fn remove_from(&mut self, key: &str, value: &Value) -> bool {
        match self.doc.get_mut(key) {
            Some(Value::Array(items)) => {
                let before = items.len();
                items.retain(|v| v != value);
                items.len() != before
            }
            _ => false,
        }
    }
}

struct CachedConfig {
    config: WatchConfig,
    invalid: bool,
}

/// Owner of the watch configuration.
///
/// Mutations are read-modify-write against the store and mark the cached
/// copy invalid, so the next [`get`](Self::get) re-reads what was persisted.
/// Writers in other processes are not coordinated with; the last write wins.
pub struct WatchConfigCache {
    store: Arc<dyn KeyValueStore>,
    state: Mutex<CachedConfig>,
}

impl WatchConfigCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            state: Mutex::new(CachedConfig {
                config: WatchConfig::default(),
                invalid: true,
            }),
        }
    }

    /// Current configuration, reloading if invalidated
    pub async fn get(&self) -> Result<WatchConfig> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;
        Ok(state.config.clone())
    }

    /// Watched app ids
    pub async fn apps(&self) -> Result<Vec<String>> {
        Ok(self.get().await?.apps())
    }

    /// Force the next read to go to the store
    pub async fn invalidate(&self) {
        self.state.lock().await.invalid = true;
    }

    /// Apply `f` to the current configuration and persist the result.
    ///
    /// Nothing is written if `f` fails.
    pub async fn mutate<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut WatchConfig) -> Result<()>,
    {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let mut next = state.config.clone();
        f(&mut next)?;

        let raw = serde_json::to_string(&next)?;
        self.store.put(keys::CONFIG, &raw).await?;
        state.invalid = true;
        Ok(())
    }

    /// Append `value` to the list at `key`; fails if already present
    pub async fn add_array_element(&self, key: &str, value: Value) -> Result<()> {
        self.mutate(|config| config.push_unique(key, value)).await
    }

    /// Start watching an app; fails with `DuplicateWatchEntry` if already watched
    pub async fn add_app(&self, app_id: &str) -> Result<()> {
        self.add_array_element(APPS_KEY, Value::String(app_id.to_string()))
            .await
    }

    /// Stop watching an app, returning whether it was watched
    pub async fn remove_app(&self, app_id: &str) -> Result<bool> {
        let mut removed = false;
        let target = Value::String(app_id.to_string());
        self.mutate(|config| {
            removed = config.remove_from(APPS_KEY, &target);
            Ok(())
        })
        .await?;
        Ok(removed)
    }

    /// Replace the value stored at `key`
    pub async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.mutate(|config| {
            config.doc.insert(key.to_string(), value);
            Ok(())
        })
        .await
    }

    async fn ensure_loaded(&self, state: &mut CachedConfig) -> Result<()> {
        if !state.invalid {
            return Ok(());
        }

        state.config = match store::get_optional(self.store.as_ref(), keys::CONFIG).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Stored watch config is unreadable ({}), starting empty", e);
                WatchConfig::default()
            }),
            None => WatchConfig::default(),
        };
        state.invalid = false;
        Ok(())
    }
}
