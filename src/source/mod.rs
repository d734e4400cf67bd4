//! App metadata sources
//!
//! Each source turns an app id into an [`AppRecord`]. Sources are tried in
//! order by a [`SourceChain`] until one succeeds; later sources are the
//! fallbacks for earlier ones.

pub mod apkpure;
pub mod appbrain;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result, SourceError};
use crate::models::AppRecord;

pub use apkpure::ApkPureSource;
pub use appbrain::AppBrainSource;

/// A single upstream that can describe an app
#[async_trait]
pub trait AppSource: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Fetch the current listing for `app_id`
    async fn attempt(&self, app_id: &str) -> Result<AppRecord>;

    /// Concrete version string for apps whose listing shows
    /// "Varies with device". `None` when this source cannot tell.
    async fn device_version(&self, _app_id: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Ordered list of sources tried until one succeeds
#[derive(Clone)]
pub struct SourceChain {
    sources: Vec<Arc<dyn AppSource>>,
    /// Why the last resolution of an app fell back to a minimal record
    exhausted: Arc<Mutex<HashMap<String, String>>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Arc<dyn AppSource>>) -> Self {
        Self {
            sources,
            exhausted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Names of the configured sources, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolve `app_id` through the chain.
    ///
    /// A failing source hands over to the next one. When everything fails:
    /// - a real error from a fallback source is returned;
    /// - if the fallbacks were merely unconfigured, a minimal record with
    ///   only the id is returned instead.
    ///
    /// Store failures are never masked by falling back. The first source
    /// error behind a minimal record is kept for [`Self::exhaustion_reason`].
    pub async fn resolve(&self, app_id: &str) -> Result<AppRecord> {
        let mut fallback_error: Option<Error> = None;
        let mut first_error: Option<String> = None;

        for (position, source) in self.sources.iter().enumerate() {
            match source.attempt(app_id).await {
                Ok(record) => {
                    self.note_exhausted(app_id, None);
                    return Ok(record);
                }
                Err(e @ Error::Store(_)) => return Err(e),
                Err(Error::Source(SourceError::NotConfigured(name))) => {
                    log::debug!("Skipping {} for {}: not configured", name, app_id);
                }
                Err(e) => {
                    log::error!("Error querying {} for {}: {}", source.name(), app_id, e);
                    first_error.get_or_insert_with(|| e.to_string());
                    if position > 0 {
                        fallback_error = Some(e);
                    }
                }
            }
        }

        match fallback_error {
            Some(e) => Err(e),
            None => {
                log::warn!("No source could describe {}, keeping a minimal record", app_id);
                let reason = first_error.unwrap_or_else(|| "no source is configured".to_string());
                self.note_exhausted(app_id, Some(reason));
                Ok(AppRecord::minimal(app_id))
            }
        }
    }

    /// Source error behind the last minimal record produced for `app_id`.
    /// Cleared once a source answers again.
    pub fn exhaustion_reason(&self, app_id: &str) -> Option<String> {
        self.exhausted
            .lock()
            .ok()
            .and_then(|reasons| reasons.get(app_id).cloned())
    }

    fn note_exhausted(&self, app_id: &str, reason: Option<String>) {
        let Ok(mut reasons) = self.exhausted.lock() else {
            return;
        };
        match reason {
            Some(reason) => {
                reasons.insert(app_id.to_string(), reason);
            }
            None => {
                reasons.remove(app_id);
            }
        }
    }

    /// Ask each source in turn for a device-specific version
    pub async fn device_version(&self, app_id: &str) -> Result<Option<String>> {
        for source in &self.sources {
            if let Some(version) = source.device_version(app_id).await? {
                return Ok(Some(version));
            }
        }
        Ok(None)
    }
}
