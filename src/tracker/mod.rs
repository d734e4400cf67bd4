//! Per-app resolution: source chain, last-change bookkeeping and the
//! "Varies with device" fix-up, memoised for a short window.

mod recorder;

pub use recorder::ChangeRecorder;

use std::sync::Arc;

use crate::cache::{CacheTtl, TtlCache};
use crate::error::Result;
use crate::models::AppRecord;
use crate::notify::NotificationQueue;
use crate::source::SourceChain;
use crate::store::{KeyValueStore, keys};

pub struct AppTracker {
    cache: TtlCache,
    chain: SourceChain,
    recorder: ChangeRecorder,
}

impl AppTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, chain: SourceChain, queue: NotificationQueue) -> Self {
        Self {
            cache: TtlCache::new(store.clone()),
            chain,
            recorder: ChangeRecorder::new(store, queue),
        }
    }

    /// Resolve `app_id` and record any version change.
    ///
    /// Repeat calls inside [`CacheTtl::RESOLVED_APP`] return the memoised
    /// record without touching the sources or the recorder.
    pub async fn resolve(&self, app_id: &str) -> Result<AppRecord> {
        let resolved = self
            .cache
            .wrap(&keys::resolved(app_id), CacheTtl::RESOLVED_APP, || async {
                self.resolve_uncached(app_id).await.map(Some)
            })
            .await?;

        Ok(resolved.unwrap_or_else(|| AppRecord::minimal(app_id)))
    }

    async fn resolve_uncached(&self, app_id: &str) -> Result<AppRecord> {
        let mut record = self.chain.resolve(app_id).await?;
        record.last_changed = self.recorder.last_changed(app_id).await?;

        if record.has_ambiguous_version() {
            self.normalize_version(&mut record).await?;
        }

        log::info!(
            "Updated app {}: {}",
            app_id,
            record.version.as_deref().unwrap_or("unknown version")
        );
        self.recorder.record(record).await
    }

    /// Swap a "Varies with device" version for a concrete one when any
    /// source can supply it
    async fn normalize_version(&self, record: &mut AppRecord) -> Result<()> {
        log::info!("Resolving device-specific version for {}", record.id);
        match self.chain.device_version(&record.id).await? {
            Some(version) => record.version = Some(version),
            None => log::warn!(
                "No concrete version for {}, keeping {:?}",
                record.id,
                record.version
            ),
        }
        Ok(())
    }

    /// Why `app_id` last resolved to a minimal record, if it did
    pub fn exhaustion_reason(&self, app_id: &str) -> Option<String> {
        self.chain.exhaustion_reason(app_id)
    }

    /// Persisted records for `apps`, most recently changed first.
    /// Apps never resolved are left out.
    pub async fn latest(&self, apps: &[String]) -> Result<Vec<AppRecord>> {
        let mut records = Vec::with_capacity(apps.len());
        for app_id in apps {
            if let Some(record) = self.recorder.stored(app_id).await? {
                records.push(record);
            }
        }
        // None sorts last
        records.sort_by(|a, b| b.last_changed.cmp(&a.last_changed));
        Ok(records)
    }

    /// Persisted record for a single app
    pub async fn latest_for(&self, app_id: &str) -> Result<Option<AppRecord>> {
        self.recorder.stored(app_id).await
    }
}
