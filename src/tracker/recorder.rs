//! Version change detection

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{AppRecord, NotificationItem};
use crate::notify::NotificationQueue;
use crate::store::{self, KeyValueStore, keys};

/// Compares freshly resolved records with the last persisted state,
/// stamps `last_changed` on a version change and queues a notification.
pub struct ChangeRecorder {
    store: Arc<dyn KeyValueStore>,
    queue: NotificationQueue,
}

impl ChangeRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>, queue: NotificationQueue) -> Self {
        Self { store, queue }
    }

    /// Persist `record` as the canonical state for its app.
    ///
    /// A first sighting or any textual difference in `version` counts as a
    /// change. The record is rewritten even when unchanged so changelog, size
    /// and the like stay fresh. Records without a version are returned
    /// untouched: an outage must not overwrite the last good state.
    pub async fn record(&self, mut record: AppRecord) -> Result<AppRecord> {
        let Some(version) = record.version.clone() else {
            log::warn!(
                "No version resolved for {}, keeping previous state",
                record.id
            );
            return Ok(record);
        };

        let previous = self.stored(&record.id).await?;
        let previous_version = previous.as_ref().and_then(|p| p.version.clone());
        let changed = previous.is_none() || previous_version.as_deref() != Some(version.as_str());

        let mut notification = None;
        if changed {
            let message = format!(
                "App {} version changed from {} to {}",
                record.id,
                previous_version.as_deref().unwrap_or("undefined"),
                version
            );
            log::warn!("{}", message);

            // Detection time, not publish time: staged rollouts publish early
            let stamp = advance(record.last_changed, Utc::now());
            self.store
                .put(&keys::last_changed(&record.id), &stamp.to_rfc3339())
                .await?;
            record.last_changed = Some(stamp);
            notification = Some(NotificationItem::new(message, record.icon.clone()));
        }

        self.store
            .put(&keys::app_record(&record.id), &serde_json::to_string(&record)?)
            .await?;

        if let Some(item) = notification {
            self.queue.enqueue(item);
        }
        Ok(record)
    }

    /// Last persisted record for `app_id`; unreadable records count as absent
    pub async fn stored(&self, app_id: &str) -> Result<Option<AppRecord>> {
        let Some(raw) = store::get_optional(self.store.as_ref(), &keys::app_record(app_id)).await?
        else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw)
            .inspect_err(|e| log::warn!("Ignoring unreadable record for {}: {}", app_id, e))
            .ok())
    }

    /// Recorded last-change time for `app_id`
    pub async fn last_changed(&self, app_id: &str) -> Result<Option<DateTime<Utc>>> {
        let raw = store::get_optional(self.store.as_ref(), &keys::last_changed(app_id)).await?;
        Ok(raw
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

/// `last_changed` never moves backwards, even if the clock does
fn advance(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn recorder() -> (ChangeRecorder, NotificationQueue, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let queue = NotificationQueue::new();
        (
            ChangeRecorder::new(store.clone(), queue.clone()),
            queue,
            store,
        )
    }

    fn versioned(version: &str) -> AppRecord {
        let mut record = AppRecord::minimal("com.example.app");
        record.version = Some(version.to_string());
        record.icon = Some("https://example.com/icon.png".to_string());
        record
    }

    #[tokio::test]
    async fn test_first_sighting_is_a_change() {
        let (recorder, queue, _store) = recorder();
        let before = Utc::now();

        let record = recorder.record(versioned("1.0")).await.unwrap();

        assert!(record.last_changed.unwrap() >= before);
        assert_eq!(queue.len(), 1);
        assert_eq!(
            recorder.stored("com.example.app").await.unwrap(),
            Some(record.clone())
        );
        assert_eq!(
            recorder.last_changed("com.example.app").await.unwrap(),
            record.last_changed
        );
    }

    #[tokio::test]
    async fn test_unchanged_version_notifies_once() {
        let (recorder, queue, _store) = recorder();

        let first = recorder.record(versioned("1.0")).await.unwrap();

        let mut again = versioned("1.0");
        again.last_changed = first.last_changed;
        again.changelog = Some("refreshed".to_string());
        let second = recorder.record(again).await.unwrap();

        assert_eq!(queue.len(), 1);
        assert_eq!(second.last_changed, first.last_changed);
        assert_eq!(
            recorder
                .stored("com.example.app")
                .await
                .unwrap()
                .unwrap()
                .changelog
                .as_deref(),
            Some("refreshed")
        );
    }

    #[tokio::test]
    async fn test_version_change_advances_last_changed() {
        let (recorder, queue, _store) = recorder();
        let first = recorder.record(versioned("1.0")).await.unwrap();

        let day_ago = Utc::now() - chrono::Duration::days(1);
        assert!(first.last_changed.unwrap() > day_ago);

        let mut next = versioned("1.1");
        next.last_changed = Some(day_ago);
        let second = recorder.record(next).await.unwrap();

        let stamp = second.last_changed.unwrap();
        assert!(stamp > day_ago);
        assert_eq!(
            recorder.last_changed("com.example.app").await.unwrap(),
            Some(stamp)
        );
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_comparison_is_textual() {
        let (recorder, queue, _store) = recorder();
        recorder.record(versioned("1.0")).await.unwrap();

        recorder.record(versioned("1.0.0")).await.unwrap();

        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_notification_describes_transition() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let queue = NotificationQueue::new();
        let recorder = ChangeRecorder::new(store, queue.clone());
        let sink = crate::notify::mock::MockSink::new();

        recorder.record(versioned("1.0")).await.unwrap();
        recorder.record(versioned("1.1")).await.unwrap();
        queue.drain_once(&sink).await;

        let mut messages = sink.delivered_messages().await;
        messages.sort();
        assert_eq!(
            messages,
            vec![
                "App com.example.app version changed from 1.0 to 1.1",
                "App com.example.app version changed from undefined to 1.0",
            ]
        );
        let delivered = sink.delivered.lock().await;
        assert!(
            delivered
                .iter()
                .all(|i| i.icon.as_deref() == Some("https://example.com/icon.png"))
        );
    }

    #[tokio::test]
    async fn test_versionless_record_is_not_persisted() {
        let (recorder, queue, store) = recorder();
        recorder.record(versioned("1.0")).await.unwrap();

        let minimal = recorder
            .record(AppRecord::minimal("com.example.app"))
            .await
            .unwrap();

        assert!(minimal.version.is_none());
        assert_eq!(queue.len(), 1);
        let raw = store.get(&keys::app_record("com.example.app")).await.unwrap();
        assert!(raw.contains("\"1.0\""));
    }

    #[test]
    fn test_advance_never_goes_backwards() {
        let now = Utc::now();
        let future = now + chrono::Duration::hours(1);

        assert_eq!(advance(None, now), now);
        assert_eq!(advance(Some(now - chrono::Duration::hours(1)), now), now);
        assert_eq!(advance(Some(future), now), future);
    }
}
