//! Buffered change notifications
//!
//! Producers push onto a [`NotificationQueue`] synchronously; a background
//! drain loop periodically takes the whole queue as one batch and delivers
//! every item concurrently. Items that fail to deliver go back on the live
//! queue and are retried on a later cycle, with no backoff and no limit.

pub mod webhook;

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::DeliveryError;
use crate::models::NotificationItem;

pub use webhook::WebhookSink;

/// Drain cycles a one-shot command spends before giving up on stragglers
pub const FLUSH_ATTEMPTS: usize = 3;

/// Destination for notifications
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, item: &NotificationItem) -> Result<(), DeliveryError>;
}

/// Outcome of one drain cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub requeued: usize,
}

/// Shared handle to the pending notification list.
///
/// A disabled queue (no destination configured) drops everything enqueued.
#[derive(Clone)]
pub struct NotificationQueue {
    pending: Option<Arc<Mutex<Vec<NotificationItem>>>>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self {
            pending: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Queue that accepts and discards items
    pub fn disabled() -> Self {
        Self { pending: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.pending.is_some()
    }

    /// Append an item; never blocks on delivery
    pub fn enqueue(&self, item: NotificationItem) {
        if let Some(pending) = &self.pending {
            lock(pending).push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.pending.as_ref().map(|p| lock(p).len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swap the pending list for an empty one and return what was there
    fn take_batch(&self) -> Vec<NotificationItem> {
        match &self.pending {
            Some(pending) => std::mem::take(&mut *lock(pending)),
            None => Vec::new(),
        }
    }

    /// Deliver everything queued right now.
    ///
    /// Items enqueued while this runs are left for the next cycle. Failed
    /// items are re-enqueued behind anything that arrived meanwhile.
    pub async fn drain_once(&self, sink: &dyn NotificationSink) -> DrainReport {
        let batch = self.take_batch();
        if batch.is_empty() {
            return DrainReport::default();
        }
        log::debug!("Draining {} notifications", batch.len());

        let outcomes = join_all(batch.into_iter().map(|item| async move {
            let result = sink.deliver(&item).await;
            (item, result)
        }))
        .await;

        let mut report = DrainReport::default();
        for (item, result) in outcomes {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    log::error!("Notify error: {}", e);
                    self.enqueue(item);
                    report.requeued += 1;
                }
            }
        }
        report
    }

    /// Drain until the queue is empty or `attempts` cycles have run,
    /// waiting `period` between cycles.
    ///
    /// Used by commands that exit right after, so a transient sink failure
    /// gets a few more chances. `requeued` in the result counts what is
    /// still pending when this gives up.
    pub async fn flush(
        &self,
        sink: &dyn NotificationSink,
        period: Duration,
        attempts: usize,
    ) -> DrainReport {
        let mut total = DrainReport::default();
        for attempt in 0..attempts.max(1) {
            if attempt > 0 {
                if self.is_empty() {
                    break;
                }
                tokio::time::sleep(period).await;
            }
            total.delivered += self.drain_once(sink).await.delivered;
        }
        total.requeued = self.len();
        total
    }

    /// Run [`drain_once`](Self::drain_once) every `period` on a background task.
    ///
    /// Returns `None` for a disabled queue.
    pub fn spawn_drain_loop(
        &self,
        sink: Arc<dyn NotificationSink>,
        period: Duration,
    ) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            log::info!("No webhook configured, notifications disabled");
            return None;
        }

        let queue = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if queue.is_empty() {
                    continue;
                }
                let report = queue.drain_once(sink.as_ref()).await;
                log::debug!(
                    "Drain cycle: {} delivered, {} requeued",
                    report.delivered,
                    report.requeued
                );
            }
        }))
    }
}

fn lock(pending: &Mutex<Vec<NotificationItem>>) -> MutexGuard<'_, Vec<NotificationItem>> {
    // A panic mid-push cannot leave the Vec inconsistent
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
