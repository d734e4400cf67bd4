//! Sweeps over the watch set.
//!
//! Scheduled and manual sweeps go through the same [`Poller::poll_all`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info};
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::models::AppRecord;
use crate::tracker::AppTracker;
use crate::watch::WatchConfigCache;

/// Sweep concurrency when none is configured
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

type PollFuture = Pin<Box<dyn Future<Output = (String, Result<AppRecord>)> + Send>>;

/// Outcome of one sweep
#[derive(Debug, Default)]
pub struct PollReport {
    pub succeeded: usize,
    /// `(app id, error message)` per failed app
    pub failed: Vec<(String, String)>,
}

impl PollReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

pub struct Poller {
    tracker: Arc<AppTracker>,
    watch: Arc<WatchConfigCache>,
    max_concurrent: usize,
}

impl Poller {
    pub fn new(tracker: Arc<AppTracker>, watch: Arc<WatchConfigCache>) -> Self {
        Self {
            tracker,
            watch,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Resolve every watched app, at most `max_concurrent` at a time.
    ///
    /// The watch set is re-read from the store first, so edits made by
    /// another process are picked up. Only a failure to read it fails the
    /// sweep; per-app errors are logged and collected in the report.
    pub async fn poll_all(&self) -> Result<PollReport> {
        self.watch.invalidate().await;
        let apps = self.watch.apps().await?;
        debug!(
            "Polling {} apps with max {} concurrent",
            apps.len(),
            self.max_concurrent
        );

        let mut report = PollReport::default();
        let mut in_flight: FuturesUnordered<PollFuture> = FuturesUnordered::new();
        let mut pending = apps.into_iter();

        let make_future = |app_id: String| -> PollFuture {
            let tracker = self.tracker.clone();
            Box::pin(async move {
                let result = match tracker.resolve(&app_id).await {
                    Ok(record) if record.version.is_none() => {
                        let reason = tracker
                            .exhaustion_reason(&app_id)
                            .unwrap_or_else(|| "no source returned a version".to_string());
                        Err(Error::Other(format!("No version for {}: {}", app_id, reason)))
                    }
                    other => other,
                };
                (app_id, result)
            })
        };

        for app_id in pending.by_ref().take(self.max_concurrent) {
            in_flight.push(make_future(app_id));
        }

        while let Some((app_id, result)) = in_flight.next().await {
            match result {
                Ok(_) => report.succeeded += 1,
                Err(e) => {
                    error!("Failed to poll {}: {}", app_id, e);
                    report.failed.push((app_id, e.to_string()));
                }
            }

            if let Some(next) = pending.next() {
                in_flight.push(make_future(next));
            }
        }

        info!(
            "Poll finished: {} succeeded, {} failed",
            report.succeeded,
            report.failed.len()
        );
        Ok(report)
    }

    /// Sweep now, then every `period`, forever
    pub async fn run(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_all().await {
                error!("Poll sweep failed: {}", e);
            }
        }
    }
}
