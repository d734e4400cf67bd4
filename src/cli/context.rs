//! Command execution context
//!
//! Wires settings, the durable store, sources, the notification queue and the
//! poller together once so command handlers only deal with their own logic.

use std::sync::Arc;

use crate::cache::TtlCache;
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::config::Settings;
use crate::error::Result;
use crate::notify::{DrainReport, FLUSH_ATTEMPTS, NotificationQueue, NotificationSink, WebhookSink};
use crate::poll::Poller;
use crate::source::{ApkPureSource, AppBrainSource, AppSource, SourceChain};
use crate::store::SqliteStore;
use crate::tracker::AppTracker;
use crate::watch::WatchConfigCache;

pub struct CommandContext {
    pub settings: Settings,
    pub store: Arc<SqliteStore>,
    pub watch: Arc<WatchConfigCache>,
    pub tracker: Arc<AppTracker>,
    pub queue: NotificationQueue,
    /// `None` when no webhook is configured
    pub sink: Option<Arc<dyn NotificationSink>>,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Load settings and open the store.
    ///
    /// Constructing the sources performs no network I/O; commands that never
    /// resolve apps pay only for opening the store.
    pub async fn new(opts: &GlobalOptions) -> Result<Self> {
        let settings = Settings::load_at(opts.config_ref())?;
        let store_dir = settings.store_dir()?;
        log::debug!("Opening store at {}", store_dir.display());
        let store = Arc::new(SqliteStore::open_at(&store_dir)?);

        let (queue, sink) = match &settings.webhook_url {
            Some(url) => {
                let sink: Arc<dyn NotificationSink> =
                    Arc::new(WebhookSink::new(url.as_str(), settings.webhook_username.as_str())?);
                (NotificationQueue::new(), Some(sink))
            }
            None => {
                log::debug!("No webhook configured, notifications disabled");
                (NotificationQueue::disabled(), None)
            }
        };

        let cache = TtlCache::new(store.clone());
        let appbrain = AppBrainSource::new(settings.appbrain_api_key.clone(), cache.clone())?;
        if !appbrain.is_configured() {
            log::debug!("No AppBrain key, fallback source disabled");
        }
        let sources: Vec<Arc<dyn AppSource>> = vec![
            Arc::new(ApkPureSource::new(cache)?),
            Arc::new(appbrain),
        ];
        let chain = SourceChain::new(sources);
        log::debug!("Source chain: {}", chain.names().join(" -> "));

        let tracker = Arc::new(AppTracker::new(store.clone(), chain, queue.clone()));
        let watch = Arc::new(WatchConfigCache::new(store.clone()));

        Ok(Self {
            settings,
            store,
            watch,
            tracker,
            queue,
            sink,
            format: opts.format,
        })
    }

    /// Poller sized by `max_concurrent_polls`
    pub fn poller(&self) -> Poller {
        Poller::new(self.tracker.clone(), self.watch.clone())
            .with_max_concurrent(self.settings.max_concurrent_polls)
    }

    /// Deliver what one-shot commands queued before the process exits.
    ///
    /// Retries on the drain interval a few times; whatever is still pending
    /// afterwards is logged as dropped. `None` without a webhook.
    pub async fn flush_notifications(&self) -> Option<DrainReport> {
        let sink = self.sink.as_ref()?;
        let report = self
            .queue
            .flush(sink.as_ref(), self.settings.drain_interval(), FLUSH_ATTEMPTS)
            .await;
        if report.requeued > 0 {
            log::warn!(
                "{} undelivered notifications dropped after {} attempts",
                report.requeued,
                FLUSH_ATTEMPTS
            );
        }
        Some(report)
    }
}
