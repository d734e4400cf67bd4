//! Long-running mode: scheduled sweeps plus the notification drain loop

use colored::Colorize;
use log::info;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::error::Result;

/// Poll immediately, then every `poll_interval_secs`, until Ctrl-C
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let poller = ctx.poller();

    let drain = ctx
        .sink
        .clone()
        .and_then(|sink| ctx.queue.spawn_drain_loop(sink, ctx.settings.drain_interval()));
    if drain.is_none() {
        eprintln!(
            "{} No webhook configured; changes are recorded but not announced",
            "⚠".yellow()
        );
    }

    info!(
        "Watching {} apps, polling every {}s",
        ctx.watch.apps().await?.len(),
        ctx.settings.poll_interval_secs
    );

    tokio::select! {
        _ = poller.run(ctx.settings.poll_interval()) => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Interrupted, shutting down");
        }
    }

    if let Some(handle) = drain {
        handle.abort();
    }
    if !ctx.queue.is_empty() {
        log::warn!("{} undelivered notifications dropped", ctx.queue.len());
    }
    Ok(())
}
