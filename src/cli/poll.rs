//! Manual sweep

use colored::Colorize;
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::Result;
use crate::output::json;

#[derive(Serialize)]
struct PollSummary<'a> {
    succeeded: usize,
    failed: Vec<FailedApp<'a>>,
    notifications_delivered: usize,
    notifications_dropped: usize,
}

#[derive(Serialize)]
struct FailedApp<'a> {
    app_id: &'a str,
    error: &'a str,
}

/// Poll every watched app once, then flush the notification queue
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let report = ctx.poller().poll_all().await?;
    let drained = ctx.flush_notifications().await;

    match ctx.format {
        OutputFormat::Json => {
            let summary = PollSummary {
                succeeded: report.succeeded,
                failed: report
                    .failed
                    .iter()
                    .map(|(app_id, error)| FailedApp { app_id, error })
                    .collect(),
                notifications_delivered: drained.as_ref().map_or(0, |d| d.delivered),
                notifications_dropped: drained.as_ref().map_or(0, |d| d.requeued),
            };
            println!("{}", json::format_json(&summary)?);
        }
        OutputFormat::Pretty | OutputFormat::Table => {
            println!(
                "Polled {} apps: {} ok, {} failed",
                report.total(),
                report.succeeded.to_string().green(),
                report.failed.len().to_string().red()
            );
            for (app_id, error) in &report.failed {
                println!("  {} {}: {}", "✗".red(), app_id, error.dimmed());
            }
            if let Some(drained) = drained {
                println!("Notifications: {} delivered", drained.delivered);
                if drained.requeued > 0 {
                    println!(
                        "  {} {} could not be delivered",
                        "⚠".yellow(),
                        drained.requeued
                    );
                }
            }
        }
    }

    Ok(())
}
