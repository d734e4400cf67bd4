//! Watch list commands

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::error::{ConfigError, Error, Result};
use crate::models::display::render_changelog;
use crate::models::{AppDisplay, AppRecord};
use crate::output::{Formattable, json};

/// Watched id for list output
#[derive(Tabled, Serialize)]
struct WatchedApp {
    #[tabled(rename = "APP ID")]
    id: String,
}

/// Per-id result of `add`
#[derive(Serialize)]
struct AddOutcome {
    app_id: String,
    added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Add each id to the watch set and resolve it right away.
///
/// Ids already watched are reported and skipped; the rest still go through.
pub async fn add(opts: &GlobalOptions, app_ids: &[String]) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let mut outcomes = Vec::with_capacity(app_ids.len());

    for app_id in app_ids {
        match ctx.watch.add_app(app_id).await {
            Ok(()) => {}
            Err(Error::Config(ConfigError::DuplicateWatchEntry(_))) => {
                outcomes.push(AddOutcome {
                    app_id: app_id.clone(),
                    added: false,
                    version: None,
                    error: Some("already watched".to_string()),
                });
                continue;
            }
            Err(e) => return Err(e),
        }

        let (version, error) = match ctx.tracker.resolve(app_id).await {
            Ok(record) => (record.version, None),
            Err(e) => {
                log::error!("Failed to resolve {}: {}", app_id, e);
                (None, Some(e.to_string()))
            }
        };
        outcomes.push(AddOutcome {
            app_id: app_id.clone(),
            added: true,
            version,
            error,
        });
    }

    // First sightings queue a notification each
    ctx.flush_notifications().await;

    match ctx.format {
        OutputFormat::Json => println!("{}", json::format_json(&outcomes)?),
        OutputFormat::Pretty | OutputFormat::Table => {
            for outcome in &outcomes {
                match (outcome.added, &outcome.error) {
                    (false, _) => println!(
                        "{} {} is already watched",
                        "○".dimmed(),
                        outcome.app_id
                    ),
                    (true, None) => println!(
                        "{} Watching {} ({})",
                        "✓".green(),
                        outcome.app_id.bold(),
                        outcome.version.as_deref().unwrap_or("version unknown")
                    ),
                    (true, Some(error)) => println!(
                        "{} Watching {} (lookup failed: {})",
                        "⚠".yellow(),
                        outcome.app_id.bold(),
                        error
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Drop an id from the watch set. Its history stays in the store.
pub async fn remove(opts: &GlobalOptions, app_id: &str) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let removed = ctx.watch.remove_app(app_id).await?;

    match ctx.format {
        OutputFormat::Json => println!(
            "{}",
            json::format_json(&serde_json::json!({ "app_id": app_id, "removed": removed }))?
        ),
        OutputFormat::Pretty | OutputFormat::Table => {
            if removed {
                println!("{} Stopped watching {}", "✓".green(), app_id);
            } else {
                println!("{} {} was not watched", "○".dimmed(), app_id);
            }
        }
    }
    Ok(())
}

pub async fn list(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let apps: Vec<WatchedApp> = ctx
        .watch
        .apps()
        .await?
        .into_iter()
        .map(|id| WatchedApp { id })
        .collect();

    apps.print(ctx.format)
}

/// Show persisted records, newest change first
pub async fn latest(opts: &GlobalOptions, app_id: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;

    if let Some(app_id) = app_id {
        let record = ctx
            .tracker
            .latest_for(app_id)
            .await?
            .ok_or_else(|| Error::Other(format!("No recorded state for {}", app_id)))?;
        return display_record(&record, ctx.format);
    }

    let apps = ctx.watch.apps().await?;
    let records = ctx.tracker.latest(&apps).await?;

    match ctx.format {
        OutputFormat::Json => println!("{}", json::format_json(&records)?),
        format => {
            let display: Vec<AppDisplay> = records.iter().map(AppDisplay::from).collect();
            display.print(format)?;
        }
    }
    Ok(())
}

fn display_record(record: &AppRecord, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Pretty => {
            let display = AppDisplay::from(record);
            println!();
            println!("{}: {}", "App".bold(), display.name);
            println!("{}: {}", "ID".dimmed(), record.id);
            println!("{}: {}", "Version".bold(), display.version.cyan());
            println!("{}: {}", "Size".dimmed(), display.size);
            println!("{}: {}", "Changed".dimmed(), display.last_changed);
            if let Some(url) = &record.url {
                println!("{}: {}", "Store".dimmed(), url);
            }

            let changelog = render_changelog(record.changelog.as_deref());
            if !changelog.is_empty() {
                println!();
                println!("{}:", "What's new".bold());
                for line in changelog.lines() {
                    println!("  {}", line);
                }
            }
            println!();
        }
        OutputFormat::Table => vec![AppDisplay::from(record)].print(format)?,
        OutputFormat::Json => println!("{}", json::format_json(record)?),
    }
    Ok(())
}

/// Replace `key` in the watch configuration with a JSON value
pub async fn set(opts: &GlobalOptions, key: &str, value: &str) -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(value)
        .map_err(|e| ConfigError::Invalid(format!("{} is not valid JSON: {}", key, e)))?;

    let ctx = CommandContext::new(opts).await?;
    ctx.watch.set(key, value).await?;

    match ctx.format {
        OutputFormat::Json => {
            let config = ctx.watch.get().await?;
            println!("{}", json::format_json(&config.get(key))?);
        }
        OutputFormat::Pretty | OutputFormat::Table => {
            println!("{} Updated {}", "✓".green(), key.bold())
        }
    }
    Ok(())
}
