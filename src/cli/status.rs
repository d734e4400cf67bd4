//! Status command implementation

use colored::Colorize;

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::config::Settings;
use crate::error::Result;
use crate::output::json;

/// Show which settings are in effect and how much is being watched
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    let config_path = Settings::resolve_path(opts.config_ref())?;
    let ctx = CommandContext::new(opts).await?;
    let settings = &ctx.settings;
    let watched = ctx.watch.apps().await?.len();
    let store_dir = settings.store_dir()?;

    if ctx.format == OutputFormat::Json {
        let status = serde_json::json!({
            "config_file": config_path.display().to_string(),
            "config_file_exists": config_path.exists(),
            "store_dir": store_dir.display().to_string(),
            "webhook_configured": settings.notifications_enabled(),
            "appbrain_configured": settings.appbrain_api_key.is_some(),
            "poll_interval_secs": settings.poll_interval_secs,
            "drain_interval_secs": settings.drain_interval_secs,
            "max_concurrent_polls": settings.max_concurrent_polls,
            "watched_apps": watched,
        });
        println!("{}", json::format_json(&status)?);
        return Ok(());
    }

    println!("{}\n", "Stapler Status".bold());

    if config_path.exists() {
        println!("Config file: {}", config_path.display().to_string().cyan());
    } else {
        println!(
            "Config file: {} {}",
            config_path.display().to_string().cyan(),
            "(not found, using defaults)".dimmed()
        );
    }
    println!("Store: {}", store_dir.display().to_string().cyan());
    println!();

    if settings.notifications_enabled() {
        println!(
            "{} Webhook configured (posting as {})",
            "✓".green(),
            settings.webhook_username
        );
    } else {
        println!("{} No webhook configured, notifications disabled", "✗".red());
        println!("  → Set webhook_url or STAPLER_WEBHOOK_URL");
    }

    if settings.appbrain_api_key.is_some() {
        println!("{} AppBrain fallback configured", "✓".green());
    } else {
        println!("{} AppBrain fallback not configured", "○".dimmed());
    }

    println!(
        "{} Watching {} apps, polling every {}s",
        "○".dimmed(),
        watched,
        settings.poll_interval_secs
    );
    println!();

    Ok(())
}
