//! Cache management commands

use chrono::{DateTime, Local};

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::config::Settings;
use crate::error::Result;
use crate::models::display::format_size;
use crate::store::{KeyValueStore, keys};

/// Show store statistics
pub async fn status(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let stats = ctx.store.stats().await?;
    let path = ctx
        .store
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "total_entries": stats.total_entries,
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes as u64),
                "oldest_update_timestamp": stats.oldest_update,
                "newest_update_timestamp": stats.newest_update,
                "path": path,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Pretty | OutputFormat::Table => {
            println!("Store Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", path);
            println!("Entries:        {}", stats.total_entries);
            println!(
                "Total size:     {}",
                format_size(stats.total_size_bytes as u64)
            );
            if let Some(oldest) = stats.oldest_update {
                println!("Oldest update:  {}", local_time(oldest));
            }
            if let Some(newest) = stats.newest_update {
                println!("Newest update:  {}", local_time(newest));
            }
        }
    }

    Ok(())
}

/// Drop every expiring entry. The watch list and recorded app state stay.
pub async fn clear(opts: &GlobalOptions) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;

    let mut removed = 0;
    for prefix in keys::CACHE_PREFIXES {
        removed += ctx.store.delete_prefix(prefix).await?;
    }

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Pretty | OutputFormat::Table => {
            if removed > 0 {
                println!("Cleared {} cache entries", removed);
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

/// Print the store directory without opening it
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let settings = Settings::load_at(opts.config_ref())?;
    println!("{}", settings.store_dir()?.display());
    Ok(())
}

fn local_time(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|d| d.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
