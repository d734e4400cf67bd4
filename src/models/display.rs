//! Display models for table and JSON output

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use super::AppRecord;

/// App record display model for table/JSON output.
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct AppDisplay {
    #[tabled(rename = "APP ID")]
    pub id: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "VERSION")]
    pub version: String,

    #[tabled(rename = "SIZE")]
    pub size: String,

    /// When we noticed the current version
    #[tabled(rename = "CHANGED")]
    pub last_changed: String,

    #[tabled(rename = "CHANGELOG")]
    pub changelog: String,
}

impl From<&AppRecord> for AppDisplay {
    fn from(record: &AppRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone().unwrap_or_else(|| "--".to_string()),
            version: record.version.clone().unwrap_or_else(|| "--".to_string()),
            size: record
                .size
                .map(format_size)
                .unwrap_or_else(|| "--".to_string()),
            last_changed: format_timestamp(record.last_changed),
            changelog: truncate_string(&render_changelog(record.changelog.as_deref()), 60),
        }
    }
}

/// Store changelogs carry HTML line breaks; show them as text
pub fn render_changelog(changelog: Option<&str>) -> String {
    changelog
        .unwrap_or_default()
        .replace("<br>", "\n")
        .trim()
        .to_string()
}

/// Truncate string to max length with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or_default();
    if first_line.chars().count() <= max_len && first_line.len() == s.len() {
        return s.to_string();
    }
    let kept: String = first_line
        .chars()
        .take(max_len.saturating_sub(3))
        .collect();
    format!("{}...", kept)
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--".to_string())
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
