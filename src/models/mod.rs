//! Domain models shared across the tracker, sources and CLI

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod display;

pub use display::AppDisplay;

/// Version string some store listings show instead of a concrete version
pub const VARIES_WITH_DEVICE: &str = "varies with device";

/// Everything known about one watched app.
///
/// Only `id` is guaranteed: when every source fails the tracker still
/// produces a minimal record carrying the id and the last-change stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
    /// Package identifier, e.g. `com.example.app`
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// When the store says the current version was published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    /// Package size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// When we first observed the current version (may be later than
    /// `updated` for staged rollouts)
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
}

impl AppRecord {
    /// Record with nothing but the id
    pub fn minimal(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            version: None,
            updated: None,
            changelog: None,
            size: None,
            icon: None,
            url: None,
            last_changed: None,
        }
    }

    /// True when the version is the ambiguous "Varies with device" marker
    pub fn has_ambiguous_version(&self) -> bool {
        self.version
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case(VARIES_WITH_DEVICE))
    }
}

/// Public Play Store listing for a package
pub fn play_store_url(app_id: &str) -> String {
    format!("https://play.google.com/store/apps/details?id={}", app_id)
}

/// Outbound alert waiting in the notification queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NotificationItem {
    pub fn new(message: impl Into<String>, icon: Option<String>) -> Self {
        Self {
            message: message.into(),
            icon,
        }
    }
}
