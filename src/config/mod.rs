//! Configuration management for Stapler

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable overriding `webhook_url`
pub const ENV_WEBHOOK_URL: &str = "STAPLER_WEBHOOK_URL";
/// Environment variable overriding `appbrain_api_key`
pub const ENV_APPBRAIN_KEY: &str = "STAPLER_APPBRAIN_KEY";
/// Environment variable overriding `store_dir`
pub const ENV_STORE_DIR: &str = "STAPLER_STORE_DIR";

/// Process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Discord-compatible webhook receiving change notifications.
    /// Notifications are disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Display name used for webhook posts
    #[serde(default = "default_webhook_username")]
    pub webhook_username: String,

    /// AppBrain API key (secondary source, strict monthly quota)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appbrain_api_key: Option<String>,

    /// Directory holding the durable store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    /// Seconds between scheduled sweeps
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Seconds between notification drain cycles
    #[serde(default = "default_drain_interval")]
    pub drain_interval_secs: u64,

    /// Upper bound on apps resolved at the same time during a sweep
    #[serde(default = "default_max_concurrent_polls")]
    pub max_concurrent_polls: usize,
}

fn default_webhook_username() -> String {
    "Stapler".to_string()
}

fn default_poll_interval() -> u64 {
    60 * 60
}

fn default_drain_interval() -> u64 {
    10
}

fn default_max_concurrent_polls() -> usize {
    16
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            webhook_username: default_webhook_username(),
            appbrain_api_key: None,
            store_dir: None,
            poll_interval_secs: default_poll_interval(),
            drain_interval_secs: default_drain_interval(),
            max_concurrent_polls: default_max_concurrent_polls(),
        }
    }
}

impl Settings {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".stapler").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete config path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load settings from an optional path, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults are used instead.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        let mut settings = match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(crate::error::Error::Config(ConfigError::NotFound)) => {
                log::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e),
        };
        settings.apply_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(settings)
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Webhook URLs and API keys are secrets
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Environment wins over the file
    fn apply_env(&mut self) {
        if let Some(url) = non_empty_env(ENV_WEBHOOK_URL) {
            self.webhook_url = Some(url);
        }
        if let Some(key) = non_empty_env(ENV_APPBRAIN_KEY) {
            self.appbrain_api_key = Some(key);
        }
        if let Some(dir) = non_empty_env(ENV_STORE_DIR) {
            self.store_dir = Some(PathBuf::from(dir));
        }
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be > 0".to_string()).into());
        }
        if self.drain_interval_secs == 0 {
            return Err(
                ConfigError::Invalid("drain_interval_secs must be > 0".to_string()).into(),
            );
        }
        if self.max_concurrent_polls == 0 {
            return Err(
                ConfigError::Invalid("max_concurrent_polls must be > 0".to_string()).into(),
            );
        }
        Ok(())
    }

    /// Directory of the durable store (`~/.local/share/stapler` on Linux)
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let base = dirs::data_dir().ok_or(ConfigError::Invalid(
                    "Could not determine data directory".to_string(),
                ))?;
                Ok(base.join("stapler"))
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }

    /// True when a webhook destination is configured
    pub fn notifications_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
