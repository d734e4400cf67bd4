//! Error types for Stapler

use thiserror::Error;

/// Result type alias for Stapler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Durable store errors.
///
/// `NotFound` is the expected miss that drives the cache-miss path; every
/// other variant is fatal to the enclosing operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Store database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to serialize stored value: {0}")]
    Serialization(String),
}

impl StoreError {
    /// True for the expected "key not found" miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Data source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source {0} is not configured")]
    NotConfigured(&'static str),

    #[error("Source {source_name} unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },

    #[error("Invalid source response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            SourceError::Network("Failed to connect to source".to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Notification delivery errors. Always retried, never fatal.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Webhook request failed: {0}")]
    Network(String),

    #[error("Webhook rejected notification with status {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Network(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("{0} is already being watched")]
    DuplicateWatchEntry(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
