//! AppBrain API source
//!
//! AppBrain's free tier allows roughly 500 calls a month, so every raw
//! response is cached for a day and shared between the fallback path and
//! "Varies with device" version lookups.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::AppSource;
use crate::cache::{CacheTtl, TtlCache};
use crate::error::{Result, SourceError};
use crate::models::{AppRecord, play_store_url};
use crate::store::keys;

/// AppBrain API base URL
const API_BASE_URL: &str = "https://api.appbrain.com";

const SOURCE_NAME: &str = "appbrain";

/// Marker preceding the changelog inside AppBrain descriptions
const RECENT_CHANGES_MARKER: &str = "Recent changes:\n";

/// Subset of the `getapp` response we use
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppBrainApp {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version_string: Option<String>,

    /// Unix seconds
    #[serde(default)]
    pub last_app_update_time: Option<i64>,

    #[serde(default)]
    pub description: Option<String>,

    /// Bytes
    #[serde(default)]
    pub apk_size: Option<u64>,

    #[serde(default)]
    pub icon_url: Option<String>,
}

impl AppBrainApp {
    /// Map onto the common record shape
    pub fn into_record(self, app_id: &str) -> AppRecord {
        let changelog = self
            .description
            .as_deref()
            .and_then(|d| d.rsplit(RECENT_CHANGES_MARKER).next())
            .map(str::to_string);

        AppRecord {
            id: app_id.to_string(),
            name: self.name,
            version: self.version_string,
            updated: self
                .last_app_update_time
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            changelog,
            size: self.apk_size,
            icon: self.icon_url,
            url: Some(play_store_url(app_id)),
            last_changed: None,
        }
    }
}

/// Secondary source backed by the AppBrain JSON API
pub struct AppBrainSource {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    cache: TtlCache,
}

impl AppBrainSource {
    /// Create the source; without an API key it reports itself unconfigured
    pub fn new(api_key: Option<String>, cache: TtlCache) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SourceError::from)?;

        Ok(Self {
            http,
            base_url: API_BASE_URL.to_string(),
            api_key,
            cache,
        })
    }

    /// Point at a different API host (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Cached `getapp` lookup. `None` when no API key is configured.
    pub async fn query(&self, app_id: &str) -> Result<Option<AppBrainApp>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        self.cache
            .wrap(&keys::appbrain(app_id), CacheTtl::APPBRAIN, || async {
                log::info!("Fetching {} from appbrain...", app_id);
                self.fetch(api_key, app_id).await.map(Some)
            })
            .await
    }

    async fn fetch(&self, api_key: &str, app_id: &str) -> Result<AppBrainApp> {
        let url = format!("{}/v2/info/getapp", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("apikey", api_key), ("package", app_id), ("format", "json")])
            .send()
            .await
            .map_err(SourceError::from)?;

        match response.status() {
            StatusCode::OK => {
                let app = response.json::<AppBrainApp>().await.map_err(|e| {
                    SourceError::InvalidResponse(format!("Failed to parse appbrain response: {}", e))
                })?;
                Ok(app)
            }
            status => Err(SourceError::Unavailable {
                source_name: SOURCE_NAME,
                reason: format!("HTTP {}", status.as_u16()),
            }
            .into()),
        }
    }
}

#[async_trait]
impl AppSource for AppBrainSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn attempt(&self, app_id: &str) -> Result<AppRecord> {
        match self.query(app_id).await? {
            Some(app) => Ok(app.into_record(app_id)),
            None => Err(SourceError::NotConfigured(SOURCE_NAME).into()),
        }
    }

    async fn device_version(&self, app_id: &str) -> Result<Option<String>> {
        Ok(self
            .query(app_id)
            .await?
            .and_then(|app| app.version_string))
    }
}
