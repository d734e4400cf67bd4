//! Discord-compatible webhook delivery

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::time::Duration;

use super::NotificationSink;
use crate::error::{DeliveryError, Result, SourceError};
use crate::models::NotificationItem;

/// Request body accepted by Discord (and Slack-compatible) webhooks
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
    content: &'a str,
}

/// Posts each notification to a webhook URL
pub struct WebhookSink {
    http: HttpClient,
    url: String,
    username: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, username: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(SourceError::from)?;

        Ok(Self {
            http,
            url: url.into(),
            username: username.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, item: &NotificationItem) -> std::result::Result<(), DeliveryError> {
        let payload = WebhookPayload {
            username: &self.username,
            avatar_url: item.icon.as_deref(),
            content: &item.message,
        };

        let response = self.http.post(&self.url).json(&payload).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected(status.as_u16()))
        }
    }
}
