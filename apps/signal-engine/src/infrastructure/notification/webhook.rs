//! Chat webhook sink.
//!
//! Posts each notification as a single embed. When the signal has a thread,
//! the message is routed into it with the `thread_id` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::ports::{Notification, NotificationError, NotificationSink};
use crate::domain::signal_lifecycle::SignalStatus;

/// Webhook sink settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook URL.
    pub url: String,
    /// Name the messages are posted under.
    #[serde(default)]
    pub display_name: Option<String>,
    /// HTTP timeout per request.
    #[serde(default = "default_timeout", with = "crate::application::services::duration_ms")]
    pub timeout: Duration,
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl WebhookConfig {
    /// Settings for a webhook URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: None,
            timeout: default_timeout(),
        }
    }
}

/// Notification sink that posts to a chat webhook.
pub struct WebhookSink {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookSink {
    /// Create a sink.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryFailed` if the HTTP client cannot be built.
    pub fn new(config: WebhookConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotificationError::DeliveryFailed {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, client })
    }

    fn color(status: Option<SignalStatus>) -> u32 {
        match status {
            Some(SignalStatus::Waiting) => 0x6c_757d,
            Some(SignalStatus::Active) => 0x00_7bff,
            Some(SignalStatus::Tp1Hit | SignalStatus::Tp2Hit | SignalStatus::Tp3Hit) => 0x28_a745,
            Some(SignalStatus::StopLossHit) => 0xdc_3545,
            Some(SignalStatus::ClosedManual | SignalStatus::Expired) | None => 0xfd_7e14,
        }
    }

    fn payload(&self, notification: &Notification) -> serde_json::Value {
        let mut fields = vec![json!({
            "name": "Symbol",
            "value": format!("`{}`", notification.symbol),
            "inline": true
        })];
        if let Some(status) = notification.status {
            fields.push(json!({ "name": "Status", "value": status.as_str(), "inline": true }));
        }
        if let Some(signal_id) = &notification.signal_id {
            fields.push(json!({
                "name": "Signal",
                "value": format!("`{signal_id}`"),
                "inline": false
            }));
        }

        let mut payload = json!({
            "embeds": [{
                "title": notification.headline,
                "description": notification.detail,
                "color": Self::color(notification.status),
                "fields": fields,
                "timestamp": notification.occurred_at.to_rfc3339(),
            }]
        });
        if let Some(name) = &self.config.display_name {
            payload["username"] = json!(name);
        }
        payload
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .json(&self.payload(notification));
        if let Some(thread) = &notification.thread_id {
            request = request.query(&[("thread_id", thread.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotificationError::DeliveryFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(symbol = %notification.symbol, "Webhook notification sent");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "Webhook rejected notification");
        Err(NotificationError::Rejected {
            status: status.as_u16(),
        })
    }
}
