//! Webhook Alerts - Best-effort JSON POST
//!
//! Posts `{"level", "message"}` to a configured URL with a short timeout.
//! When alerts are disabled or no URL is configured the alert is only
//! logged. Delivery failures are logged and swallowed.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::ports::alerts::{AlertLevel, AlertSink};

/// Upper bound on a single delivery attempt.
pub const ALERT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    level: AlertLevel,
    message: &'a str,
}

/// [`AlertSink`] that posts to a webhook.
pub struct WebhookAlerts {
    http: Client,
    /// `None` means log-only.
    webhook_url: Option<String>,
}

impl WebhookAlerts {
    /// Build the sink. A disabled sink, or one without a URL, only logs.
    pub fn new(enabled: bool, webhook_url: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(ALERT_TIMEOUT)
            .build()
            .context("Failed to build alert HTTP client")?;

        Ok(Self {
            http,
            webhook_url: webhook_url.filter(|url| enabled && !url.is_empty()),
        })
    }

    pub fn is_delivering(&self) -> bool {
        self.webhook_url.is_some()
    }
}

fn log_only(level: AlertLevel, message: &str) {
    match level {
        AlertLevel::Info => info!(alert = %message, "Alert (not delivered)"),
        AlertLevel::Warning => warn!(alert = %message, "Alert (not delivered)"),
        AlertLevel::Critical => error!(alert = %message, "Alert (not delivered)"),
    }
}

#[async_trait]
impl AlertSink for WebhookAlerts {
    async fn send(&self, level: AlertLevel, message: &str) {
        let Some(url) = self.webhook_url.as_deref() else {
            log_only(level, message);
            return;
        };

        let payload = AlertPayload { level, message };
        match self.http.post(url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(level = %level, "Alert delivered");
            }
            Ok(resp) => {
                warn!(status = %resp.status(), alert = %message, "Alert webhook refused delivery");
            }
            Err(e) => {
                error!(error = %e, alert = %message, "Failed to deliver alert");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = AlertPayload {
            level: AlertLevel::Warning,
            message: "capacity exceeded",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["level"], "WARNING");
        assert_eq!(json["message"], "capacity exceeded");
    }

    #[test]
    fn test_disabled_or_missing_url_is_log_only() {
        let disabled = WebhookAlerts::new(false, Some("http://localhost:9/hook".into())).unwrap();
        assert!(!disabled.is_delivering());
        let no_url = WebhookAlerts::new(true, None).unwrap();
        assert!(!no_url.is_delivering());
        let live = WebhookAlerts::new(true, Some("http://localhost:9/hook".into())).unwrap();
        assert!(live.is_delivering());
    }

    #[tokio::test]
    async fn test_log_only_send_returns() {
        let sink = WebhookAlerts::new(false, None).unwrap();
        sink.send(AlertLevel::Critical, "gate blocked").await;
    }
}
