//! Webhook delivery for analytics alerts (Slack-compatible payload).

use crate::analytics::alerts::{Alert, Severity};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct WebhookMessage {
    text: String,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct Attachment {
    color: &'static str,
    fields: Vec<Field>,
}

#[derive(Debug, Serialize)]
struct Field {
    title: &'static str,
    value: String,
    short: bool,
}

/// Posts alerts to a configured webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    retry: RetryConfig,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
            retry: RetryConfig::alert_delivery(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Deliver `alerts` in a single message. No request is made for an empty slice.
    pub async fn notify(&self, alerts: &[Alert]) -> Result<()> {
        if alerts.is_empty() {
            return Ok(());
        }

        let message = build_message(alerts);
        with_retry(&self.retry, "Alert webhook", || self.post(&message)).await?;

        info!("Delivered {} alert(s) to webhook", alerts.len());
        Ok(())
    }

    async fn post(&self, message: &WebhookMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .context("Failed to send request to alert webhook")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Alert webhook error ({}): {}", status, body);
        }

        Ok(())
    }
}

fn build_message(alerts: &[Alert]) -> WebhookMessage {
    WebhookMessage {
        text: "⚠️ I18n Performance Alerts".to_string(),
        attachments: alerts
            .iter()
            .map(|alert| Attachment {
                color: if alert.severity == Severity::High {
                    "danger"
                } else {
                    "warning"
                },
                fields: vec![
                    Field {
                        title: "Alert Type",
                        value: alert.kind.as_str().to_string(),
                        short: true,
                    },
                    Field {
                        title: "Language",
                        value: alert.language.clone().unwrap_or_else(|| "-".to_string()),
                        short: true,
                    },
                    Field {
                        title: "Message",
                        value: alert.message.clone(),
                        short: false,
                    },
                ],
            })
            .collect(),
    }
}
