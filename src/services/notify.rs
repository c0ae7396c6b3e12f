// src/services/notify.rs

//! Best-effort run notifications.
//!
//! Delivery problems are logged and swallowed; a notifier never fails a run.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::Result;
use crate::models::NotifyConfig;
use crate::utils::http::create_async_client;

/// Sink for human-readable run events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        log::info!("[notify] {}", message);
    }
}

/// Posts notifications to a Slack-compatible incoming webhook.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: create_async_client(timeout_secs)?,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, message: &str) {
        log::info!("[notify] {}", message);

        let result = self
            .client
            .post(&self.webhook_url)
            .json(&SlackMessage { text: message })
            .send()
            .await
            .and_then(|r| r.error_for_status());

        if let Err(e) = result {
            log::warn!("Failed to deliver notification: {}", e);
        }
    }
}

/// Slack when a webhook is configured, log-only otherwise.
pub fn from_config(config: &NotifyConfig) -> Result<Box<dyn Notifier>> {
    let url = config.slack_webhook_url.trim();
    if url.is_empty() {
        log::debug!("No webhook configured, notifications go to the log.");
        return Ok(Box::new(LogNotifier));
    }
    Ok(Box::new(SlackNotifier::new(url, config.timeout_secs)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_payload_shape() {
        let payload = serde_json::to_string(&SlackMessage {
            text: "Begin to crawl.",
        })
        .unwrap();
        assert_eq!(payload, r#"{"text":"Begin to crawl."}"#);
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_swallowed() {
        let notifier = SlackNotifier::new("http://127.0.0.1:9/hook", 1).unwrap();
        notifier.notify("still fine").await;
    }

    #[test]
    fn test_from_config_without_webhook() {
        assert!(from_config(&NotifyConfig::default()).is_ok());
    }
}
