//! Discord webhook notifications
//!
//! Every message is written to the log. When a webhook is configured the
//! same text is posted to it as a plain `content` message.

#![allow(async_fn_in_trait)]

use crate::config::{Mention, NotificationConfig};
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sent once when the agent starts
pub const STARTUP_MESSAGE: &str = "===========\n**Bot started**\n===========";

/// Delivers a finished message somewhere operators will see it
pub trait Notifier {
    /// Deliver `message`. Failures are logged, never returned.
    async fn notify(&self, message: &str);
}

/// Discord webhook payload
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Notifier posting to a Discord-compatible webhook
pub struct WebhookNotifier {
    webhook: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            webhook: config.webhook.clone(),
            client,
        })
    }

    /// Check if a webhook is configured
    pub fn is_enabled(&self) -> bool {
        !self.webhook.is_empty()
    }

    /// Send webhook to Discord
    async fn send_webhook(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook)
            .json(&WebhookPayload { content: message })
            .send()
            .await
            .context("Failed to send Discord webhook")?;

        let status = response.status();
        if status.is_success() {
            debug!("Discord webhook sent successfully");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord webhook failed with status {}: {}", status, body)
        }
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        info!("{}", message);

        if !self.is_enabled() {
            return;
        }

        if let Err(e) = self.send_webhook(message).await {
            warn!("Failed to deliver notification: {:#}", e);
        }
    }
}

/// Render mentions as a line to put under a block header.
///
/// Empty when there is nobody to mention, otherwise a newline followed by the
/// tags joined with `, `.
pub fn render_mentions(mentions: &[Mention]) -> String {
    if mentions.is_empty() {
        return String::new();
    }

    let tags: Vec<String> = mentions.iter().map(Mention::to_string).collect();
    format!("\n{}", tags.join(", "))
}

pub fn success_message(archive: &str) -> String {
    format!("Successful backup! Archive: {}", archive)
}

pub fn error_block(error: &str, mentions: &[Mention]) -> String {
    format!("**ERROR**{}\n{}", render_mentions(mentions), error)
}

pub fn warning_block(warning: &str, mentions: &[Mention]) -> String {
    format!("**WARNING**{}\n{}", render_mentions(mentions), warning)
}

/// Build the message for a finished cycle
pub fn compose_message(
    outcome: Result<&str, &str>,
    warning: Option<&str>,
    config: &NotificationConfig,
) -> String {
    let mut message = match outcome {
        Ok(archive) => success_message(archive),
        Err(error) => error_block(error, &config.error_mentions),
    };

    if let Some(warning) = warning {
        message.push_str("\n\n");
        message.push_str(&warning_block(warning, &config.warning_mentions));
    }

    message
}

/// Recording notifier for tests
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct MockNotifier {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl MockNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all delivered messages
        pub fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }

        pub fn last(&self) -> Option<String> {
            self.messages.lock().unwrap().last().cloned()
        }
    }

    impl Notifier for MockNotifier {
        async fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}
