//! # notify::telegram
//!
//! Sends each notification with the Bot API `sendMessage` call.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::Notifier;
use crate::config::TelegramConfig;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text:    &'a str,
}

pub struct TelegramNotifier {
    client:   reqwest::Client,
    config:   TelegramConfig,
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, config: TelegramConfig) -> Self {
        Self {
            client,
            config,
            base_url: TELEGRAM_API.to_string(),
        }
    }

    /// Point at another Bot API host (a local mock in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn deliver(&self, text: &str) -> Result<(), String> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.config.bot_token);

        let resp = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: &self.config.chat_id,
                text,
            })
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| format!("telegram unreachable: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("telegram rejected message: HTTP {status}: {body}"));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) {
        match self.deliver(text).await {
            Ok(()) => debug!(chat_id = %self.config.chat_id, "Notification delivered"),
            Err(e) => warn!(error = %e, message = %text, "⚠️ Notification dropped"),
        }
    }
}
