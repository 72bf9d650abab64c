//! # notify — operator notifications
//!
//! Fire-and-forget text messages about opened/closed positions and failed
//! orders. A failed delivery is logged and never reaches the trading loop.

pub mod telegram;

use async_trait::async_trait;
use tracing::info;

pub use telegram::TelegramNotifier;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str);
}

/// Writes notifications to the log. Used when no Telegram bot is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) {
        info!(message = %text, "📣 [NOTIFY]");
    }
}
