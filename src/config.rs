//! # config — read configuration from environment variables
//!
//! | Variable             | Default                                                        |
//! |----------------------|----------------------------------------------------------------|
//! | `BIND_ADDR`          | `0.0.0.0:5000`                                                 |
//! | `DATABASE_URL`       | unset → in-memory ledger                                       |
//! | `KRAKEN_PUBLIC_KEY`  | required                                                       |
//! | `KRAKEN_PRIVATE_KEY` | required (base64, as issued by the exchange)                   |
//! | `FEED_URL`           | `wss://demo-futures.kraken.com/ws/v1`                          |
//! | `ORDER_URL`          | `https://demo-futures.kraken.com/derivatives/api/v3/sendorder` |
//! | `TELEGRAM_BOT_TOKEN` | unset → notifications go to the log only                       |
//! | `TELEGRAM_CHAT_ID`   | required when the token is set                                 |
//! | `API_KEY`            | unset → control surface open (dev mode)                        |
//! | `POLL_INTERVAL_MS`   | `100`                                                          |
//! | `TICK_SPACING_MS`    | `100`                                                          |
//! | `RECONNECT_DELAY_MS` | `1000`                                                         |

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id:   String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr:       SocketAddr,
    pub database_url:    Option<String>,
    pub public_key:      String,
    pub private_key:     String,
    pub feed_url:        String,
    pub order_url:       String,
    pub telegram:        Option<TelegramConfig>,
    pub api_key:         Option<String>,
    /// How often the idle loop looks at the run flag.
    pub poll_interval:   Duration,
    /// Minimum spacing between two ticks delivered by the feed.
    pub tick_spacing:    Duration,
    /// Pause before each reconnect attempt of the feed.
    pub reconnect_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let public_key = std::env::var("KRAKEN_PUBLIC_KEY")
            .context("KRAKEN_PUBLIC_KEY environment variable is required")?;
        let private_key = std::env::var("KRAKEN_PRIVATE_KEY")
            .context("KRAKEN_PRIVATE_KEY environment variable is required")?;

        let telegram = match (non_empty("TELEGRAM_BOT_TOKEN"), non_empty("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            (None, None) => None,
            (Some(_), None) => bail!("TELEGRAM_CHAT_ID is required when TELEGRAM_BOT_TOKEN is set"),
            (None, Some(_)) => bail!("TELEGRAM_BOT_TOKEN is required when TELEGRAM_CHAT_ID is set"),
        };

        let poll_interval = env_millis("POLL_INTERVAL_MS", 100)?;
        if poll_interval.is_zero() || poll_interval >= Duration::from_secs(1) {
            bail!("POLL_INTERVAL_MS must be between 1 and 999");
        }

        Ok(Self {
            bind_addr,
            database_url:    non_empty("DATABASE_URL"),
            public_key,
            private_key,
            feed_url:        std::env::var("FEED_URL")
                .unwrap_or_else(|_| "wss://demo-futures.kraken.com/ws/v1".to_string()),
            order_url:       std::env::var("ORDER_URL")
                .unwrap_or_else(|_| "https://demo-futures.kraken.com/derivatives/api/v3/sendorder".to_string()),
            telegram,
            api_key:         non_empty("API_KEY"),
            poll_interval,
            tick_spacing:    env_millis("TICK_SPACING_MS", 100)?,
            reconnect_delay: env_millis("RECONNECT_DELAY_MS", 1000)?,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_millis(key: &str, default: u64) -> anyhow::Result<Duration> {
    let ms = match std::env::var(key) {
        Ok(v) => v.parse().with_context(|| format!("{key} must be a number of milliseconds"))?,
        Err(_) => default,
    };
    Ok(Duration::from_millis(ms))
}
