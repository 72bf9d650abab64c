//! # feed — Market Feed Client
//!
//! [`MarketFeed`] is the capability the trading loop consumes: subscribe to
//! one instrument and get back a [`TickStream`]. Reconnects, filtering of
//! malformed frames and delivery pacing are the implementation's job and are
//! invisible to the caller.

pub mod handoff;
pub mod kraken;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Instrument;

pub use handoff::{handoff, FeedCancel, TickSender, TickStream};
pub use kraken::KrakenFeed;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket connect to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("subscribe request failed: {0}")]
    Subscribe(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode subscribe request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Open a tick stream for `instrument` on the feed at `address`.
    ///
    /// An error here means the first connection could not be established;
    /// later transport failures are retried internally.
    async fn subscribe(&self, address: &str, instrument: Instrument) -> Result<TickStream, FeedError>;
}
