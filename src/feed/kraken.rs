//! # feed::kraken
//!
//! Kraken Futures `ticker_lite` websocket feed.
//!
//! ```text
//!  subscribe() ──▶ connect + {"event":"subscribe","feed":"ticker_lite",...}
//!                     │
//!                     ▼
//!               FeedPump task ── read frame ── decode ── drop if no product_id
//!                     │  ▲                                   │
//!   read error / EOF  │  └──── pause(tick_spacing) ◀── deliver (one in flight)
//!                     ▼
//!               reconnect loop (pause, connect, resubscribe)
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{handoff, FeedError, MarketFeed, TickSender, TickStream};
use crate::models::{Instrument, PriceTick};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Serialize)]
struct SubscribeRequest<'a> {
    event:       &'a str,
    feed:        &'a str,
    product_ids: [&'a str; 1],
}

// ─── KrakenFeed ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct KrakenFeed {
    tick_spacing:    Duration,
    reconnect_delay: Duration,
}

impl KrakenFeed {
    pub fn new(tick_spacing: Duration, reconnect_delay: Duration) -> Self {
        Self {
            tick_spacing,
            reconnect_delay,
        }
    }
}

#[async_trait]
impl MarketFeed for KrakenFeed {
    async fn subscribe(&self, address: &str, instrument: Instrument) -> Result<TickStream, FeedError> {
        let ws = connect(address, instrument).await?;
        info!(%address, %instrument, "📡 [FEED] Subscribed to ticker_lite");

        let (tx, stream) = handoff();
        let pump = FeedPump {
            address: address.to_string(),
            instrument,
            tick_spacing: self.tick_spacing,
            reconnect_delay: self.reconnect_delay,
        };
        tokio::spawn(pump.run(ws, tx));

        Ok(stream)
    }
}

async fn connect(address: &str, instrument: Instrument) -> Result<WsStream, FeedError> {
    let (mut ws, _) = connect_async(address)
        .await
        .map_err(|source| FeedError::Connect {
            url: address.to_string(),
            source,
        })?;

    let request = serde_json::to_string(&SubscribeRequest {
        event:       "subscribe",
        feed:        "ticker_lite",
        product_ids: [instrument.product_id()],
    })?;

    ws.send(Message::Text(request))
        .await
        .map_err(FeedError::Subscribe)?;

    Ok(ws)
}

// ─── FeedPump ─────────────────────────────────────────────────────────────────

struct FeedPump {
    address:         String,
    instrument:      Instrument,
    tick_spacing:    Duration,
    reconnect_delay: Duration,
}

impl FeedPump {
    async fn run(self, mut ws: WsStream, mut tx: TickSender) {
        loop {
            let frame = tokio::select! {
                _ = tx.stopped() => break,
                frame = ws.next() => frame,
            };

            let lost = match frame {
                Some(Ok(Message::Text(text))) => {
                    let tick: PriceTick = match serde_json::from_str(&text) {
                        Ok(tick) => tick,
                        Err(e) => {
                            debug!(error = %e, "Undecodable feed frame skipped");
                            continue;
                        }
                    };
                    if !tick.is_valid() {
                        continue;
                    }
                    if !tx.deliver(tick).await || !tx.pause(self.tick_spacing).await {
                        break;
                    }
                    false
                }
                Some(Ok(Message::Close(frame))) => {
                    warn!(?frame, "Feed closed by server");
                    true
                }
                Some(Ok(_)) => false,
                Some(Err(e)) => {
                    warn!(error = %e, "Feed read failed");
                    true
                }
                None => {
                    warn!("Feed stream ended");
                    true
                }
            };

            if lost {
                match self.reconnect(&mut tx).await {
                    Some(fresh) => ws = fresh,
                    None => return,
                }
            }
        }

        let _ = ws.close(None).await;
        debug!(instrument = %self.instrument, "Feed subscription released");
    }

    /// Reconnect and resubscribe until it works or the subscription is
    /// cancelled (`None`).
    async fn reconnect(&self, tx: &mut TickSender) -> Option<WsStream> {
        let mut attempt: u32 = 0;
        loop {
            if !tx.pause(self.reconnect_delay).await {
                return None;
            }
            attempt += 1;

            let result = tokio::select! {
                _ = tx.stopped() => return None,
                result = connect(&self.address, self.instrument) => result,
            };

            match result {
                Ok(ws) => {
                    info!(attempt, instrument = %self.instrument, "🔌 [FEED] Reconnected");
                    return Some(ws);
                }
                Err(e) => warn!(attempt, error = %e, "Feed reconnect failed"),
            }
        }
    }
}
