//! # models::tick
//!
//! Defines [`PriceTick`], one bid/ask observation pushed by the market feed.
//!
//! The struct doubles as the decode target for the feed's `ticker_lite`
//! frames. Control frames (`subscribed`, `info`, heartbeats) decode with an
//! empty `instrument_id` and are dropped by the feed before delivery.

use serde::Deserialize;

/// A single price tick for the subscribed instrument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceTick {
    /// Exchange product id, e.g. `"PI_XBTUSD"`. Empty for non-ticker frames.
    #[serde(rename = "product_id", default)]
    pub instrument_id: String,

    /// Best bid: the price a long position is closed at.
    #[serde(default)]
    pub bid: f64,

    /// Best ask: the price a short position is closed at.
    #[serde(default)]
    pub ask: f64,
}

impl PriceTick {
    pub fn new(instrument_id: impl Into<String>, bid: f64, ask: f64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            bid,
            ask,
        }
    }

    /// `false` for frames that carry no instrument id.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.instrument_id.is_empty()
    }
}
