//! # models::params
//!
//! Defines [`StrategyParams`], the operator-supplied configuration that the
//! control surface writes and the trading loop snapshots once per iteration.
//!
//! On the wire the struct keeps the operator's field names
//! (`start`, `ticker`, `size`, `profit`, `side`) with `start` as `0`/`1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

// ─── Instrument ───────────────────────────────────────────────────────────────

/// The fixed whitelist of perpetual futures the robot is allowed to trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    #[serde(rename = "PI_XBTUSD")]
    XbtUsd,
    #[serde(rename = "PI_ETHUSD")]
    EthUsd,
    #[serde(rename = "PI_LTCUSD")]
    LtcUsd,
    #[serde(rename = "PI_XRPUSD")]
    XrpUsd,
    #[serde(rename = "PI_BCHUSD")]
    BchUsd,
}

impl Instrument {
    pub const ALL: [Instrument; 5] = [
        Instrument::XbtUsd,
        Instrument::EthUsd,
        Instrument::LtcUsd,
        Instrument::XrpUsd,
        Instrument::BchUsd,
    ];

    /// Product id as used by the feed and in operator messages, e.g. `PI_XBTUSD`.
    pub fn product_id(self) -> &'static str {
        match self {
            Instrument::XbtUsd => "PI_XBTUSD",
            Instrument::EthUsd => "PI_ETHUSD",
            Instrument::LtcUsd => "PI_LTCUSD",
            Instrument::XrpUsd => "PI_XRPUSD",
            Instrument::BchUsd => "PI_BCHUSD",
        }
    }

    /// Symbol expected by the order endpoint (lower-cased product id).
    pub fn order_symbol(self) -> String {
        self.product_id().to_lowercase()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.product_id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'ticker' option must be 'PI_XBTUSD' or 'PI_ETHUSD' or 'PI_LTCUSD' or 'PI_XRPUSD' or 'PI_BCHUSD'")]
pub struct UnknownInstrument;

impl FromStr for Instrument {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::ALL
            .into_iter()
            .find(|i| i.product_id() == s)
            .ok_or(UnknownInstrument)
    }
}

// ─── Side ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side that flattens a position opened on `self`.
    pub fn reversed(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── StrategyParams ───────────────────────────────────────────────────────────

/// Current strategy configuration.
///
/// `Default` is the all-zero value the process starts with: stopped, no
/// instrument, size 0, profit 0, no preferred side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategyParams {
    /// Run flag. `true` asks the trading loop to run one cycle.
    #[serde(rename = "start", serialize_with = "flag_as_int")]
    pub running: bool,

    #[serde(rename = "ticker")]
    pub instrument: Option<Instrument>,

    /// Order size in contracts.
    pub size: u32,

    /// Take-profit / stop-loss distance, in percent of the entry price.
    #[serde(rename = "profit")]
    pub profit_pct: f64,

    /// Preferred side. `None` lets the direction probe decide.
    pub side: Option<Side>,
}

fn flag_as_int<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*flag))
}
