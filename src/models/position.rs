//! # models::position
//!
//! Defines [`PositionRecord`], the row the ledger stores every time a
//! position is opened or closed. Records are immutable once built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Instrument, Side};

// ─── RecordKind ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Open,
    Close,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Open => "open",
            RecordKind::Close => "close",
        }
    }
}

// ─── PositionRecord ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionRecord {
    pub record_id: Uuid,
    pub instrument: Instrument,
    pub size: u32,
    /// Side of the order that produced this record (the closing side on close).
    pub side: Side,
    /// Fill price on open, observed close price on close.
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    pub kind: RecordKind,
    /// Realised profit × size. Always 0 on open.
    pub profit: f64,
    /// Carries the profit percentage on open and 0 on close.
    pub stop_loss: f64,
}

impl PositionRecord {
    pub fn opened(instrument: Instrument, size: u32, side: Side, price: f64, profit_pct: f64) -> Self {
        Self {
            record_id:  Uuid::new_v4(),
            instrument,
            size,
            side,
            price,
            timestamp:  Utc::now(),
            kind:       RecordKind::Open,
            profit:     0.0,
            stop_loss:  profit_pct,
        }
    }

    pub fn closed(instrument: Instrument, size: u32, side: Side, price: f64, profit: f64) -> Self {
        Self {
            record_id:  Uuid::new_v4(),
            instrument,
            size,
            side,
            price,
            timestamp:  Utc::now(),
            kind:       RecordKind::Close,
            profit,
            stop_loss:  0.0,
        }
    }
}
