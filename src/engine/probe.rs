//! # engine::probe
//!
//! Pure per-tick decisions used by the trading loop: which side to open
//! when the operator left it unset, where the exit limits sit, and what
//! price a tick closes the position at.

use crate::models::{PriceTick, Side};

/// Number of ticks sampled before a side is chosen.
pub const PROBE_TICKS: usize = 7;

// ─── Direction probe ──────────────────────────────────────────────────────────

/// Running min/max of the ask over the first [`PROBE_TICKS`] ticks.
///
/// After the last sample: `buy` when the last ask is at or below the
/// midpoint of the observed range, `sell` otherwise.
#[derive(Debug, Default, Clone)]
pub struct DirectionProbe {
    seen: usize,
    min:  f64,
    max:  f64,
    last: f64,
}

impl DirectionProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one ask. Returns the chosen side once enough ticks were seen.
    pub fn observe(&mut self, ask: f64) -> Option<Side> {
        if self.seen == 0 {
            self.min = ask;
            self.max = ask;
        } else {
            self.min = self.min.min(ask);
            self.max = self.max.max(ask);
        }
        self.last = ask;
        self.seen += 1;

        (self.seen >= PROBE_TICKS).then(|| self.decide())
    }

    pub fn mid(&self) -> f64 {
        (self.max + self.min) / 2.0
    }

    fn decide(&self) -> Side {
        if self.last <= self.mid() {
            Side::Buy
        } else {
            Side::Sell
        }
    }
}

// ─── Exit limits ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub upper: f64,
    pub lower: f64,
}

impl Limits {
    /// Symmetric band of `profit_pct` percent around the entry price.
    pub fn around(entry: f64, profit_pct: f64) -> Self {
        Self {
            upper: entry * (1.0 + profit_pct / 100.0),
            lower: entry * (1.0 - profit_pct / 100.0),
        }
    }

    /// Strictly outside the band.
    pub fn breached_by(&self, price: f64) -> bool {
        price > self.upper || price < self.lower
    }
}

/// Price a position on `side` would be closed at: bid for longs, ask for shorts.
#[inline]
pub fn close_price(side: Side, tick: &PriceTick) -> f64 {
    match side {
        Side::Buy => tick.bid,
        Side::Sell => tick.ask,
    }
}

/// Per-contract profit of a position opened on `side`.
#[inline]
pub fn profit_per_contract(side: Side, entry: f64, close: f64) -> f64 {
    match side {
        Side::Buy => close - entry,
        Side::Sell => entry - close,
    }
}
