//! # engine::report
//!
//! Operator notification texts. Prices are printed with one decimal.

use crate::models::{Instrument, Side};

use super::probe::Limits;

pub fn opened(instrument: Instrument, side: Side, size: u32, price: f64, limits: Limits) -> String {
    format!(
        "Order had been opened.\n\
         Instrument - {instrument}, side - {side}, size - {size}, price - {price:.1}\n\
         Stoploss/takeprofit is {:.1}/{:.1}\n",
        limits.upper, limits.lower
    )
}

/// `side` is the closing side and `profit` is already multiplied by size.
pub fn closed(
    instrument: Instrument,
    side: Side,
    size: u32,
    entry: f64,
    close: f64,
    profit: f64,
    total: Option<f64>,
) -> String {
    let total = match total {
        Some(t) => format!("{t:.1}"),
        None => "unavailable".to_string(),
    };
    format!(
        "Order had been closed.\n\
         Instrument - {instrument}, side - {side}, size - {size}, \
         open price - {entry:.1}, close price - {close:.1}, profit is {profit:.1}\n\
         Total profit is {total}"
    )
}

pub fn not_placed(reason: &str) -> String {
    format!("Order hadn't been placed: {reason}")
}

pub fn left_open(instrument: Instrument, side: Side, size: u32, entry: f64) -> String {
    format!(
        "Price feed lost, position is left open.\n\
         Instrument - {instrument}, side - {side}, size - {size}, open price - {entry:.1}"
    )
}
