//! # engine
//!
//! * [`probe`]  : pure per-tick decisions (direction probe, exit limits)
//! * [`report`] : operator notification texts
//! * [`robot`]  : the trading loop state machine

pub mod probe;
pub mod report;
pub mod robot;

pub use robot::{LoopSettings, TradingLoop};
