//! Domain models shared by the control surface, the trading loop and the
//! collaborators.

pub mod order;
pub mod params;
pub mod position;
pub mod tick;

pub use order::{OrderOutcome, OrderResult, OrderStatus};
pub use params::{Instrument, Side, StrategyParams};
pub use position::{PositionRecord, RecordKind};
pub use tick::PriceTick;
