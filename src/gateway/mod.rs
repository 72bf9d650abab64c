//! # gateway — Order Gateway
//!
//! [`OrderGateway`] submits one market order and reports how the exchange
//! answered. Transport and decoding problems come back as [`GatewayError`];
//! an exchange that answers but refuses the order comes back as an
//! [`OrderResult`] that is not accepted.

pub mod kraken;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Instrument, OrderResult, Side};

pub use kraken::KrakenGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("order endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid order endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("API secret is not valid base64: {0}")]
    Secret(#[from] base64::DecodeError),

    #[error("order response could not be decoded (HTTP {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit(
        &self,
        instrument: Instrument,
        side: Side,
        size: u32,
        endpoint: &str,
    ) -> Result<OrderResult, GatewayError>;
}
