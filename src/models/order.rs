//! # models::order
//!
//! [`OrderResult`] is what the trading loop sees after a market order
//! submission. [`SendOrderResponse`] is the raw JSON body returned by the
//! `sendorder` endpoint, converted into an `OrderResult` by the gateway.

use std::fmt;

use serde::Deserialize;

// ─── OrderResult ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Success,
    Error,
}

/// `sendStatus.status` from the exchange. Anything other than `placed` means
/// the order did not go through (e.g. `insufficientAvailableFunds`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStatus {
    Placed,
    Error,
    Other(String),
}

impl OrderStatus {
    fn from_wire(status: &str) -> Self {
        match status {
            "placed" => OrderStatus::Placed,
            "error" => OrderStatus::Error,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Placed => f.write_str("placed"),
            OrderStatus::Error => f.write_str("error"),
            OrderStatus::Other(s) if s.is_empty() => f.write_str("no send status"),
            OrderStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Structured result of one order submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub outcome: OrderOutcome,
    pub status: OrderStatus,
    pub order_id: Option<String>,
    /// Price of the first fill event, when the exchange reported one.
    pub fill_price: Option<f64>,
    pub raw_error: Option<String>,
}

impl OrderResult {
    /// `true` only for `result=success` together with `status=placed`.
    pub fn is_accepted(&self) -> bool {
        self.outcome == OrderOutcome::Success && self.status == OrderStatus::Placed
    }

    /// Short human-readable reason used in operator notifications.
    pub fn rejection_reason(&self) -> String {
        match self.outcome {
            OrderOutcome::Success => self.status.to_string(),
            OrderOutcome::Error => match self.raw_error.as_deref() {
                Some(e) if !e.is_empty() => format!("error ({e})"),
                _ => "error".to_string(),
            },
        }
    }
}

// ─── Wire format ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendOrderResponse {
    pub result: String,
    #[serde(rename = "sendStatus", default)]
    pub send_status: Option<SendStatus>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendStatus {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "orderEvents", default)]
    pub order_events: Vec<OrderEvent>,
}

#[derive(Debug, Deserialize)]
pub struct OrderEvent {
    #[serde(default)]
    pub price: Option<f64>,
}

impl From<SendOrderResponse> for OrderResult {
    fn from(resp: SendOrderResponse) -> Self {
        let outcome = if resp.result == "success" {
            OrderOutcome::Success
        } else {
            OrderOutcome::Error
        };

        let (status, order_id, fill_price) = match resp.send_status {
            Some(s) => (
                OrderStatus::from_wire(&s.status),
                s.order_id,
                s.order_events.iter().find_map(|e| e.price),
            ),
            None => (OrderStatus::Other(String::new()), None, None),
        };

        Self {
            outcome,
            status,
            order_id,
            fill_price,
            raw_error: resp.error,
        }
    }
}
