//! # feed::handoff
//!
//! Rendezvous hand-off between the feed's producer task and the trading loop.
//!
//! * At most one tick is in flight: the producer cannot read the next frame
//!   until the consumer has taken the previous tick, so a stalled loop
//!   back-pressures the socket instead of growing a buffer.
//! * Every send attempt races a cancellation token. A producer blocked on a
//!   send is released as soon as the consumer cancels, whichever task calls
//!   [`FeedCancel::cancel`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::models::PriceTick;

/// Build a connected producer/consumer pair.
pub fn handoff() -> (TickSender, TickStream) {
    let (tx, rx) = mpsc::channel(1);
    let (stop_tx, stop_rx) = watch::channel(false);
    let cancel = FeedCancel {
        stop: Arc::new(stop_tx),
    };

    (
        TickSender { tx, stop: stop_rx },
        TickStream { rx, cancel },
    )
}

// ─── FeedCancel ───────────────────────────────────────────────────────────────

/// Cloneable cancellation token of one subscription.
#[derive(Clone, Debug)]
pub struct FeedCancel {
    stop: Arc<watch::Sender<bool>>,
}

impl FeedCancel {
    /// Ask the producer to stop. Idempotent, never blocks.
    pub fn cancel(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.stop.borrow()
    }
}

// ─── TickSender ───────────────────────────────────────────────────────────────

/// Producer half, owned by the feed task.
pub struct TickSender {
    tx: mpsc::Sender<PriceTick>,
    stop: watch::Receiver<bool>,
}

impl TickSender {
    /// Hand one tick to the consumer.
    ///
    /// Returns `false` when the subscription was cancelled or the consumer is
    /// gone; the producer must stop then.
    pub async fn deliver(&mut self, tick: PriceTick) -> bool {
        if self.is_stopped() {
            return false;
        }

        let sent = tokio::select! {
            biased;
            _ = cancelled(&mut self.stop) => false,
            res = self.tx.send(tick) => res.is_ok(),
        };

        sent && !self.is_stopped()
    }

    /// Sleep for `period` unless cancelled first. Returns `false` on cancel.
    pub async fn pause(&mut self, period: Duration) -> bool {
        let slept = tokio::select! {
            biased;
            _ = cancelled(&mut self.stop) => false,
            _ = tokio::time::sleep(period) => true,
        };

        slept && !self.is_stopped()
    }

    /// Resolves once the subscription is cancelled or the consumer dropped
    /// the stream.
    pub async fn stopped(&mut self) {
        tokio::select! {
            _ = cancelled(&mut self.stop) => {}
            _ = self.tx.closed() => {}
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow() || self.tx.is_closed()
    }
}

/// Resolves once the token is set or every canceller is gone.
async fn cancelled(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

// ─── TickStream ───────────────────────────────────────────────────────────────

/// Consumer half, owned by the trading loop.
pub struct TickStream {
    rx: mpsc::Receiver<PriceTick>,
    cancel: FeedCancel,
}

impl TickStream {
    /// Next tick, or `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<PriceTick> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.rx.recv().await
    }

    /// Token that cancels this subscription from any task.
    pub fn canceller(&self) -> FeedCancel {
        self.cancel.clone()
    }

    /// Release the subscription: stop the producer and drop any pending tick.
    pub fn cancel(mut self) {
        self.cancel.cancel();
        self.rx.close();
    }
}

impl Drop for TickStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
