//! # state
//!
//! The robot's **shared application state**. Both the control surface
//! (writes) and the trading loop (reads, and resets the run flag) hold a
//! clone of the same [`ParamStore`].
//!
//! ## Locking rules
//!
//! * One `tokio::sync::Mutex` guards the whole [`StrategyParams`] value, so a
//!   reader never observes a half-applied update.
//! * Reads return an owned copy. No guard escapes this module, so no lock is
//!   ever held across feed reads, order submissions or ledger writes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::StrategyParams;

// ─── ParamStore ───────────────────────────────────────────────────────────────

/// Mutex-guarded holder of the current [`StrategyParams`].
#[derive(Clone, Default)]
pub struct ParamStore {
    inner: Arc<Mutex<StrategyParams>>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every field, run flag included.
    pub async fn set_all(&self, params: StrategyParams) {
        *self.inner.lock().await = params;
    }

    /// Replace instrument, size, profit and side; keep the stored run flag.
    pub async fn set_without_run_flag(&self, params: StrategyParams) {
        let mut guard = self.inner.lock().await;
        *guard = StrategyParams {
            running: guard.running,
            ..params
        };
    }

    pub async fn set_run_flag(&self, running: bool) {
        self.inner.lock().await.running = running;
    }

    /// Point-in-time copy of the current parameters.
    pub async fn get(&self) -> StrategyParams {
        self.inner.lock().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }
}

// ─── LoopMetrics ──────────────────────────────────────────────────────────────

/// Counters bumped by the trading loop and read by `/health`.
#[derive(Debug, Default)]
pub struct LoopMetrics {
    pub cycles_started:   AtomicU64,
    pub cycles_completed: AtomicU64,
    pub orders_submitted: AtomicU64,
    pub ticks_consumed:   AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cycles_started:   u64,
    pub cycles_completed: u64,
    pub orders_submitted: u64,
    pub ticks_consumed:   u64,
}

impl LoopMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_started:   self.cycles_started.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            orders_submitted: self.orders_submitted.load(Ordering::Relaxed),
            ticks_consumed:   self.ticks_consumed.load(Ordering::Relaxed),
        }
    }
}

// ─── AppState ─────────────────────────────────────────────────────────────────

/// Top-level shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub params: ParamStore,
    pub metrics: Arc<LoopMetrics>,
    /// Value required in `X-API-Key`. `None` disables the check.
    pub api_key: Option<String>,
}

impl AppState {
    pub fn new(params: ParamStore, metrics: Arc<LoopMetrics>, api_key: Option<String>) -> Self {
        Self {
            params,
            metrics,
            api_key,
        }
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;
