//! # engine::robot
//!
//! The **Trading Loop**. One long-lived task that turns the operator's run
//! flag into exactly one position at a time.
//!
//! ```text
//!   Idle ──flag=1──▶ Opening ──side unset──▶ DirectionProbe (7 ticks)
//!    ▲                  │                          │
//!    │                  ▼                          ▼
//!    │             open order ◀────────────────────┘
//!    │                  │ accepted
//!    │                  ▼
//!    │             Monitoring ── limit breached / flag=0 / shutdown
//!    │                  │
//!    │                  ▼
//!    └──────────── Closing (reversed side)
//! ```
//!
//! Every cycle ends with the run flag at 0, whatever happened. A failed
//! external call aborts the current cycle only.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::probe::{self, DirectionProbe, Limits};
use super::report;
use crate::feed::{MarketFeed, TickStream};
use crate::gateway::OrderGateway;
use crate::ledger::Ledger;
use crate::models::{Instrument, PositionRecord, PriceTick, Side};
use crate::notify::Notifier;
use crate::state::{LoopMetrics, ParamStore};

/// Endpoints and pacing the loop runs with.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub feed_url:      String,
    pub order_url:     String,
    pub poll_interval: Duration,
}

/// How one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Position opened and closed.
    Completed,
    /// Cycle gave up before a position was closed.
    Aborted,
    /// Shutdown was requested during the cycle. Any open position was closed
    /// first when possible.
    Shutdown,
}

enum Next {
    Tick(PriceTick),
    Ended,
    Shutdown,
}

pub struct TradingLoop {
    params:   ParamStore,
    feed:     Arc<dyn MarketFeed>,
    gateway:  Arc<dyn OrderGateway>,
    ledger:   Arc<dyn Ledger>,
    notifier: Arc<dyn Notifier>,
    settings: LoopSettings,
    metrics:  Arc<LoopMetrics>,
}

impl TradingLoop {
    pub fn new(
        params: ParamStore,
        feed: Arc<dyn MarketFeed>,
        gateway: Arc<dyn OrderGateway>,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
        settings: LoopSettings,
        metrics: Arc<LoopMetrics>,
    ) -> Self {
        Self {
            params,
            feed,
            gateway,
            ledger,
            notifier,
            settings,
            metrics,
        }
    }

    // ─── Idle ─────────────────────────────────────────────────────────────────

    /// Poll the run flag until `shutdown` flips to `true` (or its sender is
    /// dropped), running one cycle each time the flag is set.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_ms = self.settings.poll_interval.as_millis() as u64, "🤖 [LOOP] Trading loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            if self.params.is_running().await {
                if self.run_cycle(&mut shutdown).await == CycleOutcome::Shutdown {
                    break;
                }
                continue;
            }

            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }

        info!("🛑 [LOOP] Trading loop stopped");
    }

    /// One Opening → (Probe) → Monitoring → Closing pass.
    pub async fn run_cycle(&self, shutdown: &mut watch::Receiver<bool>) -> CycleOutcome {
        let params = self.params.get().await;
        self.metrics.cycles_started.fetch_add(1, Ordering::Relaxed);

        // ── 1. Opening ───────────────────────────────────────────────────────
        let Some(instrument) = params.instrument else {
            warn!("Run flag set without an instrument, cycle skipped");
            self.params.set_run_flag(false).await;
            return CycleOutcome::Aborted;
        };
        let size = params.size;

        info!(%instrument, size, profit_pct = params.profit_pct, side = ?params.side, "▶️ [LOOP] Cycle started");

        let mut stream = match self.feed.subscribe(&self.settings.feed_url, instrument).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, %instrument, "Feed subscription failed, cycle aborted");
                self.params.set_run_flag(false).await;
                return CycleOutcome::Aborted;
            }
        };

        // ── 2. Direction probe ───────────────────────────────────────────────
        let side = match params.side {
            Some(side) => side,
            None => match self.probe_direction(&mut stream, shutdown).await {
                ProbeEnd::Side(side) => side,
                ProbeEnd::Ended => {
                    warn!(%instrument, "Feed ended during direction probe, cycle aborted");
                    self.abort(stream).await;
                    return CycleOutcome::Aborted;
                }
                ProbeEnd::Shutdown => {
                    info!("Shutdown during direction probe, cycle aborted");
                    self.abort(stream).await;
                    return CycleOutcome::Shutdown;
                }
            },
        };

        // ── 3. Open order ────────────────────────────────────────────────────
        let entry = match self.place(instrument, side, size).await {
            Ok(price) => price,
            Err(reason) => {
                self.fail(stream, &reason).await;
                return CycleOutcome::Aborted;
            }
        };

        let limits = Limits::around(entry, params.profit_pct);
        info!(
            %instrument,
            %side,
            entry,
            upper = limits.upper,
            lower = limits.lower,
            "📈 [LOOP] Position opened"
        );

        let opened = PositionRecord::opened(instrument, size, side, entry, params.profit_pct);
        if let Err(e) = self.ledger.append_record(&opened).await {
            error!(error = %e, record_id = %opened.record_id, "Failed to store open record");
        }
        self.notifier
            .send(&report::opened(instrument, side, size, entry, limits))
            .await;

        // ── 4. Monitoring ────────────────────────────────────────────────────
        let mut close_price = entry;
        let mut shutting_down = false;
        loop {
            match next_tick(&mut stream, shutdown).await {
                Next::Tick(tick) => {
                    self.metrics.ticks_consumed.fetch_add(1, Ordering::Relaxed);
                    close_price = probe::close_price(side, &tick);

                    if limits.breached_by(close_price) {
                        info!(close_price, "🎯 [LOOP] Limit reached");
                        break;
                    }
                    if !self.params.is_running().await {
                        info!(close_price, "Run flag cleared by operator");
                        break;
                    }
                }
                Next::Ended => {
                    warn!(%instrument, %side, entry, "Feed ended while monitoring, position left open");
                    self.notifier
                        .send(&report::left_open(instrument, side, size, entry))
                        .await;
                    self.abort(stream).await;
                    return CycleOutcome::Aborted;
                }
                Next::Shutdown => {
                    info!(close_price, "Shutdown while monitoring, closing position");
                    shutting_down = true;
                    break;
                }
            }
        }

        // ── 5. Closing ───────────────────────────────────────────────────────
        let closing_side = side.reversed();
        if let Err(reason) = self.place(instrument, closing_side, size).await {
            self.fail(stream, &reason).await;
            return if shutting_down { CycleOutcome::Shutdown } else { CycleOutcome::Aborted };
        }

        stream.cancel();
        self.params.set_run_flag(false).await;

        let profit = probe::profit_per_contract(side, entry, close_price) * f64::from(size);
        let closed = PositionRecord::closed(instrument, size, closing_side, close_price, profit);
        if let Err(e) = self.ledger.append_record(&closed).await {
            error!(error = %e, record_id = %closed.record_id, "Failed to store close record");
        }

        let total = match self.ledger.total_profit().await {
            Ok(total) => Some(total),
            Err(e) => {
                error!(error = %e, "Failed to read total profit");
                None
            }
        };

        info!(%instrument, entry, close_price, profit, total = ?total, "📉 [LOOP] Position closed");
        self.notifier
            .send(&report::closed(instrument, closing_side, size, entry, close_price, profit, total))
            .await;
        self.metrics.cycles_completed.fetch_add(1, Ordering::Relaxed);

        if shutting_down {
            CycleOutcome::Shutdown
        } else {
            CycleOutcome::Completed
        }
    }

    // ─── Helpers ──────────────────────────────────────────────────────────────

    /// Sample [`probe::PROBE_TICKS`] asks and pick a side.
    async fn probe_direction(&self, stream: &mut TickStream, shutdown: &mut watch::Receiver<bool>) -> ProbeEnd {
        let mut probe = DirectionProbe::new();
        loop {
            match next_tick(stream, shutdown).await {
                Next::Tick(tick) => {
                    self.metrics.ticks_consumed.fetch_add(1, Ordering::Relaxed);
                    if let Some(side) = probe.observe(tick.ask) {
                        debug!(mid = probe.mid(), last_ask = tick.ask, %side, "Direction probe finished");
                        return ProbeEnd::Side(side);
                    }
                }
                Next::Ended => return ProbeEnd::Ended,
                Next::Shutdown => return ProbeEnd::Shutdown,
            }
        }
    }

    /// Submit one market order. `Ok` carries the fill price; `Err` the reason
    /// shown to the operator.
    async fn place(&self, instrument: Instrument, side: Side, size: u32) -> Result<f64, String> {
        self.metrics.orders_submitted.fetch_add(1, Ordering::Relaxed);

        let result = self
            .gateway
            .submit(instrument, side, size, &self.settings.order_url)
            .await
            .map_err(|e| {
                error!(error = %e, %instrument, %side, "Order submission failed");
                e.to_string()
            })?;

        if !result.is_accepted() {
            warn!(status = %result.status, error = ?result.raw_error, "Order rejected by exchange");
            return Err(result.rejection_reason());
        }

        result.fill_price.ok_or_else(|| {
            warn!(order_id = ?result.order_id, "Order placed without a fill price");
            "placed without fill price".to_string()
        })
    }

    /// Notify the operator of a failed order and end the cycle.
    async fn fail(&self, stream: TickStream, reason: &str) {
        self.notifier.send(&report::not_placed(reason)).await;
        self.abort(stream).await;
    }

    async fn abort(&self, stream: TickStream) {
        stream.cancel();
        self.params.set_run_flag(false).await;
    }
}

enum ProbeEnd {
    Side(Side),
    Ended,
    Shutdown,
}

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn next_tick(stream: &mut TickStream, shutdown: &mut watch::Receiver<bool>) -> Next {
    tokio::select! {
        biased;
        _ = shutdown_requested(shutdown) => Next::Shutdown,
        tick = stream.next() => match tick {
            Some(tick) => Next::Tick(tick),
            None => Next::Ended,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::feed::{handoff, FeedError};
    use crate::gateway::GatewayError;
    use crate::ledger::{LedgerError, MemoryLedger};
    use crate::models::order::{OrderOutcome, OrderStatus};
    use crate::models::{OrderResult, RecordKind, StrategyParams};

    // ─── Test doubles ─────────────────────────────────────────────────────────

    enum Script {
        Ticks(Vec<PriceTick>),
        Endless(PriceTick),
        Stall(Vec<PriceTick>),
        Refuse,
    }

    struct ScriptedFeed {
        script: Mutex<Option<Script>>,
    }

    impl ScriptedFeed {
        fn new(script: Script) -> Self {
            Self {
                script: Mutex::new(Some(script)),
            }
        }
    }

    #[async_trait]
    impl MarketFeed for ScriptedFeed {
        async fn subscribe(&self, address: &str, _instrument: Instrument) -> Result<TickStream, FeedError> {
            let script = self.script.lock().unwrap().take().unwrap_or(Script::Ticks(Vec::new()));
            let (mut tx, stream) = handoff();
            match script {
                Script::Refuse => {
                    return Err(FeedError::Connect {
                        url: address.to_string(),
                        source: tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                    })
                }
                Script::Ticks(ticks) => {
                    tokio::spawn(async move {
                        for tick in ticks {
                            if !tx.deliver(tick).await {
                                return;
                            }
                        }
                    });
                }
                Script::Stall(ticks) => {
                    tokio::spawn(async move {
                        for tick in ticks {
                            if !tx.deliver(tick).await {
                                return;
                            }
                        }
                        tx.stopped().await;
                    });
                }
                Script::Endless(tick) => {
                    tokio::spawn(async move {
                        while tx.deliver(tick.clone()).await && tx.pause(Duration::from_millis(1)).await {}
                    });
                }
            }
            Ok(stream)
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        replies: Mutex<VecDeque<Result<OrderResult, GatewayError>>>,
        calls:   Mutex<Vec<(Instrument, Side, u32)>>,
    }

    impl RecordingGateway {
        fn with(replies: Vec<Result<OrderResult, GatewayError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls:   Mutex::default(),
            }
        }

        fn calls(&self) -> Vec<(Instrument, Side, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderGateway for RecordingGateway {
        async fn submit(
            &self,
            instrument: Instrument,
            side: Side,
            size: u32,
            _endpoint: &str,
        ) -> Result<OrderResult, GatewayError> {
            self.calls.lock().unwrap().push((instrument, side, size));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(placed(1.0)))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) {
            self.sent.lock().unwrap().push(text.to_string());
        }
    }

    fn placed(price: f64) -> OrderResult {
        OrderResult {
            outcome:    OrderOutcome::Success,
            status:     OrderStatus::Placed,
            order_id:   Some("test-order".into()),
            fill_price: Some(price),
            raw_error:  None,
        }
    }

    fn rejected(status: &str) -> OrderResult {
        OrderResult {
            outcome:    OrderOutcome::Success,
            status:     OrderStatus::Other(status.into()),
            order_id:   None,
            fill_price: None,
            raw_error:  None,
        }
    }

    fn xbt(bid: f64, ask: f64) -> PriceTick {
        PriceTick::new("PI_XBTUSD", bid, ask)
    }

    struct Rig {
        params:   ParamStore,
        gateway:  Arc<RecordingGateway>,
        ledger:   Arc<MemoryLedger>,
        notifier: Arc<RecordingNotifier>,
        metrics:  Arc<LoopMetrics>,
        robot:    TradingLoop,
    }

    async fn rig(script: Script, replies: Vec<Result<OrderResult, GatewayError>>, side: Option<Side>, profit_pct: f64) -> Rig {
        let params = ParamStore::new();
        params
            .set_all(StrategyParams {
                running: true,
                instrument: Some(Instrument::XbtUsd),
                size: 2,
                profit_pct,
                side,
            })
            .await;

        let gateway = Arc::new(RecordingGateway::with(replies));
        let ledger = Arc::new(MemoryLedger::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let metrics = Arc::new(LoopMetrics::default());

        let robot = TradingLoop::new(
            params.clone(),
            Arc::new(ScriptedFeed::new(script)),
            gateway.clone(),
            ledger.clone(),
            notifier.clone(),
            LoopSettings {
                feed_url:      "ws://feed.test".into(),
                order_url:     "http://orders.test/derivatives/api/v3/sendorder".into(),
                poll_interval: Duration::from_millis(5),
            },
            metrics.clone(),
        );

        Rig {
            params,
            gateway,
            ledger,
            notifier,
            metrics,
            robot,
        }
    }

    async fn wait_for_records(ledger: &MemoryLedger, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while ledger.records().await.len() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("ledger never reached the expected record count");
    }

    // ─── Cycles ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_preset_side_opens_then_closes_on_limit() {
        let rig = rig(
            Script::Ticks(vec![xbt(50_001.0, 50_002.0), xbt(55_000.0, 55_001.0)]),
            vec![Ok(placed(50_000.0)), Ok(placed(55_000.0))],
            Some(Side::Buy),
            0.01,
        )
        .await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Completed);

        assert_eq!(
            rig.gateway.calls(),
            vec![(Instrument::XbtUsd, Side::Buy, 2), (Instrument::XbtUsd, Side::Sell, 2)]
        );
        assert!(!rig.params.is_running().await);

        let records = rig.ledger.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, RecordKind::Open);
        assert_eq!(records[0].profit, 0.0);
        assert_eq!(records[0].stop_loss, 0.01);
        assert_eq!(records[1].kind, RecordKind::Close);
        assert_eq!(records[1].side, Side::Sell);
        assert_eq!(records[1].price, 55_000.0);
        assert_eq!(records[1].profit, 10_000.0);
        assert_eq!(records[1].stop_loss, 0.0);

        let sent = rig.notifier.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].starts_with("Order had been opened.\nInstrument - PI_XBTUSD, side - buy, size - 2, price - 50000.0"));
        assert!(sent[1].contains("side - sell, size - 2, open price - 50000.0, close price - 55000.0, profit is 10000.0"));
        assert!(sent[1].ends_with("Total profit is 10000.0"));

        let metrics = rig.metrics.snapshot();
        assert_eq!(metrics.cycles_completed, 1);
        assert_eq!(metrics.orders_submitted, 2);
        assert_eq!(metrics.ticks_consumed, 2);
    }

    #[tokio::test]
    async fn test_open_rejected_resets_flag_without_record() {
        let rig = rig(
            Script::Endless(xbt(100.0, 101.0)),
            vec![Ok(rejected("insufficientAvailableFunds"))],
            Some(Side::Sell),
            1.0,
        )
        .await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Aborted);

        assert!(!rig.params.is_running().await);
        assert!(rig.ledger.records().await.is_empty());
        assert_eq!(rig.gateway.calls().len(), 1);
        assert_eq!(rig.notifier.sent(), vec!["Order hadn't been placed: insufficientAvailableFunds"]);
    }

    #[tokio::test]
    async fn test_open_transport_error_aborts() {
        let rig = rig(
            Script::Endless(xbt(100.0, 101.0)),
            vec![Err(GatewayError::Endpoint {
                endpoint: "http://orders.test".into(),
                reason:   "connection refused".into(),
            })],
            Some(Side::Buy),
            1.0,
        )
        .await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Aborted);

        assert!(!rig.params.is_running().await);
        assert!(rig.ledger.records().await.is_empty());
        let sent = rig.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("Order hadn't been placed: "));
        assert!(sent[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_placed_without_fill_is_rejection() {
        let mut no_fill = placed(0.0);
        no_fill.fill_price = None;
        let rig = rig(Script::Endless(xbt(100.0, 101.0)), vec![Ok(no_fill)], Some(Side::Buy), 1.0).await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Aborted);
        assert!(rig.ledger.records().await.is_empty());
        assert!(!rig.params.is_running().await);
    }

    #[tokio::test]
    async fn test_probe_picks_side_before_opening() {
        let mut ticks: Vec<PriceTick> = [10.0, 12.0, 8.0, 15.0, 9.0, 11.0, 14.0]
            .into_iter()
            .map(|ask| xbt(ask - 0.5, ask))
            .collect();
        // short at 14 with 10% band: ask 20 is above 15.4
        ticks.push(xbt(13.0, 14.0));
        ticks.push(xbt(19.5, 20.0));

        let rig = rig(Script::Ticks(ticks), vec![Ok(placed(14.0)), Ok(placed(20.0))], None, 10.0).await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Completed);

        assert_eq!(
            rig.gateway.calls(),
            vec![(Instrument::XbtUsd, Side::Sell, 2), (Instrument::XbtUsd, Side::Buy, 2)]
        );
        let close = &rig.ledger.records().await[1];
        assert_eq!(close.side, Side::Buy);
        assert_eq!(close.price, 20.0);
        assert_eq!(close.profit, -12.0);
        assert!(rig.notifier.sent()[1].contains("profit is -12.0"));
    }

    #[tokio::test]
    async fn test_feed_end_during_probe_aborts() {
        let rig = rig(Script::Ticks(vec![xbt(1.0, 2.0); 3]), vec![], None, 1.0).await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Aborted);
        assert!(rig.gateway.calls().is_empty());
        assert!(!rig.params.is_running().await);
    }

    #[tokio::test]
    async fn test_shutdown_during_probe_places_nothing() {
        let rig = rig(Script::Stall(vec![xbt(1.0, 2.0); 3]), vec![], None, 1.0).await;
        let Rig {
            params,
            gateway,
            ledger,
            notifier,
            metrics,
            robot,
        } = rig;

        let (tx, mut shutdown) = watch::channel(false);
        let cycle = tokio::spawn(async move { robot.run_cycle(&mut shutdown).await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while metrics.snapshot().ticks_consumed < 3 {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("probe never started");
        tx.send(true).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), cycle)
            .await
            .expect("cycle ignored shutdown")
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Shutdown);
        assert!(gateway.calls().is_empty());
        assert!(!params.is_running().await);
        assert!(ledger.records().await.is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_error_resets_flag() {
        let rig = rig(Script::Refuse, vec![], Some(Side::Buy), 1.0).await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Aborted);
        assert!(rig.gateway.calls().is_empty());
        assert!(!rig.params.is_running().await);
        assert!(rig.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_operator_stop_closes_position() {
        let rig = rig(
            Script::Endless(xbt(100.0, 100.5)),
            vec![Ok(placed(100.0)), Ok(placed(100.0))],
            Some(Side::Buy),
            5.0,
        )
        .await;
        let Rig {
            params,
            gateway,
            ledger,
            robot,
            ..
        } = rig;

        let (_tx, mut shutdown) = watch::channel(false);
        let cycle = tokio::spawn(async move { robot.run_cycle(&mut shutdown).await });

        wait_for_records(&ledger, 1).await;
        params.set_run_flag(false).await;

        let outcome = tokio::time::timeout(Duration::from_secs(5), cycle)
            .await
            .expect("cycle did not stop")
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(gateway.calls()[1].1, Side::Sell);

        // close forces the flag to 0 even though it already was
        assert!(!params.is_running().await);
        let records = ledger.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].profit, 0.0);
    }

    #[tokio::test]
    async fn test_close_rejected_writes_no_close_record() {
        let rig = rig(
            Script::Ticks(vec![xbt(200.0, 201.0)]),
            vec![Ok(placed(100.0)), Ok(rejected("marketSuspended"))],
            Some(Side::Buy),
            1.0,
        )
        .await;
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(rig.robot.run_cycle(&mut shutdown).await, CycleOutcome::Aborted);

        let records = rig.ledger.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, RecordKind::Open);
        assert!(!rig.params.is_running().await);
        assert_eq!(rig.notifier.sent().last().unwrap(), "Order hadn't been placed: marketSuspended");
    }

    #[tokio::test]
    async fn test_long_monitoring_then_feed_end_does_not_hang() {
        let quiet = vec![xbt(1_000.0, 1_000.5); 5_000];
        let rig = rig(Script::Ticks(quiet), vec![Ok(placed(1_000.0))], Some(Side::Buy), 1.0).await;
        let (_tx, mut shutdown) = watch::channel(false);

        let outcome = tokio::time::timeout(Duration::from_secs(10), rig.robot.run_cycle(&mut shutdown))
            .await
            .expect("monitoring hung");

        assert_eq!(outcome, CycleOutcome::Aborted);
        assert_eq!(rig.gateway.calls().len(), 1);
        assert_eq!(rig.metrics.snapshot().ticks_consumed, 5_000);
        assert!(!rig.params.is_running().await);
        assert!(rig.notifier.sent()[1].starts_with("Price feed lost, position is left open."));
    }

    #[tokio::test]
    async fn test_ledger_failure_does_not_block_close() {
        struct BrokenLedger;

        #[async_trait]
        impl Ledger for BrokenLedger {
            async fn append_record(&self, _record: &PositionRecord) -> Result<(), LedgerError> {
                Err(LedgerError::Unavailable("disk full".into()))
            }

            async fn total_profit(&self) -> Result<f64, LedgerError> {
                Err(LedgerError::Unavailable("disk full".into()))
            }
        }

        let params = ParamStore::new();
        params
            .set_all(StrategyParams {
                running: true,
                instrument: Some(Instrument::EthUsd),
                size: 1,
                profit_pct: 1.0,
                side: Some(Side::Sell),
            })
            .await;
        let gateway = Arc::new(RecordingGateway::with(vec![Ok(placed(100.0)), Ok(placed(90.0))]));
        let notifier = Arc::new(RecordingNotifier::default());
        let robot = TradingLoop::new(
            params.clone(),
            Arc::new(ScriptedFeed::new(Script::Ticks(vec![PriceTick::new("PI_ETHUSD", 89.5, 90.0)]))),
            gateway.clone(),
            Arc::new(BrokenLedger),
            notifier.clone(),
            LoopSettings {
                feed_url:      "ws://feed.test".into(),
                order_url:     "http://orders.test/api/v3/sendorder".into(),
                poll_interval: Duration::from_millis(5),
            },
            Arc::new(LoopMetrics::default()),
        );
        let (_tx, mut shutdown) = watch::channel(false);

        assert_eq!(robot.run_cycle(&mut shutdown).await, CycleOutcome::Completed);
        assert_eq!(gateway.calls().len(), 2);
        assert!(!params.is_running().await);

        let sent = notifier.sent();
        assert!(sent[1].contains("profit is 10.0"));
        assert!(sent[1].ends_with("Total profit is unavailable"));
    }

    // ─── Lifecycle ────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_on_shutdown_while_idle() {
        let rig = rig(Script::Refuse, vec![], Some(Side::Buy), 1.0).await;
        rig.params.set_run_flag(false).await;

        let (tx, shutdown) = watch::channel(false);
        let handle = tokio::spawn(rig.robot.run(shutdown));

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop ignored shutdown")
            .unwrap();
        assert!(rig.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_picks_up_flag() {
        let rig = rig(
            Script::Ticks(vec![xbt(120.0, 121.0)]),
            vec![Ok(placed(100.0)), Ok(placed(120.0))],
            Some(Side::Buy),
            10.0,
        )
        .await;
        rig.params.set_run_flag(false).await;
        let Rig {
            params,
            ledger,
            robot,
            ..
        } = rig;

        let (tx, shutdown) = watch::channel(false);
        let handle = tokio::spawn(robot.run(shutdown));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(ledger.records().await.is_empty());

        params.set_run_flag(true).await;
        wait_for_records(&ledger, 2).await;
        assert!(!params.is_running().await);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop ignored shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_twice_places_no_more_orders() {
        let rig = rig(
            Script::Ticks(vec![xbt(120.0, 121.0)]),
            vec![Ok(placed(100.0)), Ok(placed(120.0))],
            Some(Side::Buy),
            10.0,
        )
        .await;
        let Rig {
            params,
            gateway,
            ledger,
            robot,
            ..
        } = rig;

        let (tx, shutdown) = watch::channel(false);
        let handle = tokio::spawn(robot.run(shutdown));

        wait_for_records(&ledger, 2).await;
        params.set_run_flag(false).await;
        params.set_run_flag(false).await;

        // several poll intervals pass while idle
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(gateway.calls().len(), 2);
        assert_eq!(ledger.records().await.len(), 2);
        assert!(!params.is_running().await);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop ignored shutdown")
            .unwrap();
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_stop_twice_while_idle_places_nothing() {
        let rig = rig(Script::Endless(xbt(100.0, 100.5)), vec![], Some(Side::Buy), 1.0).await;
        rig.params.set_run_flag(false).await;
        let Rig {
            params,
            gateway,
            robot,
            ..
        } = rig;

        let (tx, shutdown) = watch::channel(false);
        let handle = tokio::spawn(robot.run(shutdown));

        params.set_run_flag(false).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        params.set_run_flag(false).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop ignored shutdown")
            .unwrap();
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_while_monitoring_closes_position() {
        let rig = rig(
            Script::Endless(xbt(100.0, 100.5)),
            vec![Ok(placed(100.0)), Ok(placed(100.0))],
            Some(Side::Buy),
            5.0,
        )
        .await;
        let Rig {
            gateway,
            ledger,
            robot,
            ..
        } = rig;

        let (tx, shutdown) = watch::channel(false);
        let handle = tokio::spawn(robot.run(shutdown));

        wait_for_records(&ledger, 1).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop ignored shutdown")
            .unwrap();
        assert_eq!(gateway.calls().len(), 2);
        assert_eq!(ledger.records().await.len(), 2);
    }
}
