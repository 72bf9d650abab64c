//! # tickbot — single-instrument futures trading robot
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐  POST /api/, /api/set,        ┌──────────────────────┐
//!  │  Operator    │       /api/start, /api/stop    │   ParamStore         │
//!  │  (HTTP/JSON) │ ─────────────────────────────▶ │   Mutex<Strategy-    │
//!  └──────────────┘                                │         Params>      │
//!                                                  └──────────┬───────────┘
//!                                                             │ poll run flag
//!  ┌──────────────┐   ticker_lite (websocket)      ┌──────────▼───────────┐
//!  │ Kraken feed  │ ─────────────────────────────▶ │   Trading Loop       │──▶ sendorder (signed)
//!  └──────────────┘                                │   (one background    │──▶ ledger (Postgres / memory)
//!                                                  │    task)             │──▶ Telegram / log
//!                                                  └──────────────────────┘
//! ```
//!
//! Configuration comes from the environment, see [`config`].

use std::sync::Arc;

use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod engine;
mod error;
mod feed;
mod gateway;
mod ledger;
mod models;
mod notify;
mod routes;
mod state;

use config::Config;
use engine::{LoopSettings, TradingLoop};
use feed::KrakenFeed;
use gateway::KrakenGateway;
use ledger::{Ledger, MemoryLedger};
use notify::{LogNotifier, Notifier, TelegramNotifier};
use state::{AppState, LoopMetrics, ParamStore};

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional, real env vars win) ──────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging ─────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("tickbot=debug".parse()?)
            .add_directive("tower_http=info".parse()?))
        .init();

    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║        TICKBOT — Futures Trading Robot        ║
  ║        Rust + Axum  ·  Feed & Gateway         ║
  ╚═══════════════════════════════════════════════╝"#
    );

    // ── 3. Configuration ─────────────────────────────────────────────────────
    let config = Config::from_env()?;

    // ── 4. Collaborators ─────────────────────────────────────────────────────
    let http = reqwest::Client::builder()
        .user_agent(concat!("tickbot/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let ledger = build_ledger(&config).await?;

    let notifier: Arc<dyn Notifier> = match config.telegram.clone() {
        Some(telegram) => {
            info!(chat_id = %telegram.chat_id, "📣 Telegram notifications enabled");
            Arc::new(TelegramNotifier::new(http.clone(), telegram))
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };

    let params = ParamStore::new();
    let metrics = Arc::new(LoopMetrics::default());

    // ── 5. Trading loop ──────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let robot = TradingLoop::new(
        params.clone(),
        Arc::new(KrakenFeed::new(config.tick_spacing, config.reconnect_delay)),
        Arc::new(KrakenGateway::new(http, config.public_key.clone(), config.private_key.clone())),
        ledger,
        notifier,
        LoopSettings {
            feed_url:      config.feed_url.clone(),
            order_url:     config.order_url.clone(),
            poll_interval: config.poll_interval,
        },
        metrics.clone(),
    );
    let robot_handle = tokio::spawn(robot.run(shutdown_rx));

    // ── 6. Control surface ───────────────────────────────────────────────────
    if config.api_key.is_none() {
        warn!("API_KEY not set, control surface is open (dev mode)");
    }
    let state = Arc::new(AppState::new(params, metrics, config.api_key.clone()));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    info!(addr = ?config.bind_addr, feed = %config.feed_url, orders = %config.order_url, "🚀 Tickbot starting");

    // ── 7. Serve until Ctrl-C, then stop the loop ────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
        })
        .await?;

    shutdown_tx.send_replace(true);
    robot_handle.await?;

    info!("👋 Tickbot stopped");
    Ok(())
}

// ─── Ledger selection ─────────────────────────────────────────────────────────

#[cfg(feature = "postgres")]
async fn build_ledger(config: &Config) -> anyhow::Result<Arc<dyn Ledger>> {
    use anyhow::Context;

    match config.database_url.as_deref() {
        Some(url) => {
            let ledger = ledger::PgLedger::connect(url)
                .await
                .context("Failed to open the PostgreSQL ledger")?;
            Ok(Arc::new(ledger))
        }
        None => {
            warn!("DATABASE_URL not set, positions are kept in memory only");
            Ok(Arc::new(MemoryLedger::new()))
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn build_ledger(config: &Config) -> anyhow::Result<Arc<dyn Ledger>> {
    if config.database_url.is_some() {
        warn!("DATABASE_URL ignored, built without the `postgres` feature");
    }
    Ok(Arc::new(MemoryLedger::new()))
}
