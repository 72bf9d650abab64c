//! # routes::params
//!
//! Operator control of the strategy parameters and the run flag.
//!
//! ## Endpoints
//!
//! | Method | Path          | Description                                        |
//! |--------|---------------|----------------------------------------------------|
//! | POST   | `/api/`       | Replace every parameter, `start` included          |
//! | POST   | `/api/set`    | Replace parameters, keep the current run flag      |
//! | POST   | `/api/start`  | Validate the stored parameters, then set flag to 1 |
//! | POST   | `/api/stop`   | Set flag to 0                                      |
//! | GET    | `/api/params` | Current parameters                                 |
//!
//! ### Request body (JSON)
//! ```json
//! { "start": 1, "ticker": "PI_XBTUSD", "size": 2, "profit": 0.05, "side": "buy" }
//! ```
//! `side` may be `""` to let the robot pick the direction itself.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::{Instrument, Side, StrategyParams},
    state::SharedState,
};

// ─── Request body ─────────────────────────────────────────────────────────────

/// Raw operator input. Missing fields decode to their zero value and are
/// then caught by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParamsBody {
    pub start:  i64,
    pub ticker: String,
    pub size:   i64,
    pub profit: f64,
    pub side:   String,
}

impl ParamsBody {
    /// Validate everything except `start`.
    pub fn into_params(self) -> Result<StrategyParams, String> {
        let side = match self.side.as_str() {
            "" => None,
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => return Err("'side' option must be 'buy' or 'sell'".into()),
        };
        if self.size < 1 {
            return Err("'size' option must be more than 0".into());
        }
        let size = u32::try_from(self.size).map_err(|_| "'size' option is too large".to_string())?;
        if self.profit <= 0.0 {
            return Err("'profit' must be more than 0".into());
        }
        let instrument = self.ticker.parse::<Instrument>().map_err(|e| e.to_string())?;

        Ok(StrategyParams {
            running: self.start == 1,
            instrument: Some(instrument),
            size,
            profit_pct: self.profit,
            side,
        })
    }

    /// Validate every field, `start` first.
    pub fn into_params_with_start(self) -> Result<StrategyParams, String> {
        if self.start != 0 && self.start != 1 {
            return Err("'start' option must be '1' or '0'".into());
        }
        self.into_params()
    }
}

/// Checks applied by `/api/start` to the parameters already stored.
pub fn check_stored(params: &StrategyParams) -> Result<(), String> {
    if params.size < 1 {
        return Err("'size' option must be more than 0".into());
    }
    if params.profit_pct <= 0.0 {
        return Err("'profit' must be more than 0".into());
    }
    if params.instrument.is_none() {
        return Err(
            "'ticker' option must be 'PI_XBTUSD' or 'PI_ETHUSD' or 'PI_LTCUSD' or 'PI_XRPUSD' or 'PI_BCHUSD'".into(),
        );
    }
    Ok(())
}

fn decode(body: Result<Json<ParamsBody>, JsonRejection>) -> Result<ParamsBody, AppError> {
    body.map(|Json(b)| b).map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Unmarshall error");
        AppError::MalformedBody(rejection.body_text())
    })
}

// ─── POST /api/ ───────────────────────────────────────────────────────────────

pub async fn set_and_start(
    State(state): State<SharedState>,
    body: Result<Json<ParamsBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let params = decode(body)?.into_params_with_start().map_err(|e| {
        warn!(error = %e, "Error while setting params");
        AppError::BadParams(e)
    })?;

    info!(?params, "⚙️ [CONTROL] Parameters replaced");
    state.params.set_all(params).await;

    Ok(Json(json!({ "ok": true, "message": "Parameters had been set" })))
}

// ─── POST /api/set ────────────────────────────────────────────────────────────

pub async fn set_params(
    State(state): State<SharedState>,
    body: Result<Json<ParamsBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let params = decode(body)?.into_params().map_err(|e| {
        warn!(error = %e, "Error while setting params");
        AppError::BadParams(e)
    })?;

    info!(?params, "⚙️ [CONTROL] Parameters updated, run flag kept");
    state.params.set_without_run_flag(params).await;

    Ok(Json(json!({ "ok": true, "message": "Parameters had been set" })))
}

// ─── POST /api/start ──────────────────────────────────────────────────────────

pub async fn start(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let current = state.params.get().await;
    check_stored(&current).map_err(|e| {
        warn!(error = %e, "Start refused");
        AppError::BadParams(e)
    })?;

    state.params.set_run_flag(true).await;
    info!("▶️ [CONTROL] Start signal sent");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "ok": true, "message": "The signal to start had been sent" })),
    ))
}

// ─── POST /api/stop ───────────────────────────────────────────────────────────

pub async fn stop(State(state): State<SharedState>) -> impl IntoResponse {
    state.params.set_run_flag(false).await;
    info!("⏹️ [CONTROL] Stop signal sent");

    (
        StatusCode::ACCEPTED,
        Json(json!({ "ok": true, "message": "The signal to stop had been sent" })),
    )
}

// ─── GET /api/params ──────────────────────────────────────────────────────────

pub async fn get_params(State(state): State<SharedState>) -> impl IntoResponse {
    let params = state.params.get().await;
    Json(json!({ "ok": true, "params": params }))
}
