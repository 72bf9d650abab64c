//! # routes
//!
//! Operator control surface. [`router`] wires every handler and the
//! `X-API-Key` guard; `main` adds tracing and CORS on top.

pub mod auth;
pub mod health;
pub mod params;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ── Parameters & run flag ────────────────────────────────────────────
        .route("/api",        post(params::set_and_start))
        .route("/api/",       post(params::set_and_start))
        .route("/api/set",    post(params::set_params))
        .route("/api/start",  post(params::start))
        .route("/api/stop",   post(params::stop))
        .route("/api/params", get(params::get_params))
        // ── Health ───────────────────────────────────────────────────────────
        .route("/health",     get(health::health_check))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_api_key))
        .with_state(state)
}
