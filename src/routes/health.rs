//! # routes::health
//!
//! `GET /health`, unauthenticated.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::SharedState;

pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let running = state.params.is_running().await;

    Json(json!({
        "ok":      true,
        "running": running,
        "metrics": state.metrics.snapshot(),
    }))
}
