//! # routes::auth
//!
//! `X-API-Key` guard for the control surface.
//!
//! - `API_KEY` unset → every request passes (dev mode)
//! - `API_KEY` set → every route except `/health` needs `X-API-Key: <key>`

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{error::AppError, state::SharedState};

pub const API_KEY_HEADER: &str = "X-API-Key";

pub async fn require_api_key(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided == expected {
        next.run(request).await
    } else {
        warn!(path = request.uri().path(), "❌ Unauthorized request");
        AppError::Unauthorized.into_response()
    }
}
