//! # error
//!
//! Error type of the HTTP control surface.
//!
//! Every handler returns `Result<_, AppError>`. The `IntoResponse` impl turns
//! it into a JSON body `{ "ok": false, "error": ... }` so operators always get
//! a machine-readable answer. Collaborator errors (feed, gateway, ledger)
//! never reach this layer: the trading loop handles them itself.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Body could not be decoded as JSON.
    #[error("Json unmarshall error: {0}")]
    MalformedBody(String),

    /// Parameters failed validation.
    #[error("Bad params: {0}")]
    BadParams(String),

    /// Missing or wrong `X-API-Key`.
    #[error("Unauthorized: invalid or missing X-API-Key header")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedBody(_) | AppError::BadParams(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = Json(json!({
            "ok":    false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
