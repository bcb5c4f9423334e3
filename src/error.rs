//! # error
//!
//! Error taxonomy for the bot.
//!
//! The per-item errors ([`ProviderError`], [`RenderError`], [`DeliveryError`])
//! are caught at ticker / recipient granularity and logged; they never stop a
//! scan. [`AppError`] is what the HTTP admin handlers return — its
//! `IntoResponse` impl renders a JSON `{ "ok": false, "error": ... }` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ─── Provider ─────────────────────────────────────────────────────────────────

/// Market-data retrieval failed for one ticker.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid period: '{0}' (use 5d, 1mo, 3mo, 6mo, 1y or 2y)")]
    InvalidPeriod(String),

    #[error("Market data unreachable: {0}")]
    Network(String),

    #[error("Market data request timed out after {0}s")]
    Timeout(u64),

    #[error("Market data provider returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("No market data for {0}")]
    Empty(String),

    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<&'static str>),

    #[error("Malformed market data: {0}")]
    Malformed(String),
}

// ─── Signal pipeline ──────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    /// Empty input series — distinct from "analysed, no signal".
    #[error("No data to analyse")]
    NoData,
}

// ─── Chart ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Chart rendering is disabled (CHART_URL not set)")]
    Disabled,

    #[error("Chart service error: {0}")]
    Http(String),

    #[error("Chart file error: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Delivery ─────────────────────────────────────────────────────────────────

/// Sending to one recipient failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Telegram unreachable: {0}")]
    Network(String),

    #[error("Telegram rejected message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("Attachment error: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// Persisting a list failed. Unparseable content is not an error here: the
/// store resets it to its default and logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid ticker: '{0}'")]
    InvalidTicker(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ─── AppError (HTTP) ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A scan is already running.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidTicker(_) => AppError::BadRequest(err.to_string()),
            other => AppError::Internal(other.into()),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidPeriod(_) => AppError::BadRequest(err.to_string()),
            ProviderError::Empty(_) => AppError::NotFound(err.to_string()),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {err}"),
            ),
        };

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}
