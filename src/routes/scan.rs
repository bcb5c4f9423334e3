//! # routes::scan
//!
//! `POST /api/scan` runs the watchlist scan through the same non-reentrant
//! path as the daily timer.

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::{engine::scanner::ScanOutcome, error::AppError, state::SharedState};

pub async fn trigger_scan(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    match state.scanner.run("api").await {
        ScanOutcome::Completed(report) => Ok(Json(json!({ "ok": true, "report": report }))),
        ScanOutcome::Skipped => Err(AppError::Conflict("a scan is already running".into())),
    }
}
