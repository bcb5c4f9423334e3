//! # routes::health
//!
//! `GET /api/health` — liveness plus scan counters. Not behind the API key.

use std::sync::atomic::Ordering;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::json;

use crate::engine::scanner::next_run_after;
use crate::state::SharedState;

pub async fn health_check(State(state): State<SharedState>) -> impl IntoResponse {
    let scans_completed = state.scans_completed.load(Ordering::Relaxed);
    let alerts_sent     = state.alerts_sent.load(Ordering::Relaxed);
    let next_scan       = next_run_after(Utc::now(), state.config.scan_time);

    Json(json!({
        "ok":              true,
        "scan_running":    state.scanner.is_running(),
        "scans_completed": scans_completed,
        "alerts_sent":     alerts_sent,
        "next_scan":       next_scan,
    }))
}
