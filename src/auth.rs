//! # auth — API key middleware
//!
//! Guards the HTTP admin API with an `X-API-Key` header.
//!
//! ## Mode
//! - `API_KEY` unset or empty → **allow all** (dev mode)
//! - `API_KEY` set → every request must carry `X-API-Key: <key>`
//!
//! `GET /api/health` is always open.
//!
//! ```bash
//! curl -H "X-API-Key: $API_KEY" -X POST http://localhost:3000/api/scan
//! ```

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::state::SharedState;

pub const HEALTH_PATH: &str = "/api/health";

pub async fn require_api_key(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.config.api_key.as_str();

    // ── Dev mode ──────────────────────────────────────────────────────────────
    if expected.is_empty() {
        return next.run(request).await;
    }

    let path = request.uri().path();
    if path == HEALTH_PATH {
        return next.run(request).await;
    }

    // ── Header check ──────────────────────────────────────────────────────────
    let provided = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided == expected {
        next.run(request).await
    } else {
        warn!(path, "❌ Unauthorized request — invalid or missing X-API-Key");
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "ok":    false,
                "error": "Unauthorized: invalid or missing X-API-Key header",
            })),
        )
            .into_response()
    }
}
