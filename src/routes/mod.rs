//! # routes
//!
//! HTTP admin surface. Every endpoint mirrors a chat command.
//!
//! | Method | Path                        | Description                       |
//! |--------|-----------------------------|-----------------------------------|
//! | GET    | `/api/health`               | counters, scan state (no key)     |
//! | GET    | `/api/watchlist`            | list tickers                      |
//! | POST   | `/api/watchlist`            | add ticker                        |
//! | DELETE | `/api/watchlist/:ticker`    | remove ticker                     |
//! | GET    | `/api/recipients`           | list chat ids                     |
//! | POST   | `/api/recipients`           | register chat id                  |
//! | DELETE | `/api/recipients/:chat_id`  | unregister chat id                |
//! | POST   | `/api/scan`                 | run a scan now (409 if running)   |
//! | GET    | `/api/check/:ticker`        | analyse one ticker, no alert      |

pub mod check;
pub mod health;
pub mod recipients;
pub mod scan;
pub mod watchlist;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{require_api_key, HEALTH_PATH};
use crate::state::SharedState;

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(HEALTH_PATH,                  get(health::health_check))
        // ── Watchlist ─────────────────────────────────────────────────────────
        .route("/api/watchlist",             get(watchlist::list_watchlist).post(watchlist::add_ticker))
        .route("/api/watchlist/:ticker",     delete(watchlist::remove_ticker))
        // ── Recipients ────────────────────────────────────────────────────────
        .route("/api/recipients",            get(recipients::list_recipients).post(recipients::register))
        .route("/api/recipients/:chat_id",   delete(recipients::unregister))
        // ── Scan ──────────────────────────────────────────────────────────────
        .route("/api/scan",                  post(scan::trigger_scan))
        .route("/api/check/:ticker",         get(check::check_ticker))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
