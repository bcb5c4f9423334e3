//! # Gapwatch — gap-down + accumulation alert bot
//!
//! ```text
//!  ┌──────────────┐  02:15 UTC daily   ┌──────────────────────────────────┐
//!  │  Scheduler   │ ─────────────────▶ │ Scanner (non-reentrant)          │
//!  └──────────────┘                    │  watchlist → Yahoo → signal      │
//!  ┌──────────────┐  /test_auto        │        └─▶ AlertDispatcher ──────┼──▶ Telegram chats
//!  │  Telegram    │ ─────────────────▶ │                                  │
//!  │  poller      │  /gapcheck ...     └──────────────────────────────────┘
//!  └──────────────┘                          ▲
//!  ┌──────────────┐  POST /api/scan          │
//!  │  Admin HTTP  │ ─────────────────────────┘
//!  └──────────────┘  /api/watchlist, /api/recipients, /api/check
//! ```
//!
//! ## Environment Variables
//!
//! | Variable             | Default                           | Description                  |
//! |----------------------|-----------------------------------|------------------------------|
//! | `TELEGRAM_BOT_TOKEN` | —                                 | Bot API token (required)     |
//! | `BIND_ADDR`          | `0.0.0.0:3000`                    | admin HTTP listen address    |
//! | `API_KEY`            | empty                             | admin HTTP key (empty = dev) |
//! | `DATA_DIR`           | `data`                            | watchlist + chat id files    |
//! | `CHART_URL`          | unset                             | chart service; unset = text  |
//! | `SCAN_TIME_UTC`      | `02:15`                           | daily scan time              |
//! | `RUST_LOG`           | `gapwatch=debug`                  | tracing filter               |
//!
//! The full list lives in [`config::Config::from_env`].

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod auth;
mod chart;
mod config;
mod engine;
mod error;
mod models;
mod provider;
mod routes;
mod state;
mod store;
mod telegram;
#[cfg(test)]
mod testutil;

use config::Config;
use engine::dispatcher::Messenger;
use routes::build_router;
use state::build_state;
use telegram::{poller::run_poller, TelegramClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env ──────────────────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ─────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("gapwatch=debug".parse()?)
                .add_directive("tower_http=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════════════╗
  ║              GAPWATCH — IDX Signal Bot                ║
  ║     Gap-down · OBV accumulation · Telegram alerts     ║
  ╚═══════════════════════════════════════════════════════╝"#);

    // ── 3. Config ─────────────────────────────────────────────────────────────
    let config = Config::from_env()?;
    info!(
        suffix    = %config.market_suffix,
        scan_time = %config.scan_time,
        period    = %config.scan_period,
        threshold = config.gap_threshold_pct,
        charts    = config.chart_url.is_some(),
        "⚙️ Configuration loaded"
    );

    // ── 4. Shared state ───────────────────────────────────────────────────────
    let http = reqwest::Client::builder().build()?;
    let telegram = Arc::new(TelegramClient::new(
        http.clone(),
        &config.telegram_api_url,
        &config.telegram_token,
    ));
    let messenger: Arc<dyn Messenger> = telegram.clone();
    let bind_addr = config.bind_addr;
    let scan_time = config.scan_time;
    let state = build_state(config, http, messenger);

    let watched = state.watchlist.load().await?;
    info!(tickers = watched.len(), "📋 Watchlist ready");

    // ── 5. Background loops ───────────────────────────────────────────────────
    tokio::spawn(Arc::clone(&state.scanner).run_forever(scan_time));
    tokio::spawn(run_poller(Arc::clone(&state), telegram));

    // ── 6. Bind & Serve ───────────────────────────────────────────────────────
    let app = build_router(state);

    info!(addr = %bind_addr, "🚀 Gapwatch admin API starting");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
