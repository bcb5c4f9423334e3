//! # state
//!
//! Shared application state: every collaborator the scheduler, the chat
//! command loop and the HTTP handlers need, behind one `Arc`.
//!
//! ```text
//!   AppState
//!   ├─ watchlist, recipients     JSON list stores (Mutex per list)
//!   ├─ renderer                  HttpChartRenderer | NoChart
//!   ├─ messenger                 TelegramClient
//!   ├─ scanner                   owns provider + dispatcher + scan lock
//!   └─ scans_completed,
//!      alerts_sent               counters for /api/health
//! ```

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::chart::{ChartRenderer, HttpChartRenderer, NoChart};
use crate::config::Config;
use crate::engine::dispatcher::{AlertDispatcher, Messenger};
use crate::engine::scanner::{ScanSettings, Scanner};
use crate::models::ChatId;
use crate::provider::{BarProvider, YahooProvider};
use crate::store::{JsonFileStore, ListStore, Recipients, Watchlist};

// ─── AppState ─────────────────────────────────────────────────────────────────

pub struct AppState {
    pub config:          Config,
    pub watchlist:       Arc<Watchlist>,
    pub recipients:      Arc<Recipients>,
    pub renderer:        Arc<dyn ChartRenderer>,
    pub messenger:       Arc<dyn Messenger>,
    pub scanner:         Arc<Scanner>,
    /// Completed scan cycles since start-up.
    pub scans_completed: Arc<AtomicU64>,
    /// Successful alert deliveries since start-up.
    pub alerts_sent:     Arc<AtomicU64>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the state from already-built collaborators.
    pub fn new(
        config: Config,
        provider: Arc<dyn BarProvider>,
        renderer: Arc<dyn ChartRenderer>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        let wl_store: Arc<dyn ListStore<String>> =
            Arc::new(JsonFileStore::<String>::new(config.watchlist_path()));
        let watchlist = Arc::new(Watchlist::new(wl_store, &config.default_watchlist, &config.market_suffix));

        let rc_store: Arc<dyn ListStore<ChatId>> =
            Arc::new(JsonFileStore::<ChatId>::new(config.recipients_path()));
        let recipients = Arc::new(Recipients::new(rc_store));

        let dispatcher = Arc::new(AlertDispatcher::new(
            Arc::clone(&renderer),
            Arc::clone(&messenger),
            config.market_suffix.clone(),
        ));

        let scans_completed = Arc::new(AtomicU64::new(0));
        let alerts_sent = Arc::new(AtomicU64::new(0));

        let settings = ScanSettings {
            period:        config.scan_period,
            threshold_pct: config.gap_threshold_pct,
            fetch_timeout: config.fetch_timeout,
        };
        let scanner = Arc::new(Scanner::new(
            Arc::clone(&watchlist),
            Arc::clone(&recipients),
            provider,
            dispatcher,
            settings,
            Arc::clone(&scans_completed),
            Arc::clone(&alerts_sent),
        ));

        Self {
            config,
            watchlist,
            recipients,
            renderer,
            messenger,
            scanner,
            scans_completed,
            alerts_sent,
        }
    }
}

/// Build the production state: Yahoo provider, optional chart service and the
/// given messenger (the Telegram client).
pub fn build_state(
    config: Config,
    http: reqwest::Client,
    messenger: Arc<dyn Messenger>,
) -> SharedState {
    let provider: Arc<dyn BarProvider> = Arc::new(YahooProvider::new(
        http.clone(),
        config.yahoo_base_url.clone(),
        config.fetch_timeout,
    ));

    let renderer: Arc<dyn ChartRenderer> = match &config.chart_url {
        Some(url) => Arc::new(HttpChartRenderer::new(
            http,
            url.clone(),
            config.chart_dir.clone(),
            config.market_suffix.clone(),
            config.fetch_timeout,
        )),
        None => Arc::new(NoChart),
    };

    Arc::new(AppState::new(config, provider, renderer, messenger))
}
