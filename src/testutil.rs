//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use crate::chart::{ChartFile, ChartRenderer, NoChart};
use crate::config::Config;
use crate::engine::dispatcher::Messenger;
use crate::error::{DeliveryError, ProviderError, RenderError};
use crate::models::{Bar, BarSeries, ChatId, EnrichedBar, SignalEvent, Ticker};
use crate::provider::{BarProvider, Period};
use crate::state::{AppState, SharedState};

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
}

pub fn make_bar(day: u32, open: f64, close: f64, volume: u64) -> Bar {
    Bar {
        date: date(day),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume,
    }
}

/// Two bars whose last one is a gap-down (-3%) on an up close: a signal on
/// 2024-05-14.
pub fn signal_bars() -> Vec<Bar> {
    vec![make_bar(13, 100.0, 100.0, 1_000), make_bar(14, 97.0, 101.0, 1_500)]
}

/// No gap, no signal.
pub fn quiet_bars() -> Vec<Bar> {
    vec![make_bar(13, 100.0, 100.0, 1_000), make_bar(14, 100.5, 101.0, 1_500)]
}

pub fn signal_event(ticker: &str, close: f64, gap_pct: Option<f64>) -> SignalEvent {
    let bar = Bar {
        date: date(14),
        open: close * 0.97,
        high: close * 1.01,
        low: close * 0.96,
        close,
        volume: 10_000,
    };
    SignalEvent {
        ticker: Ticker::canonical(ticker, ".JK").unwrap(),
        bar: EnrichedBar {
            bar,
            gap_pct,
            money_flow_multiplier: 0.5,
            money_flow_volume: 5_000.0,
            accumulation_distribution: 5_000.0,
            on_balance_volume: 10_000,
            obv_delta: Some(10_000),
            is_gap_down: true,
            is_accumulating: true,
            is_signal: true,
        },
    }
}

// ─── Provider ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProvider {
    bars:    HashMap<String, Vec<Bar>>,
    failing: HashSet<String>,
    delay:   Option<Duration>,
    calls:   Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn with_bars(mut self, ticker: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str) -> Self {
        self.failing.insert(ticker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BarProvider for FakeProvider {
    async fn fetch(&self, ticker: &Ticker, _period: Period) -> Result<BarSeries, ProviderError> {
        self.calls.lock().unwrap().push(ticker.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.contains(ticker.as_str()) {
            return Err(ProviderError::Upstream {
                status: 502,
                body:   "<html><body>Bad Gateway</body></html>".into(),
            });
        }
        match self.bars.get(ticker.as_str()) {
            Some(bars) => Ok(BarSeries::new(ticker.clone(), bars.clone())),
            None => Err(ProviderError::Empty(ticker.to_string())),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ─── Renderer ─────────────────────────────────────────────────────────────────

pub struct FakeRenderer {
    dir:       Option<PathBuf>,
    last_path: Mutex<Option<PathBuf>>,
}

impl FakeRenderer {
    pub fn failing() -> Self {
        Self { dir: None, last_path: Mutex::new(None) }
    }

    /// Writes a small placeholder file per render into `dir`.
    pub fn writing(dir: &Path) -> Self {
        Self { dir: Some(dir.to_path_buf()), last_path: Mutex::new(None) }
    }

    pub fn last_path(&self) -> Option<PathBuf> {
        self.last_path.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChartRenderer for FakeRenderer {
    async fn render(&self, ticker: &Ticker, _bars: &[Bar]) -> Result<ChartFile, RenderError> {
        let Some(dir) = &self.dir else {
            return Err(RenderError::Http("renderer offline".into()));
        };
        let path = dir.join(format!("{ticker}_candle.png"));
        std::fs::write(&path, b"\x89PNG")?;
        *self.last_path.lock().unwrap() = Some(path.clone());
        Ok(ChartFile::new(path))
    }
}

// ─── Messenger ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Sent {
    Text { chat_id: ChatId, text: String },
    Photo { chat_id: ChatId, path: PathBuf, caption: String },
}

impl Sent {
    pub fn chat_id(&self) -> ChatId {
        match self {
            Sent::Text { chat_id, .. } | Sent::Photo { chat_id, .. } => *chat_id,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Sent::Text { text, .. } => text,
            Sent::Photo { caption, .. } => caption,
        }
    }
}

/// Records successful sends; chats in `failing` get a rejection.
#[derive(Default)]
pub struct FakeMessenger {
    failing: HashSet<ChatId>,
    sent:    Mutex<Vec<Sent>>,
}

impl FakeMessenger {
    pub fn failing(ids: &[ChatId]) -> Self {
        Self { failing: ids.iter().copied().collect(), sent: Mutex::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    fn check(&self, chat_id: ChatId) -> Result<(), DeliveryError> {
        if self.failing.contains(&chat_id) {
            return Err(DeliveryError::Rejected {
                status:      403,
                description: "Forbidden: bot was blocked by the user".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        self.check(chat_id)?;
        self.sent.lock().unwrap().push(Sent::Text { chat_id, text: text.to_string() });
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        self.check(chat_id)?;
        if !photo.exists() {
            return Err(DeliveryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "chart missing at send time",
            )));
        }
        self.sent.lock().unwrap().push(Sent::Photo {
            chat_id,
            path: photo.to_path_buf(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

// ─── App state ────────────────────────────────────────────────────────────────

pub fn test_config(data_dir: &Path) -> Config {
    Config {
        telegram_token:    "test-token".into(),
        telegram_api_url:  "http://127.0.0.1:9".into(),
        poll_timeout:      Duration::from_secs(1),
        bind_addr:         "127.0.0.1:0".parse().unwrap(),
        api_key:           String::new(),
        data_dir:          data_dir.to_path_buf(),
        chart_dir:         data_dir.join("charts"),
        chart_url:         None,
        yahoo_base_url:    "http://127.0.0.1:9".into(),
        market_suffix:     ".JK".into(),
        scan_time:         NaiveTime::from_hms_opt(2, 15, 0).unwrap(),
        scan_period:       Period::OneMonth,
        gap_threshold_pct: 2.0,
        fetch_timeout:     Duration::from_millis(500),
        default_watchlist: vec!["BBRI".into(), "BMRI".into()],
    }
}

pub struct TestState {
    pub state:     SharedState,
    pub messenger: Arc<FakeMessenger>,
    _dir:          tempfile::TempDir,
}

/// State over a temp data dir, with no chart renderer.
pub async fn make_state(provider: FakeProvider, messenger: FakeMessenger) -> TestState {
    make_state_with(provider, messenger, |_| {}).await
}

pub async fn make_state_with(
    provider: FakeProvider,
    messenger: FakeMessenger,
    tweak: impl FnOnce(&mut Config),
) -> TestState {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    tweak(&mut config);

    let messenger = Arc::new(messenger);
    let state = Arc::new(AppState::new(
        config,
        Arc::new(provider),
        Arc::new(NoChart),
        messenger.clone(),
    ));
    TestState { state, messenger, _dir: dir }
}
