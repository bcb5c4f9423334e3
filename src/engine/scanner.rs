//! # engine::scanner
//!
//! **Scan Scheduler** — walks the watchlist once per trigger.
//!
//! ```text
//!            trigger (daily timer | /test_auto | POST /api/scan)
//!                 │
//!         try_lock(scan_lock) ── held ──▶ ScanOutcome::Skipped
//!                 │  raise `running` (read by /api/health, never the lock)
//!   for ticker in watchlist snapshot (sequential)
//!        fetch (bounded by FETCH_TIMEOUT_SECS) ── error ──▶ record, next ticker
//!        analyze → latest_signal ── none ──▶ next ticker
//!        resolve Broadcast → dispatch
//!                 │
//!           ScanReport
//! ```
//!
//! A failed fetch is not retried inside the cycle; the next cycle is the retry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::dispatcher::{AlertDispatcher, AlertKind, DispatchReport, RecipientPolicy};
use super::signal::{analyze, latest_signal};
use crate::error::ProviderError;
use crate::models::{BarSeries, EnrichedBar, SignalEvent, Ticker};
use crate::provider::{BarProvider, Period};
use crate::store::{Recipients, Watchlist};

// ─── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ScanFailure {
    pub ticker: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_at:        DateTime<Utc>,
    pub finished_at:       DateTime<Utc>,
    pub scanned:           usize,
    /// Tickers whose latest bar set off an alert.
    pub signals:           Vec<String>,
    pub failures:          Vec<ScanFailure>,
    pub delivered:         usize,
    pub failed_deliveries: usize,
}

impl ScanReport {
    fn begin() -> Self {
        let now = Utc::now();
        Self {
            started_at:        now,
            finished_at:       now,
            scanned:           0,
            signals:           Vec::new(),
            failures:          Vec::new(),
            delivered:         0,
            failed_deliveries: 0,
        }
    }

    fn fail(&mut self, ticker: impl Into<String>, reason: impl ToString) {
        self.failures.push(ScanFailure { ticker: ticker.into(), reason: reason.to_string() });
    }

    /// Short text summary for chat replies.
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Scan finished: {} ticker(s), {} signal(s), {} alert(s) delivered",
            self.scanned,
            self.signals.len(),
            self.delivered,
        );
        if self.failed_deliveries > 0 {
            text.push_str(&format!(", {} failed", self.failed_deliveries));
        }
        if !self.signals.is_empty() {
            text.push_str(&format!("\nSignals: {}", self.signals.join(", ")));
        }
        for f in &self.failures {
            text.push_str(&format!("\n⚠️ {}: {}", f.ticker, f.reason));
        }
        text
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    Completed(ScanReport),
    /// Another scan held the lock.
    Skipped,
}

/// Result of a single-ticker check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub series:   BarSeries,
    pub enriched: Vec<EnrichedBar>,
}

impl CheckResult {
    pub fn latest_signal(&self) -> Option<&EnrichedBar> {
        latest_signal(&self.enriched)
    }

    /// The latest signal as an alert payload for the series' ticker.
    pub fn event(&self) -> Option<SignalEvent> {
        self.latest_signal().map(|bar| SignalEvent {
            ticker: self.series.ticker().clone(),
            bar:    bar.clone(),
        })
    }
}

/// Holds `running` high for the lifetime of one scan.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// ─── Scanner ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub period:        Period,
    pub threshold_pct: f64,
    pub fetch_timeout: Duration,
}

pub struct Scanner {
    watchlist:       Arc<Watchlist>,
    recipients:      Arc<Recipients>,
    provider:        Arc<dyn BarProvider>,
    dispatcher:      Arc<AlertDispatcher>,
    settings:        ScanSettings,
    scan_lock:       Mutex<()>,
    running:         AtomicBool,
    scans_completed: Arc<AtomicU64>,
    alerts_sent:     Arc<AtomicU64>,
}

impl Scanner {
    pub fn new(
        watchlist: Arc<Watchlist>,
        recipients: Arc<Recipients>,
        provider: Arc<dyn BarProvider>,
        dispatcher: Arc<AlertDispatcher>,
        settings: ScanSettings,
        scans_completed: Arc<AtomicU64>,
        alerts_sent: Arc<AtomicU64>,
    ) -> Self {
        Self {
            watchlist,
            recipients,
            provider,
            dispatcher,
            settings,
            scan_lock: Mutex::new(()),
            running: AtomicBool::new(false),
            scans_completed,
            alerts_sent,
        }
    }

    /// Status read for health checks. Does not touch `scan_lock`.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fetch with the per-fetch timeout applied.
    async fn fetch(&self, ticker: &Ticker, period: Period) -> Result<BarSeries, ProviderError> {
        let timeout = self.settings.fetch_timeout;
        match tokio::time::timeout(timeout, self.provider.fetch(ticker, period)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout.as_secs())),
        }
    }

    /// Fetch and analyse one ticker without dispatching anything.
    pub async fn check(&self, ticker: &Ticker, period: Period) -> Result<CheckResult, ProviderError> {
        let series = self.fetch(ticker, period).await?;
        let enriched = analyze(&series, self.settings.threshold_pct)
            .map_err(|_| ProviderError::Empty(ticker.to_string()))?;
        Ok(CheckResult { series, enriched })
    }

    /// Manual single-ticker check delivered through `policy`.
    ///
    /// `Ok(None)` when the series holds no signal.
    pub async fn check_and_alert(
        &self,
        ticker: &Ticker,
        period: Period,
        policy: RecipientPolicy,
    ) -> Result<Option<DispatchReport>, ProviderError> {
        let result = self.check(ticker, period).await?;
        let Some(event) = result.event() else {
            return Ok(None);
        };

        let recipients = match policy.resolve(&self.recipients).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Failed to load recipients");
                Vec::new()
            }
        };
        let report = self
            .dispatcher
            .dispatch(&event, result.series.bars(), AlertKind::Manual, &recipients)
            .await;
        self.alerts_sent.fetch_add(report.delivered() as u64, Ordering::Relaxed);
        Ok(Some(report))
    }

    /// One full pass over the watchlist. Never runs twice at once.
    pub async fn run(&self, trigger: &str) -> ScanOutcome {
        let Ok(_guard) = self.scan_lock.try_lock() else {
            warn!(trigger, "⏭️ Scan already running — trigger skipped");
            return ScanOutcome::Skipped;
        };
        let _running = RunningFlag::raise(&self.running);

        info!(trigger, "🔎 Scan started");
        let mut report = ScanReport::begin();

        // ── 1. Snapshot the watchlist ──────────────────────────────────────
        let tickers = match self.watchlist.load().await {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "❌ Watchlist unavailable — scan aborted");
                report.fail("watchlist", e);
                return self.finish(report);
            }
        };

        // ── 2. Per-ticker pipeline ─────────────────────────────────────────
        for ticker in &tickers {
            report.scanned += 1;

            let result = match self.check(ticker, self.settings.period).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(ticker = %ticker, provider = self.provider.name(), error = %e, "Fetch failed — skipping ticker");
                    report.fail(ticker.as_str(), e);
                    continue;
                }
            };

            let Some(event) = result.event() else {
                debug!(ticker = %ticker, bars = result.series.len(), "No signal");
                continue;
            };

            info!(
                ticker  = %ticker,
                date    = %event.bar.bar.date,
                gap_pct = event.bar.gap_pct,
                "📉 Signal detected"
            );
            report.signals.push(ticker.to_string());

            // ── 3. Fan-out ─────────────────────────────────────────────────
            let recipients = match RecipientPolicy::Broadcast.resolve(&self.recipients).await {
                Ok(ids) => ids,
                Err(e) => {
                    error!(ticker = %ticker, error = %e, "Recipients unavailable — alert not sent");
                    report.fail(ticker.as_str(), e);
                    continue;
                }
            };

            let delivery = self
                .dispatcher
                .dispatch(&event, result.series.bars(), AlertKind::Scheduled, &recipients)
                .await;
            report.delivered += delivery.delivered();
            report.failed_deliveries += delivery.failed();
        }

        self.finish(report)
    }

    fn finish(&self, mut report: ScanReport) -> ScanOutcome {
        report.finished_at = Utc::now();
        self.scans_completed.fetch_add(1, Ordering::Relaxed);
        self.alerts_sent.fetch_add(report.delivered as u64, Ordering::Relaxed);

        info!(
            scanned   = report.scanned,
            signals   = report.signals.len(),
            failures  = report.failures.len(),
            delivered = report.delivered,
            "✅ Scan finished"
        );
        ScanOutcome::Completed(report)
    }

    /// Daily timer loop. Never returns; a failing cycle only affects itself.
    pub async fn run_forever(self: Arc<Self>, at: NaiveTime) {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, at);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, "⏰ Next scheduled scan");

            tokio::time::sleep(wait).await;
            self.run("schedule").await;
        }
    }
}

/// First instant strictly after `now` whose UTC wall-clock time is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        return today;
    }
    now.date_naive()
        .checked_add_days(Days::new(1))
        .map(|d| d.and_time(at).and_utc())
        .unwrap_or(today)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
