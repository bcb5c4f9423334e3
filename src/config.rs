//! # config — environment configuration
//!
//! Read once at startup. Only `TELEGRAM_BOT_TOKEN` is required; everything
//! else falls back to a default.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveTime;

use crate::engine::signal::DEFAULT_GAP_THRESHOLD_PCT;
use crate::provider::Period;

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token:     String,
    /// Bot API base, e.g. `https://api.telegram.org`.
    pub telegram_api_url:   String,
    pub poll_timeout:       Duration,
    pub bind_addr:          SocketAddr,
    /// Empty → HTTP admin API runs without a key (dev mode).
    pub api_key:            String,
    pub data_dir:           PathBuf,
    pub chart_dir:          PathBuf,
    /// Chart service endpoint; `None` sends text-only alerts.
    pub chart_url:          Option<String>,
    pub yahoo_base_url:     String,
    pub market_suffix:      String,
    /// Daily scan time, UTC.
    pub scan_time:          NaiveTime,
    pub scan_period:        Period,
    pub gap_threshold_pct:  f64,
    pub fetch_timeout:      Duration,
    pub default_watchlist:  Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let telegram_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN environment variable is required")?;
        if telegram_token.trim().is_empty() {
            bail!("TELEGRAM_BOT_TOKEN is empty");
        }

        let bind_addr: SocketAddr = env_or("BIND_ADDR", "0.0.0.0:3000")
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let scan_time = parse_scan_time(&env_or("SCAN_TIME_UTC", "02:15"))?;

        let scan_period: Period = env_or("SCAN_PERIOD", "1mo")
            .parse()
            .context("SCAN_PERIOD")?;

        let gap_threshold_pct: f64 = env_or("GAP_THRESHOLD_PCT", &DEFAULT_GAP_THRESHOLD_PCT.to_string())
            .parse()
            .context("GAP_THRESHOLD_PCT must be a number")?;
        if !gap_threshold_pct.is_finite() || gap_threshold_pct < 0.0 {
            bail!("GAP_THRESHOLD_PCT must be a non-negative percentage, got {gap_threshold_pct}");
        }

        let poll_timeout = env_secs("TELEGRAM_POLL_TIMEOUT_SECS", 30)?;
        let fetch_timeout = env_secs("FETCH_TIMEOUT_SECS", 15)?;

        Ok(Self {
            telegram_token,
            telegram_api_url:  env_or("TELEGRAM_API_URL", "https://api.telegram.org"),
            poll_timeout,
            bind_addr,
            api_key:           std::env::var("API_KEY").unwrap_or_default(),
            data_dir:          PathBuf::from(env_or("DATA_DIR", "data")),
            chart_dir:         PathBuf::from(env_or("CHART_DIR", "temp")),
            chart_url:         std::env::var("CHART_URL").ok().filter(|s| !s.trim().is_empty()),
            yahoo_base_url:    env_or("YAHOO_BASE_URL", "https://query2.finance.yahoo.com"),
            market_suffix:     env_or("MARKET_SUFFIX", ".JK"),
            scan_time,
            scan_period,
            gap_threshold_pct,
            fetch_timeout,
            default_watchlist: parse_list(&env_or("DEFAULT_WATCHLIST", "BBRI,BMRI")),
        })
    }

    pub fn watchlist_path(&self) -> PathBuf {
        self.data_dir.join("watchlist.json")
    }

    pub fn recipients_path(&self) -> PathBuf {
        self.data_dir.join("chat_ids.json")
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> anyhow::Result<Duration> {
    parse_secs(key, std::env::var(key).ok().as_deref(), default)
}

/// Positive whole seconds; `None` means unset.
fn parse_secs(key: &str, raw: Option<&str>, default: u64) -> anyhow::Result<Duration> {
    let secs = match raw {
        None => default,
        Some(v) => v
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{key} must be whole seconds, got '{v}'"))?,
    };
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

/// `"HH:MM"` or `"HH:MM:SS"`.
fn parse_scan_time(raw: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
        .with_context(|| format!("SCAN_TIME_UTC must be HH:MM, got '{raw}'"))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
