//! # models::bar
//!
//! [`Bar`] is one trading day; [`BarSeries`] is the ordered run of bars for a
//! single ticker as handed out by the provider adapter.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Ticker;

/// One end-of-day OHLCV record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date:   NaiveDate,
    pub open:   f64,
    pub high:   f64,
    pub low:    f64,
    pub close:  f64,
    pub volume: u64,
}

impl Bar {
    /// `low ≤ open,close ≤ high`, all prices positive and finite.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return false;
        }

        self.low <= self.high
            && self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
    }
}

// ─── BarSeries ────────────────────────────────────────────────────────────────

/// Bars for one ticker, ascending by date with no duplicate dates.
///
/// Only [`BarSeries::new`] can build one, so every series downstream of the
/// provider already satisfies the ordering and OHLC invariants.
#[derive(Debug, Clone, Serialize)]
pub struct BarSeries {
    ticker: Ticker,
    bars:   Vec<Bar>,
}

impl BarSeries {
    /// Sort by date, keep the last row for a repeated date and drop rows that
    /// break the OHLC invariant.
    pub fn new(ticker: Ticker, mut bars: Vec<Bar>) -> Self {
        // stable sort: among equal dates the later row stays later
        bars.sort_by_key(|b| b.date);

        let mut clean: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            if !bar.is_consistent() {
                debug!(ticker = %ticker, date = %bar.date, "Dropping inconsistent bar");
                continue;
            }
            match clean.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => clean.push(bar),
            }
        }

        Self { ticker, bars: clean }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
