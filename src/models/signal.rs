//! # models::signal
//!
//! Output of the signal pipeline. One [`EnrichedBar`] per input [`Bar`], same
//! order; a [`SignalEvent`] carries the bar that fired to the dispatcher.

use serde::Serialize;

use super::{Bar, Ticker};

/// A [`Bar`] plus everything the pipeline derived for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedBar {
    #[serde(flatten)]
    pub bar: Bar,

    /// `(open - prev_close) / prev_close * 100`; `None` on the first bar.
    pub gap_pct: Option<f64>,

    pub money_flow_multiplier:     f64,
    pub money_flow_volume:         f64,
    /// Running sum of `money_flow_volume` (A/D line).
    pub accumulation_distribution: f64,

    /// Running signed-volume sum, seeded at 0.
    pub on_balance_volume: i64,
    /// `OBV[i] - OBV[i-1]`; `None` on the first bar.
    pub obv_delta:         Option<i64>,

    pub is_gap_down:     bool,
    pub is_accumulating: bool,
    pub is_signal:       bool,
}

/// Payload from the scanner to the dispatcher. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SignalEvent {
    pub ticker: Ticker,
    pub bar:    EnrichedBar,
}
