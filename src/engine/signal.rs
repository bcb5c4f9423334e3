//! # engine::signal
//!
//! **Signal Pipeline** — pure transformation from daily bars to the
//! gap-down + accumulation signal. No I/O, no shared state.
//!
//! ```text
//! bars ──┬─ [1] gap stage         gap_pct, is_gap_down
//!        ├─ [2] money-flow stage  multiplier, money_flow, A/D line
//!        ├─ [3] OBV stage         obv, obv_delta, is_accumulating
//!        └─ [4] fusion            is_signal = gap_down && accumulating
//! ```
//!
//! Every stage yields exactly one element per input bar and carries its
//! running totals as fold state. An empty input is [`SignalError::NoData`],
//! never an empty `Ok`.

use crate::error::SignalError;
use crate::models::{Bar, BarSeries, EnrichedBar};

pub const DEFAULT_GAP_THRESHOLD_PCT: f64 = 2.0;

// ─── Stage outputs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapPoint {
    pub gap_pct:     Option<f64>,
    pub is_gap_down: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoneyFlowPoint {
    pub multiplier:   f64,
    pub money_flow:   f64,
    pub ad_line:      f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObvPoint {
    pub obv:             i64,
    pub delta:           Option<i64>,
    pub is_accumulating: bool,
}

fn non_empty(bars: &[Bar]) -> Result<&[Bar], SignalError> {
    if bars.is_empty() {
        Err(SignalError::NoData)
    } else {
        Ok(bars)
    }
}

// ─── [1] Gap ──────────────────────────────────────────────────────────────────

/// `gap_pct[i] = (open[i] - close[i-1]) / close[i-1] * 100`.
///
/// Gap-down is inclusive: `gap_pct == -threshold_pct` counts.
pub fn gap_stage(bars: &[Bar], threshold_pct: f64) -> Result<Vec<GapPoint>, SignalError> {
    let bars = non_empty(bars)?;

    let mut out = Vec::with_capacity(bars.len());
    let mut prev_close: Option<f64> = None;

    for bar in bars {
        let gap_pct = prev_close.map(|pc| (bar.open - pc) / pc * 100.0);
        out.push(GapPoint {
            gap_pct,
            is_gap_down: gap_pct.is_some_and(|g| g <= -threshold_pct),
        });
        prev_close = Some(bar.close);
    }

    Ok(out)
}

// ─── [2] Money flow / A-D line ────────────────────────────────────────────────

/// Money-flow multiplier for one bar. A zero-range day divides by 1, which
/// yields zero flow for any consistent bar.
pub fn money_flow_multiplier(bar: &Bar) -> f64 {
    let range = bar.high - bar.low;
    let divisor = if range == 0.0 { 1.0 } else { range };
    ((bar.close - bar.low) - (bar.high - bar.close)) / divisor
}

pub fn money_flow_stage(bars: &[Bar]) -> Result<Vec<MoneyFlowPoint>, SignalError> {
    let bars = non_empty(bars)?;

    let points = bars
        .iter()
        .scan(0.0_f64, |ad_line, bar| {
            let multiplier = money_flow_multiplier(bar);
            let money_flow = multiplier * bar.volume as f64;
            *ad_line += money_flow;
            Some(MoneyFlowPoint { multiplier, money_flow, ad_line: *ad_line })
        })
        .collect();

    Ok(points)
}

// ─── [3] On-balance volume ────────────────────────────────────────────────────

/// OBV seeded at 0 on the first bar; `+volume` on an up close, `-volume` on a
/// down close, unchanged on a flat close.
pub fn obv_stage(bars: &[Bar]) -> Result<Vec<ObvPoint>, SignalError> {
    let bars = non_empty(bars)?;

    let mut out = Vec::with_capacity(bars.len());
    let mut obv: i64 = 0;
    let mut prev_close: Option<f64> = None;

    for bar in bars {
        let delta = prev_close.map(|pc| {
            let volume = i64::try_from(bar.volume).unwrap_or(i64::MAX);
            if bar.close > pc {
                volume
            } else if bar.close < pc {
                -volume
            } else {
                0
            }
        });

        if let Some(d) = delta {
            obv = obv.saturating_add(d);
        }

        out.push(ObvPoint {
            obv,
            delta,
            is_accumulating: delta.is_some_and(|d| d > 0),
        });
        prev_close = Some(bar.close);
    }

    Ok(out)
}

// ─── [4] Fusion ───────────────────────────────────────────────────────────────

/// Run all stages over raw bars and zip them into [`EnrichedBar`]s.
pub fn analyze_bars(bars: &[Bar], threshold_pct: f64) -> Result<Vec<EnrichedBar>, SignalError> {
    let gaps  = gap_stage(bars, threshold_pct)?;
    let flows = money_flow_stage(bars)?;
    let obvs  = obv_stage(bars)?;

    let enriched = bars
        .iter()
        .zip(gaps)
        .zip(flows)
        .zip(obvs)
        .map(|(((bar, gap), flow), obv)| EnrichedBar {
            bar:                       *bar,
            gap_pct:                   gap.gap_pct,
            money_flow_multiplier:     flow.multiplier,
            money_flow_volume:         flow.money_flow,
            accumulation_distribution: flow.ad_line,
            on_balance_volume:         obv.obv,
            obv_delta:                 obv.delta,
            is_gap_down:               gap.is_gap_down,
            is_accumulating:           obv.is_accumulating,
            is_signal:                 gap.is_gap_down && obv.is_accumulating,
        })
        .collect();

    Ok(enriched)
}

/// Analyse a provider series. The series itself is left untouched.
pub fn analyze(series: &BarSeries, threshold_pct: f64) -> Result<Vec<EnrichedBar>, SignalError> {
    analyze_bars(series.bars(), threshold_pct)
}

/// The chronologically last bar with `is_signal`, if any.
pub fn latest_signal(enriched: &[EnrichedBar]) -> Option<&EnrichedBar> {
    enriched.iter().rev().find(|b| b.is_signal)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
