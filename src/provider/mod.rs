//! # provider — OHLCV Provider Adapter
//!
//! [`BarProvider`] is the boundary to the outside market-data source:
//! `ticker + period → BarSeries | ProviderError`. Adapters turn whatever the
//! upstream returns into a [`RawFrame`] and hand it to [`normalize`], which
//! owns the column rules:
//!
//! * multi-level headers collapse to their innermost level
//! * names are matched case-insensitively (`price` is an alias for `Close`)
//! * a row missing any of the five fields is dropped, never filled

pub mod yahoo;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::models::{Bar, BarSeries, Ticker};

pub use yahoo::YahooProvider;

// ─── Period ───────────────────────────────────────────────────────────────────

/// Relative look-back window for a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "5d")]
    FiveDays,
    #[default]
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::FiveDays    => "5d",
            Period::OneMonth    => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths   => "6mo",
            Period::OneYear     => "1y",
            Period::TwoYears    => "2y",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5d"  => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "1y"  => Ok(Period::OneYear),
            "2y"  => Ok(Period::TwoYears),
            _ => Err(ProviderError::InvalidPeriod(s.to_string())),
        }
    }
}

// ─── Provider trait ───────────────────────────────────────────────────────────

#[async_trait]
pub trait BarProvider: Send + Sync {
    /// Fetch daily bars. No caching; every call goes upstream.
    async fn fetch(&self, ticker: &Ticker, period: Period) -> Result<BarSeries, ProviderError>;

    fn name(&self) -> &str;
}

// ─── Raw frame ────────────────────────────────────────────────────────────────

/// One upstream column. `header` holds every header level, outermost first
/// (e.g. `["BBRI.JK", "Close"]`).
#[derive(Debug, Clone)]
pub struct RawColumn {
    pub header: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl RawColumn {
    pub fn new(name: &str, values: Vec<Option<f64>>) -> Self {
        Self { header: vec![name.to_string()], values }
    }
}

/// Upstream table before normalisation: a date index plus loosely named
/// columns.
#[derive(Debug, Clone, Default)]
pub struct RawFrame {
    pub dates:   Vec<NaiveDate>,
    pub columns: Vec<RawColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
}

const REQUIRED: [(Field, &str); 5] = [
    (Field::Open,   "Open"),
    (Field::High,   "High"),
    (Field::Low,    "Low"),
    (Field::Close,  "Close"),
    (Field::Volume, "Volume"),
];

fn field_for(name: &str) -> Option<Field> {
    match name.trim().to_lowercase().as_str() {
        "open"            => Some(Field::Open),
        "high"            => Some(Field::High),
        "low"             => Some(Field::Low),
        "close" | "price" => Some(Field::Close),
        "volume"          => Some(Field::Volume),
        _ => None,
    }
}

fn cell(col: &[Option<f64>], i: usize) -> Option<f64> {
    col.get(i).copied().flatten().filter(|v| v.is_finite())
}

/// Turn a raw upstream table into a canonical [`BarSeries`].
pub fn normalize(ticker: &Ticker, frame: RawFrame) -> Result<BarSeries, ProviderError> {
    if frame.dates.is_empty() {
        return Err(ProviderError::Empty(ticker.to_string()));
    }

    let mut open = None;
    let mut high = None;
    let mut low = None;
    let mut close = None;
    let mut volume = None;

    for column in frame.columns {
        let Some(name) = column.header.last() else { continue };
        let slot = match field_for(name) {
            Some(Field::Open)   => &mut open,
            Some(Field::High)   => &mut high,
            Some(Field::Low)    => &mut low,
            Some(Field::Close)  => &mut close,
            Some(Field::Volume) => &mut volume,
            None => continue,
        };
        // first column wins when two names map to the same field
        if slot.is_none() {
            *slot = Some(column.values);
        }
    }

    let missing: Vec<&'static str> = REQUIRED
        .iter()
        .filter(|(field, _)| match field {
            Field::Open   => open.is_none(),
            Field::High   => high.is_none(),
            Field::Low    => low.is_none(),
            Field::Close  => close.is_none(),
            Field::Volume => volume.is_none(),
        })
        .map(|(_, name)| *name)
        .collect();

    let (Some(open), Some(high), Some(low), Some(close), Some(volume)) =
        (open, high, low, close, volume)
    else {
        return Err(ProviderError::MissingColumns(missing));
    };

    let mut bars = Vec::with_capacity(frame.dates.len());
    let mut dropped = 0usize;

    for (i, &date) in frame.dates.iter().enumerate() {
        let row = (
            cell(&open, i),
            cell(&high, i),
            cell(&low, i),
            cell(&close, i),
            cell(&volume, i).filter(|v| *v >= 0.0),
        );
        match row {
            (Some(open), Some(high), Some(low), Some(close), Some(volume)) => bars.push(Bar {
                date,
                open,
                high,
                low,
                close,
                volume: volume.round() as u64,
            }),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(ticker = %ticker, dropped, "Dropped rows with missing fields");
    }

    let series = BarSeries::new(ticker.clone(), bars);
    if series.is_empty() {
        return Err(ProviderError::Empty(ticker.to_string()));
    }

    Ok(series)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker() -> Ticker {
        Ticker::canonical("BBRI", ".JK").unwrap()
    }

    fn nested(levels: &[&str], values: Vec<Option<f64>>) -> RawColumn {
        RawColumn {
            header: levels.iter().map(|l| l.to_string()).collect(),
            values,
        }
    }

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2024, 5, 1 + i as u32).unwrap())
            .collect()
    }

    #[test]
    fn test_period_parse() {
        assert_eq!("1mo".parse::<Period>().unwrap(), Period::OneMonth);
        assert_eq!(" 3MO ".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert!(matches!("7w".parse::<Period>(), Err(ProviderError::InvalidPeriod(_))));
        assert_eq!(Period::SixMonths.to_string(), "6mo");
    }

    #[test]
    fn test_lowercase_and_price_alias() {
        let frame = RawFrame {
            dates: dates(2),
            columns: vec![
                RawColumn::new("open",   vec![Some(10.0), Some(11.0)]),
                RawColumn::new("HIGH",   vec![Some(12.0), Some(12.0)]),
                RawColumn::new("Low",    vec![Some(9.0),  Some(10.0)]),
                RawColumn::new("price",  vec![Some(11.0), Some(11.5)]),
                RawColumn::new("volume", vec![Some(100.0), Some(200.0)]),
            ],
        };
        let series = normalize(&ticker(), frame).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[1].close, 11.5);
        assert_eq!(series.bars()[1].volume, 200);
    }

    #[test]
    fn test_multi_level_header_collapses() {
        let frame = RawFrame {
            dates: dates(1),
            columns: vec![
                nested(&["BBRI.JK", "Open"],   vec![Some(10.0)]),
                nested(&["BBRI.JK", "High"],   vec![Some(12.0)]),
                nested(&["BBRI.JK", "Low"],    vec![Some(9.0)]),
                nested(&["BBRI.JK", "Close"],  vec![Some(11.0)]),
                nested(&["BBRI.JK", "Volume"], vec![Some(100.0)]),
            ],
        };
        let series = normalize(&ticker(), frame).unwrap();
        assert_eq!(series.bars()[0].open, 10.0);
    }

    #[test]
    fn test_rows_with_gaps_dropped() {
        let frame = RawFrame {
            dates: dates(3),
            columns: vec![
                RawColumn::new("Open",   vec![Some(10.0), None,       Some(11.0)]),
                RawColumn::new("High",   vec![Some(12.0), Some(12.0), Some(12.0)]),
                RawColumn::new("Low",    vec![Some(9.0),  Some(9.0),  Some(10.0)]),
                RawColumn::new("Close",  vec![Some(11.0), Some(11.0), Some(f64::NAN)]),
                RawColumn::new("Volume", vec![Some(1.0),  Some(1.0),  Some(1.0)]),
            ],
        };
        let series = normalize(&ticker(), frame).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].date, dates(3)[0]);
    }

    #[test]
    fn test_missing_columns_error() {
        let frame = RawFrame {
            dates: dates(1),
            columns: vec![
                RawColumn::new("Open",  vec![Some(10.0)]),
                RawColumn::new("Close", vec![Some(11.0)]),
            ],
        };
        match normalize(&ticker(), frame) {
            Err(ProviderError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["High", "Low", "Volume"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_frame_error() {
        let result = normalize(&ticker(), RawFrame::default());
        assert!(matches!(result, Err(ProviderError::Empty(_))));
    }

    #[test]
    fn test_all_rows_dropped_is_empty() {
        let frame = RawFrame {
            dates: dates(1),
            columns: ["Open", "High", "Low", "Close", "Volume"]
                .iter()
                .map(|n| RawColumn::new(n, vec![None]))
                .collect(),
        };
        assert!(matches!(normalize(&ticker(), frame), Err(ProviderError::Empty(_))));
    }
}
