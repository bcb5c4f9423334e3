//! # provider::yahoo — Yahoo Finance v8 chart adapter
//!
//! `GET {base}/v8/finance/chart/{ticker}?range={period}&interval=1d`
//!
//! The quote block comes back as lower-case parallel arrays with `null` holes
//! on suspended days. Prices are auto-adjusted with the `adjclose` ratio when
//! Yahoo provides it, then everything goes through [`normalize`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{normalize, BarProvider, Period, RawColumn, RawFrame};
use crate::error::ProviderError;
use crate::models::{BarSeries, Ticker};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

// ─── Response shape ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error:  Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code:        String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta:       ChartMeta,
    timestamp:  Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds (25200 for Jakarta).
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote:    Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open:   Vec<Option<f64>>,
    #[serde(default)]
    high:   Vec<Option<f64>>,
    #[serde(default)]
    low:    Vec<Option<f64>>,
    #[serde(default)]
    close:  Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

// ─── Provider ─────────────────────────────────────────────────────────────────

pub struct YahooProvider {
    client:   reqwest::Client,
    base_url: String,
    timeout:  Duration,
}

impl YahooProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn chart_url(&self, ticker: &Ticker, period: Period) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d&includeAdjustedClose=true",
            self.base_url, ticker, period
        )
    }
}

#[async_trait]
impl BarProvider for YahooProvider {
    async fn fetch(&self, ticker: &Ticker, period: Period) -> Result<BarSeries, ProviderError> {
        let url = self.chart_url(ticker, period);
        debug!(ticker = %ticker, %period, url = %url, "Fetching daily bars");

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout.as_secs())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !status.is_success() {
            // Yahoo answers 404 with a regular chart body for unknown symbols
            if let Ok(chart) = serde_json::from_str::<ChartResponse>(&body) {
                if let Some(err) = chart.chart.error {
                    if err.code == "Not Found" {
                        return Err(ProviderError::Empty(ticker.to_string()));
                    }
                }
            }
            warn!(ticker = %ticker, http_status = %status, "Yahoo returned HTTP error");
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                body:   body.chars().take(200).collect(),
            });
        }

        let frame = parse_chart(ticker, &body)?;
        normalize(ticker, frame)
    }

    fn name(&self) -> &str {
        "yahoo_finance"
    }
}

// ─── Parsing ──────────────────────────────────────────────────────────────────

fn parse_chart(ticker: &Ticker, body: &str) -> Result<RawFrame, ProviderError> {
    let chart: ChartResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("chart JSON: {e}")))?;

    if let Some(err) = chart.chart.error {
        return Err(if err.code == "Not Found" {
            ProviderError::Empty(ticker.to_string())
        } else {
            ProviderError::Malformed(format!("{}: {}", err.code, err.description))
        });
    }

    let data = chart
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::Empty(ticker.to_string()))?;

    // no timestamps = no trading days in the window
    let timestamps = data.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Err(ProviderError::Empty(ticker.to_string()));
    }

    let offset = data.meta.gmtoffset;
    let dates = timestamps
        .iter()
        .map(|&ts| {
            chrono::DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| ProviderError::Malformed(format!("invalid timestamp: {ts}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(mut quote) = data.indicators.quote.into_iter().next() else {
        return Err(ProviderError::MissingColumns(vec!["Open", "High", "Low", "Close", "Volume"]));
    };

    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    if let Some(adj) = adj_closes {
        auto_adjust(&mut quote, &adj);
    }

    // Yahoo omits empty arrays on some responses; only pass on what exists
    let mut columns = Vec::with_capacity(5);
    for (name, values) in [
        ("open",   quote.open),
        ("high",   quote.high),
        ("low",    quote.low),
        ("close",  quote.close),
        ("volume", quote.volume),
    ] {
        if !values.is_empty() {
            columns.push(RawColumn::new(name, values));
        }
    }

    Ok(RawFrame { dates, columns })
}

/// Scale O/H/L/C by `adjclose / close` per row (split/dividend adjustment).
fn auto_adjust(quote: &mut QuoteData, adj: &[Option<f64>]) {
    for (i, adj_close) in adj.iter().enumerate() {
        let (Some(adj_close), Some(Some(close))) = (adj_close, quote.close.get(i).copied()) else {
            continue;
        };
        if close == 0.0 {
            continue;
        }
        let ratio = adj_close / close;
        for col in [&mut quote.open, &mut quote.high, &mut quote.low, &mut quote.close] {
            if let Some(Some(v)) = col.get_mut(i) {
                *v *= ratio;
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ticker() -> Ticker {
        Ticker::canonical("BBRI", ".JK").unwrap()
    }

    // 2024-05-13 02:00 UTC, 2024-05-14 02:00 UTC, 2024-05-15 02:00 UTC
    const BODY: &str = r#"{
      "chart": {
        "result": [{
          "meta": { "symbol": "BBRI.JK", "gmtoffset": 25200 },
          "timestamp": [1715565600, 1715652000, 1715738400],
          "indicators": {
            "quote": [{
              "open":   [4800.0, 4700.0, null],
              "high":   [4850.0, 4790.0, 4800.0],
              "low":    [4750.0, 4680.0, 4700.0],
              "close":  [4800.0, 4760.0, 4750.0],
              "volume": [100000, 250000, 90000]
            }],
            "adjclose": [{ "adjclose": [4800.0, 4760.0, 4750.0] }]
          }
        }],
        "error": null
      }
    }"#;

    #[test]
    fn test_parse_chart_to_series() {
        let frame = parse_chart(&ticker(), BODY).unwrap();
        assert_eq!(frame.dates[0], NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());

        let series = normalize(&ticker(), frame).unwrap();
        // third row has a null open and is dropped
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[1].open, 4700.0);
        assert_eq!(series.bars()[1].volume, 250_000);
    }

    #[test]
    fn test_not_found_is_empty() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(matches!(parse_chart(&ticker(), body), Err(ProviderError::Empty(_))));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(parse_chart(&ticker(), "<html>"), Err(ProviderError::Malformed(_))));
    }

    #[test]
    fn test_auto_adjust_scales_prices() {
        let mut quote = QuoteData {
            open:   vec![Some(100.0)],
            high:   vec![Some(110.0)],
            low:    vec![Some(90.0)],
            close:  vec![Some(100.0)],
            volume: vec![Some(5.0)],
        };
        auto_adjust(&mut quote, &[Some(50.0)]);
        assert_eq!(quote.open[0], Some(50.0));
        assert_eq!(quote.high[0], Some(55.0));
        assert_eq!(quote.close[0], Some(50.0));
        assert_eq!(quote.volume[0], Some(5.0));
    }
}
