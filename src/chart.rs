//! # chart — candlestick chart collaborator
//!
//! Rendering lives outside this process: [`HttpChartRenderer`] POSTs the
//! OHLCV rows to a chart service and stores the returned PNG under
//! `CHART_DIR`. The result is a [`ChartFile`] that deletes itself on drop, so
//! an artefact never outlives the delivery that needed it.
//!
//! With no `CHART_URL` configured the bot runs with [`NoChart`] and every
//! alert goes out as text.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::models::{Bar, Ticker};

// ─── Chart artefact ───────────────────────────────────────────────────────────

/// A rendered image on disk, removed when dropped.
#[derive(Debug)]
pub struct ChartFile {
    path: PathBuf,
}

impl ChartFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ChartFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "🧹 Chart file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove chart file"),
        }
    }
}

// ─── Renderer trait ───────────────────────────────────────────────────────────

#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, ticker: &Ticker, bars: &[Bar]) -> Result<ChartFile, RenderError>;
}

/// Renderer used when no chart service is configured.
pub struct NoChart;

#[async_trait]
impl ChartRenderer for NoChart {
    async fn render(&self, _ticker: &Ticker, _bars: &[Bar]) -> Result<ChartFile, RenderError> {
        Err(RenderError::Disabled)
    }
}

// ─── HTTP chart service ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChartRequest<'a> {
    title:  String,
    ylabel: &'static str,
    style:  ChartStyle,
    bars:   &'a [Bar],
}

#[derive(Debug, Serialize)]
struct ChartStyle {
    up:        &'static str,
    down:      &'static str,
    volume:    &'static str,
    grid:      &'static str,
    width:     u32,
    height:    u32,
}

const STYLE: ChartStyle = ChartStyle {
    up:     "#2E7D32",
    down:   "#C62828",
    volume: "#78909C",
    grid:   "#ECEFF1",
    width:  1200,
    height: 600,
};

pub struct HttpChartRenderer {
    client:  reqwest::Client,
    url:     String,
    dir:     PathBuf,
    suffix:  String,
    timeout: Duration,
}

impl HttpChartRenderer {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        dir: impl Into<PathBuf>,
        suffix: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            dir: dir.into(),
            suffix: suffix.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ChartRenderer for HttpChartRenderer {
    async fn render(&self, ticker: &Ticker, bars: &[Bar]) -> Result<ChartFile, RenderError> {
        if bars.is_empty() {
            return Err(RenderError::Http("no bars to plot".into()));
        }

        let short = ticker.short(&self.suffix);
        let request = ChartRequest {
            title:  format!("{short} | {}", Utc::now().format("%d %b %Y")),
            ylabel: "Price (IDR)",
            style:  STYLE,
            bars,
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RenderError::Http(format!("chart service unreachable: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RenderError::Http(format!("HTTP {status}: {body}")));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{short}_candle_{}.png", uuid::Uuid::new_v4()));
        let chart = write_chart(ChartFile::new(path), resp).await?;

        debug!(ticker = %ticker, path = %chart.path().display(), "📊 Chart rendered");
        Ok(chart)
    }
}

// ─── Image body ───────────────────────────────────────────────────────────────

/// Image bytes arriving in pieces.
#[async_trait]
trait ChunkSource: Send {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RenderError>;
}

#[async_trait]
impl ChunkSource for reqwest::Response {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, RenderError> {
        self.chunk()
            .await
            .map(|c| c.map(|b| b.to_vec()))
            .map_err(|e| RenderError::Http(format!("chart body: {e}")))
    }
}

/// Stream `source` into the file guarded by `chart`. On any error the guard
/// is dropped here and the partial file goes with it.
async fn write_chart(chart: ChartFile, mut source: impl ChunkSource) -> Result<ChartFile, RenderError> {
    let mut file = tokio::fs::File::create(chart.path()).await?;
    let mut written = 0usize;
    while let Some(chunk) = source.next_chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    if written == 0 {
        return Err(RenderError::Http("empty image".into()));
    }
    Ok(chart)
}
