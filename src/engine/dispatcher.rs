//! # engine::dispatcher
//!
//! **Alert Dispatcher** — fan-out of one [`SignalEvent`] to N chats.
//!
//! ```text
//! SignalEvent
//!     │
//!     ├─ format message          ticker, date, close, gap %, accumulation
//!     ├─ render chart            failure → text-only, never fatal
//!     ├─ for each recipient      photo (or text); a failed send is logged and
//!     │                          recorded, the loop carries on
//!     └─ drop chart artefact     file removed on every path
//! ```

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::chart::ChartRenderer;
use crate::error::{DeliveryError, StoreError};
use crate::models::{Bar, ChatId, SignalEvent};
use crate::store::Recipients;

// ─── Delivery boundary ────────────────────────────────────────────────────────

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError>;
}

// ─── Recipient policy ─────────────────────────────────────────────────────────

/// Who receives an alert. Resolved before [`AlertDispatcher::dispatch`]; the
/// dispatcher itself never guesses a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientPolicy {
    /// Every registered chat.
    Broadcast,
    /// Only the chat that asked (manual checks).
    Single(ChatId),
}

impl RecipientPolicy {
    pub async fn resolve(&self, recipients: &Recipients) -> Result<Vec<ChatId>, StoreError> {
        match self {
            RecipientPolicy::Broadcast => recipients.list().await,
            RecipientPolicy::Single(id) => Ok(vec![*id]),
        }
    }
}

// ─── Message ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Scheduled,
    Manual,
}

/// HTML-formatted alert text (Telegram `parse_mode=HTML`).
pub fn format_alert(event: &SignalEvent, kind: AlertKind, suffix: &str) -> String {
    let heading = match kind {
        AlertKind::Scheduled => "SIGNAL DETECTED",
        AlertKind::Manual    => "LATEST SIGNAL (manual check)",
    };
    let bar = &event.bar;
    let gap = bar
        .gap_pct
        .map(|g| format!("{g:.2}%"))
        .unwrap_or_else(|| "n/a".to_string());
    let accumulation = if bar.is_accumulating { "✅" } else { "❌" };

    format!(
        "📉 <b>{heading}</b>\n\
         Ticker: {}\n\
         Date: {}\n\
         Price: Rp {}\n\
         Gap: {gap}\n\
         Accumulation: {accumulation}",
        event.ticker.short(suffix),
        bar.bar.date.format("%Y-%m-%d"),
        format_thousands(bar.bar.close),
    )
}

/// `4250.4` → `"4,250"`.
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if negative {
        format!("-{out}")
    } else {
        out
    }
}

// ─── Outcome ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub chat_id:    ChatId,
    pub with_chart: bool,
    /// `None` on success.
    pub error:      Option<String>,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

// ─── Dispatcher ───────────────────────────────────────────────────────────────

pub struct AlertDispatcher {
    renderer:  Arc<dyn ChartRenderer>,
    messenger: Arc<dyn Messenger>,
    suffix:    String,
}

impl AlertDispatcher {
    pub fn new(
        renderer: Arc<dyn ChartRenderer>,
        messenger: Arc<dyn Messenger>,
        suffix: impl Into<String>,
    ) -> Self {
        Self { renderer, messenger, suffix: suffix.into() }
    }

    /// Deliver one event to every chat in `recipients`, independently.
    ///
    /// `chart_bars` is the series plotted next to the alert.
    pub async fn dispatch(
        &self,
        event: &SignalEvent,
        chart_bars: &[Bar],
        kind: AlertKind,
        recipients: &[ChatId],
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        if recipients.is_empty() {
            warn!(ticker = %event.ticker, "No recipients registered — alert not sent");
            return report;
        }

        let message = format_alert(event, kind, &self.suffix);

        let chart = match self.renderer.render(&event.ticker, chart_bars).await {
            Ok(chart) => Some(chart),
            Err(e) => {
                warn!(ticker = %event.ticker, error = %e, "Chart unavailable — sending text only");
                None
            }
        };

        for &chat_id in recipients {
            let outcome = self.deliver_one(chat_id, &message, chart.as_ref().map(|c| c.path())).await;
            report.outcomes.push(outcome);
        }

        // artefact goes away here whatever happened above
        drop(chart);

        info!(
            ticker    = %event.ticker,
            delivered = report.delivered(),
            failed    = report.failed(),
            "📨 Alert dispatched"
        );
        report
    }

    async fn deliver_one(&self, chat_id: ChatId, message: &str, chart: Option<&Path>) -> DeliveryOutcome {
        if let Some(path) = chart {
            match self.messenger.send_photo(chat_id, path, message).await {
                Ok(()) => {
                    return DeliveryOutcome { chat_id, with_chart: true, error: None };
                }
                Err(e) => {
                    warn!(chat_id, error = %e, "Photo delivery failed — retrying as text");
                }
            }
        }

        match self.messenger.send_text(chat_id, message).await {
            Ok(()) => DeliveryOutcome { chat_id, with_chart: false, error: None },
            Err(e) => {
                error!(chat_id, error = %e, "❌ Alert delivery failed");
                DeliveryOutcome { chat_id, with_chart: false, error: Some(e.to_string()) }
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
