//! # telegram::commands
//!
//! Chat command surface. [`Command::parse`] turns message text into a
//! command; [`handle`] runs it and returns the reply text, if any. Failures
//! come back as a short human-readable reply, never as a crash.
//!
//! | Command                     | Effect                                   |
//! |-----------------------------|------------------------------------------|
//! | `/start`                    | register this chat, show help            |
//! | `/stop`                     | unregister this chat                     |
//! | `/help`                     | show help                                |
//! | `/addwatch T` `/rmwatch T`  | edit the watchlist                       |
//! | `/watchlist`                | list watched tickers                     |
//! | `/show_ids`                 | list registered chats                    |
//! | `/gapcheck T [period]`      | manual check, alert to this chat only    |
//! | `/cek_candle T`, `/chart T` | candle chart of the last month           |
//! | `/test_auto`, `/scan`       | run the scan now (broadcast)             |
//!
//! Replies are sent with `parse_mode=HTML`, so any user input or error text
//! placed in them goes through [`escape_html`].

use tracing::{info, warn};

use crate::engine::dispatcher::RecipientPolicy;
use crate::engine::scanner::ScanOutcome;
use crate::models::ChatId;
use crate::provider::Period;
use crate::state::AppState;

pub const HELP: &str = "\
📈 <b>Gap-down + accumulation alerts</b>

/start – subscribe this chat to alerts
/stop – unsubscribe
/addwatch TICKER – add to watchlist
/rmwatch TICKER – remove from watchlist
/watchlist – show watchlist
/show_ids – show subscribed chats
/gapcheck TICKER [5d|1mo|3mo|6mo|1y|2y] – check one ticker now
/cek_candle TICKER – candle chart (last month)
/test_auto – run the daily scan now";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Help,
    AddWatch(Option<String>),
    RmWatch(Option<String>),
    Watchlist,
    ShowIds,
    GapCheck { ticker: Option<String>, period: Option<String> },
    Chart(Option<String>),
    Scan,
    Unknown(String),
}

impl Command {
    /// `None` when the text is not a command at all.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        // "/cmd@SomeBot" in group chats
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        let arg1 = words.next().map(str::to_string);
        let arg2 = words.next().map(str::to_string);

        let cmd = match name.as_str() {
            "start"               => Command::Start,
            "stop"                => Command::Stop,
            "help"                => Command::Help,
            "addwatch"            => Command::AddWatch(arg1),
            "rmwatch"             => Command::RmWatch(arg1),
            "watchlist"           => Command::Watchlist,
            "show_ids"            => Command::ShowIds,
            "gapcheck"            => Command::GapCheck { ticker: arg1, period: arg2 },
            "cek_candle" | "chart" => Command::Chart(arg1),
            "test_auto" | "scan"  => Command::Scan,
            _                     => Command::Unknown(name),
        };
        Some(cmd)
    }
}

/// Run `command` for `chat_id`; the returned text is sent back to that chat.
pub async fn handle(state: &AppState, chat_id: ChatId, command: Command) -> Option<String> {
    info!(chat_id, ?command, "💬 Command received");

    match command {
        Command::Start => {
            let reply = match state.recipients.register(chat_id).await {
                Ok(true) => format!("✅ Subscribed. Alerts will be sent to this chat.\n\n{HELP}"),
                Ok(false) => format!("ℹ️ This chat is already subscribed.\n\n{HELP}"),
                Err(e) => failed("subscribe", e),
            };
            Some(reply)
        }

        Command::Stop => Some(match state.recipients.unregister(chat_id).await {
            Ok(true) => "👋 Unsubscribed. Send /start to subscribe again.".to_string(),
            Ok(false) => "ℹ️ This chat was not subscribed.".to_string(),
            Err(e) => failed("unsubscribe", e),
        }),

        Command::Help => Some(HELP.to_string()),

        Command::AddWatch(None) => Some("Usage: /addwatch TICKER".to_string()),
        Command::AddWatch(Some(raw)) => Some(match state.watchlist.add(&raw).await {
            Ok(true) => format!("✅ {} added to watchlist", short(state, &raw)),
            Ok(false) => format!("ℹ️ {} is already in the watchlist", short(state, &raw)),
            Err(e) => failed("add ticker", e),
        }),

        Command::RmWatch(None) => Some("Usage: /rmwatch TICKER".to_string()),
        Command::RmWatch(Some(raw)) => Some(match state.watchlist.remove(&raw).await {
            Ok(true) => format!("🗑️ {} removed from watchlist", short(state, &raw)),
            Ok(false) => format!("ℹ️ {} is not in the watchlist", short(state, &raw)),
            Err(e) => failed("remove ticker", e),
        }),

        Command::Watchlist => Some(match state.watchlist.load().await {
            Ok(tickers) if tickers.is_empty() => "📋 Watchlist is empty.".to_string(),
            Ok(tickers) => {
                let suffix = state.watchlist.suffix();
                let lines: Vec<String> = tickers.iter().map(|t| format!("• {}", t.short(suffix))).collect();
                format!("📋 <b>Watchlist</b>\n{}", lines.join("\n"))
            }
            Err(e) => failed("load watchlist", e),
        }),

        Command::ShowIds => Some(match state.recipients.list().await {
            Ok(ids) if ids.is_empty() => "No chats subscribed yet.".to_string(),
            Ok(ids) => {
                let lines: Vec<String> = ids.iter().map(|id| format!("• <code>{id}</code>")).collect();
                format!("👥 <b>Subscribed chats</b>\n{}", lines.join("\n"))
            }
            Err(e) => failed("load chats", e),
        }),

        Command::GapCheck { ticker: None, .. } => {
            Some("Usage: /gapcheck TICKER [5d|1mo|3mo|6mo|1y|2y]".to_string())
        }
        Command::GapCheck { ticker: Some(raw), period } => gap_check(state, chat_id, &raw, period.as_deref()).await,

        Command::Chart(None) => Some("Usage: /cek_candle TICKER".to_string()),
        Command::Chart(Some(raw)) => chart(state, chat_id, &raw).await,

        Command::Scan => Some(match state.scanner.run("command").await {
            ScanOutcome::Completed(report) => escape_html(&report.summary()),
            ScanOutcome::Skipped => "⏳ A scan is already running, try again later.".to_string(),
        }),

        Command::Unknown(name) => Some(format!(
            "Unknown command /{}. Send /help for the list.",
            escape_html(&name)
        )),
    }
}

async fn gap_check(state: &AppState, chat_id: ChatId, raw: &str, period: Option<&str>) -> Option<String> {
    let ticker = match state.watchlist.parse(raw) {
        Ok(t) => t,
        Err(e) => return Some(rejected(e)),
    };
    let period = match period.map(str::parse::<Period>).transpose() {
        Ok(p) => p.unwrap_or_default(),
        Err(e) => return Some(rejected(e)),
    };

    match state.scanner.check_and_alert(&ticker, period, RecipientPolicy::Single(chat_id)).await {
        Ok(Some(report)) if report.delivered() > 0 => None,
        Ok(Some(_)) => Some("❌ Signal found but the alert could not be delivered.".to_string()),
        Ok(None) => Some(format!(
            "🔍 No gap-down + accumulation signal for {} in the last {period}.",
            ticker.short(state.watchlist.suffix())
        )),
        Err(e) => Some(rejected(e)),
    }
}

async fn chart(state: &AppState, chat_id: ChatId, raw: &str) -> Option<String> {
    let ticker = match state.watchlist.parse(raw) {
        Ok(t) => t,
        Err(e) => return Some(rejected(e)),
    };

    let result = match state.scanner.check(&ticker, Period::OneMonth).await {
        Ok(r) => r,
        Err(e) => return Some(rejected(e)),
    };

    let chart = match state.renderer.render(&ticker, result.series.bars()).await {
        Ok(c) => c,
        Err(e) => return Some(rejected(e)),
    };

    let caption = format!("🕯️ {} | last month", ticker.short(state.watchlist.suffix()));
    match state.messenger.send_photo(chat_id, chart.path(), &caption).await {
        Ok(()) => None,
        Err(e) => {
            warn!(chat_id, error = %e, "Chart delivery failed");
            Some(rejected(e))
        }
    }
}

fn short(state: &AppState, raw: &str) -> String {
    state
        .watchlist
        .parse(raw)
        .map(|t| t.short(state.watchlist.suffix()).to_string())
        .unwrap_or_else(|_| escape_html(raw))
}

fn failed(action: &str, err: impl std::fmt::Display) -> String {
    warn!(action, error = %err, "Command failed");
    format!("❌ Could not {action}: {}", escape_html(&err.to_string()))
}

fn rejected(err: impl std::fmt::Display) -> String {
    format!("❌ {}", escape_html(&err.to_string()))
}

/// Escape the three characters Telegram's HTML parse mode reserves.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c   => out.push(c),
        }
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────────
