//! Domain models shared across the whole bot.

pub mod bar;
pub mod signal;
pub mod ticker;

pub use bar::{Bar, BarSeries};
pub use signal::{EnrichedBar, SignalEvent};
pub use ticker::Ticker;

/// Telegram chat identifier of a subscriber.
pub type ChatId = i64;
