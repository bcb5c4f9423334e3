//! # telegram::poller
//!
//! Long-poll loop over `getUpdates`. Each command runs in its own task so a
//! slow `/test_auto` never stalls other chats; replies go out through the
//! shared messenger.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::client::{Message, TelegramClient, Update};
use super::commands::{handle, Command};
use crate::state::SharedState;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Poll forever. Transport errors are logged and retried after a short pause.
pub async fn run_poller(state: SharedState, client: Arc<TelegramClient>) {
    info!("🤖 Telegram poller started");
    let mut offset: i64 = 0;

    loop {
        let updates = match client.get_updates(offset, state.config.poll_timeout).await {
            Ok(u) => u,
            Err(e) => {
                warn!(error = %e, "getUpdates failed — retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        offset = next_offset(offset, &updates);

        for message in updates.into_iter().filter_map(|u| u.message) {
            tokio::spawn(handle_message(Arc::clone(&state), message));
        }
    }
}

/// Acknowledge everything up to the newest update seen.
fn next_offset(current: i64, updates: &[Update]) -> i64 {
    updates
        .iter()
        .map(|u| u.update_id + 1)
        .fold(current, i64::max)
}

async fn handle_message(state: SharedState, message: Message) {
    let chat_id = message.chat.id;
    let Some(command) = message.text.as_deref().and_then(Command::parse) else {
        debug!(chat_id, "Ignoring non-command message");
        return;
    };

    let Some(reply) = handle(&state, chat_id, command).await else {
        return;
    };

    if let Err(e) = state.messenger.send_text(chat_id, &reply).await {
        warn!(chat_id, error = %e, "Failed to send command reply");
    }
}
