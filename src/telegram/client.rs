//! # telegram::client
//!
//! Thin Bot API client over `reqwest`: `sendMessage`, `sendPhoto`
//! (multipart upload) and long-poll `getUpdates`. Implements [`Messenger`]
//! for the alert dispatcher.
//!
//! The bot token is part of every URL, so transport errors are stripped of
//! their URL before they are logged or returned.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::engine::dispatcher::Messenger;
use crate::error::DeliveryError;
use crate::models::ChatId;

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok:          bool,
    description: Option<String>,
    result:      Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message:   Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

// ─── Client ───────────────────────────────────────────────────────────────────

pub struct TelegramClient {
    client: reqwest::Client,
    base:   String,
}

impl TelegramClient {
    pub fn new(client: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            client,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    fn method(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }

    /// Long-poll for updates after `offset`. Blocks up to `timeout`.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, DeliveryError> {
        let resp = self
            .client
            .get(self.method("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout.as_secs().to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .timeout(timeout + Duration::from_secs(10))
            .send()
            .await
            .map_err(network)?;

        let updates = read_response::<Vec<Update>>(resp).await?;
        Ok(updates.unwrap_or_default())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(self.method("sendMessage"))
            .json(&json!({
                "chat_id":    chat_id,
                "text":       text,
                "parse_mode": "HTML",
            }))
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(network)?;

        read_response::<serde_json::Value>(resp).await?;
        debug!(chat_id, "Message sent");
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: &Path,
        caption: &str,
    ) -> Result<(), DeliveryError> {
        let bytes = tokio::fs::read(photo).await?;
        let file_name = photo
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chart.png".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/png")
            .map_err(network)?;

        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML")
            .part("photo", part);

        let resp = self
            .client
            .post(self.method("sendPhoto"))
            .multipart(form)
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(network)?;

        read_response::<serde_json::Value>(resp).await?;
        debug!(chat_id, "Photo sent");
        Ok(())
    }
}

fn network(e: reqwest::Error) -> DeliveryError {
    DeliveryError::Network(e.without_url().to_string())
}

async fn read_response<T>(resp: reqwest::Response) -> Result<Option<T>, DeliveryError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = resp.status();
    let body = resp.text().await.map_err(network)?;

    let parsed: ApiResponse<T> = match serde_json::from_str(&body) {
        Ok(p) => p,
        Err(_) => {
            return Err(DeliveryError::Rejected {
                status:      status.as_u16(),
                description: body.chars().take(200).collect(),
            })
        }
    };

    if !parsed.ok || !status.is_success() {
        return Err(DeliveryError::Rejected {
            status:      status.as_u16(),
            description: parsed.description.unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    Ok(parsed.result)
}
