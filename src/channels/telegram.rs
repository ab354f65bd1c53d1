//! Telegram Bot API transport.
//!
//! ## Architecture
//! - **Incoming**: long-polling `getUpdates` loop with offset tracking;
//!   non-text updates are skipped
//! - **Outgoing**: `sendMessage` for text (optional Markdown parse mode),
//!   `sendDocument`/`sendPhoto` via multipart upload for files

use super::{ChatId, Incoming, Transport};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;

/// Telegram Bot API base URL.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Long-poll wait passed to `getUpdates` (seconds).
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause before retrying after a failed poll.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram Bot API transport.
pub struct TelegramTransport {
    token: String,
    api_base: String,
    client: reqwest::Client,
}

// ── Bot API wire types ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    from: Option<TgUser>,
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Self {
        Self::with_api_base(token, TELEGRAM_API_BASE)
    }

    /// Point the transport at a different API host (for tests).
    pub fn with_api_base(token: &str, api_base: impl Into<String>) -> Self {
        // Client timeout must outlast the long-poll wait.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(POLL_TIMEOUT_SECS) + 60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            token: token.to_string(),
            api_base: api_base.into(),
            client,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token)
    }

    /// One `getUpdates` round. Returns the updates and the next offset.
    async fn poll_updates(&self, offset: i64) -> Result<(Vec<Update>, i64)> {
        let response = self
            .client
            .get(self.url("getUpdates"))
            .query(&[
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .context("getUpdates request failed")?;

        let body: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .context("getUpdates returned malformed JSON")?;
        if !body.ok {
            bail!(
                "getUpdates rejected: {}",
                body.description.unwrap_or_else(|| "unknown error".into())
            );
        }

        let updates = body.result.unwrap_or_default();
        let next_offset = updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(offset);
        Ok((updates, next_offset))
    }

    async fn check_send_response(response: reqwest::Response, method: &str) -> Result<()> {
        let body: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .with_context(|| format!("{method} returned malformed JSON"))?;
        if !body.ok {
            bail!(
                "{method} rejected: {}",
                body.description.unwrap_or_else(|| "unknown error".into())
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn listen(&self, tx: mpsc::Sender<Incoming>) -> Result<()> {
        tracing::info!("Telegram: long-polling for updates");
        let mut offset = 0i64;
        loop {
            let (updates, next_offset) = match self.poll_updates(offset).await {
                Ok(polled) => polled,
                Err(e) => {
                    tracing::warn!("Telegram poll failed, retrying: {e:#}");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };
            offset = next_offset;

            for update in updates {
                let Some(message) = update.message else {
                    continue;
                };
                let (Some(from), Some(text)) = (message.from, message.text) else {
                    continue;
                };
                let incoming = Incoming {
                    sender: from.id,
                    chat: message.chat.id,
                    text,
                };
                if tx.send(incoming).await.is_err() {
                    bail!("Telegram listener stopped: receiver dropped");
                }
            }
        }
    }

    async fn send_text(&self, chat: ChatId, text: &str, markdown: bool) -> Result<()> {
        let mut body = serde_json::json!({
            "chat_id": chat,
            "text": text,
        });
        if markdown {
            body["parse_mode"] = serde_json::Value::String("Markdown".into());
        }
        let response = self
            .client
            .post(self.url("sendMessage"))
            .json(&body)
            .send()
            .await
            .context("sendMessage request failed")?;
        Self::check_send_response(response, "sendMessage").await
    }

    async fn send_file(&self, chat: ChatId, path: &Path, mime: &str) -> Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read outgoing file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();

        // Photos get Telegram's image handling; everything else is a document.
        let (method, field) = if mime.starts_with("image/") {
            ("sendPhoto", "photo")
        } else {
            ("sendDocument", "document")
        };

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .with_context(|| format!("Invalid MIME type '{mime}'"))?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat.to_string())
            .part(field.to_string(), part);

        let response = self
            .client
            .post(self.url(method))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("{method} request failed"))?;
        Self::check_send_response(response, method).await
    }
}
