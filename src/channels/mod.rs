//! Chat transport abstraction.
//!
//! The command core is transport-agnostic: it consumes [`Incoming`] messages
//! and emits text/files through the [`Transport`] trait. The one production
//! implementation is the Telegram Bot API long-poller in [`telegram`]; tests
//! substitute an in-memory fake.

pub mod telegram;

use crate::auth::UserId;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

/// Chat identity outbound artifacts are addressed to.
pub type ChatId = i64;

/// One inbound text message.
#[derive(Debug, Clone)]
pub struct Incoming {
    pub sender: UserId,
    pub chat: ChatId,
    pub text: String,
}

/// Messaging transport the bot speaks through.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Receive messages indefinitely, delivering each into `tx`.
    async fn listen(&self, tx: mpsc::Sender<Incoming>) -> Result<()>;

    /// Send a text message, optionally Markdown-formatted.
    async fn send_text(&self, chat: ChatId, text: &str, markdown: bool) -> Result<()>;

    /// Send a local file with the given MIME type.
    async fn send_file(&self, chat: ChatId, path: &Path, mime: &str) -> Result<()>;
}
