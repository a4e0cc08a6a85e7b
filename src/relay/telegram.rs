//! Telegram transport using teloxide.
//!
//! Long-polls `getUpdates` with an explicit offset instead of using the
//! teloxide dispatcher, so the update cursor stays a plain value owned by
//! the main loop.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, LinkPreviewOptions, UpdateKind};
use tracing::debug;

use crate::relay::error::RelayError;

/// One bot update, reduced to what the dispatcher needs.
#[derive(Debug, Clone)]
pub struct BotUpdate {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: String,
}

/// Bot transport seam. Every call returns a typed result; the caller decides
/// whether a failure is fatal for the pass or just logged.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch all pending updates with id >= `offset`, waiting up to
    /// `timeout_secs` when none are immediately available.
    async fn updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u32,
    ) -> Result<Vec<BotUpdate>, RelayError>;

    /// Send a text message to a chat, link previews disabled.
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), RelayError>;
}

/// Bot API transport over teloxide.
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u32,
    ) -> Result<Vec<BotUpdate>, RelayError> {
        let mut request = self
            .bot
            .get_updates()
            .timeout(timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);
        if let Some(offset) = offset {
            request = request.offset(offset as i32);
        }

        let updates = request
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        debug!("fetched {} update(s)", updates.len());

        Ok(updates
            .into_iter()
            .filter_map(|update| {
                let update_id = i64::from(update.id.0);
                match update.kind {
                    UpdateKind::Message(msg) => Some(BotUpdate {
                        update_id,
                        chat_id: msg.chat.id.0,
                        text: msg.text().unwrap_or_default().to_string(),
                    }),
                    _ => None,
                }
            })
            .collect())
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<(), RelayError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .link_preview_options(LinkPreviewOptions {
                is_disabled: true,
                url: None,
                prefer_small_media: false,
                prefer_large_media: false,
                show_above_text: false,
            })
            .await
            .map(|_| ())
            .map_err(|e| RelayError::Transport(e.to_string()))
    }
}
