//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates`; outbound sends go through one
//! method per media kind. Docs: <https://core.telegram.org/bots/api>

mod polling;
mod send;
pub(crate) mod types;

use javob_core::config::TelegramConfig;
use javob_core::message::{DeletionSignal, Inbound};
use std::sync::Arc;
use tokio::sync::Mutex;

/// An event decoded from one Telegram update.
#[derive(Debug, Clone)]
pub enum TelegramEvent {
    /// A regular chat message.
    Message(Inbound),
    /// A message in a business connection (replies must carry the
    /// connection id).
    BusinessMessage(Inbound),
    /// A message-deletion signal, already normalized from whichever raw
    /// shape the platform produced.
    Deletion(DeletionSignal),
}

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: &TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Self {
            client: reqwest::Client::new(),
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
        }
    }
}
