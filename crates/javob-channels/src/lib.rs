//! # javob-channels
//!
//! Messaging platform integration. Currently Telegram only, via long
//! polling on the Bot API.

pub mod telegram;

pub use telegram::{TelegramChannel, TelegramEvent};
