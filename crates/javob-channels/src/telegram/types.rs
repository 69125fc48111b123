//! Telegram Bot API deserialization types and the deletion-signal
//! boundary adapter.

use javob_core::message::{DeletionSignal, Inbound};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub message: Option<TgMessage>,
    pub business_message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    pub date: Option<i64>,
    pub text: Option<String>,
    /// Entities are carried opaquely and echoed back on sends.
    pub entities: Option<Vec<Value>>,
    pub photo: Option<Vec<TgPhotoSize>>,
    pub document: Option<TgDocument>,
    pub sticker: Option<TgSticker>,
    pub voice: Option<TgVoice>,
    pub caption: Option<String>,
    pub business_connection_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgPhotoSize {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgDocument {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgSticker {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgVoice {
    pub file_id: String,
}

impl TgMessage {
    /// Whether the sender is a bot (those messages are dropped).
    pub(crate) fn from_bot(&self) -> bool {
        self.from.as_ref().is_some_and(|u| u.is_bot)
    }

    pub(crate) fn into_inbound(self) -> Inbound {
        let (from_id, from_name) = match self.from {
            Some(user) => {
                let name = if !user.first_name.is_empty() {
                    user.first_name
                } else {
                    user.username.unwrap_or_default()
                };
                (user.id.to_string(), name)
            }
            None => (String::new(), String::new()),
        };
        Inbound {
            chat_id: self.chat.id.to_string(),
            message_id: self.message_id,
            from_id,
            from_name,
            date: self.date.unwrap_or_else(|| chrono::Utc::now().timestamp()),
            text: self.text,
            entities: self.entities,
            // Telegram sends several photo sizes; the last is largest.
            photo_file_id: self.photo.and_then(|p| p.into_iter().last()).map(|p| p.file_id),
            document_file_id: self.document.map(|d| d.file_id),
            sticker_file_id: self.sticker.map(|s| s.file_id),
            voice_file_id: self.voice.map(|v| v.file_id),
            caption: self.caption,
            business_connection_id: self.business_connection_id,
        }
    }
}

/// Probe a raw update for any of the known deletion shapes and
/// normalize it. Telegram has no single reliable schema for deletions,
/// so the probing stays here at the boundary; everything past this
/// function sees one `DeletionSignal`.
pub(crate) fn deletion_signal(update: &Value) -> Option<DeletionSignal> {
    let info = update
        .pointer("/message/delete_chat_photo")
        .or_else(|| update.pointer("/edited_message/delete_message"))
        .or_else(|| update.pointer("/edited_message/deleted"))
        .or_else(|| update.get("message_deleted"))
        .or_else(|| update.get("deleted_message"))?;

    let chat_id = id_string(info.get("chat_id"))
        .or_else(|| id_string(info.get("chatId")))
        .or_else(|| id_string(info.pointer("/chat/id")))?;
    let message_id = id_string(info.get("message_id"))
        .or_else(|| id_string(info.get("messageId")))
        .or_else(|| id_string(info.pointer("/message/message_id")))?;

    Some(DeletionSignal {
        chat_id,
        message_id,
        who: info
            .get("who_deleted")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Accept both numeric and string ids.
fn id_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
