//! Outbound Bot API calls.

use super::types::TgResponse;
use super::TelegramChannel;
use async_trait::async_trait;
use javob_core::error::BotError;
use javob_core::message::SendOptions;
use javob_core::traits::Outbound;
use serde_json::{json, Map, Value};
use tracing::debug;

impl TelegramChannel {
    async fn call(&self, method: &str, body: Value) -> Result<(), BotError> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BotError::Channel(format!("telegram {method} request failed: {e}")))?;

        let parsed: TgResponse<Value> = resp
            .json()
            .await
            .map_err(|e| BotError::Channel(format!("telegram {method} bad response: {e}")))?;

        if !parsed.ok {
            return Err(BotError::Channel(format!(
                "telegram {method} rejected: {}",
                parsed.description.unwrap_or_default()
            )));
        }
        debug!("telegram {method} ok");
        Ok(())
    }
}

/// Fold send options into an API request body. Entities take precedence
/// over HTML parse mode so formatting is never applied twice.
fn apply_options(body: &mut Map<String, Value>, opts: &SendOptions, entity_field: &str) {
    if let Some(entities) = &opts.entities {
        body.insert(entity_field.to_string(), json!(entities));
    } else if opts.html {
        body.insert("parse_mode".to_string(), json!("HTML"));
    }
    if let Some(reply_to) = opts.reply_to {
        body.insert("reply_to_message_id".to_string(), json!(reply_to));
    }
    if let Some(conn) = &opts.business_connection_id {
        body.insert("business_connection_id".to_string(), json!(conn));
    }
    if let Some(markup) = &opts.reply_markup {
        body.insert("reply_markup".to_string(), markup.clone());
    }
}

#[async_trait]
impl Outbound for TelegramChannel {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), json!(chat_id));
        body.insert("text".to_string(), json!(text));
        apply_options(&mut body, opts, "entities");
        self.call("sendMessage", Value::Object(body)).await
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), json!(chat_id));
        body.insert("photo".to_string(), json!(file_id));
        if !caption.is_empty() {
            body.insert("caption".to_string(), json!(caption));
        }
        apply_options(&mut body, opts, "caption_entities");
        self.call("sendPhoto", Value::Object(body)).await
    }

    async fn send_document(
        &self,
        chat_id: &str,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), json!(chat_id));
        body.insert("document".to_string(), json!(file_id));
        if !caption.is_empty() {
            body.insert("caption".to_string(), json!(caption));
        }
        apply_options(&mut body, opts, "caption_entities");
        self.call("sendDocument", Value::Object(body)).await
    }

    async fn send_sticker(
        &self,
        chat_id: &str,
        file_id: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), json!(chat_id));
        body.insert("sticker".to_string(), json!(file_id));
        apply_options(&mut body, opts, "entities");
        self.call("sendSticker", Value::Object(body)).await
    }

    async fn send_voice(
        &self,
        chat_id: &str,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), json!(chat_id));
        body.insert("voice".to_string(), json!(file_id));
        if !caption.is_empty() {
            body.insert("caption".to_string(), json!(caption));
        }
        apply_options(&mut body, opts, "caption_entities");
        self.call("sendVoice", Value::Object(body)).await
    }
}
