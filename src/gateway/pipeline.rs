//! Message processing pipeline.
//!
//! Per inbound message: snapshot → admin wizard → trigger rules →
//! web search → provider chain → duplicate gate → send.

use super::Gateway;
use javob_core::error::BotError;
use javob_core::html::{detect_html, escape_unless_html, looks_like_html};
use javob_core::message::{Inbound, SendOptions};
use javob_providers::search::SearchResult;
use javob_store::{now_ms, MessageSnapshot, ResponseItem, DUPLICATE_WINDOW_MS};
use tracing::{info, warn};

/// Attribution appended to every rule-authored reply.
pub(crate) const SENT_NOTE: &str = "(Bu javob bot tomonidan yuborildi.)";

/// Notice sent when the duplicate gate suppresses an AI reply.
pub(crate) const DUPLICATE_NOTICE: &str = "Kechirasiz, men xuddi shu javobni oldin berganman — \
     iltimos, boshqa savol bering yoki batafsilroq yozing.";

impl Gateway {
    pub(crate) async fn handle_message(&self, inbound: Inbound) -> Result<(), BotError> {
        let preview = inbound.text.as_deref().unwrap_or("<media>");
        let preview: String = preview.chars().take(60).collect();
        info!(
            "[{}] {} says: {preview}",
            inbound.chat_id,
            if inbound.from_name.is_empty() {
                "unknown"
            } else {
                &inbound.from_name
            },
        );

        let mut doc = self.store.load().await;

        doc.snapshot_message(build_snapshot(&inbound));
        self.store.save(&doc).await?;

        if self.handle_wizard(&mut doc, &inbound).await? {
            return Ok(());
        }

        // No auto-replies to the admin's own messages.
        if inbound.is_from(&self.admin_id) {
            return Ok(());
        }

        let text = inbound.text.clone().unwrap_or_default();

        if let Some(rule) = doc.match_auto_reply(&text) {
            info!(
                "auto-reply matched trigger={:?} for chat={}",
                rule.trigger, inbound.chat_id
            );
            let responses = rule.responses.clone();
            for (i, item) in responses.iter().enumerate() {
                if !doc.can_send_and_mark(
                    &inbound.chat_id,
                    item.dedup_key(),
                    now_ms(),
                    DUPLICATE_WINDOW_MS,
                ) {
                    info!("skipping duplicate auto-reply for chat {}", inbound.chat_id);
                    continue;
                }
                // Only the first item replies to the triggering message.
                let reply_to = (i == 0).then_some(inbound.message_id);
                if let Err(e) = self.send_response(&inbound, item, reply_to).await {
                    warn!("auto-reply send error: {e}");
                }
            }
            self.store.save(&doc).await?;
            return Ok(());
        }

        // Best-effort grounding search; any failure degrades to an
        // unsearched prompt.
        let results: Vec<SearchResult> = if self.search.is_configured() && !text.is_empty() {
            match self.search.search(&text).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("serper error: {e}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let display_name = if inbound.from_name.is_empty() {
            "Foydalanuvchi"
        } else {
            &inbound.from_name
        };
        let persona = doc.persona_for(&inbound.from_id, &self.admin_id, display_name);

        let reply = self.chain.generate(&persona, &text, &results).await;

        let opts = SendOptions {
            reply_to: Some(inbound.message_id),
            business_connection_id: inbound.business_connection_id.clone(),
            ..SendOptions::default()
        };

        if !doc.can_send_and_mark(&inbound.chat_id, &reply, now_ms(), DUPLICATE_WINDOW_MS) {
            info!("skipping duplicate AI reply for chat {}", inbound.chat_id);
            self.store.save(&doc).await?;
            self.outbound
                .send_text(&inbound.chat_id, DUPLICATE_NOTICE, &opts)
                .await?;
            return Ok(());
        }
        self.store.save(&doc).await?;

        self.outbound
            .send_text(&inbound.chat_id, &escape_unless_html(&reply, false), &opts)
            .await?;
        info!("sent AI reply to {}", inbound.chat_id);
        Ok(())
    }

    /// Send one rule response with the attribution note appended.
    async fn send_response(
        &self,
        inbound: &Inbound,
        item: &ResponseItem,
        reply_to: Option<i64>,
    ) -> Result<(), BotError> {
        let chat_id = &inbound.chat_id;
        let base = SendOptions {
            reply_to,
            business_connection_id: inbound.business_connection_id.clone(),
            ..SendOptions::default()
        };

        match item {
            ResponseItem::Text {
                content,
                use_html,
                entities,
            } => {
                let html = *use_html && entities.is_none();
                let text = escape_unless_html(&format!("{content}\n\n{SENT_NOTE}"), html);
                let opts = SendOptions {
                    html,
                    entities: entities.clone(),
                    ..base
                };
                self.outbound.send_text(chat_id, &text, &opts).await
            }
            ResponseItem::Photo {
                file_id,
                caption,
                use_html,
                entities,
            } => {
                let html = *use_html && entities.is_none();
                let caption = escape_unless_html(&format!("{caption}\n\n{SENT_NOTE}"), html);
                let opts = SendOptions {
                    html,
                    entities: entities.clone(),
                    ..base
                };
                self.outbound
                    .send_photo(chat_id, file_id, &caption, &opts)
                    .await
            }
            ResponseItem::Document {
                file_id,
                caption,
                use_html,
                entities,
            } => {
                let html = *use_html && entities.is_none();
                let caption = escape_unless_html(&format!("{caption}\n\n{SENT_NOTE}"), html);
                let opts = SendOptions {
                    html,
                    entities: entities.clone(),
                    ..base
                };
                self.outbound
                    .send_document(chat_id, file_id, &caption, &opts)
                    .await
            }
            ResponseItem::Sticker { file_id } => {
                self.outbound.send_sticker(chat_id, file_id, &base).await
            }
            ResponseItem::Voice { file_id, caption } => {
                let caption = format!("{caption}\n\n{SENT_NOTE}");
                self.outbound
                    .send_voice(chat_id, file_id, &caption, &base)
                    .await
            }
        }
    }
}

/// Build a snapshot for the message storage. The text is stored with
/// the `/html ` marker already stripped.
pub(crate) fn build_snapshot(inbound: &Inbound) -> MessageSnapshot {
    let (text, use_html) = match &inbound.text {
        Some(t) => {
            let (stripped, html) = detect_html(t);
            (Some(stripped), html)
        }
        None => (None, false),
    };
    MessageSnapshot {
        chat_id: inbound.chat_id.clone(),
        message_id: inbound.message_id,
        from_id: inbound.from_id.parse().ok(),
        from_name: inbound.from_name.clone(),
        date: inbound.date,
        saved_at: now_ms(),
        text,
        use_html,
        entities: inbound.entities.clone(),
        photo_file_id: inbound.photo_file_id.clone(),
        document_file_id: inbound.document_file_id.clone(),
        sticker_file_id: inbound.sticker_file_id.clone(),
        voice_file_id: inbound.voice_file_id.clone(),
        caption: inbound.caption.clone(),
        caption_html: inbound.caption.as_deref().is_some_and(looks_like_html),
        deleted_at: None,
        deleted_by: None,
    }
}
