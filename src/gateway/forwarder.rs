//! Deleted-message forwarding to the archive chat.

use super::Gateway;
use chrono::{TimeZone, Utc};
use javob_core::error::BotError;
use javob_core::message::{DeletionSignal, SendOptions};
use javob_store::{now_ms, DeletedEntry, MessageSnapshot};
use tracing::{info, warn};

impl Gateway {
    /// Forward a deleted message's snapshot to the archive chat and
    /// record it in the deletion log. A missing snapshot is a no-op.
    pub(crate) async fn handle_deletion(&self, signal: DeletionSignal) -> Result<(), BotError> {
        let mut doc = self.store.load().await;

        let Some(snapshot) = doc.snapshot(&signal.chat_id, &signal.message_id).cloned() else {
            info!(
                "deletion signal for unsnapshotted message chat={} id={}",
                signal.chat_id, signal.message_id
            );
            return Ok(());
        };

        // A missing archive chat skips only the forwarding; the
        // snapshot is still stamped as deleted below.
        if self.archive_chat_id.is_empty() {
            warn!("archive chat id not set; cannot forward deleted message");
        } else {
            self.forward_snapshot(&snapshot).await;
            doc.deleted_log.push(DeletedEntry {
                forwarded_at: now_ms(),
                original: snapshot,
            });
            info!(
                "forwarded deleted message chat={} id={} to archive",
                signal.chat_id, signal.message_id
            );
        }

        doc.mark_deleted(
            &signal.chat_id,
            &signal.message_id,
            now_ms(),
            signal.who.clone(),
        );
        self.store.save(&doc).await?;
        Ok(())
    }

    /// Send every populated payload kind of the snapshot. Individual
    /// send failures are logged and the rest still go out.
    async fn forward_snapshot(&self, snap: &MessageSnapshot) {
        let archive = &self.archive_chat_id;
        let header = deletion_header(snap);

        if let Some(text) = &snap.text {
            let opts = SendOptions {
                html: snap.use_html,
                ..SendOptions::default()
            };
            if let Err(e) = self
                .outbound
                .send_text(archive, &format!("{header}{text}"), &opts)
                .await
            {
                warn!("failed to forward deleted text: {e}");
            }
        }
        if let Some(file_id) = &snap.photo_file_id {
            let caption = format!("{header}{}", snap.caption.as_deref().unwrap_or_default());
            let opts = SendOptions {
                html: snap.caption_html,
                ..SendOptions::default()
            };
            if let Err(e) = self.outbound.send_photo(archive, file_id, &caption, &opts).await {
                warn!("failed to forward deleted photo: {e}");
            }
        }
        if let Some(file_id) = &snap.document_file_id {
            let caption = format!("{header}{}", snap.caption.as_deref().unwrap_or_default());
            let opts = SendOptions {
                html: snap.caption_html,
                ..SendOptions::default()
            };
            if let Err(e) = self
                .outbound
                .send_document(archive, file_id, &caption, &opts)
                .await
            {
                warn!("failed to forward deleted document: {e}");
            }
        }
        if let Some(file_id) = &snap.sticker_file_id {
            if let Err(e) = self
                .outbound
                .send_sticker(archive, file_id, &SendOptions::default())
                .await
            {
                warn!("failed to forward deleted sticker: {e}");
            }
        }
        if let Some(file_id) = &snap.voice_file_id {
            let caption = format!("{header}{}", snap.caption.as_deref().unwrap_or_default());
            if let Err(e) = self
                .outbound
                .send_voice(archive, file_id, &caption, &SendOptions::default())
                .await
            {
                warn!("failed to forward deleted voice: {e}");
            }
        }
    }
}

/// Header identifying the deleted message's origin.
pub(crate) fn deletion_header(snap: &MessageSnapshot) -> String {
    let sent_at = Utc.timestamp_opt(snap.date, 0).single().unwrap_or_default();
    format!(
        "⚠️ O'chirilgan xabar\nFrom: {} (id: {})\nChat: {}\nMessageId: {}\nSent at: {}\n\n",
        if snap.from_name.is_empty() {
            "Unknown"
        } else {
            &snap.from_name
        },
        snap.from_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string()),
        snap.chat_id,
        snap.message_id,
        sent_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
    )
}
