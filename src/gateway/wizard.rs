//! Admin wizard: a menu-driven state machine for managing trigger
//! rules, active only in the admin's own chat.

use super::Gateway;
use javob_core::error::BotError;
use javob_core::html::{detect_html, looks_like_html};
use javob_core::message::{Inbound, SendOptions};
use javob_store::{Document, ResponseItem, Rule, WizardState};
use serde_json::{json, Value};

fn main_keyboard() -> Value {
    json!({
        "keyboard": [
            ["Add auto reply ✉️", "Remove auto reply 🚫"],
            ["List auto replies 📋"],
        ],
        "resize_keyboard": true,
    })
}

fn back_keyboard() -> Value {
    json!({ "keyboard": [["Back 🔙"]], "resize_keyboard": true })
}

fn done_keyboard() -> Value {
    json!({ "keyboard": [["Done!"], ["Back 🔙"]], "resize_keyboard": true })
}

impl Gateway {
    /// Handle menu commands and wizard steps. Returns true when the
    /// message was consumed and the pipeline must stop.
    pub(crate) async fn handle_wizard(
        &self,
        doc: &mut Document,
        inbound: &Inbound,
    ) -> Result<bool, BotError> {
        let text = inbound.text.as_deref().unwrap_or("");
        let is_admin_chat = inbound.chat_id == self.admin_id;

        if text == "/start" {
            if !is_admin_chat {
                self.reply(inbound, "Bu bot faqat admin uchun.", None).await?;
                return Ok(true);
            }
            self.reply(
                inbound,
                "Assalomu alaykum, admin. Tanlang:",
                Some(main_keyboard()),
            )
            .await?;
            return Ok(true);
        }

        if !is_admin_chat {
            return Ok(false);
        }

        // Menu commands win over any in-flight step.
        match text {
            "Add auto reply ✉️" => {
                doc.step
                    .insert(self.admin_id.clone(), WizardState::AddTrigger);
                self.store.save(doc).await?;
                self.reply(
                    inbound,
                    "Qaysi trigger so'zni qo'shmoqchisiz? (masalan: salom)",
                    Some(back_keyboard()),
                )
                .await?;
                return Ok(true);
            }
            "Remove auto reply 🚫" => {
                if doc.auto_replies.is_empty() {
                    self.reply(inbound, "Auto-reply ro'yxati bo'sh.", Some(main_keyboard()))
                        .await?;
                    return Ok(true);
                }
                let mut list = String::from("Auto-replylar:\n\n");
                for (i, rule) in doc.auto_replies.iter().enumerate() {
                    list.push_str(&format!(
                        "{}. {} ({} javob)\n",
                        i + 1,
                        rule.trigger,
                        rule.responses.len()
                    ));
                }
                doc.step
                    .insert(self.admin_id.clone(), WizardState::RemoveChoose);
                self.store.save(doc).await?;
                list.push_str("\nO'chirish uchun raqam yuboring yoki Back.");
                self.reply(inbound, &list, Some(back_keyboard())).await?;
                return Ok(true);
            }
            "List auto replies 📋" => {
                if doc.auto_replies.is_empty() {
                    self.reply(inbound, "Auto-reply ro'yxati bo'sh.", Some(main_keyboard()))
                        .await?;
                    return Ok(true);
                }
                let mut list = String::from("Auto-replylar:\n\n");
                for (i, rule) in doc.auto_replies.iter().enumerate() {
                    list.push_str(&format!("{}. {}\n", i + 1, rule.trigger));
                }
                self.reply(inbound, &list, Some(main_keyboard())).await?;
                return Ok(true);
            }
            "Back 🔙" => {
                // Always delete the step entry, never null it.
                doc.step.remove(&self.admin_id);
                self.store.save(doc).await?;
                self.reply(inbound, "Bosh menyu", Some(main_keyboard())).await?;
                return Ok(true);
            }
            _ => {}
        }

        let Some(step) = doc.step.get(&self.admin_id).cloned() else {
            return Ok(false);
        };

        match step {
            WizardState::AddTrigger => {
                let trigger = text.trim();
                if trigger.is_empty() {
                    self.reply(inbound, "Trigger bo'sh, qayta kiriting.", Some(back_keyboard()))
                        .await?;
                    return Ok(true);
                }
                doc.auto_replies.push(Rule {
                    trigger: trigger.to_string(),
                    responses: Vec::new(),
                });
                let index = doc.auto_replies.len() - 1;
                doc.step
                    .insert(self.admin_id.clone(), WizardState::AddResponse { index });
                self.store.save(doc).await?;
                self.reply(
                    inbound,
                    &format!(
                        "Trigger qo'shildi: \"{trigger}\"\nEndi triggerga beriladigan javobni \
                         yuboring (matn yoki media). Agar bir nechta javob qo'shmoqchi \
                         bo'lsangiz qayta yuboring. Tugagach 'Done!' yuboring."
                    ),
                    Some(done_keyboard()),
                )
                .await?;
                Ok(true)
            }
            WizardState::AddResponse { index } => {
                self.capture_response(doc, inbound, index).await?;
                Ok(true)
            }
            WizardState::RemoveChoose => {
                let n: usize = match text.trim().parse() {
                    Ok(n) if n >= 1 && n <= doc.auto_replies.len() => n,
                    _ => {
                        // Re-prompt, state unchanged.
                        self.reply(inbound, "Noto'g'ri raqam.", None).await?;
                        return Ok(true);
                    }
                };
                doc.auto_replies.remove(n - 1);
                doc.step.remove(&self.admin_id);
                self.store.save(doc).await?;
                self.reply(inbound, "O'chirildi.", Some(main_keyboard())).await?;
                Ok(true)
            }
        }
    }

    /// Capture one response payload for the rule under construction.
    async fn capture_response(
        &self,
        doc: &mut Document,
        inbound: &Inbound,
        index: usize,
    ) -> Result<(), BotError> {
        if index >= doc.auto_replies.len() {
            doc.step.remove(&self.admin_id);
            self.store.save(doc).await?;
            return self
                .reply(inbound, "Xato indeks, qayta boshlang.", Some(main_keyboard()))
                .await;
        }

        let text = inbound.text.as_deref().unwrap_or("");

        if text == "Done!" {
            doc.step.remove(&self.admin_id);
            self.store.save(doc).await?;
            return self
                .reply(inbound, "Auto-reply saqlandi.", Some(main_keyboard()))
                .await;
        }

        let (item, ack) = if !text.is_empty() {
            let (content, use_html) = detect_html(text);
            (
                ResponseItem::Text {
                    content,
                    use_html,
                    entities: inbound.entities.clone(),
                },
                "Matn javobi qo'shildi. Yana qo'shing yoki 'Done!'.",
            )
        } else if let Some(file_id) = &inbound.photo_file_id {
            let caption = inbound.caption.clone().unwrap_or_default();
            (
                ResponseItem::Photo {
                    file_id: file_id.clone(),
                    use_html: looks_like_html(&caption),
                    caption,
                    entities: None,
                },
                "Photo javobi qo'shildi.",
            )
        } else if let Some(file_id) = &inbound.document_file_id {
            let caption = inbound.caption.clone().unwrap_or_default();
            (
                ResponseItem::Document {
                    file_id: file_id.clone(),
                    use_html: looks_like_html(&caption),
                    caption,
                    entities: None,
                },
                "File javobi qo'shildi.",
            )
        } else if let Some(file_id) = &inbound.sticker_file_id {
            (
                ResponseItem::Sticker {
                    file_id: file_id.clone(),
                },
                "Sticker javobi qo'shildi.",
            )
        } else if let Some(file_id) = &inbound.voice_file_id {
            (
                ResponseItem::Voice {
                    file_id: file_id.clone(),
                    caption: inbound.caption.clone().unwrap_or_default(),
                },
                "Voice javobi qo'shildi.",
            )
        } else {
            return self
                .reply(
                    inbound,
                    "Qo'llab-quvvatlanmagan tur: iltimos matn yoki media yuboring.",
                    None,
                )
                .await;
        };

        doc.auto_replies[index].responses.push(item);
        self.store.save(doc).await?;
        self.reply(inbound, ack, None).await
    }

    async fn reply(
        &self,
        inbound: &Inbound,
        text: &str,
        keyboard: Option<Value>,
    ) -> Result<(), BotError> {
        let opts = SendOptions {
            reply_markup: keyboard,
            ..SendOptions::default()
        };
        self.outbound.send_text(&inbound.chat_id, text, &opts).await
    }
}
