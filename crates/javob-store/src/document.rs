//! The persisted document and its shape normalizer.
//!
//! Field names follow the on-disk wire format (`autoReplies`,
//! `deletedLog`, `photoFileId`, ...) so a db.json written by an earlier
//! deployment keeps loading.

use javob_core::persona::{Persona, Role};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Duplicate-suppression window: identical text to the same chat within
/// this span is not re-sent.
pub const DUPLICATE_WINDOW_MS: i64 = 5 * 60 * 1000;

/// The whole persisted state, serialized as one JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub users: BTreeMap<String, UserRecord>,
    #[serde(rename = "autoReplies")]
    pub auto_replies: Vec<Rule>,
    pub conversations: BTreeMap<String, Conversation>,
    /// Admin wizard state, keyed by user id. Absent entry = idle; a
    /// finished or cancelled flow removes the entry, never nulls it.
    pub step: BTreeMap<String, WizardState>,
    /// chat id → message id → snapshot.
    pub messages: BTreeMap<String, BTreeMap<String, MessageSnapshot>>,
    #[serde(rename = "deletedLog")]
    pub deleted_log: Vec<DeletedEntry>,
}

/// A known user and their optional stored persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub role: Role,
    #[serde(rename = "personaProfile", skip_serializing_if = "Option::is_none")]
    pub persona_profile: Option<Persona>,
}

/// Per-chat conversation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversation {
    #[serde(rename = "lastBotReply", skip_serializing_if = "Option::is_none")]
    pub last_bot_reply: Option<LastReply>,
}

/// Single-slot record of the most recent bot reply in a chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastReply {
    pub text: String,
    /// Epoch milliseconds.
    pub at: i64,
}

/// One trigger → ordered responses rule. Earlier rules win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    pub trigger: String,
    pub responses: Vec<ResponseItem>,
}

/// One response payload. Closed union — every send site dispatches
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseItem {
    Text {
        #[serde(default)]
        content: String,
        #[serde(default)]
        use_html: bool,
        /// Raw Telegram entities. When present they win over
        /// `use_html` to avoid double formatting.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entities: Option<Vec<Value>>,
    },
    Photo {
        #[serde(rename = "fileId")]
        file_id: String,
        #[serde(default)]
        caption: String,
        #[serde(default)]
        use_html: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entities: Option<Vec<Value>>,
    },
    Document {
        #[serde(rename = "fileId")]
        file_id: String,
        #[serde(default)]
        caption: String,
        #[serde(default)]
        use_html: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entities: Option<Vec<Value>>,
    },
    Sticker {
        #[serde(rename = "fileId")]
        file_id: String,
    },
    Voice {
        #[serde(rename = "fileId")]
        file_id: String,
        #[serde(default)]
        caption: String,
    },
}

impl ResponseItem {
    /// Text used by the duplicate-suppression gate for this item:
    /// content for text, caption (or the kind name) for media.
    pub fn dedup_key(&self) -> &str {
        match self {
            Self::Text { content, .. } => content,
            Self::Photo { caption, .. } | Self::Document { caption, .. } => {
                if caption.is_empty() {
                    self.kind()
                } else {
                    caption
                }
            }
            Self::Voice { caption, .. } => {
                if caption.is_empty() {
                    "voice"
                } else {
                    caption
                }
            }
            Self::Sticker { .. } => "sticker",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Photo { .. } => "photo",
            Self::Document { .. } => "document",
            Self::Sticker { .. } => "sticker",
            Self::Voice { .. } => "voice",
        }
    }
}

/// Admin wizard state. The `action` tag matches the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WizardState {
    AddTrigger,
    AddResponse { index: usize },
    RemoveChoose,
}

/// A stored copy of an inbound message, kept for deleted-message
/// forwarding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageSnapshot {
    #[serde(rename = "chatId")]
    pub chat_id: String,
    #[serde(rename = "messageId")]
    pub message_id: i64,
    #[serde(rename = "fromId", skip_serializing_if = "Option::is_none")]
    pub from_id: Option<i64>,
    #[serde(rename = "fromName")]
    pub from_name: String,
    /// Original message timestamp, epoch seconds.
    pub date: i64,
    /// When the snapshot was taken, epoch milliseconds.
    pub saved_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub use_html: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Value>>,
    #[serde(rename = "photoFileId", skip_serializing_if = "Option::is_none")]
    pub photo_file_id: Option<String>,
    #[serde(rename = "documentFileId", skip_serializing_if = "Option::is_none")]
    pub document_file_id: Option<String>,
    #[serde(rename = "stickerFileId", skip_serializing_if = "Option::is_none")]
    pub sticker_file_id: Option<String>,
    #[serde(rename = "voiceFileId", skip_serializing_if = "Option::is_none")]
    pub voice_file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub caption_html: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
}

/// One forwarded deleted message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletedEntry {
    pub forwarded_at: i64,
    #[serde(rename = "originalMeta")]
    pub original: MessageSnapshot,
}

impl Document {
    /// Coerce an arbitrary JSON value into a well-typed document.
    ///
    /// Never fails: a top-level field of the wrong kind becomes empty,
    /// and an entry that does not fit the schema is dropped with a
    /// warning. The persisted file may have been hand-edited or written
    /// by a different schema version; degrading to "empty but
    /// well-typed" beats crashing.
    pub fn normalize(raw: Value) -> Self {
        let mut obj = match raw {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            users: take_map(&mut obj, "users"),
            auto_replies: take_seq(&mut obj, "autoReplies"),
            conversations: take_map(&mut obj, "conversations"),
            step: take_map(&mut obj, "step"),
            messages: take_map(&mut obj, "messages"),
            deleted_log: take_seq(&mut obj, "deletedLog"),
        }
    }

    /// Role of a user: owner iff the configured admin, otherwise the
    /// stored role, defaulting to unknown.
    pub fn role_of(&self, user_id: &str, admin_id: &str) -> Role {
        if user_id.is_empty() {
            return Role::Unknown;
        }
        if user_id == admin_id {
            return Role::Owner;
        }
        self.users.get(user_id).map(|u| u.role).unwrap_or_default()
    }

    /// Stored persona for the user, or the role-derived fallback.
    pub fn persona_for(&self, user_id: &str, admin_id: &str, display_name: &str) -> Persona {
        if let Some(profile) = self.users.get(user_id).and_then(|u| u.persona_profile.clone()) {
            return profile;
        }
        Persona::fallback(self.role_of(user_id, admin_id), display_name)
    }

    /// First rule whose trigger is contained in `text`,
    /// case-insensitively. No word boundaries: a short trigger matches
    /// inside unrelated words, which is a documented quirk.
    pub fn match_auto_reply(&self, text: &str) -> Option<&Rule> {
        let lower = text.to_lowercase();
        self.auto_replies
            .iter()
            .find(|rule| !rule.trigger.is_empty() && lower.contains(&rule.trigger.to_lowercase()))
    }

    /// Duplicate-suppression gate with a recording side effect.
    ///
    /// Returns false (and records nothing) when the chat's last bot
    /// reply has identical text and is younger than `window_ms`.
    /// Otherwise overwrites the single-slot record and returns true —
    /// so A,B,A in quick succession is never suppressed on the second A.
    pub fn can_send_and_mark(
        &mut self,
        chat_id: &str,
        text: &str,
        now_ms: i64,
        window_ms: i64,
    ) -> bool {
        let convo = self.conversations.entry(chat_id.to_string()).or_default();
        if let Some(last) = &convo.last_bot_reply {
            if last.text == text && now_ms - last.at < window_ms {
                return false;
            }
        }
        convo.last_bot_reply = Some(LastReply {
            text: text.to_string(),
            at: now_ms,
        });
        true
    }

    /// Upsert a message snapshot.
    pub fn snapshot_message(&mut self, snapshot: MessageSnapshot) {
        self.messages
            .entry(snapshot.chat_id.clone())
            .or_default()
            .insert(snapshot.message_id.to_string(), snapshot);
    }

    pub fn snapshot(&self, chat_id: &str, message_id: &str) -> Option<&MessageSnapshot> {
        self.messages.get(chat_id)?.get(message_id)
    }

    /// Stamp a snapshot as deleted. No-op when the snapshot is absent.
    pub fn mark_deleted(
        &mut self,
        chat_id: &str,
        message_id: &str,
        deleted_at: i64,
        deleted_by: Option<String>,
    ) {
        if let Some(snap) = self
            .messages
            .get_mut(chat_id)
            .and_then(|chat| chat.get_mut(message_id))
        {
            snap.deleted_at = Some(deleted_at);
            snap.deleted_by = deleted_by;
        }
    }
}

fn take_map<T: DeserializeOwned>(
    obj: &mut serde_json::Map<String, Value>,
    key: &str,
) -> BTreeMap<String, T> {
    match obj.remove(key) {
        Some(Value::Object(entries)) => entries
            .into_iter()
            .filter_map(|(k, v)| match serde_json::from_value::<T>(v) {
                Ok(t) => Some((k, t)),
                Err(e) => {
                    warn!("normalize: dropping malformed entry {key}[{k}]: {e}");
                    None
                }
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn take_seq<T: DeserializeOwned>(obj: &mut serde_json::Map<String, Value>, key: &str) -> Vec<T> {
    match obj.remove(key) {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .filter_map(|(i, v)| match serde_json::from_value::<T>(v) {
                Ok(t) => Some(t),
                Err(e) => {
                    warn!("normalize: dropping malformed entry {key}[{i}]: {e}");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_rule(trigger: &str, content: &str) -> Rule {
        Rule {
            trigger: trigger.to_string(),
            responses: vec![ResponseItem::Text {
                content: content.to_string(),
                use_html: false,
                entities: None,
            }],
        }
    }

    #[test]
    fn normalize_of_garbage_yields_empty_fields() {
        for raw in [json!(null), json!(42), json!("db"), json!([])] {
            let doc = Document::normalize(raw);
            assert_eq!(doc, Document::default());
        }
    }

    #[test]
    fn normalize_coerces_wrong_kinds() {
        let doc = Document::normalize(json!({
            "users": [],
            "autoReplies": {"not": "a list"},
            "conversations": 7,
            "step": null,
            "messages": "nope",
            "deletedLog": {},
        }));
        assert_eq!(doc, Document::default());
    }

    #[test]
    fn normalize_keeps_valid_entries_and_drops_malformed() {
        let doc = Document::normalize(json!({
            "users": {
                "7": {"role": "friend"},
                "8": {"role": "martian"},
                "9": 12,
            },
            "autoReplies": [
                {"trigger": "salom", "responses": [
                    {"type": "text", "content": "va alaykum"},
                ]},
                {"trigger": "x", "responses": [{"type": "hologram"}]},
                "garbage",
            ],
        }));
        assert_eq!(doc.users.len(), 1);
        assert_eq!(doc.users["7"].role, Role::Friend);
        assert_eq!(doc.auto_replies.len(), 1);
        assert_eq!(doc.auto_replies[0].trigger, "salom");
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = json!({
            "users": {"5": {"role": "contact"}},
            "autoReplies": [{"trigger": "hi", "responses": []}],
            "conversations": {"1": {"lastBotReply": {"text": "ok", "at": 10}}},
            "step": {"5": {"action": "add_response", "index": 2}},
            "messages": {"1": {"42": {"chatId": "1", "messageId": 42, "fromName": "A",
                               "date": 1, "saved_at": 2, "text": "hi",
                               "use_html": false, "caption_html": false}}},
            "deletedLog": [],
            "junkField": true,
        });
        let once = Document::normalize(raw);
        let twice = Document::normalize(serde_json::to_value(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn role_resolution() {
        let mut doc = Document::default();
        doc.users.insert(
            "7".into(),
            UserRecord {
                role: Role::Friend,
                persona_profile: None,
            },
        );
        assert_eq!(doc.role_of("1", "1"), Role::Owner);
        assert_eq!(doc.role_of("7", "1"), Role::Friend);
        assert_eq!(doc.role_of("99", "1"), Role::Unknown);
        assert_eq!(doc.role_of("", "1"), Role::Unknown);
    }

    #[test]
    fn trigger_match_is_case_insensitive_substring() {
        let mut doc = Document::default();
        doc.auto_replies.push(text_rule("salom", "va alaykum"));
        assert!(doc.match_auto_reply("Salom qandaysiz").is_some());
        // Documented quirk: matches inside unrelated words too.
        assert!(doc.match_auto_reply("assalom").is_some());
        assert!(doc.match_auto_reply("xayr").is_none());
    }

    #[test]
    fn first_matching_rule_wins() {
        let mut doc = Document::default();
        doc.auto_replies.push(text_rule("salom", "first"));
        doc.auto_replies.push(text_rule("salom alaykum", "second"));
        let rule = doc.match_auto_reply("salom alaykum").unwrap();
        assert_eq!(rule.trigger, "salom");
    }

    #[test]
    fn empty_trigger_never_matches() {
        let mut doc = Document::default();
        doc.auto_replies.push(text_rule("", "never"));
        assert!(doc.match_auto_reply("anything").is_none());
    }

    #[test]
    fn duplicate_within_window_is_suppressed() {
        let mut doc = Document::default();
        assert!(doc.can_send_and_mark("1", "X", 1_000, DUPLICATE_WINDOW_MS));
        assert!(!doc.can_send_and_mark("1", "X", 2_000, DUPLICATE_WINDOW_MS));
        // Other chats are unaffected.
        assert!(doc.can_send_and_mark("2", "X", 2_000, DUPLICATE_WINDOW_MS));
    }

    #[test]
    fn suppression_is_single_slot() {
        let mut doc = Document::default();
        assert!(doc.can_send_and_mark("1", "A", 1_000, DUPLICATE_WINDOW_MS));
        assert!(doc.can_send_and_mark("1", "B", 2_000, DUPLICATE_WINDOW_MS));
        // A again: only the most recent reply is remembered.
        assert!(doc.can_send_and_mark("1", "A", 3_000, DUPLICATE_WINDOW_MS));
    }

    #[test]
    fn suppression_expires_after_window() {
        let mut doc = Document::default();
        assert!(doc.can_send_and_mark("1", "X", 0, DUPLICATE_WINDOW_MS));
        assert!(doc.can_send_and_mark("1", "X", DUPLICATE_WINDOW_MS, DUPLICATE_WINDOW_MS));
    }

    #[test]
    fn suppressed_send_does_not_rerecord() {
        let mut doc = Document::default();
        assert!(doc.can_send_and_mark("1", "X", 0, DUPLICATE_WINDOW_MS));
        assert!(!doc.can_send_and_mark("1", "X", 1_000, DUPLICATE_WINDOW_MS));
        let last = doc.conversations["1"].last_bot_reply.as_ref().unwrap();
        assert_eq!(last.at, 0);
    }

    #[test]
    fn snapshot_upsert_and_lookup() {
        let mut doc = Document::default();
        doc.snapshot_message(MessageSnapshot {
            chat_id: "1".into(),
            message_id: 42,
            text: Some("hi".into()),
            ..Default::default()
        });
        assert!(doc.snapshot("1", "42").is_some());
        assert!(doc.snapshot("1", "43").is_none());

        doc.mark_deleted("1", "42", 9_000, Some("admin".into()));
        let snap = doc.snapshot("1", "42").unwrap();
        assert_eq!(snap.deleted_at, Some(9_000));
        assert_eq!(snap.deleted_by.as_deref(), Some("admin"));
    }

    #[test]
    fn wizard_state_wire_format() {
        let state = WizardState::AddResponse { index: 3 };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, json!({"action": "add_response", "index": 3}));
        let back: WizardState = serde_json::from_value(json!({"action": "remove_choose"})).unwrap();
        assert_eq!(back, WizardState::RemoveChoose);
    }

    #[test]
    fn response_item_wire_format() {
        let item: ResponseItem =
            serde_json::from_value(json!({"type": "photo", "fileId": "f1", "caption": "c"}))
                .unwrap();
        match &item {
            ResponseItem::Photo {
                file_id, caption, ..
            } => {
                assert_eq!(file_id, "f1");
                assert_eq!(caption, "c");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(item.kind(), "photo");
        assert!(serde_json::from_value::<ResponseItem>(json!({"type": "gif"})).is_err());
    }

    #[test]
    fn dedup_keys() {
        let text = ResponseItem::Text {
            content: "hi".into(),
            use_html: false,
            entities: None,
        };
        assert_eq!(text.dedup_key(), "hi");
        let photo: ResponseItem =
            serde_json::from_value(json!({"type": "photo", "fileId": "f"})).unwrap();
        assert_eq!(photo.dedup_key(), "photo");
        let sticker: ResponseItem =
            serde_json::from_value(json!({"type": "sticker", "fileId": "s"})).unwrap();
        assert_eq!(sticker.dedup_key(), "sticker");
    }
}
