//! File-backed store for the persisted document.
//!
//! Writes are serialized through an async mutex so two in-process
//! writers can never interleave bytes in the same file. This is
//! advisory only — a second *process* writing the file is not covered,
//! and two handlers may still race their read-modify-write cycles at
//! whole-document granularity (last save wins).

use crate::document::Document;
use javob_core::error::BotError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Handle to the JSON document on disk. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl Store {
    /// Open a store, creating the parent directory and a canonical
    /// empty document on first run.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, BotError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BotError::Store(format!("failed to create data dir: {e}")))?;
        }
        if !Path::new(&path).exists() {
            let empty = serde_json::to_vec_pretty(&Document::default())?;
            tokio::fs::write(&path, empty)
                .await
                .map_err(|e| BotError::Store(format!("failed to create db file: {e}")))?;
            info!("created db file at {}", path.display());
        }
        Ok(Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Load and normalize the document. Never fails: unreadable or
    /// unparseable files degrade to the empty document.
    pub async fn load(&self) -> Document {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) => {
                warn!("load: could not read {}: {e}; starting empty", self.path.display());
                return Document::default();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(raw) => Document::normalize(raw),
            Err(e) => {
                warn!("load: JSON parse failed, reinitializing: {e}");
                Document::default()
            }
        }
    }

    /// Serialize and write the whole document. One writer at a time.
    pub async fn save(&self, doc: &Document) -> Result<(), BotError> {
        let _guard = self.write_lock.lock().await;
        let bytes = serde_json::to_vec_pretty(doc)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| BotError::Store(format!("failed to write db file: {e}")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MessageSnapshot, ResponseItem, Rule, UserRecord};
    use javob_core::persona::Role;

    #[tokio::test]
    async fn open_creates_dir_and_canonical_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");
        let store = Store::open(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        for key in ["users", "conversations", "step", "messages"] {
            assert!(raw[key].is_object(), "{key} should be an object");
        }
        for key in ["autoReplies", "deletedLog"] {
            assert!(raw[key].is_array(), "{key} should be an array");
        }
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("db.json")).await.unwrap();

        let mut doc = Document::default();
        doc.users.insert(
            "7".into(),
            UserRecord {
                role: Role::Friend,
                persona_profile: None,
            },
        );
        doc.auto_replies.push(Rule {
            trigger: "salom".into(),
            responses: vec![ResponseItem::Text {
                content: "va alaykum".into(),
                use_html: false,
                entities: None,
            }],
        });
        doc.snapshot_message(MessageSnapshot {
            chat_id: "1".into(),
            message_id: 42,
            from_name: "Anvar".into(),
            text: Some("hi".into()),
            ..Default::default()
        });

        store.save(&doc).await.unwrap();
        let loaded = store.load().await;
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = Store::open(&path).await.unwrap();
        std::fs::write(&path, b"{ this is not json").unwrap();
        assert_eq!(store.load().await, Document::default());

        std::fs::write(&path, b"").unwrap();
        assert_eq!(store.load().await, Document::default());
    }

    #[tokio::test]
    async fn wrong_shaped_fields_are_coerced_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = Store::open(&path).await.unwrap();
        std::fs::write(&path, br#"{"users": [], "autoReplies": {"a": 1}, "step": 5}"#).unwrap();
        assert_eq!(store.load().await, Document::default());
    }
}
