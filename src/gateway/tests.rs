//! Gateway end-to-end tests against a recording mock channel.

use super::Gateway;
use async_trait::async_trait;
use javob_core::config::{SearchConfig, TelegramConfig};
use javob_core::error::BotError;
use javob_core::message::{DeletionSignal, Inbound, SendOptions};
use javob_core::traits::Outbound;
use javob_providers::chain::ProviderChain;
use javob_providers::search::SearchClient;
use javob_providers::Provider;
use javob_store::{Document, ResponseItem, Rule, Store, WizardState};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone)]
struct Sent {
    kind: String,
    chat_id: String,
    payload: String,
    reply_to: Option<i64>,
}

/// Records every outbound call.
#[derive(Default)]
struct MockOutbound {
    sends: Mutex<Vec<Sent>>,
}

impl MockOutbound {
    fn record(&self, kind: &str, chat_id: &str, payload: &str, opts: &SendOptions) {
        self.sends.lock().unwrap().push(Sent {
            kind: kind.to_string(),
            chat_id: chat_id.to_string(),
            payload: payload.to_string(),
            reply_to: opts.reply_to,
        });
    }

    fn sent(&self) -> Vec<Sent> {
        self.sends.lock().unwrap().clone()
    }
}

#[async_trait]
impl Outbound for MockOutbound {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        self.record("text", chat_id, text, opts);
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: &str,
        _file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        self.record("photo", chat_id, caption, opts);
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: &str,
        _file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        self.record("document", chat_id, caption, opts);
        Ok(())
    }

    async fn send_sticker(
        &self,
        chat_id: &str,
        file_id: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        self.record("sticker", chat_id, file_id, opts);
        Ok(())
    }

    async fn send_voice(
        &self,
        chat_id: &str,
        _file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError> {
        self.record("voice", chat_id, caption, opts);
        Ok(())
    }
}

/// Counts completions so tests can assert the chain was never reached.
struct CountingProvider {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Provider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, _prompt: &str) -> Result<String, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("ai answer".to_string())
    }
}

struct Harness {
    gateway: Gateway,
    outbound: Arc<MockOutbound>,
    provider_calls: Arc<AtomicU32>,
    _dir: TempDir,
}

async fn harness(ai_enabled: bool, archive_chat_id: &str, seed: Option<Document>) -> Harness {
    let dir = TempDir::new().unwrap();
    let store = Store::open(dir.path().join("db.json")).await.unwrap();
    if let Some(doc) = seed {
        store.save(&doc).await.unwrap();
    }

    let provider_calls = Arc::new(AtomicU32::new(0));
    let chain = ProviderChain::new(
        ai_enabled,
        "",
        vec![Arc::new(CountingProvider {
            calls: provider_calls.clone(),
        })],
    );
    let outbound = Arc::new(MockOutbound::default());
    let telegram = TelegramConfig {
        bot_token: "test:token".to_string(),
        admin_id: "42".to_string(),
        archive_chat_id: archive_chat_id.to_string(),
    };

    let gateway = Gateway::new(
        store,
        chain,
        SearchClient::from_config(&SearchConfig::default()),
        outbound.clone(),
        &telegram,
    );
    Harness {
        gateway,
        outbound,
        provider_calls,
        _dir: dir,
    }
}

fn inbound(chat_id: &str, message_id: i64, text: &str) -> Inbound {
    Inbound {
        chat_id: chat_id.to_string(),
        message_id,
        from_id: chat_id.to_string(),
        from_name: "Aziz".to_string(),
        date: 1_700_000_000,
        text: Some(text.to_string()),
        ..Inbound::default()
    }
}

fn doc_with_rule(trigger: &str, content: &str) -> Document {
    Document {
        auto_replies: vec![Rule {
            trigger: trigger.to_string(),
            responses: vec![ResponseItem::Text {
                content: content.to_string(),
                use_html: false,
                entities: None,
            }],
        }],
        ..Document::default()
    }
}

#[tokio::test]
async fn trigger_rule_sends_one_attributed_reply() {
    let h = harness(true, "", Some(doc_with_rule("hello", "hi there"))).await;

    h.gateway
        .handle_message(inbound("5", 1, "well hello there"))
        .await
        .unwrap();

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, "text");
    assert_eq!(sent[0].chat_id, "5");
    assert_eq!(sent[0].payload, "hi there\n\n(Bu javob bot tomonidan yuborildi.)");
    assert_eq!(sent[0].reply_to, Some(1));
    assert_eq!(h.provider_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unmatched_message_goes_through_the_chain() {
    let h = harness(true, "", Some(doc_with_rule("hello", "hi there"))).await;

    h.gateway
        .handle_message(inbound("5", 1, "nima gap"))
        .await
        .unwrap();

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, "ai answer");
    assert_eq!(h.provider_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_ai_reply_gets_the_duplicate_notice() {
    let h = harness(true, "", None).await;

    h.gateway
        .handle_message(inbound("5", 1, "nima gap"))
        .await
        .unwrap();
    h.gateway
        .handle_message(inbound("5", 2, "nima gap"))
        .await
        .unwrap();

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].payload, "ai answer");
    assert!(sent[1].payload.starts_with("Kechirasiz, men xuddi shu javobni"));
}

#[tokio::test]
async fn admin_messages_get_no_auto_reply() {
    let h = harness(true, "", Some(doc_with_rule("hello", "hi there"))).await;

    h.gateway
        .handle_message(inbound("42", 1, "hello everyone"))
        .await
        .unwrap();

    assert!(h.outbound.sent().is_empty());
    assert_eq!(h.provider_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn every_inbound_message_is_snapshotted() {
    let h = harness(true, "", None).await;

    h.gateway
        .handle_message(inbound("5", 7, "saqlanadimi"))
        .await
        .unwrap();

    let doc = h.gateway.store.load().await;
    let snap = doc.snapshot("5", "7").expect("snapshot stored");
    assert_eq!(snap.text.as_deref(), Some("saqlanadimi"));
    assert_eq!(snap.from_name, "Aziz");
}

#[tokio::test]
async fn deletion_forwards_snapshot_and_logs_it() {
    let h = harness(true, "-100", None).await;

    h.gateway.handle_message(inbound("1", 42, "hi")).await.unwrap();
    h.gateway
        .handle_deletion(DeletionSignal {
            chat_id: "1".to_string(),
            message_id: "42".to_string(),
            who: Some("peer".to_string()),
        })
        .await
        .unwrap();

    let archive_sends: Vec<_> = h
        .outbound
        .sent()
        .into_iter()
        .filter(|s| s.chat_id == "-100")
        .collect();
    assert_eq!(archive_sends.len(), 1);
    assert!(archive_sends[0].payload.contains("hi"));
    assert!(archive_sends[0].payload.contains("O'chirilgan xabar"));

    let doc = h.gateway.store.load().await;
    assert_eq!(doc.deleted_log.len(), 1);
    let snap = doc.snapshot("1", "42").unwrap();
    assert!(snap.deleted_at.is_some());
    assert_eq!(snap.deleted_by.as_deref(), Some("peer"));
}

#[tokio::test]
async fn unconfigured_archive_still_stamps_the_deletion() {
    let h = harness(true, "", None).await;

    h.gateway.handle_message(inbound("1", 42, "hi")).await.unwrap();
    let sends_before = h.outbound.sent().len();

    h.gateway
        .handle_deletion(DeletionSignal {
            chat_id: "1".to_string(),
            message_id: "42".to_string(),
            who: Some("peer".to_string()),
        })
        .await
        .unwrap();

    // Nothing is forwarded or logged without an archive chat, but the
    // snapshot is stamped all the same.
    assert_eq!(h.outbound.sent().len(), sends_before);
    let doc = h.gateway.store.load().await;
    assert!(doc.deleted_log.is_empty());
    let snap = doc.snapshot("1", "42").unwrap();
    assert!(snap.deleted_at.is_some());
    assert_eq!(snap.deleted_by.as_deref(), Some("peer"));
}

#[tokio::test]
async fn only_the_first_trigger_item_replies_to_the_message() {
    let mut doc = doc_with_rule("hello", "birinchi javob");
    doc.auto_replies[0].responses.push(ResponseItem::Text {
        content: "ikkinchi javob".to_string(),
        use_html: false,
        entities: None,
    });
    let h = harness(true, "", Some(doc)).await;

    h.gateway
        .handle_message(inbound("5", 9, "hello"))
        .await
        .unwrap();

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].reply_to, Some(9));
    assert_eq!(sent[1].reply_to, None);
}

#[tokio::test]
async fn deletion_of_unsnapshotted_message_is_a_noop() {
    let h = harness(true, "-100", None).await;

    h.gateway
        .handle_deletion(DeletionSignal {
            chat_id: "1".to_string(),
            message_id: "999".to_string(),
            who: None,
        })
        .await
        .unwrap();

    assert!(h.outbound.sent().is_empty());
    assert!(h.gateway.store.load().await.deleted_log.is_empty());
}

#[tokio::test]
async fn wizard_builds_a_rule_end_to_end() {
    let h = harness(true, "", None).await;

    h.gateway
        .handle_message(inbound("42", 1, "Add auto reply ✉️"))
        .await
        .unwrap();
    let doc = h.gateway.store.load().await;
    assert_eq!(doc.step.get("42"), Some(&WizardState::AddTrigger));

    h.gateway.handle_message(inbound("42", 2, "salom")).await.unwrap();
    let doc = h.gateway.store.load().await;
    assert_eq!(doc.step.get("42"), Some(&WizardState::AddResponse { index: 0 }));
    assert_eq!(doc.auto_replies[0].trigger, "salom");

    h.gateway
        .handle_message(inbound("42", 3, "va alaykum assalom"))
        .await
        .unwrap();
    h.gateway.handle_message(inbound("42", 4, "Done!")).await.unwrap();

    let doc = h.gateway.store.load().await;
    assert!(doc.step.is_empty());
    assert_eq!(doc.auto_replies[0].responses.len(), 1);
    assert!(matches!(
        &doc.auto_replies[0].responses[0],
        ResponseItem::Text { content, .. } if content == "va alaykum assalom"
    ));

    // The finished rule now answers a matching message.
    h.gateway
        .handle_message(inbound("5", 5, "salom bot"))
        .await
        .unwrap();
    let last = h.outbound.sent().pop().unwrap();
    assert_eq!(last.chat_id, "5");
    assert!(last.payload.starts_with("va alaykum assalom"));
}

#[tokio::test]
async fn wizard_removal_validates_the_number() {
    let mut doc = doc_with_rule("hello", "hi there");
    doc.auto_replies.push(Rule {
        trigger: "salom".to_string(),
        responses: Vec::new(),
    });
    let h = harness(true, "", Some(doc)).await;

    h.gateway
        .handle_message(inbound("42", 1, "Remove auto reply 🚫"))
        .await
        .unwrap();
    h.gateway.handle_message(inbound("42", 2, "99")).await.unwrap();

    // Invalid number re-prompts without touching the list or state.
    let doc = h.gateway.store.load().await;
    assert_eq!(doc.auto_replies.len(), 2);
    assert_eq!(doc.step.get("42"), Some(&WizardState::RemoveChoose));

    h.gateway.handle_message(inbound("42", 3, "1")).await.unwrap();
    let doc = h.gateway.store.load().await;
    assert_eq!(doc.auto_replies.len(), 1);
    assert_eq!(doc.auto_replies[0].trigger, "salom");
    assert!(doc.step.is_empty());
}

#[tokio::test]
async fn back_cancels_an_in_flight_wizard() {
    let h = harness(true, "", None).await;

    h.gateway
        .handle_message(inbound("42", 1, "Add auto reply ✉️"))
        .await
        .unwrap();
    h.gateway.handle_message(inbound("42", 2, "Back 🔙")).await.unwrap();

    let doc = h.gateway.store.load().await;
    assert!(doc.step.is_empty());
    assert!(doc.auto_replies.is_empty());
}

#[tokio::test]
async fn disabled_ai_answers_from_the_persona() {
    let h = harness(false, "", None).await;

    h.gateway
        .handle_message(inbound("5", 1, "qalaysiz"))
        .await
        .unwrap();

    let sent = h.outbound.sent();
    assert_eq!(sent.len(), 1);
    // Unknown role → formal fallback persona, no provider call.
    assert_eq!(sent[0].payload, "Assalomu alaykum, qanday savolingiz bor?");
    assert_eq!(h.provider_calls.load(Ordering::SeqCst), 0);
}
