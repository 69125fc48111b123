//! Long-polling update loop.

use super::types::{deletion_signal, TgResponse, TgUpdate};
use super::{TelegramChannel, TelegramEvent};
use javob_core::error::BotError;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

impl TelegramChannel {
    /// Start long polling. Returns a receiver yielding decoded events.
    pub fn start(&self) -> Result<mpsc::Receiver<TelegramEvent>, BotError> {
        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let last_update_id = self.last_update_id.clone();

        info!("telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let offset = last_update_id.lock().await.map(|id| id + 1);

                // No allowed_updates filter: deletion signals arrive in
                // shapes the default set covers but a filter would drop.
                let mut body_req = serde_json::json!({ "timeout": 30 });
                if let Some(off) = offset {
                    body_req["offset"] = serde_json::json!(off);
                }

                let resp = match client
                    .post(format!("{base_url}/getUpdates"))
                    .json(&body_req)
                    .timeout(std::time::Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                // Updates stay raw here: deletion events arrive in
                // several ad-hoc shapes that the typed decoder cannot
                // cover, so each update is probed before typed decode.
                let body: TgResponse<Vec<Value>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(id) = updates.last().and_then(|u| u.get("update_id")).and_then(Value::as_i64) {
                    *last_update_id.lock().await = Some(id);
                }

                for raw in updates {
                    for event in decode_update(&raw) {
                        if tx.send(event).await.is_err() {
                            info!("telegram channel receiver dropped, stopping poll");
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Decode one raw update into zero or more events. A single update may
/// carry both a deletion signal and a regular message.
fn decode_update(raw: &Value) -> Vec<TelegramEvent> {
    let mut events = Vec::new();

    if let Some(signal) = deletion_signal(raw) {
        debug!(
            "deletion signal for chat={} message={}",
            signal.chat_id, signal.message_id
        );
        events.push(TelegramEvent::Deletion(signal));
    }

    let update: TgUpdate = match serde_json::from_value(raw.clone()) {
        Ok(u) => u,
        Err(e) => {
            warn!("skipping undecodable update: {e}");
            return events;
        }
    };

    if let Some(msg) = update.message {
        if !msg.from_bot() {
            events.push(TelegramEvent::Message(msg.into_inbound()));
        }
    }
    if let Some(msg) = update.business_message {
        if !msg.from_bot() {
            events.push(TelegramEvent::BusinessMessage(msg.into_inbound()));
        }
    }

    events
}
