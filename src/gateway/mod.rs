//! Gateway — the event loop connecting the Telegram channel, the
//! persisted document, and the AI provider chain.
//!
//! Every update is handled in its own task; errors are caught at the
//! handler boundary and logged, never propagated to the loop.

mod forwarder;
mod pipeline;
mod wizard;

#[cfg(test)]
mod tests;

use javob_channels::TelegramEvent;
use javob_core::config::TelegramConfig;
use javob_core::traits::Outbound;
use javob_providers::chain::ProviderChain;
use javob_providers::search::SearchClient;
use javob_store::Store;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// The central gateway routing events to their handlers.
pub struct Gateway {
    pub(crate) store: Store,
    pub(crate) chain: ProviderChain,
    pub(crate) search: SearchClient,
    pub(crate) outbound: Arc<dyn Outbound>,
    pub(crate) admin_id: String,
    /// Chat receiving forwarded deleted messages. Empty = disabled.
    pub(crate) archive_chat_id: String,
}

impl Gateway {
    pub fn new(
        store: Store,
        chain: ProviderChain,
        search: SearchClient,
        outbound: Arc<dyn Outbound>,
        telegram: &TelegramConfig,
    ) -> Self {
        Self {
            store,
            chain,
            search,
            outbound,
            admin_id: telegram.admin_id.clone(),
            archive_chat_id: telegram.archive_chat_id.clone(),
        }
    }

    /// Run the main event loop until ctrl-c.
    pub async fn run(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<TelegramEvent>,
    ) -> anyhow::Result<()> {
        info!(
            "javob gateway running | admin: {} | deleted-message archive: {}",
            self.admin_id,
            if self.archive_chat_id.is_empty() {
                "disabled"
            } else {
                "enabled"
            },
        );

        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        info!("channel closed, stopping gateway");
                        break;
                    };
                    let gw = self.clone();
                    tokio::spawn(async move {
                        gw.handle_event(event).await;
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handler boundary: every per-event failure dies here with a log
    /// line.
    pub(crate) async fn handle_event(&self, event: TelegramEvent) {
        let result = match event {
            TelegramEvent::Message(inbound) | TelegramEvent::BusinessMessage(inbound) => {
                self.handle_message(inbound).await
            }
            TelegramEvent::Deletion(signal) => self.handle_deletion(signal).await,
        };
        if let Err(e) = result {
            error!("event handler failed: {e}");
        }
    }
}
