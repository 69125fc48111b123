use crate::error::BotError;
use crate::message::SendOptions;
use async_trait::async_trait;

/// Outbound side of a messaging channel.
///
/// One method per media kind the bot can send. The gateway only talks
/// to this trait, which keeps the pipeline testable against a mock.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_text(
        &self,
        chat_id: &str,
        text: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError>;

    async fn send_photo(
        &self,
        chat_id: &str,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError>;

    async fn send_document(
        &self,
        chat_id: &str,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError>;

    async fn send_sticker(
        &self,
        chat_id: &str,
        file_id: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError>;

    async fn send_voice(
        &self,
        chat_id: &str,
        file_id: &str,
        caption: &str,
        opts: &SendOptions,
    ) -> Result<(), BotError>;
}
