//! # javob-providers
//!
//! Generative-text backends and the preference-ordered fallback chain,
//! plus the Serper web-search client used to ground answers.

pub mod chain;
pub mod cohere;
pub mod gemini;
pub mod openai;
pub mod search;

use async_trait::async_trait;
use javob_core::error::BotError;

/// A generative-text backend.
///
/// Each adapter owns its request shape and response-field extraction;
/// the chain only needs prompt-in, text-out.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name as used in the config `preferred` field.
    fn name(&self) -> &str;

    /// Whether the required credential is present. Unconfigured
    /// providers are skipped by the chain, never errored on.
    fn is_configured(&self) -> bool;

    /// Generate a completion for the prompt.
    async fn complete(&self, prompt: &str) -> Result<String, BotError>;
}
