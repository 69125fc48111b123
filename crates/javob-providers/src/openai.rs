//! OpenAI chat-completions provider.

use crate::Provider;
use async_trait::async_trait;
use javob_core::config::OpenAiConfig;
use javob_core::error::BotError;
use javob_core::retry::{retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const TIMEOUT: Duration = Duration::from_secs(25);
const RETRY: RetryPolicy = RetryPolicy::new(1, 800);

/// OpenAI chat-completions provider.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

fn extract_text(resp: &ChatCompletionResponse) -> Option<String> {
    let content = &resp.choices.as_ref()?.first()?.message.as_ref()?.content;
    if content.is_empty() {
        None
    } else {
        Some(content.clone())
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(&self, prompt: &str) -> Result<String, BotError> {
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: 512,
            temperature: 0.2,
        };

        debug!("openai: POST chat/completions model={}", self.model);

        let parsed: ChatCompletionResponse = retry(RETRY, || async {
            let resp = self
                .client
                .post(OPENAI_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .timeout(TIMEOUT)
                .send()
                .await
                .map_err(|e| BotError::http_transport(format!("openai request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(BotError::http_status(
                    status.as_u16(),
                    format!("openai returned: {text}"),
                ));
            }

            resp.json()
                .await
                .map_err(|e| BotError::Provider(format!("openai: failed to parse response: {e}")))
        })
        .await?;

        extract_text(&parsed)
            .ok_or_else(|| BotError::Provider("openai: empty response".to_string()))
    }
}
