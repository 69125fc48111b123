//! Cohere generate-endpoint provider.

use crate::Provider;
use async_trait::async_trait;
use javob_core::config::CohereConfig;
use javob_core::error::BotError;
use javob_core::retry::{retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const COHERE_URL: &str = "https://api.cohere.ai/generate";
const TIMEOUT: Duration = Duration::from_secs(25);
const RETRY: RetryPolicy = RetryPolicy::new(2, 1000);

/// Cohere text-generation provider.
pub struct CohereProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl CohereProvider {
    pub fn from_config(config: &CohereConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    generations: Option<Vec<Generation>>,
}

#[derive(Deserialize)]
struct Generation {
    text: Option<String>,
}

fn extract_text(resp: &GenerateResponse) -> Option<String> {
    let text = resp.generations.as_ref()?.first()?.text.as_ref()?;
    if text.is_empty() {
        None
    } else {
        Some(text.clone())
    }
}

#[async_trait]
impl Provider for CohereProvider {
    fn name(&self) -> &str {
        "cohere"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(&self, prompt: &str) -> Result<String, BotError> {
        let body = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            max_tokens: 300,
            temperature: 0.2,
        };

        debug!("cohere: POST generate model={}", self.model);

        let parsed: GenerateResponse = retry(RETRY, || async {
            let resp = self
                .client
                .post(COHERE_URL)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .timeout(TIMEOUT)
                .send()
                .await
                .map_err(|e| BotError::http_transport(format!("cohere request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(BotError::http_status(
                    status.as_u16(),
                    format!("cohere returned: {text}"),
                ));
            }

            resp.json()
                .await
                .map_err(|e| BotError::Provider(format!("cohere: failed to parse response: {e}")))
        })
        .await?;

        extract_text(&parsed)
            .ok_or_else(|| BotError::Provider("cohere: empty response".to_string()))
    }
}
