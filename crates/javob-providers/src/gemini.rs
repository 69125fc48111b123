//! Google Gemini API provider.
//!
//! Calls the `generateContent` endpoint. Auth via URL query param.

use crate::Provider;
use async_trait::async_trait;
use javob_core::config::GeminiConfig;
use javob_core::error::BotError;
use javob_core::retry::{retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TIMEOUT: Duration = Duration::from_secs(25);
const RETRY: RetryPolicy = RetryPolicy::new(1, 700);

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn from_config(config: &GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

fn extract_text(resp: &GeminiResponse) -> Option<String> {
    let content = resp.candidates.as_ref()?.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(&self, prompt: &str) -> Result<String, BotError> {
        let url = format!(
            "{GEMINI_BASE_URL}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.2,
                max_output_tokens: 400,
            },
        };

        debug!("gemini: POST generateContent model={}", self.model);

        let parsed: GeminiResponse = retry(RETRY, || async {
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .timeout(TIMEOUT)
                .send()
                .await
                .map_err(|e| BotError::http_transport(format!("gemini request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(BotError::http_status(
                    status.as_u16(),
                    format!("gemini returned: {text}"),
                ));
            }

            resp.json()
                .await
                .map_err(|e| BotError::Provider(format!("gemini: failed to parse response: {e}")))
        })
        .await?;

        extract_text(&parsed)
            .ok_or_else(|| BotError::Provider("gemini: empty response".to_string()))
    }
}
