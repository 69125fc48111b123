//! Serper web-search client.
//!
//! Results ground AI answers; every caller treats failures as "no
//! search context" rather than an error worth surfacing.

use javob_core::config::SearchConfig;
use javob_core::error::BotError;
use javob_core::retry::{retry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERPER_URL: &str = "https://google.serper.dev/search";
const TIMEOUT: Duration = Duration::from_secs(20);
const RETRY: RetryPolicy = RetryPolicy::new(1, 500);

/// One organic search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

/// Thin Serper client.
pub struct SearchClient {
    client: reqwest::Client,
    api_key: String,
    gl: String,
    hl: String,
}

impl SearchClient {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.serper_api_key.clone(),
            gl: config.gl.clone(),
            hl: config.hl.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Search and return the organic results in order.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, BotError> {
        if !self.is_configured() {
            return Err(BotError::Search("serper api key is not set".to_string()));
        }

        let body = SerperRequest {
            q: query.to_string(),
            gl: self.gl.clone(),
            hl: self.hl.clone(),
        };

        debug!("serper: searching {query:?}");

        let parsed: SerperResponse = retry(RETRY, || async {
            let resp = self
                .client
                .post(SERPER_URL)
                .header("X-API-KEY", &self.api_key)
                .json(&body)
                .timeout(TIMEOUT)
                .send()
                .await
                .map_err(|e| BotError::http_transport(format!("serper request failed: {e}")))?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(BotError::http_status(
                    status.as_u16(),
                    format!("serper returned: {text}"),
                ));
            }

            resp.json()
                .await
                .map_err(|e| BotError::Search(format!("failed to parse serper response: {e}")))
        })
        .await?;

        Ok(parsed
            .organic
            .unwrap_or_default()
            .into_iter()
            .map(OrganicResult::into_result)
            .collect())
    }
}

#[derive(Serialize)]
struct SerperRequest {
    q: String,
    gl: String,
    hl: String,
}

#[derive(Deserialize)]
struct SerperResponse {
    organic: Option<Vec<OrganicResult>>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    snippet: Option<String>,
    description: Option<String>,
    link: Option<String>,
    displayed_link: Option<String>,
}

impl OrganicResult {
    fn into_result(self) -> SearchResult {
        SearchResult {
            title: self.title,
            snippet: self.snippet.or(self.description).unwrap_or_default(),
            link: self.link.or(self.displayed_link).unwrap_or_default(),
        }
    }
}
