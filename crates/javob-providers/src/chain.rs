//! Preference-ordered, short-circuiting provider fallback chain.
//!
//! The chain never fails: when every provider is unavailable it
//! degrades to a search-results digest, then to the persona's fallback
//! greeting.

use crate::search::SearchResult;
use crate::Provider;
use javob_core::persona::Persona;
use std::sync::Arc;
use tracing::{debug, warn};

/// Attribution appended to generated (not rule-authored) replies.
pub const GENERATED_NOTE: &str = "(Bu javob bot tomonidan yaratilgan.)";

/// The provider fallback chain.
pub struct ProviderChain {
    providers: Vec<Arc<dyn Provider>>,
    preferred: String,
    enabled: bool,
}

impl ProviderChain {
    /// `providers` in fixed fallback order; `preferred` (may be empty)
    /// is tried first.
    pub fn new(enabled: bool, preferred: &str, providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            preferred: preferred.to_lowercase(),
            enabled,
        }
    }

    /// Build the single prompt string: persona note, user message, up
    /// to 5 search results, and the fixed trailing instruction.
    pub fn build_prompt(
        persona: &Persona,
        user_message: &str,
        results: &[SearchResult],
    ) -> String {
        let top = results
            .iter()
            .take(5)
            .enumerate()
            .map(|(i, r)| format!("{}. {}\n{}\n{}", i + 1, r.title, r.snippet, r.link))
            .collect::<Vec<_>>()
            .join("\n\n");
        let persona_note = format!(
            "Persona tone: {}. Style: {} Avoid: {}",
            persona.tone, persona.style, persona.do_not_reveal
        );
        format!(
            "Siz professional yordamchisiz. {persona_note}\n\n\
             Foydalanuvchi so'rovi:\n\"{user_message}\"\n\n\
             Kontekst (qidiruv):\n{top}\n\n\
             Iltimos, 1-3 jumla ichida qisqa, aniq javob bering va kerak \
             bo'lsa URL manzilga ishora qiling. Oxirida qo'shing: {GENERATED_NOTE}"
        )
    }

    /// Candidate names in try order: the preferred provider first, then
    /// the fixed fallback order, deduplicated case-insensitively.
    fn try_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        if !self.preferred.is_empty() {
            order.push(self.preferred.clone());
        }
        for p in &self.providers {
            let name = p.name().to_lowercase();
            if !order.contains(&name) {
                order.push(name);
            }
        }
        order
    }

    /// Generate a reply. Short-circuits on the first provider success;
    /// otherwise falls back to a results digest, then to the persona.
    pub async fn generate(
        &self,
        persona: &Persona,
        user_message: &str,
        results: &[SearchResult],
    ) -> String {
        if !self.enabled {
            return persona_reply(persona, "Salom! Avtomatik javoblar faol.");
        }

        let prompt = Self::build_prompt(persona, user_message, results);

        for name in self.try_order() {
            let Some(provider) = self
                .providers
                .iter()
                .find(|p| p.name().eq_ignore_ascii_case(&name))
            else {
                continue;
            };
            if !provider.is_configured() {
                debug!("skipping unconfigured provider {name}");
                continue;
            }
            match provider.complete(&prompt).await {
                Ok(text) => return text.trim().to_string(),
                Err(e) => warn!("AI provider {name} failed: {e}"),
            }
        }

        if !results.is_empty() {
            let top = results
                .iter()
                .take(3)
                .enumerate()
                .map(|(i, r)| format!("{}. {}\n{}\n{}", i + 1, r.title, r.link, r.snippet))
                .collect::<Vec<_>>()
                .join("\n\n");
            return format!("🔎 Top natijalar:\n\n{top}\n\n{GENERATED_NOTE}");
        }

        persona_reply(persona, "Salom! Hozir AI provayderlari mavjud emas.")
    }
}

/// The persona's own words, with a last-ditch default for personas that
/// were stored with empty fields.
fn persona_reply(persona: &Persona, default: &str) -> String {
    if !persona.sample_first_message.is_empty() {
        persona.sample_first_message.clone()
    } else if !persona.greeting.is_empty() {
        persona.greeting.clone()
    } else {
        default.to_string()
    }
}
