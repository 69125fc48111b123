//! User roles and the persona fallback table.
//!
//! A persona steers AI prompt construction and doubles as the literal
//! reply whenever AI is disabled or no provider is reachable.

use serde::{Deserialize, Serialize};

/// Relationship of a user to the bot owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Friend,
    Contact,
    #[default]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Friend => "friend",
            Self::Contact => "contact",
            Self::Unknown => "unknown",
        }
    }
}

/// Tone/style profile used for prompt seeding and non-AI fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub tone: String,
    pub greeting: String,
    pub style: String,
    #[serde(rename = "doNotReveal")]
    pub do_not_reveal: String,
    pub sample_first_message: String,
    pub signature_hint: String,
}

impl Persona {
    /// Deterministic persona by role: friends get the informal profile,
    /// everyone else the formal one.
    pub fn fallback(role: Role, user_name: &str) -> Self {
        let friendly = role == Role::Friend;
        Self {
            tone: match role {
                Role::Friend => "do'stona",
                Role::Contact => "rasmiy",
                _ => "ehtiyotkor",
            }
            .to_string(),
            greeting: if friendly {
                format!("Salom, {user_name}!")
            } else {
                format!("Assalomu alaykum, {user_name}.")
            },
            style: if friendly {
                "Qisqa, norasmiy."
            } else {
                "Rasmiy va aniq."
            }
            .to_string(),
            do_not_reveal: "Shaxsiy yoki moliyaviy ma'lumotlarni so'ramang.".to_string(),
            sample_first_message: if friendly {
                format!("Salom {user_name}! Qanday yordam bera olaman?")
            } else {
                "Assalomu alaykum, qanday savolingiz bor?".to_string()
            },
            signature_hint: "— Bot".to_string(),
        }
    }
}
