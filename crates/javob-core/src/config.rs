//! TOML configuration with serde defaults.
//!
//! Every optional credential simply disables its provider/feature when
//! absent; only the bot token and admin id are required at startup.

use crate::error::BotError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Top-level javob configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub javob: BotConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub self_ping: SelfPingConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// The admin's user id (also the only chat the wizard answers in).
    #[serde(default)]
    pub admin_id: String,
    /// Chat id that receives forwarded deleted messages. Empty =
    /// forwarding disabled.
    #[serde(default)]
    pub archive_chat_id: String,
}

/// Generative-AI settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Provider name tried first (e.g. "openai"). Empty = fixed order.
    #[serde(default)]
    pub preferred: String,
}

/// Per-provider credentials and models.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub gemini: Option<GeminiConfig>,
    pub openai: Option<OpenAiConfig>,
    pub cohere: Option<CohereConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohereConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_cohere_model")]
    pub model: String,
}

/// Serper web-search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub serper_api_key: String,
    #[serde(default = "default_search_gl")]
    pub gl: String,
    #[serde(default = "default_search_hl")]
    pub hl: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            serper_api_key: String::new(),
            gl: default_search_gl(),
            hl: default_search_hl(),
        }
    }
}

/// Health HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Keep-alive self-ping settings (for free-tier hosts that idle out).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfPingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_ping_interval")]
    pub interval_secs: u64,
}

impl Default for SelfPingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            interval_secs: default_ping_interval(),
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_cohere_model() -> String {
    "command-xlarge-nightly".to_string()
}

fn default_search_gl() -> String {
    "us".to_string()
}

fn default_search_hl() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_ping_interval() -> u64 {
    240
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist (validation will
/// still reject the missing bot token).
pub fn load(path: &str) -> Result<Config, BotError> {
    let path = Path::new(path);
    if !path.exists() {
        info!("config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| BotError::Config(format!("failed to read {}: {e}", path.display())))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| BotError::Config(format!("failed to parse config: {e}")))?;

    Ok(config)
}

impl Config {
    /// Startup validation. Missing required credentials are fatal.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.telegram.bot_token.is_empty() {
            return Err(BotError::Config(
                "telegram.bot_token is not set".to_string(),
            ));
        }
        if self.telegram.admin_id.is_empty() {
            return Err(BotError::Config("telegram.admin_id is not set".to_string()));
        }
        Ok(())
    }

    /// Path of the persisted document inside the data directory.
    pub fn db_path(&self) -> std::path::PathBuf {
        Path::new(&self.javob.data_dir).join("db.json")
    }
}
