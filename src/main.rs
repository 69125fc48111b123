mod api;
mod gateway;
mod self_ping;

use clap::{Parser, Subcommand};
use javob_channels::TelegramChannel;
use javob_core::config;
use javob_providers::chain::ProviderChain;
use javob_providers::cohere::CohereProvider;
use javob_providers::gemini::GeminiProvider;
use javob_providers::openai::OpenAiProvider;
use javob_providers::search::SearchClient;
use javob_providers::Provider;
use javob_store::Store;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "javob", version, about = "javob — Telegram auto-reply bot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Check configuration and provider availability.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cfg.javob.log_level.clone())),
        )
        .init();

    match cli.command {
        Commands::Start => {
            cfg.validate()?;

            let store = Store::open(cfg.db_path()).await?;
            let chain = ProviderChain::new(cfg.ai.enabled, &cfg.ai.preferred, build_providers(&cfg));
            let search = SearchClient::from_config(&cfg.search);

            let channel = Arc::new(TelegramChannel::new(&cfg.telegram));
            let rx = channel.start()?;

            if cfg.server.enabled {
                tokio::spawn(api::serve(cfg.server.clone()));
            }
            if cfg.self_ping.enabled {
                tokio::spawn(self_ping::ping_loop(cfg.self_ping.clone()));
            }

            info!("javob starting");
            let gw = Arc::new(gateway::Gateway::new(
                store,
                chain,
                search,
                channel,
                &cfg.telegram,
            ));
            gw.run(rx).await?;
        }
        Commands::Status => {
            println!("javob — Status Check\n");
            println!("Config: {}", cli.config);
            println!(
                "  telegram: {}",
                if cfg.telegram.bot_token.is_empty() {
                    "missing bot_token"
                } else if cfg.telegram.admin_id.is_empty() {
                    "missing admin_id"
                } else {
                    "configured"
                }
            );
            println!(
                "  deleted-message archive: {}",
                if cfg.telegram.archive_chat_id.is_empty() {
                    "disabled"
                } else {
                    "enabled"
                }
            );
            println!(
                "  ai: {} (preferred: {})",
                if cfg.ai.enabled { "enabled" } else { "disabled" },
                if cfg.ai.preferred.is_empty() {
                    "fixed order"
                } else {
                    &cfg.ai.preferred
                }
            );
            for provider in build_providers(&cfg) {
                println!(
                    "    {}: {}",
                    provider.name(),
                    if provider.is_configured() {
                        "configured"
                    } else {
                        "missing api_key"
                    }
                );
            }
            println!(
                "  search: {}",
                if SearchClient::from_config(&cfg.search).is_configured() {
                    "configured"
                } else {
                    "disabled"
                }
            );
            println!(
                "  health server: {}",
                if cfg.server.enabled {
                    format!("{}:{}", cfg.server.host, cfg.server.port)
                } else {
                    "disabled".to_string()
                }
            );
        }
    }

    Ok(())
}

/// Providers in fixed fallback order; absent config sections are
/// simply not constructed.
fn build_providers(cfg: &config::Config) -> Vec<Arc<dyn Provider>> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
    if let Some(gemini) = &cfg.providers.gemini {
        providers.push(Arc::new(GeminiProvider::from_config(gemini)));
    }
    if let Some(openai) = &cfg.providers.openai {
        providers.push(Arc::new(OpenAiProvider::from_config(openai)));
    }
    if let Some(cohere) = &cfg.providers.cohere {
        providers.push(Arc::new(CohereProvider::from_config(cohere)));
    }
    providers
}
