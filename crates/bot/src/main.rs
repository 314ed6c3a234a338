//! Skycast weather bot binary.
//!
//! Usage:
//!   skycast-bot --config skycast.toml
//!   skycast-bot --tool-server ./target/release/skycast-weather-mcp
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN` - Telegram bot token (unless set in the config file)
//! - `OPENAI_API_KEY` - API key for the conversational agent
//! - `SKYCAST_CONFIG` - Config file path (overridden by --config)
//! - `RUST_LOG` - Log filter (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use skycast_bot::{Runner, TelegramClient};
use skycast_coordinator::{BotConfig, McpToolSession, ResponseFormatter, WeatherBot};
use skycast_llm::build_llm_client;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "skycast-bot", version)]
#[command(about = "Telegram weather assistant backed by an MCP weather tool server")]
struct Cli {
    /// Path to config.toml
    #[arg(short, long, env = "SKYCAST_CONFIG")]
    config: Option<PathBuf>,

    /// Tool server executable (overrides tool_server.command)
    #[arg(long)]
    tool_server: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skycast_bot=debug,skycast_coordinator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            BotConfig::from_file(path)?
        }
        None => {
            info!("Using default configuration");
            BotConfig::default()
        }
    };
    if let Some(command) = cli.tool_server {
        config.tool_server.command = command;
    }

    let agent = build_llm_client(&config.llm)?;
    let formatter = ResponseFormatter::new(agent)
        .with_sampling(config.llm.temperature, config.llm.max_tokens);
    let session = Arc::new(McpToolSession::new(config.tool_server.clone()));
    let bot = Arc::new(WeatherBot::new(session, formatter));
    let telegram = Arc::new(TelegramClient::new(&config.telegram)?);

    if let Err(e) = bot.start().await {
        warn!(error = %e, "Starting without the weather tool; all messages go to the agent");
    }

    Runner::new(telegram, bot, config.shutdown_drain())
        .run(shutdown_signal())
        .await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
