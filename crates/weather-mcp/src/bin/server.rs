//! Weather MCP server binary.
//!
//! Run this as a subprocess; it serves MCP on stdin/stdout until the client
//! closes the channel. Logs go to stderr.

use rmcp::ServiceExt;
use skycast_weather_mcp::{OpenMeteoClient, WeatherMcpServer, WeatherSourceConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol, so logging must stay on stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skycast_weather_mcp=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    tracing::info!("Starting weather MCP server");

    let config = WeatherSourceConfig::from_env();
    tracing::debug!(
        geocoding_url = %config.geocoding_url,
        forecast_url = %config.forecast_url,
        "Weather source configured"
    );

    let server = WeatherMcpServer::new(OpenMeteoClient::new(config)?);
    let service = server.serve(rmcp::transport::stdio()).await?;

    tokio::select! {
        quit = service.waiting() => {
            match quit {
                Ok(reason) => tracing::info!(?reason, "MCP channel closed"),
                Err(e) => tracing::error!(error = %e, "MCP service task failed"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal for MCP server");
        }
    }

    tracing::info!("MCP server shutdown complete");
    Ok(())
}
