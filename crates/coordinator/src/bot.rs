//! The bot orchestrator.
//!
//! Ties the router, the tool session and the formatter together and owns the
//! session lifecycle:
//!
//! ```text
//! Uninitialized ──start()──► Connected ──shutdown()──► ShuttingDown ──► Closed
//! ```
//!
//! Until `start()` succeeds the tool is unavailable and every message takes
//! the conversational path.

use crate::formatter::ResponseFormatter;
use crate::routing::{Intent, classify};
use crate::tool_session::ToolSession;
use async_trait::async_trait;
use serde_json::{Map, Value};
use skycast_common::{InboundMessage, ReplyTarget, Result, SkycastError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Capability the bot calls for weather queries.
pub const GET_WEATHER: &str = "get_weather";

pub const CLARIFICATION_PROMPT: &str = "Please tell me which city you want the weather for.\n\
For example: *what's the weather in Ubud?*";

pub const GENERIC_ERROR_REPLY: &str =
    "Sorry, I encountered an error while processing your request.";

/// Stand-in text when the tool answered with no content.
pub const NO_WEATHER_DATA: &str = "Sorry, couldn't get weather data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Uninitialized,
    Connected,
    ShuttingDown,
    Closed,
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Show a "typing" presence in the target chat.
    async fn send_typing(&self, target: &ReplyTarget) -> Result<()>;

    /// Send text that may contain platform markup.
    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<()>;
}

pub struct WeatherBot {
    session: Arc<dyn ToolSession>,
    formatter: ResponseFormatter,
    state: RwLock<BotState>,
}

impl WeatherBot {
    pub fn new(session: Arc<dyn ToolSession>, formatter: ResponseFormatter) -> Self {
        Self {
            session,
            formatter,
            state: RwLock::new(BotState::Uninitialized),
        }
    }

    pub async fn state(&self) -> BotState {
        *self.state.read().await
    }

    /// Connect the tool session. Only valid from `Uninitialized`; the bot
    /// becomes `Connected` on success and stays put on failure.
    pub async fn start(&self) -> Result<()> {
        // Held across connect() so a concurrent shutdown() waits for it.
        let mut state = self.state.write().await;
        match *state {
            BotState::Uninitialized => {}
            BotState::Connected => return Err(SkycastError::SessionAlreadyConnected),
            BotState::ShuttingDown | BotState::Closed => {
                return Err(SkycastError::InvalidTransition {
                    action: "start",
                    state: format!("{:?}", *state),
                });
            }
        }

        info!("Initializing weather bot");

        if let Err(e) = self.session.connect().await {
            warn!(error = %e, "Tool session unavailable, weather lookups disabled");
            return Err(e);
        }

        let capabilities = self.session.capabilities().await;
        if !capabilities.iter().any(|c| c.name == GET_WEATHER) {
            warn!(
                tools = ?capabilities.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Tool server does not advertise get_weather"
            );
        }

        *state = BotState::Connected;
        info!("Weather bot connected");
        Ok(())
    }

    /// Produce the reply text for one message.
    pub async fn respond(&self, message: &InboundMessage) -> Result<String> {
        let intent = classify(&message.text);
        let tool_available = self.state().await == BotState::Connected;

        debug!(message_id = %message.id, ?intent, tool_available, "Routed message");

        match intent {
            Intent::WeatherQuery { location, marker } if tool_available => {
                info!(city = %location, ?marker, "Looking up weather");
                match self.lookup_weather(&location).await {
                    Ok(raw) => self.formatter.format_weather(&raw).await,
                    Err(SkycastError::SessionNotConnected) => {
                        warn!("Tool session went away, answering conversationally");
                        self.formatter.respond_general(&message.text).await
                    }
                    Err(e) => Err(e),
                }
            }
            Intent::WeatherQueryMissingLocation if tool_available => {
                Ok(CLARIFICATION_PROMPT.to_string())
            }
            _ => self.formatter.respond_general(&message.text).await,
        }
    }

    async fn lookup_weather(&self, city: &str) -> Result<String> {
        let mut arguments = Map::new();
        arguments.insert("city".to_string(), Value::String(city.to_string()));

        let chunks = self.session.call(GET_WEATHER, arguments).await?;
        if chunks.is_empty() {
            Ok(NO_WEATHER_DATA.to_string())
        } else {
            Ok(chunks.join("\n"))
        }
    }

    /// Handle one inbound message end to end. Never fails: any error becomes
    /// the generic reply.
    pub async fn handle_message(&self, platform: &dyn ChatPlatform, message: &InboundMessage) {
        info!(
            message_id = %message.id,
            chat_id = message.reply_to.chat_id,
            sender = message.sender.as_deref().unwrap_or("unknown"),
            content_preview = %message.preview(50),
            "Received message"
        );

        if let Err(e) = platform.send_typing(&message.reply_to).await {
            debug!(error = %e, "Failed to send typing indicator");
        }

        let reply = match self.respond(message).await {
            Ok(text) => text,
            Err(e) => {
                error!(message_id = %message.id, error = %e, "Error processing message");
                GENERIC_ERROR_REPLY.to_string()
            }
        };

        if let Err(e) = platform.send_text(&message.reply_to, &reply).await {
            error!(message_id = %message.id, error = %e, "Failed to send reply");
        }
    }

    /// Close the tool session. Always ends in `Closed`; errors are logged.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write().await;
            if matches!(*state, BotState::ShuttingDown | BotState::Closed) {
                debug!(state = ?*state, "Shutdown already in progress");
                return;
            }
            *state = BotState::ShuttingDown;
        }

        info!("Starting cleanup");
        if let Err(e) = self.session.close().await {
            error!(error = %e, "Error during cleanup");
        }

        *self.state.write().await = BotState::Closed;
        info!("Cleanup completed");
    }
}
