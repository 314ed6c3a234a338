//! Coordinator for the skycast weather bot.
//!
//! The coordinator is the part between the chat platform and the tools:
//! 1. Classifies each inbound message (weather with/without location, general)
//! 2. Calls the weather tool server over a long-lived MCP session
//! 3. Has the conversational agent phrase the reply
//! 4. Owns startup and teardown of the tool session
//!
//! # Architecture
//!
//! ```text
//! Inbound message
//!      │
//!      ▼
//! ┌─────────────────┐
//! │   WeatherBot    │ ◄── routing::classify
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────────────┐
//!    ▼                    ▼
//! [ToolSession]     [ResponseFormatter]
//!  MCP stdio          LLM agent
//!    │
//!    ▼
//! skycast-weather-mcp
//! ```

pub mod bot;
pub mod config;
pub mod formatter;
pub mod routing;
pub mod tool_session;

pub use bot::{BotState, ChatPlatform, WeatherBot};
pub use config::{BotConfig, TelegramConfig, ToolServerConfig};
pub use formatter::ResponseFormatter;
pub use routing::{Intent, LocationMarker, classify};
pub use tool_session::{CapabilityDescriptor, McpToolSession, ToolSession};
