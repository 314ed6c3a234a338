//! Weather MCP: Model Context Protocol server exposing current weather.
//!
//! The server is launched as a child process by the bot and speaks MCP over
//! its stdin/stdout. It exposes one tool:
//!
//! - `get_weather` - current temperature, conditions and wind for a city
//!
//! # Architecture
//!
//! ```text
//! MCP Client (bot tool session)
//!        │
//!        │ tools/call get_weather {city}
//!        ▼
//! ┌──────────────────┐
//! │ Weather MCP      │
//! │ Server           │
//! │  ┌────────────┐  │
//! │  │ Open-Meteo │──┼──► geocoding-api.open-meteo.com
//! │  │ client     │──┼──► api.open-meteo.com
//! │  └────────────┘  │
//! └──────────────────┘
//! ```

pub mod server;
pub mod tools;
pub mod weather;

pub use server::WeatherMcpServer;
pub use tools::{GET_WEATHER, GetWeatherInput};
pub use weather::{OpenMeteoClient, WeatherOutcome, WeatherReport, WeatherSourceConfig};
