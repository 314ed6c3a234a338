//! Telegram front end for the skycast weather bot.
//!
//! Long-polls the Bot API, answers `/start` and `/help` directly and hands
//! every other text message to the coordinator's [`WeatherBot`].
//!
//! [`WeatherBot`]: skycast_coordinator::WeatherBot

pub mod commands;
pub mod runner;
pub mod telegram;

pub use commands::{Command, parse_command};
pub use runner::{Runner, handle_update};
pub use telegram::{TelegramClient, Update};
