//! Slash commands answered without going through the coordinator.

pub const START_TEXT: &str = "Hi! I'm your AI weather assistant powered by weather MCP capabilities. \
I can fetch real-time weather data for most cities in the world.\n\n\
Try asking: *what's the weather in Ubud?*";

pub const HELP_TEXT: &str = "I can help you check real-time weather conditions! Just ask me something like:\n\
*what's the weather in Ubud?*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Unknown(String),
}

impl Command {
    /// Fixed reply, or `None` for commands the bot ignores.
    pub fn reply(&self) -> Option<&'static str> {
        match self {
            Self::Start => Some(START_TEXT),
            Self::Help => Some(HELP_TEXT),
            Self::Unknown(_) => None,
        }
    }
}

/// Parse a leading `/command` (optionally `/command@botname`).
/// Returns `None` for ordinary text.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);

    Some(match name.to_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        other => Command::Unknown(other.to_string()),
    })
}
