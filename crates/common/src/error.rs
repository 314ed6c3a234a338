//! Error types for skycast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkycastError {
    /// A capability call was attempted while no tool session is open.
    #[error("Tool session is not connected")]
    SessionNotConnected,

    #[error("Tool session is already connected")]
    SessionAlreadyConnected,

    /// A lifecycle operation was requested from a state that does not allow it.
    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    /// The provider answered with an error result, the channel broke, or the
    /// call timed out.
    #[error("Tool invocation failed: {0}")]
    ToolInvocation(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    /// The conversational agent could not produce the reply text.
    #[error("Formatting failed: {0}")]
    Formatting(String),

    #[error("Channel teardown failed: {0}")]
    ChannelTeardown(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Weather source error: {0}")]
    WeatherSource(String),

    #[error("Chat platform error: {0}")]
    Platform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkycastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_have_stable_messages() {
        assert_eq!(
            SkycastError::SessionNotConnected.to_string(),
            "Tool session is not connected"
        );
        assert_eq!(
            SkycastError::SessionAlreadyConnected.to_string(),
            "Tool session is already connected"
        );
    }

    #[test]
    fn wrapped_messages_are_included() {
        let err = SkycastError::ToolInvocation("get_weather timed out".into());
        assert_eq!(err.to_string(), "Tool invocation failed: get_weather timed out");

        let err = SkycastError::Formatting("agent unreachable".into());
        assert!(err.to_string().contains("agent unreachable"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: SkycastError = io.into();
        assert!(matches!(err, SkycastError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}
