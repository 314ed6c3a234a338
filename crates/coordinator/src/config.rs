//! Configuration for the weather bot.
//!
//! # Secrets
//!
//! - Config file permission validation on Unix systems
//! - Rejects world-readable files containing a bot token or API key
//! - Warns about secrets stored in config files

use serde::{Deserialize, Serialize};
use skycast_common::{Result, SkycastError};
use skycast_llm::LlmConfig;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Main bot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Conversational agent used to phrase replies
    #[serde(default)]
    pub llm: LlmConfig,

    /// The weather tool server child process
    #[serde(default)]
    pub tool_server: ToolServerConfig,

    /// How long shutdown waits for in-flight messages (milliseconds)
    #[serde(default = "default_shutdown_drain_ms")]
    pub shutdown_drain_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token. If not set, `TELEGRAM_BOT_TOKEN` is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    #[serde(default = "default_telegram_url")]
    pub api_url: String,

    /// Long-polling timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Timeout for sendMessage / sendChatAction
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    /// Command to spawn (stdio transport)
    #[serde(default = "default_tool_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for the child process
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Bound on spawn + initialize + tools/list
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Bound on a single tools/call round trip
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,

    /// How long close() waits for the child to exit before killing it
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_ms: u64,
}

fn default_shutdown_drain_ms() -> u64 {
    10_000
}

fn default_telegram_url() -> String {
    "https://api.telegram.org".into()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    15_000
}

fn default_tool_command() -> String {
    "skycast-weather-mcp".into()
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_call_timeout() -> u64 {
    30_000
}

fn default_shutdown_grace() -> u64 {
    2_000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_url: default_telegram_url(),
            poll_timeout_secs: default_poll_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            command: default_tool_command(),
            args: Vec::new(),
            env: HashMap::new(),
            connect_timeout_ms: default_connect_timeout(),
            call_timeout_ms: default_call_timeout(),
            shutdown_grace_ms: default_shutdown_grace(),
        }
    }
}

impl ToolServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl TelegramConfig {
    /// Explicit `bot_token` first, then `TELEGRAM_BOT_TOKEN`.
    pub fn resolve_bot_token(&self) -> Option<String> {
        if let Some(ref token) = self.bot_token {
            if !token.is_empty() {
                return Some(token.clone());
            }
        }
        std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|token| !token.is_empty())
    }
}

impl BotConfig {
    /// Load configuration from a TOML file.
    ///
    /// On Unix the file must be a regular file, must not be world-writable,
    /// and must not be world-readable when it contains a secret.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        let config = Self::from_file_unchecked(path)?;

        if config.telegram.bot_token.is_some() || config.llm.api_key.is_some() {
            warn!(
                "Secrets found in config file '{}'. Prefer environment variables \
                 (TELEGRAM_BOT_TOKEN, OPENAI_API_KEY).",
                path.display()
            );
        }

        Ok(config)
    }

    /// Load configuration from a TOML file without permission checks.
    pub fn from_file_unchecked(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| SkycastError::Config(format!("Invalid config file: {e}")))
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_millis(self.shutdown_drain_ms)
    }
}

#[cfg(unix)]
fn validate_config_file_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::symlink_metadata(path).map_err(|e| {
        SkycastError::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    if !metadata.is_file() {
        return Err(SkycastError::Config(format!(
            "Config path '{}' is not a regular file. Symlinks and directories are not allowed.",
            path.display()
        )));
    }

    let permission_bits = metadata.permissions().mode() & 0o777;

    if permission_bits & 0o002 != 0 {
        return Err(SkycastError::Config(format!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path).unwrap_or_default();
    let has_secret = content.contains("bot_token") || content.contains("api_key");

    if has_secret && permission_bits & 0o004 != 0 {
        return Err(SkycastError::Config(format!(
            "Config file '{}' contains a secret but is world-readable (mode {:04o}). \
             Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        )));
    }

    if has_secret && permission_bits & 0o040 != 0 {
        warn!(
            "Config file '{}' contains a secret and is group-readable (mode {:04o}). \
             Consider: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOML_CONFIG: &str = r#"
shutdown_drain_ms = 500

[telegram]
poll_timeout_secs = 5

[llm]
model = "gpt-4o-mini"
temperature = 0.2

[tool_server]
command = "/usr/local/bin/skycast-weather-mcp"
args = ["--verbose"]
call_timeout_ms = 1500

[tool_server.env]
SKYCAST_HTTP_TIMEOUT_MS = "4000"
"#;

    fn write_config(content: &str, mode: u32) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(mode)).unwrap();
        }
        #[cfg(not(unix))]
        let _ = mode;
        file
    }

    #[test]
    fn parses_full_config() {
        let config: BotConfig = toml::from_str(TOML_CONFIG).unwrap();

        assert_eq!(config.shutdown_drain(), Duration::from_millis(500));
        assert_eq!(config.telegram.poll_timeout_secs, 5);
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.llm.temperature, Some(0.2));
        assert_eq!(config.tool_server.command, "/usr/local/bin/skycast-weather-mcp");
        assert_eq!(config.tool_server.args, vec!["--verbose".to_string()]);
        assert_eq!(config.tool_server.call_timeout(), Duration::from_millis(1500));
        assert_eq!(config.tool_server.connect_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.tool_server.env.get("SKYCAST_HTTP_TIMEOUT_MS").map(String::as_str),
            Some("4000")
        );
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: BotConfig = toml::from_str("").unwrap();
        assert_eq!(config.tool_server.command, "skycast-weather-mcp");
        assert_eq!(config.tool_server.call_timeout_ms, 30_000);
        assert_eq!(config.tool_server.shutdown_grace_ms, 2_000);
        assert_eq!(config.shutdown_drain_ms, 10_000);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn explicit_token_wins() {
        let telegram = TelegramConfig {
            bot_token: Some("123:abc".into()),
            ..Default::default()
        };
        assert_eq!(telegram.resolve_bot_token().as_deref(), Some("123:abc"));
    }

    #[test]
    fn loads_private_file() {
        let file = write_config(TOML_CONFIG, 0o600);
        let config = BotConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tool_server.call_timeout_ms, 1500);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let file = write_config("tool_server = 12", 0o600);
        let err = BotConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SkycastError::Config(_)));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_readable_secret() {
        let file = write_config("[telegram]\nbot_token = \"123:abc\"\n", 0o644);
        assert!(BotConfig::from_file(file.path()).is_err());
        // The unchecked loader does not look at permissions.
        assert!(BotConfig::from_file_unchecked(file.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn rejects_world_writable_file() {
        let file = write_config("shutdown_drain_ms = 1\n", 0o666);
        assert!(BotConfig::from_file(file.path()).is_err());
    }
}
