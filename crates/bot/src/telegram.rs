//! Minimal Telegram Bot API client: long polling plus the two outbound calls
//! the bot needs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use skycast_common::{ReplyTarget, Result, SkycastError};
use skycast_coordinator::{ChatPlatform, TelegramConfig};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl Message {
    /// Replies quote the original message in groups, not in private chats.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            chat_id: self.chat.id,
            message_id: (self.chat.kind != "private").then_some(self.message_id),
        }
    }

    pub fn sender_name(&self) -> Option<String> {
        self.from
            .as_ref()
            .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
    }
}

enum ApiFailure {
    Rejected { code: Option<u16>, description: String },
    Transport(String),
}

impl From<ApiFailure> for SkycastError {
    fn from(failure: ApiFailure) -> Self {
        match failure {
            ApiFailure::Rejected { code, description } => match code {
                Some(code) => SkycastError::Platform(format!("Telegram error {code}: {description}")),
                None => SkycastError::Platform(format!("Telegram error: {description}")),
            },
            ApiFailure::Transport(e) => SkycastError::Platform(e),
        }
    }
}

pub struct TelegramClient {
    endpoint: String,
    http_client: reqwest::Client,
    poll_timeout_secs: u64,
    request_timeout: Duration,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let token = config.resolve_bot_token().ok_or_else(|| {
            SkycastError::Config(
                "Telegram bot token missing: set telegram.bot_token or TELEGRAM_BOT_TOKEN".into(),
            )
        })?;

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| SkycastError::Platform(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            endpoint: format!("{}/bot{}", config.api_url.trim_end_matches('/'), token),
            http_client,
            poll_timeout_secs: config.poll_timeout_secs,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        })
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }

        // The server holds the request open for up to the poll timeout.
        let timeout = self.request_timeout + Duration::from_secs(self.poll_timeout_secs);
        Ok(self.call("getUpdates", &body, timeout).await?)
    }

    /// Send Markdown text, falling back to plain text if Telegram rejects
    /// the markup.
    pub async fn send_message(&self, target: &ReplyTarget, text: &str) -> Result<()> {
        match self.send_raw(target, text, Some("Markdown")).await {
            Ok(()) => Ok(()),
            Err(ApiFailure::Rejected {
                code: Some(400),
                description,
            }) => {
                warn!(
                    chat_id = target.chat_id,
                    reason = %description,
                    "Markdown rejected, resending as plain text"
                );
                Ok(self.send_raw(target, text, None).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send_raw(
        &self,
        target: &ReplyTarget,
        text: &str,
        parse_mode: Option<&str>,
    ) -> std::result::Result<(), ApiFailure> {
        let mut body = json!({
            "chat_id": target.chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }
        if let Some(message_id) = target.message_id {
            body["reply_parameters"] = json!({
                "message_id": message_id,
                "allow_sending_without_reply": true,
            });
        }

        let _: Value = self
            .call("sendMessage", &body, self.request_timeout)
            .await?;
        Ok(())
    }

    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "action": action });
        let _: bool = self
            .call("sendChatAction", &body, self.request_timeout)
            .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &Value,
        timeout: Duration,
    ) -> std::result::Result<T, ApiFailure> {
        debug!(method, "Calling Telegram");

        // without_url() keeps the bot token out of error messages
        let response = self
            .http_client
            .post(format!("{}/{}", self.endpoint, method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(format!("{method} failed: {}", e.without_url())))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response.json().await.map_err(|e| {
            ApiFailure::Transport(format!(
                "{method} returned unreadable body ({status}): {}",
                e.without_url()
            ))
        })?;

        if !parsed.ok {
            return Err(ApiFailure::Rejected {
                code: parsed.error_code.or(Some(status.as_u16())),
                description: parsed
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }

        parsed
            .result
            .ok_or_else(|| ApiFailure::Transport(format!("{method} returned no result")))
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn send_typing(&self, target: &ReplyTarget) -> Result<()> {
        self.send_chat_action(target.chat_id, "typing").await
    }

    async fn send_text(&self, target: &ReplyTarget, text: &str) -> Result<()> {
        self.send_message(target, text).await
    }
}
