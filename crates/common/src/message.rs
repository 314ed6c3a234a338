//! Chat message types passed from the chat adapter to the coordinator.

use serde::{Deserialize, Serialize};

/// Where a reply to an inbound message has to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyTarget {
    /// Chat the message arrived in
    pub chat_id: i64,

    /// Platform id of the originating message, if replies should thread to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
}

impl ReplyTarget {
    pub fn chat(chat_id: i64) -> Self {
        Self {
            chat_id,
            message_id: None,
        }
    }
}

/// A text message received from the chat platform.
///
/// Immutable once received; the orchestrator only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Unique message ID
    pub id: String,

    /// Raw message text as the user typed it
    pub text: String,

    /// Reply target for this message
    pub reply_to: ReplyTarget,

    /// Display name of the sender, if the platform provided one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Timestamp (Unix millis)
    pub received_at: u64,
}

impl InboundMessage {
    pub fn new(text: impl Into<String>, reply_to: ReplyTarget) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            reply_to,
            sender: None,
            received_at: now_millis(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// First `max_chars` characters of the text, for log lines.
    pub fn preview(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect()
    }
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
