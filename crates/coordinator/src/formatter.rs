//! Reply formatting through the conversational agent.

use skycast_common::{Result, SkycastError};
use skycast_llm::{LlmClient, LlmRequest};
use std::sync::Arc;
use tracing::debug;

/// Instruction profile for the weather assistant.
pub const WEATHER_ASSISTANT_INSTRUCTIONS: &str = "You are a weather assistant in a Telegram chat.
You have access to real-time weather data through the get_weather tool.
When users ask about weather, use the tool to get current conditions.
For other questions, politely explain that you can only help with weather queries.

Format weather responses exactly like this:
🌤️ Current Weather in *{City}*:
🌡️ Temperature: *{temp}°C*
⛅️ Conditions: *{conditions}*
💨 Wind Speed: *{speed} km/h*

Always use *asterisks* for bold text in Telegram, not underscores.
Keep the emojis and formatting exactly as shown above.";

/// Turns raw tool output or a general question into platform-formatted text.
///
/// One agent call per reply, no retries.
pub struct ResponseFormatter {
    agent: Arc<dyn LlmClient>,
    instructions: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ResponseFormatter {
    pub fn new(agent: Arc<dyn LlmClient>) -> Self {
        Self {
            agent,
            instructions: WEATHER_ASSISTANT_INSTRUCTIONS.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Prompt used to dress up raw `get_weather` output.
    pub fn weather_prompt(raw: &str) -> String {
        format!("Format this weather data using Telegram formatting (*bold* and _italic_): {raw}")
    }

    pub async fn format_weather(&self, raw: &str) -> Result<String> {
        self.run(Self::weather_prompt(raw)).await
    }

    /// The user's text goes to the agent verbatim.
    pub async fn respond_general(&self, text: &str) -> Result<String> {
        self.run(text.to_string()).await
    }

    async fn run(&self, prompt: String) -> Result<String> {
        debug!(model = %self.agent.model_name(), prompt_len = prompt.len(), "Formatting reply");

        let request = LlmRequest::single_turn(self.instructions.clone(), prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        self.agent
            .complete(request)
            .await
            .map(|response| response.content)
            .map_err(|e| SkycastError::Formatting(e.to_string()))
    }
}
