//! MCP tool definitions for the weather server.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name the capability is registered under.
pub const GET_WEATHER: &str = "get_weather";

/// Input for the get_weather tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetWeatherInput {
    /// Name of the city (e.g. 'London', 'New York', 'Tokyo')
    pub city: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_requires_city() {
        let schema = serde_json::to_value(schemars::schema_for!(GetWeatherInput)).unwrap();
        assert_eq!(schema["properties"]["city"]["type"], "string");
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required, &vec![serde_json::json!("city")]);
    }

    #[test]
    fn input_rejects_missing_city() {
        let parsed: Result<GetWeatherInput, _> = serde_json::from_value(serde_json::json!({}));
        assert!(parsed.is_err());
    }
}
