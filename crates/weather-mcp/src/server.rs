//! MCP server implementation for the weather tool.

use crate::tools::GetWeatherInput;
use crate::weather::OpenMeteoClient;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The weather MCP server.
///
/// Exposes a single `get_weather` tool. Each call is independent: a failed
/// lookup becomes an error result for that call only.
#[derive(Clone)]
pub struct WeatherMcpServer {
    weather: Arc<OpenMeteoClient>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WeatherMcpServer {
    pub fn new(weather: OpenMeteoClient) -> Self {
        Self {
            weather: Arc::new(weather),
            tool_router: Self::tool_router(),
        }
    }

    /// Handle get_weather tool call.
    ///
    /// `Ok` carries the user-facing text (including "location not found"),
    /// `Err` the message for an error result.
    pub async fn handle_get_weather(&self, input: GetWeatherInput) -> Result<String, String> {
        let city = input.city.trim();
        if city.is_empty() {
            warn!("Rejecting get_weather call with empty city");
            return Err("City name must not be empty".to_string());
        }

        match self.weather.lookup(city).await {
            Ok(outcome) => Ok(outcome.render()),
            Err(e) => {
                error!(city = %city, error = %e, "Weather lookup failed");
                Err(format!("Error getting weather for {city}: {e}"))
            }
        }
    }

    #[tool(
        description = "Get current weather for a city. Returns temperature in °C, a short description of the conditions and the wind speed in km/h. If the city cannot be found the result says so in plain text."
    )]
    async fn get_weather(
        &self,
        Parameters(input): Parameters<GetWeatherInput>,
    ) -> Result<CallToolResult, McpError> {
        info!(city = %input.city, "Handling get_weather");

        Ok(match self.handle_get_weather(input).await {
            Ok(text) => CallToolResult::success(vec![Content::text(text)]),
            Err(message) => CallToolResult::error(vec![Content::text(message)]),
        })
    }
}

#[tool_handler]
impl ServerHandler for WeatherMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Real-time weather lookups. Call get_weather with a city name.".into(),
            ),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::GET_WEATHER;
    use crate::weather::WeatherSourceConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn server_for(uri: &str) -> WeatherMcpServer {
        let client = OpenMeteoClient::new(WeatherSourceConfig {
            geocoding_url: format!("{uri}/v1/search"),
            forecast_url: format!("{uri}/v1/forecast"),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        WeatherMcpServer::new(client)
    }

    #[test]
    fn registers_get_weather_tool() {
        let server = server_for("http://127.0.0.1:9");
        let tools = server.tool_router.list_all();

        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, GET_WEATHER);
        let properties = tools[0].input_schema.get("properties").unwrap();
        assert!(properties.get("city").is_some());
    }

    #[test]
    fn advertises_tool_capability() {
        let info = server_for("http://127.0.0.1:9").get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.is_some());
    }

    #[tokio::test]
    async fn empty_city_is_an_error_result() {
        let server = server_for("http://127.0.0.1:9");
        let result = server
            .handle_get_weather(GetWeatherInput { city: "   ".into() })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_city_is_a_successful_result() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&mock)
            .await;

        let text = server_for(&mock.uri())
            .handle_get_weather(GetWeatherInput {
                city: "atlantis".into(),
            })
            .await
            .unwrap();
        assert_eq!(text, "Could not find location: atlantis");
    }

    #[tokio::test]
    async fn upstream_failure_is_an_error_result() {
        let mock = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&mock)
            .await;

        let message = server_for(&mock.uri())
            .handle_get_weather(GetWeatherInput { city: "ubud".into() })
            .await
            .unwrap_err();
        assert!(message.starts_with("Error getting weather for ubud"));
        assert!(message.contains("503"));
    }
}
