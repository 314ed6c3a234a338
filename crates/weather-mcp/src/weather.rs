//! Open-Meteo geocoding and forecast client.
//!
//! A lookup is two sequential HTTP calls: the city name is resolved to a
//! coordinate pair, then the current conditions for that pair are fetched.
//! Nothing is cached; every lookup starts from scratch.

use serde::Deserialize;
use skycast_common::{Result, SkycastError};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

pub const GEOCODING_API: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const FORECAST_API: &str = "https://api.open-meteo.com/v1/forecast";

const CURRENT_FIELDS: &str = "temperature_2m,weather_code,wind_speed_10m";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Endpoints and limits for the weather source.
#[derive(Debug, Clone)]
pub struct WeatherSourceConfig {
    pub geocoding_url: String,
    pub forecast_url: String,
    pub timeout: Duration,
}

impl Default for WeatherSourceConfig {
    fn default() -> Self {
        Self {
            geocoding_url: GEOCODING_API.to_string(),
            forecast_url: FORECAST_API.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl WeatherSourceConfig {
    /// Read overrides from `SKYCAST_GEOCODING_URL`, `SKYCAST_FORECAST_URL`
    /// and `SKYCAST_HTTP_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("SKYCAST_GEOCODING_URL") {
            config.geocoding_url = url;
        }
        if let Ok(url) = std::env::var("SKYCAST_FORECAST_URL") {
            config.forecast_url = url;
        }
        if let Some(ms) = std::env::var("SKYCAST_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.timeout = Duration::from_millis(ms);
        }
        config
    }
}

/// A geocoding candidate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    // Open-Meteo drops the field entirely when nothing matched.
    #[serde(default)]
    results: Vec<Location>,
}

/// Current conditions at a coordinate pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CurrentConditions {
    #[serde(rename = "temperature_2m")]
    pub temperature: f64,
    pub weather_code: u16,
    #[serde(rename = "wind_speed_10m")]
    pub wind_speed: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentConditions>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    reason: Option<String>,
}

/// Human-readable text for a WMO weather interpretation code.
pub fn describe_weather_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Foggy",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Slight rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Slight snow",
        73 => "Moderate snow",
        75 => "Heavy snow",
        77 => "Snow grains",
        80 => "Slight rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Slight snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with slight hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unknown",
    }
}

/// Pick the candidate whose name matches the query exactly (ignoring case),
/// otherwise the first one.
pub fn select_location(query: &str, candidates: Vec<Location>) -> Option<Location> {
    let query = query.trim();
    let exact = candidates
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(query))
        .unwrap_or(0);
    candidates.into_iter().nth(exact)
}

/// Current weather for a resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: Location,
    pub conditions: CurrentConditions,
}

impl WeatherReport {
    pub fn description(&self) -> &'static str {
        describe_weather_code(self.conditions.weather_code)
    }
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Weather in {}:", self.location.name)?;
        writeln!(f, "🌡️ Temperature: {}°C", Reading(self.conditions.temperature))?;
        writeln!(f, "🌤️ Conditions: {}", self.description())?;
        write!(f, "💨 Wind Speed: {} km/h", Reading(self.conditions.wind_speed))
    }
}

/// A measured value; whole numbers keep one decimal place ("27.0").
struct Reading(f64);

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_finite() && self.0.fract() == 0.0 {
            write!(f, "{:.1}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Result of a lookup. A city that cannot be geocoded is a normal outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherOutcome {
    Report(WeatherReport),
    LocationNotFound { query: String },
}

impl WeatherOutcome {
    pub fn render(&self) -> String {
        match self {
            Self::Report(report) => report.to_string(),
            Self::LocationNotFound { query } => format!("Could not find location: {query}"),
        }
    }
}

/// HTTP client for the Open-Meteo APIs.
pub struct OpenMeteoClient {
    config: WeatherSourceConfig,
    http: reqwest::Client,
}

impl OpenMeteoClient {
    pub fn new(config: WeatherSourceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SkycastError::WeatherSource(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Resolve a city name to a coordinate pair. `Ok(None)` when nothing matched.
    pub async fn geocode(&self, city: &str) -> Result<Option<Location>> {
        debug!(url = %self.config.geocoding_url, city = %city, "Fetching coordinates");

        let response = self
            .http
            .get(&self.config.geocoding_url)
            .query(&[("name", city), ("count", "1")])
            .send()
            .await
            .map_err(|e| SkycastError::WeatherSource(format!("Geocoding request failed: {e}")))?;

        let body: GeocodingResponse = read_json(response, "Geocoding").await?;
        let location = select_location(city, body.results);

        if let Some(ref loc) = location {
            info!(
                city = %city,
                name = %loc.name,
                latitude = loc.latitude,
                longitude = loc.longitude,
                "Found coordinates"
            );
        }
        Ok(location)
    }

    pub async fn current_conditions(&self, location: &Location) -> Result<CurrentConditions> {
        debug!(url = %self.config.forecast_url, name = %location.name, "Fetching weather");

        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let response = self
            .http
            .get(&self.config.forecast_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("current", CURRENT_FIELDS),
                ("timezone", "auto"),
            ])
            .send()
            .await
            .map_err(|e| SkycastError::WeatherSource(format!("Forecast request failed: {e}")))?;

        let body: ForecastResponse = read_json(response, "Forecast").await?;
        body.current.ok_or_else(|| {
            SkycastError::WeatherSource("Forecast response has no current conditions".into())
        })
    }

    /// Geocode `city` and fetch its current conditions.
    pub async fn lookup(&self, city: &str) -> Result<WeatherOutcome> {
        info!(city = %city, "Getting weather for city");

        let Some(location) = self.geocode(city).await? else {
            info!(city = %city, "No geocoding results");
            return Ok(WeatherOutcome::LocationNotFound {
                query: city.to_string(),
            });
        };

        let conditions = self.current_conditions(&location).await?;
        Ok(WeatherOutcome::Report(WeatherReport {
            location,
            conditions,
        }))
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    source: &str,
) -> Result<T> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| SkycastError::WeatherSource(format!("{source} response unreadable: {e}")))?;

    if !status.is_success() {
        let reason = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|body| body.reason)
            .unwrap_or(text);
        return Err(SkycastError::WeatherSource(format!(
            "{source} API error {status}: {reason}"
        )));
    }

    serde_json::from_str(&text)
        .map_err(|e| SkycastError::WeatherSource(format!("Failed to parse {source} response: {e}")))
}
