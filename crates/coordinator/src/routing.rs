//! Intent routing for inbound chat messages.
//!
//! Classification is a pure function of the message text. It is a keyword
//! heuristic and deliberately order-sensitive: the first marker that yields a
//! location wins and nothing further is disambiguated.

use serde::{Deserialize, Serialize};

const WEATHER_KEYWORD: &str = "weather";

/// Which token the location was taken after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMarker {
    In,
    For,
    /// No "in"/"for"; everything after "weather" was used.
    Weather,
}

impl LocationMarker {
    fn token(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::For => "for",
            Self::Weather => WEATHER_KEYWORD,
        }
    }
}

/// What a message is asking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    /// Not about weather; answered by the conversational agent.
    GeneralQuery,

    /// Weather question with a location to look up.
    WeatherQuery {
        location: String,
        marker: LocationMarker,
    },

    /// Weather question but no location could be extracted.
    WeatherQueryMissingLocation,
}

impl Intent {
    pub fn is_weather(&self) -> bool {
        !matches!(self, Self::GeneralQuery)
    }
}

/// Classify a message and extract the location argument, if any.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();

    if !lower.contains(WEATHER_KEYWORD) {
        return Intent::GeneralQuery;
    }

    let tokens: Vec<&str> = lower.split_whitespace().collect();

    let extracted = [LocationMarker::In, LocationMarker::For]
        .into_iter()
        .find_map(|marker| tokens_after(&tokens, marker.token()).map(|loc| (loc, marker)))
        .or_else(|| {
            tokens_after(&tokens, WEATHER_KEYWORD).map(|loc| (loc, LocationMarker::Weather))
        });

    match extracted {
        Some((raw, marker)) => {
            let location = clean_location(&raw);
            if location.is_empty() {
                Intent::WeatherQueryMissingLocation
            } else {
                Intent::WeatherQuery { location, marker }
            }
        }
        None => Intent::WeatherQueryMissingLocation,
    }
}

/// Tokens after the first occurrence of `marker`, joined with single spaces.
/// `None` when the marker is absent or is the last token.
fn tokens_after(tokens: &[&str], marker: &str) -> Option<String> {
    let idx = tokens.iter().position(|t| *t == marker)?;
    let rest = &tokens[idx + 1..];
    if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    }
}

fn clean_location(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location_of(text: &str) -> (String, LocationMarker) {
        match classify(text) {
            Intent::WeatherQuery { location, marker } => (location, marker),
            other => panic!("expected a weather query for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn messages_without_weather_are_general() {
        for text in [
            "hello there",
            "what's the forecast in Ubud?",
            "tell me a joke for the road",
            "",
        ] {
            assert_eq!(classify(text), Intent::GeneralQuery, "{text:?}");
        }
    }

    #[test]
    fn in_marker_with_trailing_punctuation() {
        assert_eq!(
            location_of("what's the weather in Ubud?"),
            ("ubud".to_string(), LocationMarker::In)
        );
    }

    #[test]
    fn for_marker_when_in_is_absent() {
        assert_eq!(
            location_of("weather for New York City"),
            ("new york city".to_string(), LocationMarker::For)
        );
    }

    #[test]
    fn in_takes_priority_over_for() {
        assert_eq!(
            location_of("weather for tomorrow in Paris"),
            ("paris".to_string(), LocationMarker::In)
        );
    }

    #[test]
    fn trailing_in_falls_through_to_for() {
        assert_eq!(
            location_of("weather for lisbon, what's it like in"),
            ("lisbon, what's it like in".to_string(), LocationMarker::For)
        );
    }

    #[test]
    fn falls_back_to_tokens_after_weather() {
        assert_eq!(
            location_of("Weather   Tokyo!!"),
            ("tokyo".to_string(), LocationMarker::Weather)
        );
    }

    #[test]
    fn bare_weather_is_missing_location() {
        assert_eq!(classify("weather?"), Intent::WeatherQueryMissingLocation);
        assert_eq!(classify("weather"), Intent::WeatherQueryMissingLocation);
        assert_eq!(
            classify("how is the weather"),
            Intent::WeatherQueryMissingLocation
        );
    }

    #[test]
    fn punctuation_only_location_is_missing() {
        assert_eq!(classify("weather in ?!"), Intent::WeatherQueryMissingLocation);
    }

    #[test]
    fn inner_punctuation_is_kept() {
        assert_eq!(
            location_of("weather in St. Louis."),
            ("st. louis".to_string(), LocationMarker::In)
        );
    }

    #[test]
    fn weather_as_substring_still_counts() {
        // "weather?" is not a token, but the message is still weather-flavoured.
        assert_eq!(
            location_of("weather? in Oslo"),
            ("oslo".to_string(), LocationMarker::In)
        );
        assert!(classify("weather?").is_weather());
    }
}
