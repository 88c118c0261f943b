use crate::config::Config;
use crate::error::{Result, WeatherAgentError};
use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

pub const TOOL_NAME: &str = "get_weather";

const TOOL_DESCRIPTION: &str = "Gets the current weather conditions for a specific geographical \
location. Use this tool whenever the user asks about the weather, temperature, humidity, or \
general weather conditions for a city or place. Returns a string describing the weather.";

const NOT_AVAILABLE: &str = "Not available";
const UNKNOWN_ERROR: &str = "Unknown error";

/// Outcome of a single weather lookup.
///
/// Every failure mode is a variant rather than an error, so the tool always hands the model
/// readable text. [`fmt::Display`] renders the text the model receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherOutcome {
    Success(String),
    TransportError(String),
    ApplicationError(String),
    UnexpectedError(String),
}

impl fmt::Display for WeatherOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherOutcome::Success(text) => write!(f, "{}", text),
            WeatherOutcome::TransportError(detail) => {
                write!(f, "Network error contacting the weather API: {}", detail)
            }
            WeatherOutcome::ApplicationError(detail) => {
                write!(f, "Error getting weather: {}", detail)
            }
            WeatherOutcome::UnexpectedError(detail) => {
                write!(f, "An unexpected error occurred while getting the weather: {}", detail)
            }
        }
    }
}

/// Current-conditions lookup against the OpenWeatherMap API.
///
/// One GET per call, metric units, English descriptions. The location is passed through
/// untouched; matching it to a place is left to the provider.
#[derive(Clone)]
pub struct WeatherTool {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WeatherTool {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.openweathermap_api_key, &config.weather_base_url)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Look up the current weather for `location`. Never fails.
    pub async fn lookup(&self, location: &str) -> WeatherOutcome {
        info!(location = location, "Looking up current weather");

        let body = match self.fetch(location).await {
            Ok(body) => body,
            Err(e) => {
                // Strip the URL: it carries the API key in its query string.
                let e = e.without_url();
                warn!(error = %e, "Weather request failed");
                return WeatherOutcome::TransportError(e.to_string());
            }
        };

        let payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Weather payload is not valid JSON");
                return WeatherOutcome::UnexpectedError(e.to_string());
            }
        };

        interpret_payload(location, &payload)
    }

    async fn fetch(&self, location: &str) -> std::result::Result<String, reqwest::Error> {
        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "en"),
            ])
            .send()
            .await?
            .error_for_status()?;

        response.text().await
    }
}

/// Turn a decoded provider payload into an outcome.
fn interpret_payload(location: &str, payload: &Value) -> WeatherOutcome {
    if !payload.is_object() {
        return WeatherOutcome::UnexpectedError("weather payload is not a JSON object".to_string());
    }

    if !is_success_code(payload.get("cod")) {
        let message = present(payload.get("message"))
            .map(render_value)
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        warn!(message = %message, "Weather provider reported an error");
        return WeatherOutcome::ApplicationError(message);
    }

    let description = payload
        .get("weather")
        .and_then(Value::as_array)
        .and_then(|conditions| conditions.first())
        .and_then(|condition| condition.get("description"));
    let main = payload.get("main");
    let temp = main.and_then(|m| m.get("temp"));
    let feels_like = main.and_then(|m| m.get("feels_like"));
    let humidity = main.and_then(|m| m.get("humidity"));

    WeatherOutcome::Success(format!(
        "The weather in {} is: {}. Temperature: {}°C (feels like: {}°C). Humidity: {}%.",
        location,
        render_field(description),
        render_field(temp),
        render_field(feels_like),
        render_field(humidity),
    ))
}

/// `cod` is a number on success but the provider sends strings for some errors.
fn is_success_code(cod: Option<&Value>) -> bool {
    match cod {
        Some(Value::Number(n)) => n.as_u64() == Some(200) || n.as_f64() == Some(200.0),
        Some(Value::String(s)) => s.trim() == "200",
        _ => false,
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn render_field(value: Option<&Value>) -> String {
    present(value).map(render_value).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl LlmTool for WeatherTool {
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let location = args.get("location").and_then(|v| v.as_str()).ok_or_else(|| {
            WeatherAgentError::ToolError("location parameter is required".to_string())
        })?;

        let outcome = self.lookup(location).await;
        Ok(json!(outcome.to_string()))
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: TOOL_NAME.to_string(),
                description: TOOL_DESCRIPTION.to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "location": {
                            "type": "string",
                            "description": "The city or place name, optionally with a country, e.g. London or Paris, FR"
                        }
                    },
                    "required": ["location"]
                }),
            },
        }
    }
}
