//! Startup configuration resolved from the process environment.
//!
//! [`Config`] is built once in `main` and handed by reference to the gateway and the weather
//! tool. Both API keys are required; the optional variables only override endpoints and the
//! model name.

use crate::error::{Result, WeatherAgentError};
use std::fmt;

pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const OPENWEATHERMAP_API_KEY_VAR: &str = "OPENWEATHERMAP_API_KEY";
pub const GEMINI_MODEL_VAR: &str = "GEMINI_MODEL";
pub const GEMINI_API_ENDPOINT_VAR: &str = "GEMINI_API_ENDPOINT";
pub const OPENWEATHERMAP_API_ENDPOINT_VAR: &str = "OPENWEATHERMAP_API_ENDPOINT";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENWEATHERMAP_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5";

/// Placeholder printed in place of secrets by `Debug` impls.
pub const REDACTED: &str = "<redacted>";

#[derive(Clone)]
pub struct Config {
    pub google_api_key: String,
    pub openweathermap_api_key: String,
    pub model: String,
    pub gemini_base_url: String,
    pub weather_base_url: String,
}

impl Config {
    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    ///
    /// The Google key is checked before the OpenWeatherMap key, so when both are missing the
    /// error names `GOOGLE_API_KEY`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let google_api_key = required(&lookup, GOOGLE_API_KEY_VAR, "Google")?;
        let openweathermap_api_key =
            required(&lookup, OPENWEATHERMAP_API_KEY_VAR, "OpenWeatherMap")?;

        Ok(Self {
            google_api_key,
            openweathermap_api_key,
            model: optional(&lookup, GEMINI_MODEL_VAR, DEFAULT_GEMINI_MODEL),
            gemini_base_url: optional(&lookup, GEMINI_API_ENDPOINT_VAR, DEFAULT_GEMINI_ENDPOINT),
            weather_base_url: optional(
                &lookup,
                OPENWEATHERMAP_API_ENDPOINT_VAR,
                DEFAULT_OPENWEATHERMAP_ENDPOINT,
            ),
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("google_api_key", &REDACTED)
            .field("openweathermap_api_key", &REDACTED)
            .field("model", &self.model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("weather_base_url", &self.weather_base_url)
            .finish()
    }
}

fn required<F>(lookup: &F, name: &str, provider: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(WeatherAgentError::ConfigError(format!(
            "{} API key not found ({}). Make sure it's in the .env file",
            provider, name
        ))),
    }
}

fn optional<F>(lookup: &F, name: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_both_keys_present() {
        let config = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("OPENWEATHERMAP_API_KEY", "w-key"),
        ]))
        .unwrap();

        assert_eq!(config.google_api_key, "g-key");
        assert_eq!(config.openweathermap_api_key, "w-key");
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.gemini_base_url, DEFAULT_GEMINI_ENDPOINT);
        assert_eq!(config.weather_base_url, DEFAULT_OPENWEATHERMAP_ENDPOINT);
    }

    #[test]
    fn test_missing_google_key() {
        let err = Config::from_lookup(lookup_from(&[("OPENWEATHERMAP_API_KEY", "w-key")]))
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Google API key not found"));
        assert!(message.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_empty_google_key() {
        let err = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", ""),
            ("OPENWEATHERMAP_API_KEY", "w-key"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_missing_weather_key() {
        let err = Config::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "g-key")])).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("OpenWeatherMap API key not found"));
        assert!(message.contains("OPENWEATHERMAP_API_KEY"));
        assert!(!message.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_empty_weather_key() {
        let err = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("OPENWEATHERMAP_API_KEY", ""),
        ]))
        .unwrap_err();

        match err {
            WeatherAgentError::ConfigError(msg) => assert!(msg.contains("OPENWEATHERMAP_API_KEY")),
            _ => panic!("Expected ConfigError"),
        }
    }

    #[test]
    fn test_google_key_reported_first_when_both_missing() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_optional_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("OPENWEATHERMAP_API_KEY", "w-key"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GEMINI_API_ENDPOINT", "http://localhost:9000"),
            ("OPENWEATHERMAP_API_ENDPOINT", "http://localhost:9001"),
        ]))
        .unwrap();

        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.gemini_base_url, "http://localhost:9000");
        assert_eq!(config.weather_base_url, "http://localhost:9001");
    }

    #[test]
    fn test_empty_optional_falls_back_to_default() {
        let config = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("OPENWEATHERMAP_API_KEY", "w-key"),
            ("GEMINI_MODEL", ""),
        ]))
        .unwrap();

        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_debug_hides_api_keys() {
        let config = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g-secret"),
            ("OPENWEATHERMAP_API_KEY", "w-secret"),
        ]))
        .unwrap();

        let printed = format!("{:?}", config);
        assert!(!printed.contains("g-secret"));
        assert!(!printed.contains("w-secret"));
        assert!(printed.contains(DEFAULT_GEMINI_MODEL));
    }
}
