//! Error types and result aliases for the weather agent.
//!
//! Startup faults (missing credentials) surface as [`WeatherAgentError::ConfigError`] and stop
//! the process. Everything else is a per-turn fault that the interactive loop reports inline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherAgentError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WeatherAgentError>;
