//! Gemini Gateway for LLM interactions.
//!
//! This module provides a gateway for the Google Generative Language API
//! (`models/{model}:generateContent`), including function calling.

use crate::config::{Config, DEFAULT_GEMINI_ENDPOINT, REDACTED};
use crate::error::{Result, WeatherAgentError};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::gateways::gemini_messages_adapter::{
    adapt_messages_to_gemini, adapt_tools_to_gemini, convert_candidate_parts,
};
use crate::llm::models::{LlmGatewayResponse, LlmMessage};
use crate::llm::tools::LlmTool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

/// Configuration for connecting to the Gemini API.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &REDACTED)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_ENDPOINT.to_string(),
        }
    }
}

impl From<&Config> for GeminiConfig {
    fn from(config: &Config) -> Self {
        Self {
            api_key: config.google_api_key.clone(),
            base_url: config.gemini_base_url.clone(),
        }
    }
}

/// Gateway for Google's Gemini models.
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// Create a new Gemini gateway with custom configuration.
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder().build()?;

        Ok(Self { client, config })
    }

    /// Create gateway with custom API key and base URL.
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        Self::with_config(GeminiConfig {
            base_url: base_url.into(),
            ..GeminiConfig::new(api_key)
        })
    }

    fn build_body(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Value {
        let prompt = adapt_messages_to_gemini(messages);

        let mut body = serde_json::json!({
            "contents": prompt.contents,
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_tokens,
            }
        });

        if let Some(system_instruction) = prompt.system_instruction {
            body["systemInstruction"] = system_instruction;
        }

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            body["tools"] = adapt_tools_to_gemini(tools);
        }

        body
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn complete(
        &self,
        model: &str,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: &CompletionConfig,
    ) -> Result<LlmGatewayResponse> {
        info!("Delegating to Gemini for completion");
        debug!("Model: {}, Message count: {}", model, messages.len());

        let body = self.build_body(messages, tools, config);

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.config.base_url, model))
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| WeatherAgentError::HttpError(e.without_url()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(WeatherAgentError::GatewayError(format!(
                "Gemini API error: {} - {}",
                status, error_text
            )));
        }

        let response_body: Value = response.json().await?;

        let Some(candidate) = response_body["candidates"].as_array().and_then(|c| c.first())
        else {
            let reason = response_body["promptFeedback"]["blockReason"]
                .as_str()
                .map(|r| format!("prompt blocked: {}", r))
                .unwrap_or_else(|| "no candidates in response".to_string());
            warn!(reason = %reason, "Gemini returned no candidates");
            return Err(WeatherAgentError::GatewayError(reason));
        };

        let parts = candidate["content"]["parts"].as_array().cloned().unwrap_or_default();
        let (content, tool_calls) = convert_candidate_parts(&parts);

        if content.is_none() && tool_calls.is_empty() {
            let reason = candidate["finishReason"].as_str().unwrap_or("UNKNOWN");
            warn!(finish_reason = reason, "Gemini candidate has no content");
            return Err(WeatherAgentError::GatewayError(format!(
                "response ended without content: {}",
                reason
            )));
        }

        Ok(LlmGatewayResponse {
            content,
            tool_calls,
        })
    }
}
