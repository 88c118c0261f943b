use crate::error::{Result, WeatherAgentError};
use crate::llm::gateway::{CompletionConfig, LlmGateway};
use crate::llm::models::{LlmMessage, LlmToolCall};
use crate::llm::tools::LlmTool;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model calls allowed per request before the broker gives up on a final answer.
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

pub const ITERATION_LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// Main interface for LLM interactions
///
/// The broker runs the tool-calling loop: it asks the gateway for a completion, executes any
/// tools the model requests, feeds the results back and repeats until the model answers in
/// plain text.
pub struct LlmBroker {
    model: String,
    gateway: Arc<dyn LlmGateway>,
    max_iterations: usize,
}

impl LlmBroker {
    /// Create a new LLM broker
    pub fn new(model: impl Into<String>, gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            model: model.into(),
            gateway,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Override the number of model calls allowed per request
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text response from LLM
    ///
    /// Tool failures and calls to unknown tools do not fail the request; they are reported back
    /// to the model as the tool's output so it can recover.
    pub async fn generate(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[Box<dyn LlmTool>]>,
        config: Option<CompletionConfig>,
    ) -> Result<String> {
        let config = config.unwrap_or_default();
        let mut current_messages = messages.to_vec();

        for _ in 0..self.max_iterations {
            let response =
                self.gateway.complete(&self.model, &current_messages, tools, &config).await?;

            let tools = match tools {
                Some(tools) if !response.tool_calls.is_empty() => tools,
                _ => {
                    if !response.tool_calls.is_empty() {
                        warn!("LLM requested tool calls but no tools provided");
                    }
                    let Some(content) = response.content.filter(|c| !c.trim().is_empty())
                    else {
                        warn!("LLM returned an empty final answer");
                        return Err(WeatherAgentError::GatewayError(
                            "model returned an empty reply".to_string(),
                        ));
                    };
                    info!("Final answer: {}", content);
                    return Ok(content);
                }
            };

            info!("Tool calls requested: {}", response.tool_calls.len());

            current_messages.push(LlmMessage::assistant_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            for tool_call in &response.tool_calls {
                let output = self.execute_tool(tool_call, tools).await;
                current_messages.push(LlmMessage::tool_result(tool_call, output));
            }
        }

        warn!(max_iterations = self.max_iterations, "Tool-calling iteration limit reached");
        Ok(ITERATION_LIMIT_MESSAGE.to_string())
    }

    async fn execute_tool(&self, tool_call: &LlmToolCall, tools: &[Box<dyn LlmTool>]) -> String {
        let Some(tool) = tools.iter().find(|t| t.matches(&tool_call.name)) else {
            warn!("Tool not found: {}", tool_call.name);
            let available: Vec<String> =
                tools.iter().map(|t| t.descriptor().function.name).collect();
            return format!(
                "Error: {} is not a valid tool, try one of [{}].",
                tool_call.name,
                available.join(", ")
            );
        };

        info!("Executing tool: {}", tool_call.name);
        debug!("Tool arguments: {:?}", tool_call.arguments);

        match tool.run(&tool_call.arguments).await {
            Ok(output) => {
                let text = tool_output_text(output);
                info!("Tool output: {}", text);
                text
            }
            Err(e) => {
                warn!("Tool execution failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

fn tool_output_text(output: Value) -> String {
    match output {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
