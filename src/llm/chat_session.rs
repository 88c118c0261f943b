//! Chat session management with full conversation memory.
//!
//! This module provides a chat session abstraction that keeps the complete history of user
//! and assistant turns and replays it, behind a fixed system prompt, on every request.

use crate::error::Result;
use crate::llm::broker::LlmBroker;
use crate::llm::gateway::CompletionConfig;
use crate::llm::models::LlmMessage;
use crate::llm::tools::LlmTool;
use tracing::debug;

/// System prompt for the conversational weather assistant.
///
/// The wording steers the model toward calling `get_weather` for follow-ups such as
/// "and in Paris?", so it is kept exactly as written.
pub const WEATHER_SYSTEM_PROMPT: &str = "You are a very helpful conversational weather assistant. \
Your main function is to get the current weather using the 'get_weather' tool. \
Carefully analyze the user's question and the CONVERSATION HISTORY. \
If the user's question, even a short follow-up like 'and in [city]?', \
asks for weather information (climate, weather, temperature, humidity) for ANY location, \
you MUST use the 'get_weather' tool with that location's name. \
Do not answer that you cannot get the weather if the 'get_weather' tool is available. \
Respond in a friendly manner.";

/// A chat session that remembers every turn of the conversation.
///
/// The system prompt is always the first message. Only user queries and final assistant
/// replies are remembered; intermediate tool traffic stays inside the broker.
///
/// # Examples
///
/// ```ignore
/// use weather_agent::llm::{ChatSession, LlmBroker};
/// use weather_agent::llm::gateways::GeminiGateway;
/// use std::sync::Arc;
///
/// let gateway = Arc::new(GeminiGateway::with_config(config)?);
/// let broker = LlmBroker::new("gemini-1.5-flash-latest", gateway);
/// let mut session = ChatSession::builder(broker)
///     .system_prompt(WEATHER_SYSTEM_PROMPT)
///     .tools(vec![Box::new(weather_tool)])
///     .build();
///
/// let reply = session.send("What's the weather in London?").await?;
/// ```
pub struct ChatSession {
    broker: LlmBroker,
    messages: Vec<LlmMessage>,
    tools: Option<Vec<Box<dyn LlmTool>>>,
    temperature: f32,
}

impl ChatSession {
    /// Create a new chat session with default settings.
    pub fn new(broker: LlmBroker) -> Self {
        Self::builder(broker).build()
    }

    /// Create a chat session builder for custom configuration.
    pub fn builder(broker: LlmBroker) -> ChatSessionBuilder {
        ChatSessionBuilder::new(broker)
    }

    /// Send a message to the LLM and get a response.
    ///
    /// On success the query and the reply are both appended to the history. On failure the
    /// query is discarded, so a failed turn leaves the conversation as it was.
    pub async fn send(&mut self, query: &str) -> Result<String> {
        self.messages.push(LlmMessage::user(query));

        let config = CompletionConfig {
            temperature: self.temperature,
            ..Default::default()
        };

        let result =
            self.broker.generate(&self.messages, self.tools.as_deref(), Some(config)).await;

        match result {
            Ok(response) => {
                self.messages.push(LlmMessage::assistant(&response));
                debug!("Conversation now holds {} messages", self.messages.len());
                Ok(response)
            }
            Err(e) => {
                self.messages.pop();
                Err(e)
            }
        }
    }

    /// Get the current conversation history
    pub fn messages(&self) -> &[LlmMessage] {
        &self.messages
    }
}

/// Builder for constructing a `ChatSession` with custom configuration.
pub struct ChatSessionBuilder {
    broker: LlmBroker,
    system_prompt: String,
    tools: Option<Vec<Box<dyn LlmTool>>>,
    temperature: f32,
}

impl ChatSessionBuilder {
    fn new(broker: LlmBroker) -> Self {
        Self {
            broker,
            system_prompt: "You are a helpful assistant.".to_string(),
            tools: None,
            temperature: CompletionConfig::default().temperature,
        }
    }

    /// Set the system prompt (default: "You are a helpful assistant.")
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the tools available to the LLM
    pub fn tools(mut self, tools: Vec<Box<dyn LlmTool>>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the temperature for generation (default: 0.7)
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn build(self) -> ChatSession {
        ChatSession {
            broker: self.broker,
            messages: vec![LlmMessage::system(self.system_prompt)],
            tools: self.tools,
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeatherAgentError;
    use crate::llm::gateway::LlmGateway;
    use crate::llm::models::{LlmGatewayResponse, LlmToolCall, MessageRole};
    use crate::llm::tools::{FunctionDescriptor, ToolDescriptor};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    // Mock gateway: `None` entries fail, `Some` entries answer with that text
    struct MockGateway {
        responses: Vec<Option<LlmGatewayResponse>>,
        call_count: Mutex<usize>,
        seen: Mutex<Vec<Vec<LlmMessage>>>,
    }

    impl MockGateway {
        fn new(responses: Vec<Option<LlmGatewayResponse>>) -> Self {
            Self {
                responses,
                call_count: Mutex::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn texts(texts: &[&str]) -> Self {
            Self::new(
                texts
                    .iter()
                    .map(|t| {
                        Some(LlmGatewayResponse {
                            content: Some(t.to_string()),
                            tool_calls: vec![],
                        })
                    })
                    .collect(),
            )
        }
    }

    #[async_trait::async_trait]
    impl LlmGateway for MockGateway {
        async fn complete(
            &self,
            _model: &str,
            messages: &[LlmMessage],
            _tools: Option<&[Box<dyn LlmTool>]>,
            _config: &CompletionConfig,
        ) -> Result<LlmGatewayResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let mut count = self.call_count.lock().unwrap();
            let idx = *count;
            *count += 1;

            match self.responses.get(idx) {
                Some(Some(response)) => Ok(response.clone()),
                Some(None) => Err(WeatherAgentError::GatewayError("unavailable".to_string())),
                None => Ok(LlmGatewayResponse {
                    content: Some("default response".to_string()),
                    tool_calls: vec![],
                }),
            }
        }
    }

    struct MockTool;

    #[async_trait::async_trait]
    impl LlmTool for MockTool {
        async fn run(&self, _args: &HashMap<String, Value>) -> Result<Value> {
            Ok(json!("clear sky"))
        }

        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                r#type: "function".to_string(),
                function: FunctionDescriptor {
                    name: "get_weather".to_string(),
                    description: "A mock tool".to_string(),
                    parameters: json!({}),
                },
            }
        }
    }

    fn broker(gateway: Arc<MockGateway>) -> LlmBroker {
        LlmBroker::new("test-model", gateway)
    }

    #[tokio::test]
    async fn test_new_session_has_system_message() {
        let session = ChatSession::new(broker(Arc::new(MockGateway::texts(&[]))));

        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, MessageRole::System);
        assert_eq!(
            session.messages()[0].content.as_deref(),
            Some("You are a helpful assistant.")
        );
    }

    #[tokio::test]
    async fn test_builder_custom_system_prompt() {
        let session = ChatSession::builder(broker(Arc::new(MockGateway::texts(&[]))))
            .system_prompt(WEATHER_SYSTEM_PROMPT)
            .build();

        assert_eq!(session.messages()[0].content.as_deref(), Some(WEATHER_SYSTEM_PROMPT));
    }

    #[tokio::test]
    async fn test_builder_custom_temperature() {
        let session = ChatSession::builder(broker(Arc::new(MockGateway::texts(&[]))))
            .temperature(0.2)
            .build();

        assert_eq!(session.temperature, 0.2);
    }

    #[tokio::test]
    async fn test_send_adds_messages_to_history() {
        let mut session =
            ChatSession::new(broker(Arc::new(MockGateway::texts(&["Hello, World!"]))));

        let response = session.send("Hi").await.unwrap();

        assert_eq!(response, "Hello, World!");
        // Should have: system, user, assistant
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].role, MessageRole::User);
        assert_eq!(session.messages()[1].content.as_deref(), Some("Hi"));
        assert_eq!(session.messages()[2].role, MessageRole::Assistant);
        assert_eq!(session.messages()[2].content.as_deref(), Some("Hello, World!"));
    }

    #[tokio::test]
    async fn test_history_is_replayed_on_follow_up() {
        let gateway = Arc::new(MockGateway::texts(&["Rainy in London.", "Sunny in Paris."]));
        let mut session = ChatSession::new(broker(gateway.clone()));

        session.send("Weather in London?").await.unwrap();
        session.send("and in Paris?").await.unwrap();

        let seen = gateway.seen.lock().unwrap();
        let second: Vec<_> = seen[1].iter().map(|m| m.content.clone().unwrap()).collect();
        assert_eq!(
            second,
            vec![
                "You are a helpful assistant.",
                "Weather in London?",
                "Rainy in London.",
                "and in Paris?",
            ]
        );
        assert_eq!(session.messages().len(), 5);
    }

    #[tokio::test]
    async fn test_tool_traffic_not_stored() {
        let gateway = Arc::new(MockGateway::new(vec![
            Some(LlmGatewayResponse {
                content: None,
                tool_calls: vec![LlmToolCall {
                    id: None,
                    name: "get_weather".to_string(),
                    arguments: HashMap::from([("location".to_string(), json!("London"))]),
                }],
            }),
            Some(LlmGatewayResponse {
                content: Some("Clear skies in London.".to_string()),
                tool_calls: vec![],
            }),
        ]));
        let mut session = ChatSession::builder(broker(gateway))
            .tools(vec![Box::new(MockTool)])
            .build();

        let reply = session.send("Weather in London?").await.unwrap();

        assert_eq!(reply, "Clear skies in London.");
        assert_eq!(session.messages().len(), 3);
        assert!(session.messages().iter().all(|m| m.role != MessageRole::Tool));
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_unchanged() {
        let gateway = Arc::new(MockGateway::new(vec![
            None,
            Some(LlmGatewayResponse {
                content: Some("Recovered".to_string()),
                tool_calls: vec![],
            }),
        ]));
        let mut session = ChatSession::new(broker(gateway));

        let first = session.send("Weather?").await;
        assert!(first.is_err());
        assert_eq!(session.messages().len(), 1);

        let second = session.send("Weather now?").await.unwrap();
        assert_eq!(second, "Recovered");
        assert_eq!(session.messages().len(), 3);
        assert_eq!(session.messages()[1].content.as_deref(), Some("Weather now?"));
    }

    #[tokio::test]
    async fn test_empty_reply_is_not_remembered() {
        let gateway = Arc::new(MockGateway::new(vec![
            Some(LlmGatewayResponse::default()),
            Some(LlmGatewayResponse {
                content: Some("Sunny in Rome.".to_string()),
                tool_calls: vec![],
            }),
        ]));
        let mut session = ChatSession::new(broker(gateway.clone()));

        let first = session.send("first").await;
        assert!(matches!(first, Err(WeatherAgentError::GatewayError(_))));
        assert_eq!(session.messages().len(), 1);

        session.send("second").await.unwrap();

        let seen = gateway.seen.lock().unwrap();
        let second: Vec<_> = seen[1].iter().map(|m| m.content.clone().unwrap()).collect();
        assert_eq!(second, vec!["You are a helpful assistant.", "second"]);
    }
}
