pub mod config;
pub mod error;
pub mod llm;
pub mod repl;

pub use config::Config;
pub use error::{Result, WeatherAgentError};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Result, WeatherAgentError};
    pub use crate::llm::gateways::{GeminiConfig, GeminiGateway};
    pub use crate::llm::tools::{FunctionDescriptor, LlmTool, ToolDescriptor, WeatherTool};
    pub use crate::llm::{ChatSession, CompletionConfig, LlmBroker, LlmGateway, LlmMessage};
}
