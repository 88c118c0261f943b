//! Conversational weather assistant.
//!
//! Reads `GOOGLE_API_KEY` and `OPENWEATHERMAP_API_KEY` (a `.env` file is honoured), then chats
//! on stdin/stdout until the user types `exit`. Set `RUST_LOG=info` to trace tool calls on
//! stderr.

use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use weather_agent::llm::gateways::{GeminiConfig, GeminiGateway};
use weather_agent::llm::tools::{LlmTool, WeatherTool};
use weather_agent::llm::{ChatSession, LlmBroker, WEATHER_SYSTEM_PROMPT};
use weather_agent::{repl, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env()?;

    let gateway = Arc::new(GeminiGateway::with_config(GeminiConfig::from(&config))?);
    let broker = LlmBroker::new(config.model.clone(), gateway);

    let tools: Vec<Box<dyn LlmTool>> = vec![Box::new(WeatherTool::new(&config))];

    let mut session = ChatSession::builder(broker)
        .system_prompt(WEATHER_SYSTEM_PROMPT)
        .tools(tools)
        .build();

    repl::run(io::stdin().lock(), io::stdout(), &mut session).await?;

    Ok(())
}
