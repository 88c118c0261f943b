//! Interactive read-eval-print loop for the weather assistant.

use crate::error::Result;
use crate::llm::ChatSession;
use async_trait::async_trait;
use std::io::{BufRead, Write};
use tracing::debug;

pub const BANNER: &str = "Conversational Weather App with Gemini";
pub const EXIT_HINT: &str = "Type 'exit' to end.";
pub const FAREWELL: &str = "Agent: Goodbye!";
pub const EMPTY_INPUT_PROMPT: &str = "Agent: Please enter a question.";

/// Anything that can answer one conversational turn.
#[async_trait]
pub trait Assistant: Send {
    async fn reply(&mut self, input: &str) -> Result<String>;
}

#[async_trait]
impl Assistant for ChatSession {
    async fn reply(&mut self, input: &str) -> Result<String> {
        self.send(input).await
    }
}

/// Run the session until the user types `exit` (any casing) or input ends.
///
/// A failed turn is printed inline and the loop carries on; only I/O errors on the terminal
/// itself end the session early. Input that is not valid UTF-8 is decoded lossily.
pub async fn run<R, W, A>(mut input: R, mut output: W, assistant: &mut A) -> Result<()>
where
    R: BufRead,
    W: Write,
    A: Assistant + ?Sized,
{
    writeln!(output, "{}", BANNER)?;
    writeln!(output, "{}", EXIT_HINT)?;

    loop {
        write!(output, "\nYou: ")?;
        output.flush()?;

        let mut buf = Vec::new();
        if input.read_until(b'\n', &mut buf)? == 0 {
            debug!("Input closed, ending session");
            writeln!(output)?;
            writeln!(output, "{}", FAREWELL)?;
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let query = line.trim_end_matches(['\r', '\n']);

        if query.eq_ignore_ascii_case("exit") {
            writeln!(output, "{}", FAREWELL)?;
            break;
        }

        if query.is_empty() {
            writeln!(output, "{}", EMPTY_INPUT_PROMPT)?;
            continue;
        }

        match assistant.reply(query).await {
            Ok(response) => writeln!(output, "\nAgent: {}", response)?,
            Err(e) => writeln!(output, "\nAgent: An error occurred: {}", e)?,
        }
    }

    output.flush()?;
    Ok(())
}
