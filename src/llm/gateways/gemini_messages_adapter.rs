//! Adapter for converting LLM messages to and from the Gemini `generateContent` format.

use crate::llm::models::{LlmMessage, LlmToolCall, MessageRole};
use crate::llm::tools::LlmTool;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Gemini request pieces derived from a message history.
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiPrompt {
    pub system_instruction: Option<Value>,
    pub contents: Vec<Value>,
}

/// Adapt LLM messages to Gemini `systemInstruction` and `contents`.
///
/// System messages are joined into the system instruction. Consecutive tool results are folded
/// into a single `user` turn, which is how Gemini expects answers to parallel function calls.
pub fn adapt_messages_to_gemini(messages: &[LlmMessage]) -> GeminiPrompt {
    let mut system_parts = Vec::new();
    let mut contents: Vec<Value> = Vec::new();
    let mut previous_was_tool = false;

    for msg in messages {
        match msg.role {
            MessageRole::System => {
                if let Some(text) = msg.content.as_deref().filter(|t| !t.is_empty()) {
                    system_parts.push(text);
                }
                previous_was_tool = false;
            }
            MessageRole::User => {
                contents.push(json!({
                    "role": "user",
                    "parts": [{ "text": msg.content.as_deref().unwrap_or("") }]
                }));
                previous_was_tool = false;
            }
            MessageRole::Assistant => {
                let mut parts = Vec::new();
                if let Some(text) = msg.content.as_deref().filter(|t| !t.is_empty()) {
                    parts.push(json!({ "text": text }));
                }
                for call in msg.tool_calls.iter().flatten() {
                    parts.push(json!({
                        "functionCall": {
                            "name": call.name,
                            "args": call.arguments,
                        }
                    }));
                }
                if parts.is_empty() {
                    warn!("Assistant message without content, skipping");
                    previous_was_tool = false;
                    continue;
                }
                contents.push(json!({ "role": "model", "parts": parts }));
                previous_was_tool = false;
            }
            MessageRole::Tool => {
                let Some(call) = msg.tool_calls.as_ref().and_then(|calls| calls.first()) else {
                    warn!("Tool message without originating call, skipping");
                    continue;
                };
                let part = json!({
                    "functionResponse": {
                        "name": call.name,
                        "response": { "content": msg.content.as_deref().unwrap_or("") }
                    }
                });

                if previous_was_tool {
                    if let Some(parts) =
                        contents.last_mut().and_then(|last| last["parts"].as_array_mut())
                    {
                        parts.push(part);
                        continue;
                    }
                }
                contents.push(json!({ "role": "user", "parts": [part] }));
                previous_was_tool = true;
            }
        }
    }

    let system_instruction = if system_parts.is_empty() {
        None
    } else {
        Some(json!({ "parts": [{ "text": system_parts.join("\n\n") }] }))
    };

    GeminiPrompt {
        system_instruction,
        contents,
    }
}

/// Build the Gemini `tools` array from tool descriptors.
pub fn adapt_tools_to_gemini(tools: &[Box<dyn LlmTool>]) -> Value {
    let declarations: Vec<Value> = tools
        .iter()
        .map(|tool| {
            let function = tool.descriptor().function;
            json!({
                "name": function.name,
                "description": function.description,
                "parameters": to_gemini_schema(&function.parameters),
            })
        })
        .collect();

    json!([{ "functionDeclarations": declarations }])
}

/// Gemini spells JSON-schema types as upper-case enum names (`OBJECT`, `STRING`, ...).
fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                let converted = match (key.as_str(), value) {
                    ("type", Value::String(t)) => Value::String(t.to_uppercase()),
                    ("properties", Value::Object(props)) => Value::Object(
                        props.iter().map(|(k, v)| (k.clone(), to_gemini_schema(v))).collect(),
                    ),
                    ("items", v) => to_gemini_schema(v),
                    (_, v) => v.clone(),
                };
                out.insert(key.clone(), converted);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Convert the parts of a Gemini candidate into text content and tool calls.
pub fn convert_candidate_parts(parts: &[Value]) -> (Option<String>, Vec<LlmToolCall>) {
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();

    for part in parts {
        if let Some(text) = part["text"].as_str() {
            texts.push(text);
        }

        let call = &part["functionCall"];
        if let Some(name) = call["name"].as_str() {
            let arguments: HashMap<String, Value> = call["args"]
                .as_object()
                .map(|args| args.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default();

            tool_calls.push(LlmToolCall {
                id: call["id"].as_str().map(String::from),
                name: name.to_string(),
                arguments,
            });
        }
    }

    let content = if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    };

    (content, tool_calls)
}
