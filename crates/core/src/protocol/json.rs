use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConversationProtocol, ParseError, to_spaced_json};
use crate::message::{StructuredMessage, ToolArgs};

const SCHEMA_EXAMPLE: &str = r#"{
  "thoughts": "Your reasoning should happen here",
  "tool": "{{tool_name}} or leave empty if no tool is needed",
  "tool_args": {{["input required for the tool"]}} or empty list if no input is needed,
  "response": "null if using a tool, otherwise your final response"
}"#;

/// The on-wire shape. Every key is optional when reading and always written.
#[derive(Serialize, Deserialize)]
struct WireMessage {
    #[serde(default)]
    thoughts: Option<String>,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    tool_args: Option<ToolArgs>,
    #[serde(default)]
    response: Option<String>,
}

/// A protocol where the whole reply is a single JSON object with the keys
/// `thoughts`, `tool`, `tool_args` and `response`.
///
/// Unlike [`TaggedProtocol`](super::TaggedProtocol) this is strict: text that
/// is not such an object fails to parse.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonProtocol;

impl JsonProtocol {
    /// Creates the protocol.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl ConversationProtocol for JsonProtocol {
    fn schema_example(&self) -> &str {
        SCHEMA_EXAMPLE
    }

    fn parse(&self, text: &str) -> Result<StructuredMessage, ParseError> {
        let value: Value = serde_json::from_str(text.trim()).map_err(|err| {
            ParseError::new(format!("malformed JSON message: {err}"))
        })?;
        if !value.is_object() {
            return Err(ParseError::new("JSON message must be an object"));
        }
        let wire: WireMessage = serde_json::from_value(value).map_err(|err| {
            ParseError::new(format!("unexpected JSON message shape: {err}"))
        })?;
        Ok(StructuredMessage::new(
            wire.thoughts,
            wire.tool,
            wire.tool_args.unwrap_or_default(),
            wire.response,
        ))
    }

    fn serialize(&self, message: &StructuredMessage, pretty: bool) -> String {
        let wire = WireMessage {
            thoughts: message.thoughts().map(ToOwned::to_owned),
            tool: message.tool().map(ToOwned::to_owned),
            tool_args: Some(message.tool_args().clone()),
            response: message.response().map(ToOwned::to_owned),
        };
        let text = if pretty {
            serde_json::to_string_pretty(&wire)
        } else {
            to_spaced_json(&wire)
        };
        // Only strings and JSON values are involved, serialization is total.
        text.unwrap_or_default()
    }
}
