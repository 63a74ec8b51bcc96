//! The structured message exchanged with the model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments for a tool call, in one of the two calling conventions the
/// model may use.
///
/// The convention is decided once, when the reply is parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArgs {
    /// Arguments bound to parameters in declaration order.
    Positional(Vec<Value>),
    /// Arguments bound to parameters by name.
    Keyed(Map<String, Value>),
}

impl Default for ToolArgs {
    #[inline]
    fn default() -> Self {
        ToolArgs::Positional(Vec::new())
    }
}

impl ToolArgs {
    /// Classifies a loosely-typed JSON value, returning `None` for shapes
    /// that are neither a sequence nor a mapping.
    #[inline]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(ToolArgs::Positional(items)),
            Value::Object(map) => Some(ToolArgs::Keyed(map)),
            _ => None,
        }
    }

    /// Returns the number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            ToolArgs::Positional(items) => items.len(),
            ToolArgs::Keyed(map) => map.len(),
        }
    }

    /// Returns `true` if there are no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Value>> for ToolArgs {
    #[inline]
    fn from(items: Vec<Value>) -> Self {
        ToolArgs::Positional(items)
    }
}

impl From<Map<String, Value>> for ToolArgs {
    #[inline]
    fn from(map: Map<String, Value>) -> Self {
        ToolArgs::Keyed(map)
    }
}

/// One structured exchange unit: the model's reasoning, an optional tool
/// request, and an optional final answer.
///
/// A message is valid when it has `thoughts` together with either a `tool`
/// or a `response`. Messages are values: they are built once and never
/// mutated in place, the `with_*` methods return new messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructuredMessage {
    thoughts: Option<String>,
    tool: Option<String>,
    tool_args: ToolArgs,
    response: Option<String>,
}

impl StructuredMessage {
    /// Creates a message from its four fields.
    ///
    /// Empty or whitespace-only text is treated as absent.
    pub fn new(
        thoughts: Option<String>,
        tool: Option<String>,
        tool_args: ToolArgs,
        response: Option<String>,
    ) -> Self {
        Self {
            thoughts: thoughts.and_then(non_blank),
            tool: tool.and_then(non_blank),
            tool_args,
            response: response.and_then(non_blank),
        }
    }

    /// Creates a message carrying only `thoughts`.
    #[inline]
    pub fn thoughts_only<S: Into<String>>(thoughts: S) -> Self {
        Self::new(Some(thoughts.into()), None, ToolArgs::default(), None)
    }

    /// Returns a copy of this message requesting `tool` with `tool_args`.
    #[inline]
    pub fn with_tool<S: Into<String>>(
        self,
        tool: S,
        tool_args: impl Into<ToolArgs>,
    ) -> Self {
        Self::new(self.thoughts, Some(tool.into()), tool_args.into(), None)
    }

    /// Returns a copy of this message answering with `response`.
    #[inline]
    pub fn with_response<S: Into<String>>(self, response: S) -> Self {
        Self::new(
            self.thoughts,
            self.tool,
            self.tool_args,
            Some(response.into()),
        )
    }

    /// Returns the model's reasoning.
    #[inline]
    pub fn thoughts(&self) -> Option<&str> {
        self.thoughts.as_deref()
    }

    /// Returns the requested tool name.
    #[inline]
    pub fn tool(&self) -> Option<&str> {
        self.tool.as_deref()
    }

    /// Returns the arguments for the requested tool.
    #[inline]
    pub fn tool_args(&self) -> &ToolArgs {
        &self.tool_args
    }

    /// Returns the final answer.
    #[inline]
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    /// Returns `true` if `thoughts` is present together with a `tool` or a
    /// `response`.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.thoughts.is_some()
            && (self.tool.is_some() || self.response.is_some())
    }

    /// Returns a copy where a missing `response` is filled from `thoughts`,
    /// when no tool is requested.
    ///
    /// Thoughts double as the answer for a model that finishes without
    /// writing one.
    pub fn with_default_response(self) -> Self {
        if self.tool.is_some() || self.response.is_some() {
            return self;
        }
        let response = self.thoughts.clone();
        Self { response, ..self }
    }
}

#[inline]
fn non_blank(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validity() {
        let thinking = StructuredMessage::thoughts_only("need date");
        assert!(!thinking.is_valid());
        assert!(
            thinking
                .clone()
                .with_tool("get_current_date", ToolArgs::default())
                .is_valid()
        );
        assert!(thinking.with_response("Today").is_valid());

        let no_thoughts = StructuredMessage::new(
            None,
            Some("echo".to_owned()),
            ToolArgs::default(),
            Some("done".to_owned()),
        );
        assert!(!no_thoughts.is_valid());
    }

    #[test]
    fn test_blank_fields_are_absent() {
        let msg = StructuredMessage::new(
            Some("  ".to_owned()),
            Some(String::new()),
            ToolArgs::default(),
            Some("\n".to_owned()),
        );
        assert_eq!(msg, StructuredMessage::default());
    }

    #[test]
    fn test_default_response() {
        let msg = StructuredMessage::thoughts_only("need date")
            .with_default_response();
        assert_eq!(msg.response(), Some("need date"));
        assert!(msg.is_valid());

        let msg = StructuredMessage::thoughts_only("need date")
            .with_tool("get_current_date", ToolArgs::default())
            .with_default_response();
        assert_eq!(msg.response(), None);
    }

    #[test]
    fn test_tool_args_shapes() {
        assert_eq!(
            ToolArgs::from_value(json!(["a", 1])),
            Some(ToolArgs::Positional(vec![json!("a"), json!(1)]))
        );
        let keyed = ToolArgs::from_value(json!({ "x": true })).unwrap();
        assert!(matches!(keyed, ToolArgs::Keyed(_)));
        assert_eq!(keyed.len(), 1);
        assert_eq!(ToolArgs::from_value(json!("a")), None);
        assert!(ToolArgs::default().is_empty());
    }
}
