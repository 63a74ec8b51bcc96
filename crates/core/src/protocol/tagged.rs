use regex::Regex;
use serde_json::Value;

use super::{ConversationProtocol, ParseError, to_spaced_json};
use crate::message::{StructuredMessage, ToolArgs};

const SCHEMA_EXAMPLE: &str = r#"<thoughts>Your reasoning should happen here</thoughts>
<tool>{{tool_name}} or leave empty if no tool is needed</tool>
<tool_args>{{["input required for the tool"]}} or empty list if no input is needed</tool_args>
<response>null if using a tool, otherwise your final response</response>"#;

/// A protocol where each field is wrapped in its own tag:
///
/// ```text
/// <thoughts>...</thoughts><tool>...</tool><tool_args>[...]</tool_args><response>...</response>
/// ```
///
/// Parsing is permissive. Tags are matched case-insensitively, a missing tag
/// leaves its field absent, and `tool_args` that are not a JSON array or
/// object degrade to no arguments. Parsing never fails.
///
/// Each field is looked up after the previous one first, and anywhere in the
/// text if that fails. Closing tags inside field text are written as
/// `<\/tag>` so that they cannot end a field early.
pub struct TaggedProtocol {
    thoughts: Regex,
    tool: Regex,
    tool_args: Regex,
    response: Regex,
    closing_tag: Regex,
}

impl TaggedProtocol {
    /// Creates the protocol, compiling its field matchers.
    pub fn new() -> Self {
        Self {
            thoughts: field_matcher("thoughts"),
            tool: field_matcher("tool"),
            tool_args: field_matcher("tool_args"),
            response: field_matcher("response"),
            closing_tag: Regex::new(
                r"(?i)</(thoughts|tool|tool_args|response)>",
            )
            .expect("closing tag matcher must compile"),
        }
    }

    /// Captures the field matched by `expr`, preferring a match at or after
    /// `cursor`. Only such a match moves the cursor.
    fn capture(
        expr: &Regex,
        text: &str,
        cursor: &mut usize,
    ) -> Option<String> {
        let caps = match expr.captures_at(text, *cursor) {
            Some(caps) => {
                *cursor = caps.get(0).map_or(*cursor, |m| m.end());
                caps
            }
            None => expr.captures(text)?,
        };
        caps.get(1).map(|m| m.as_str().trim().to_owned())
    }

    fn parse_tool_args(raw: Option<String>) -> ToolArgs {
        let Some(raw) = raw else {
            return ToolArgs::default();
        };
        if raw.is_empty() {
            return ToolArgs::default();
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => ToolArgs::from_value(value).unwrap_or_else(|| {
                debug!("tool_args is neither a list nor a map: {raw}");
                ToolArgs::default()
            }),
            Err(err) => {
                debug!("tool_args is not valid JSON ({err}): {raw}");
                ToolArgs::default()
            }
        }
    }
}

impl Default for TaggedProtocol {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

// The tag names are fixed, so the expression always compiles.
fn field_matcher(tag: &str) -> Regex {
    Regex::new(&format!(r"(?ims)<{tag}>(.*?)</{tag}>"))
        .expect("field matcher must compile")
}

impl ConversationProtocol for TaggedProtocol {
    fn schema_example(&self) -> &str {
        SCHEMA_EXAMPLE
    }

    fn parse(&self, text: &str) -> Result<StructuredMessage, ParseError> {
        let mut cursor = 0;
        let thoughts = Self::capture(&self.thoughts, text, &mut cursor);
        let tool = Self::capture(&self.tool, text, &mut cursor);
        let tool_args = Self::capture(&self.tool_args, text, &mut cursor);
        let response = Self::capture(&self.response, text, &mut cursor);
        Ok(StructuredMessage::new(
            thoughts,
            tool,
            Self::parse_tool_args(tool_args),
            response,
        ))
    }

    fn serialize(&self, message: &StructuredMessage, pretty: bool) -> String {
        let nl = if pretty { "\n" } else { "" };
        let tool_args = if pretty {
            serde_json::to_string_pretty(message.tool_args())
        } else {
            to_spaced_json(message.tool_args())
        }
        .unwrap_or_else(|_| "[]".to_owned());
        // `\/` is also a valid escape inside JSON strings, so `tool_args`
        // stays parseable.
        let escape = |field: &str| {
            self.closing_tag.replace_all(field, r"<\/$1>").into_owned()
        };
        format!(
            "<thoughts>{}</thoughts>{nl}<tool>{}</tool>{nl}<tool_args>{}</tool_args>{nl}<response>{}</response>",
            escape(message.thoughts().unwrap_or_default().trim()),
            escape(&message.tool().unwrap_or_default().trim().to_lowercase()),
            escape(&tool_args),
            escape(message.response().unwrap_or_default().trim()),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_permissive() {
        let protocol = TaggedProtocol::new();
        let msg = protocol
            .parse(
                "Sure!\n<THOUGHTS>\n  I need to find information\n  on Python.\n</Thoughts>\n\
                 <tool> search_wikipedia </tool>\n\
                 <tool_args>[\"Python\"]</tool_args>\n\
                 <response></response> trailing chatter",
            )
            .unwrap();
        assert_eq!(
            msg.thoughts(),
            Some("I need to find information\n  on Python.")
        );
        assert_eq!(msg.tool(), Some("search_wikipedia"));
        assert_eq!(
            msg.tool_args(),
            &ToolArgs::Positional(vec![json!("Python")])
        );
        assert_eq!(msg.response(), None);
    }

    #[test]
    fn test_missing_tags() {
        let protocol = TaggedProtocol::new();
        let msg = protocol.parse("just some prose").unwrap();
        assert_eq!(msg, StructuredMessage::default());

        let msg = protocol.parse("<response>42</response>").unwrap();
        assert_eq!(msg.thoughts(), None);
        assert_eq!(msg.response(), Some("42"));
    }

    #[test]
    fn test_malformed_tool_args_degrade() {
        let protocol = TaggedProtocol::new();
        let msg = protocol
            .parse(
                "<thoughts>t</thoughts><tool>echo</tool><tool_args>[\"a\",</tool_args>",
            )
            .unwrap();
        assert_eq!(msg.tool(), Some("echo"));
        assert_eq!(msg.tool_args(), &ToolArgs::default());

        let msg = protocol
            .parse("<thoughts>t</thoughts><tool>echo</tool><tool_args>7</tool_args>")
            .unwrap();
        assert_eq!(msg.tool_args(), &ToolArgs::default());

        let msg = protocol
            .parse(
                "<thoughts>t</thoughts><tool>echo</tool><tool_args>{\"x\": \"a\"}</tool_args>",
            )
            .unwrap();
        assert!(matches!(msg.tool_args(), ToolArgs::Keyed(_)));
    }

    #[test]
    fn test_serialize() {
        let protocol = TaggedProtocol::new();
        let msg = StructuredMessage::thoughts_only("I need the date.")
            .with_tool("Get_Current_Date", ToolArgs::default());
        assert_eq!(
            protocol.serialize(&msg, false),
            "<thoughts>I need the date.</thoughts><tool>get_current_date</tool><tool_args>[]</tool_args><response></response>"
        );

        let msg = StructuredMessage::thoughts_only("Python.")
            .with_tool("wikipedia_search", vec![json!("Python")]);
        assert_eq!(
            protocol.serialize(&msg, true),
            "<thoughts>Python.</thoughts>\n<tool>wikipedia_search</tool>\n<tool_args>[\n  \"Python\"\n]</tool_args>\n<response></response>"
        );
    }

    #[test]
    fn test_embedded_tags() {
        let protocol = TaggedProtocol::new();
        let msg = StructuredMessage::thoughts_only(
            "Answer inside a <response> block, then </thoughts>",
        )
        .with_tool("echo", vec![json!("</tool_args>")]);
        let text = protocol.serialize(&msg, false);
        assert_eq!(
            text,
            "<thoughts>Answer inside a <response> block, then <\\/thoughts></thoughts>\
             <tool>echo</tool><tool_args>[\"<\\/tool_args>\"]</tool_args><response></response>"
        );

        let parsed = protocol.parse(&text).unwrap();
        assert_eq!(
            parsed.thoughts(),
            Some("Answer inside a <response> block, then <\\/thoughts>")
        );
        assert_eq!(parsed.tool(), Some("echo"));
        assert_eq!(
            parsed.tool_args(),
            &ToolArgs::Positional(vec![json!("</tool_args>")])
        );
        assert_eq!(parsed.response(), None);

        // Out-of-order fields are still found.
        let msg = protocol
            .parse("<response>r</response><thoughts>t</thoughts>")
            .unwrap();
        assert_eq!(msg.thoughts(), Some("t"));
        assert_eq!(msg.response(), Some("r"));
    }

    #[test]
    fn test_schema_example_placeholders() {
        let protocol = TaggedProtocol::new();
        assert!(protocol.schema_example().contains("<tool>{{tool_name}}"));
        assert!(protocol.schema_example().starts_with("<thoughts>"));
    }
}
