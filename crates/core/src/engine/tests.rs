use std::future::ready;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use parley_model::{ErrorKind, ModelMessage, Role};
use parley_test_model::{PresetResponse, TestModelProvider};
use serde_json::{Value, json};

use crate::conversation::Transcript;
use crate::protocol::{
    ConversationProtocol, JsonProtocol, ParseError, ProtocolKind,
    TaggedProtocol,
};
use crate::tool::{Error as ToolError, Parameter, Registry, TypeTag};
use crate::{EngineBuilder, Error, StructuredMessage};

fn registry() -> Arc<Registry> {
    let mut registry = Registry::new();
    registry.register_fn(
        "echo",
        "Returns its argument.",
        vec![Parameter::new("x", TypeTag::String)],
        |args| {
            let x = args.get("x").and_then(Value::as_str).map(str::to_owned);
            ready(x.ok_or_else(|| {
                ToolError::invalid_input().with_reason("missing `x`")
            }))
        },
    );
    registry.register_fn("explode", "Always fails.", vec![], |_| {
        ready(Err(ToolError::execution_error().with_reason("boom")))
    });
    Arc::new(registry)
}

fn reply(value: Value) -> String {
    value.to_string()
}

fn tool_reply(tool: &str, args: Value) -> String {
    reply(json!({
        "thoughts": format!("I should call {tool}."),
        "tool": tool,
        "tool_args": args,
        "response": null
    }))
}

fn final_reply(text: &str) -> String {
    reply(json!({
        "thoughts": "Done.",
        "tool": "",
        "tool_args": [],
        "response": text
    }))
}

/// Returns the thoughts of a turn synthesized by the engine.
fn relayed_thoughts(message: &ModelMessage) -> String {
    assert_eq!(message.role(), Role::User);
    JsonProtocol::new()
        .parse(message.content())
        .unwrap()
        .thoughts()
        .unwrap()
        .to_owned()
}

#[tokio::test]
async fn test_thoughts_double_as_response() {
    let mut provider = TestModelProvider::default();
    provider.add_round(reply(json!({ "thoughts": "need date" })));

    let mut engine = EngineBuilder::with_model_provider(provider).build();
    let message = engine.chat("What's the date?").await.unwrap();
    assert_eq!(message.response(), Some("need date"));
    assert_eq!(engine.transcript().len(), 2);
}

#[tokio::test]
async fn test_tool_result_is_relayed() {
    let mut provider = TestModelProvider::default();
    provider.add_round(tool_reply("echo", json!(["a"])));
    provider.add_round(final_reply("The tool said a."));

    let mut engine = EngineBuilder::with_model_provider(provider.clone())
        .with_registry(registry())
        .build();
    let message = engine.chat("Echo a").await.unwrap();
    assert_eq!(message.response(), Some("The tool said a."));

    let items = engine.transcript().items();
    assert_eq!(items.len(), 4);
    assert_eq!(
        relayed_thoughts(&items[2]),
        "\"echo\" tool returned result: \"a\", proceeding further with my thoughts..."
    );

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(&requests[1].messages[1..], &items[..3]);
}

#[tokio::test]
async fn test_keyed_tool_args() {
    let mut provider = TestModelProvider::default();
    provider.add_round(tool_reply("echo", json!({ "x": "keyed" })));
    provider.add_round(final_reply("ok"));

    let mut engine = EngineBuilder::with_model_provider(provider)
        .with_registry(registry())
        .build();
    engine.chat("Echo").await.unwrap();
    assert!(
        relayed_thoughts(&engine.transcript().items()[2])
            .contains("returned result: \"keyed\"")
    );
}

#[tokio::test]
async fn test_tool_failure_is_relayed() {
    let mut provider = TestModelProvider::default();
    provider.add_round(tool_reply("explode", json!([])));
    provider.add_round(tool_reply("echo", json!(["a", "b"])));
    provider.add_round(final_reply("Both tools failed."));

    let mut engine = EngineBuilder::with_model_provider(provider)
        .with_registry(registry())
        .build();
    let message = engine.chat("Try").await.unwrap();
    assert_eq!(message.response(), Some("Both tools failed."));

    let items = engine.transcript().items();
    assert_eq!(
        relayed_thoughts(&items[2]),
        "\"explode\" tool returned error: \"boom\", proceeding further with my thoughts..."
    );
    assert!(
        relayed_thoughts(&items[4]).starts_with("\"echo\" tool returned error: ")
    );
}

#[tokio::test]
async fn test_unknown_tool_stops() {
    let mut provider = TestModelProvider::default();
    provider.add_round(tool_reply("ghost", json!([])));

    let mut engine = EngineBuilder::with_model_provider(provider)
        .with_registry(registry())
        .build();
    let message = engine.chat("Boo").await.unwrap();
    assert_eq!(message.tool(), Some("ghost"));
    assert_eq!(message.response(), None);
    assert_eq!(engine.transcript().len(), 2);
}

#[tokio::test]
async fn test_parse_failure_is_retried() {
    let mut provider = TestModelProvider::default();
    provider.add_round("Sure! Here you go.");
    provider.add_round(final_reply("Recovered."));

    let mut engine = EngineBuilder::with_model_provider(provider).build();
    let message = engine.chat("Hi").await.unwrap();
    assert_eq!(message.response(), Some("Recovered."));

    let thoughts = relayed_thoughts(&engine.transcript().items()[2]);
    assert!(thoughts.starts_with(
        "\"Sure! Here you go.\" cannot be processed. Error: malformed JSON message"
    ));
    assert!(thoughts.ends_with(", revisioning further with my thoughts..."));
}

#[tokio::test]
async fn test_invalid_response_is_fatal() {
    let mut provider = TestModelProvider::default();
    let text = reply(json!({ "tool": "echo", "response": "r" }));
    provider.add_round(text.clone());

    let mut engine = EngineBuilder::with_model_provider(provider).build();
    let err = engine.chat("Hi").await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse { reply } if reply == text));
}

#[tokio::test]
async fn test_backend_error_is_fatal() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(
        PresetResponse::with_text(final_reply("never")).with_failures(1),
    );

    let mut engine = EngineBuilder::with_model_provider(provider).build();
    let err = engine.chat("Hi").await.unwrap_err();
    assert_eq!(err.backend_kind(), Some(ErrorKind::Other));
    assert_eq!(engine.transcript().len(), 1);
}

#[tokio::test]
async fn test_empty_reply() {
    let mut provider = TestModelProvider::default();
    provider.add_user_input_step();
    provider.add_assistant_response_step(PresetResponse::with_choices(
        Vec::<String>::new(),
    ));

    let mut engine = EngineBuilder::with_model_provider(provider).build();
    let err = engine.chat("Hi").await.unwrap_err();
    assert!(matches!(err, Error::EmptyReply));
}

#[tokio::test]
async fn test_turns_exhausted() {
    let mut provider = TestModelProvider::default();
    for _ in 0..3 {
        provider.add_round(tool_reply("echo", json!(["again"])));
    }

    let mut engine = EngineBuilder::with_model_provider(provider)
        .with_registry(registry())
        .with_max_turns(2)
        .build();
    let err = engine.chat("Loop").await.unwrap_err();
    assert!(matches!(err, Error::TurnsExhausted(2)));
    assert_eq!(engine.transcript().len(), 4);
}

#[tokio::test]
async fn test_transcript_grows_two_per_round() {
    const TOOL_ROUNDS: usize = 3;

    let mut provider = TestModelProvider::default();
    for i in 0..TOOL_ROUNDS {
        provider.add_round(tool_reply("echo", json!([format!("{i}")])));
    }
    provider.add_round(final_reply("done"));

    let mut engine = EngineBuilder::with_model_provider(provider)
        .with_registry(registry())
        .build();
    engine.chat("Go").await.unwrap();

    let items = engine.transcript().items();
    assert_eq!(items.len(), 2 * (TOOL_ROUNDS + 1));
    for (idx, item) in items.iter().enumerate() {
        let expected = if idx % 2 == 0 { Role::User } else { Role::Assistant };
        assert_eq!(item.role(), expected);
    }
    assert_eq!(items[0].content(), "Go");
    for i in 0..TOOL_ROUNDS {
        assert!(
            relayed_thoughts(&items[2 + 2 * i])
                .contains(&format!("returned result: \"{i}\""))
        );
    }
}

#[tokio::test]
async fn test_request_shape() {
    let mut provider = TestModelProvider::default();
    provider.add_round(final_reply("Hi!"));

    let mut engine = EngineBuilder::with_model_provider(provider.clone())
        .with_model("qwen2.5:7b")
        .with_temperature(0.2)
        .with_registry(registry())
        .build();
    engine.chat_as(Role::Assistant, "Hello").await.unwrap();

    let requests = provider.requests();
    let req = &requests[0];
    assert_eq!(req.model, "qwen2.5:7b");
    assert_eq!(req.temperature, Some(0.2));
    assert_eq!(
        req.messages[0],
        ModelMessage::System(engine.system_prompt())
    );
    assert_eq!(req.messages[1], ModelMessage::Assistant("Hello".to_owned()));
    assert!(engine.system_prompt().contains("\"name\": \"explode\""));
}

#[tokio::test]
async fn test_tagged_conversation() {
    let mut provider = TestModelProvider::default();
    provider.add_round(
        "<thoughts>Let me echo.</thoughts>\n<tool>ECHO</tool>\n\
         <tool_args>[\"a\"]</tool_args>\n<response></response>",
    );
    provider.add_round("<thoughts>The answer is a.</thoughts>");

    let steps = Arc::new(AtomicUsize::new(0));
    let tools_seen = Arc::new(Mutex::new(Vec::new()));
    let mut engine = EngineBuilder::with_model_provider(provider)
        .with_protocol(ProtocolKind::Tagged)
        .with_registry(registry())
        .on_step({
            let steps = Arc::clone(&steps);
            let tools_seen = Arc::clone(&tools_seen);
            move |message| {
                steps.fetch_add(1, Ordering::Relaxed);
                if let Some(tool) = message.tool() {
                    tools_seen.lock().unwrap().push(tool.to_owned());
                }
            }
        })
        .build();

    let message = engine.chat("Echo a").await.unwrap();
    // The tool name is matched exactly, `ECHO` is not `echo`.
    assert_eq!(message.tool(), Some("ECHO"));
    assert_eq!(steps.load(Ordering::Relaxed), 1);
    assert_eq!(*tools_seen.lock().unwrap(), ["ECHO"]);

    let mut provider = TestModelProvider::default();
    provider.add_round(
        "<thoughts>Let me echo.</thoughts><tool>echo</tool><tool_args>[\"a\"]</tool_args>",
    );
    provider.add_round("<thoughts>The answer is a.</thoughts>");
    let mut engine = EngineBuilder::with_model_provider(provider)
        .with_protocol(ProtocolKind::Tagged)
        .with_registry(registry())
        .build();
    let message = engine.chat("Echo a").await.unwrap();
    assert_eq!(message.response(), Some("The answer is a."));

    let relayed = TaggedProtocol::new()
        .parse(engine.transcript().items()[2].content())
        .unwrap();
    assert_eq!(
        relayed.thoughts(),
        Some("\"echo\" tool returned result: \"a\", proceeding further with my thoughts...")
    );
}

#[tokio::test]
async fn test_resume_transcript() {
    let mut provider = TestModelProvider::default();
    provider.add_round(final_reply("Hello!"));
    provider.add_round(final_reply("Still here."));

    let earlier = Transcript::from(vec![
        ModelMessage::User("Hi".to_owned()),
        ModelMessage::Assistant(final_reply("Hello!")),
    ]);
    let mut engine = EngineBuilder::with_model_provider(provider.clone())
        .with_transcript(earlier.clone())
        .build();
    let message = engine.chat("Are you there?").await.unwrap();
    assert_eq!(message.response(), Some("Still here."));

    // Only the new round is requested, on top of the restored turns.
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(&requests[0].messages[1..3], earlier.items());
    assert_eq!(
        requests[0].messages[3],
        ModelMessage::User("Are you there?".to_owned())
    );
    assert_eq!(engine.transcript().len(), 4);
    assert_eq!(
        engine.transcript().last(),
        Some(&ModelMessage::Assistant(final_reply("Still here.")))
    );
}

/// Reads every reply as a final answer.
struct PlainProtocol;

impl ConversationProtocol for PlainProtocol {
    fn schema_example(&self) -> &str {
        "Answer in plain text."
    }

    fn parse(&self, text: &str) -> Result<StructuredMessage, ParseError> {
        let message = StructuredMessage::thoughts_only("Plain reply.");
        Ok(message.with_response(text))
    }

    fn serialize(&self, message: &StructuredMessage, _pretty: bool) -> String {
        message.response().unwrap_or_default().to_owned()
    }
}

#[tokio::test]
async fn test_custom_protocol() {
    let mut provider = TestModelProvider::default();
    provider.add_round("It is sunny.");

    let mut engine = EngineBuilder::with_model_provider(provider.clone())
        .with_custom_protocol(PlainProtocol)
        .with_registry(registry())
        .build();
    let message = engine.chat("Weather?").await.unwrap();
    assert_eq!(message.thoughts(), Some("Plain reply."));
    assert_eq!(message.response(), Some("It is sunny."));

    let prompt = engine.system_prompt();
    assert!(prompt.contains("Answer in plain text."));
    assert!(prompt.contains("following format:\nHello, how are you doing?"));
    assert!(!prompt.contains("<thoughts>"));
    assert_eq!(
        provider.requests()[0].messages[0],
        ModelMessage::System(prompt)
    );
}
