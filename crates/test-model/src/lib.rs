//! A local fake model for testing purpose.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_model::{
    ErrorKind, ModelChoice, ModelMessage, ModelProvider, ModelProviderError,
    ModelReply, ModelRequest,
};
use tokio::time::sleep;

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub fn message(&self) -> &'static str {
        self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Clone)]
enum ConversationStep {
    UserInput,
    AssistantResponse(PresetResponse),
}

#[derive(Default)]
struct SharedState {
    attempts: HashMap<usize, u64>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to a request. The added steps will be
/// selected according to the history messages in your request (system
/// messages are not counted). If there are no enough steps in the script, an
/// error will be returned.
///
/// Every request is recorded and can be inspected with
/// [`TestModelProvider::requests`].
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    state: Arc<Mutex<SharedState>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_response_step(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn add_user_input_step(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    /// Adds an inbound step followed by an assistant reply with `text`.
    #[inline]
    pub fn add_round<S: Into<String>>(&mut self, text: S) {
        self.add_user_input_step();
        self.add_assistant_response_step(PresetResponse::with_text(text));
    }

    /// Holds every reply back for `duration`, 1ms by default.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        match self.state.lock() {
            Ok(state) => state.requests.clone(),
            Err(poisoned) => poisoned.into_inner().requests.clone(),
        }
    }

    fn respond(&self, req: &ModelRequest) -> Result<ModelReply, Error> {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.requests.push(req.clone());

        let step_idx = req
            .messages
            .iter()
            .filter(|msg| !matches!(msg, ModelMessage::System(_)))
            .count();
        let Some(step) = self.conversation_script.get(step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::RateLimitExceeded,
            });
        };
        let preset = match step {
            ConversationStep::UserInput => {
                return Err(Error {
                    message: "not an assistant response step",
                    kind: ErrorKind::Moderated,
                });
            }
            ConversationStep::AssistantResponse(preset) => preset,
        };

        let attempts = state.attempts.entry(step_idx).or_default();
        *attempts += 1;
        let should_fail = match preset.failures {
            Some(0) => true,
            Some(failures) => *attempts <= failures,
            None => false,
        };
        if should_fail {
            return Err(Error {
                message: "preset failure",
                kind: ErrorKind::Other,
            });
        }

        Ok(ModelReply {
            choices: preset
                .choices
                .iter()
                .map(|content| ModelChoice {
                    content: content.clone(),
                })
                .collect(),
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelReply, Self::Error>> + Send + 'static
    {
        let result = self.respond(req);
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        async move {
            sleep(delay).await;
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(messages: Vec<ModelMessage>) -> ModelRequest {
        ModelRequest {
            model: "test".to_owned(),
            messages,
            temperature: None,
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_round("Hello, world!");
        provider.add_user_input_step();
        provider.add_assistant_response_step(PresetResponse::with_choices([
            "draft",
            "Sure, let me take a look.",
        ]));

        let mut req = request(vec![
            ModelMessage::System("Follow the format.".to_owned()),
            ModelMessage::User("Hi".to_owned()),
        ]);
        let reply = provider.send_request(&req).await.unwrap();
        assert_eq!(reply.last_content(), Some("Hello, world!"));

        req.messages
            .push(ModelMessage::Assistant("Hello, world!".to_owned()));
        req.messages
            .push(ModelMessage::User("Check my todo".to_owned()));
        let reply = provider.send_request(&req).await.unwrap();
        assert_eq!(reply.last_content(), Some("Sure, let me take a look."));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 4);
    }

    #[tokio::test]
    async fn test_script_errors() {
        let mut provider = TestModelProvider::default();
        provider.add_round("Hi");

        let err = provider.send_request(&request(vec![])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);

        let req = request(vec![
            ModelMessage::User("1".to_owned()),
            ModelMessage::Assistant("2".to_owned()),
            ModelMessage::User("3".to_owned()),
        ]);
        let err = provider.send_request(&req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }

    #[tokio::test]
    async fn test_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_user_input_step();
        provider.add_assistant_response_step(
            PresetResponse::with_text("finally").with_failures(2),
        );

        let req = request(vec![ModelMessage::User("Hi".to_owned())]);
        for _ in 0..2 {
            let err = provider.send_request(&req).await.unwrap_err();
            assert_eq!(err.message(), "preset failure");
        }
        let reply = provider.send_request(&req).await.unwrap();
        assert_eq!(reply.last_content(), Some("finally"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay() {
        let mut provider = TestModelProvider::default();
        provider.add_round("Hi");
        provider.set_delay(Duration::from_secs(30));

        let req = request(vec![ModelMessage::User("Hello".to_owned())]);
        let started = tokio::time::Instant::now();
        let reply = provider.send_request(&req).await.unwrap();
        assert_eq!(reply.last_content(), Some("Hi"));
        assert!(started.elapsed() >= Duration::from_secs(30));
        // The request is recorded before the delay runs out.
        assert_eq!(provider.requests().len(), 1);
    }
}
