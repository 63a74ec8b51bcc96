mod builder;
mod prompt;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use parley_model::{ModelMessage, ModelRequest, Role};

use crate::conversation::Transcript;
use crate::error::Error;
use crate::message::StructuredMessage;
use crate::model_client::ModelClient;
use crate::protocol::ConversationProtocol;
use crate::tool::Registry;
pub use builder::EngineBuilder;

pub(crate) type StepFn = Box<dyn Fn(&StructuredMessage) + Send + Sync>;

/// Drives a conversation: sends the transcript to the model, parses each
/// reply, runs requested tools and feeds their results back until the model
/// answers.
///
/// An engine is strictly sequential. It has at most one request in flight
/// and owns its transcript exclusively.
pub struct Engine {
    model_client: ModelClient,
    model: String,
    temperature: Option<f32>,
    protocol: Box<dyn ConversationProtocol>,
    registry: Arc<Registry>,
    transcript: Transcript,
    max_turns: usize,
    on_step: Option<StepFn>,
}

impl Engine {
    /// Sends `prompt` as the user and runs the conversation until the model
    /// gives a final response.
    #[inline]
    pub async fn chat<S: Into<String>>(
        &mut self,
        prompt: S,
    ) -> Result<StructuredMessage, Error> {
        self.chat_as(Role::User, prompt).await
    }

    /// Like [`Engine::chat`], with the first turn authored by `role`.
    ///
    /// Each model request counts as one turn. The returned message either
    /// has a `response`, or requests a tool that is not registered; the
    /// latter ends the conversation without an error.
    pub async fn chat_as<S: Into<String>>(
        &mut self,
        role: Role,
        prompt: S,
    ) -> Result<StructuredMessage, Error> {
        let mut role = role;
        let mut prompt = prompt.into();

        for turn in 1..=self.max_turns {
            debug!("turn {turn}/{} as {role}", self.max_turns);
            self.transcript.push(role, prompt);
            let reply = self.request_reply().await?;
            self.transcript.push(Role::Assistant, reply.as_str());

            let message = match self.protocol.parse(&reply) {
                Ok(message) => message.with_default_response(),
                Err(err) => {
                    debug!("reply cannot be parsed: {err}");
                    role = Role::User;
                    prompt = self.relay(format!(
                        "\"{reply}\" cannot be processed. Error: {err}, revisioning further with my thoughts..."
                    ));
                    continue;
                }
            };
            if !message.is_valid() {
                return Err(Error::InvalidResponse { reply });
            }
            if let Some(on_step) = &self.on_step {
                on_step(&message);
            }

            let Some(tool) = message.tool() else {
                return Ok(message);
            };
            let Some(descriptor) = self.registry.resolve(tool) else {
                warn!("tool not found: {tool}");
                return Ok(message);
            };

            let thoughts = match self
                .registry
                .invoke(descriptor, message.tool_args())
                .await
            {
                Ok(result) => format!(
                    "\"{tool}\" tool returned result: \"{result}\", proceeding further with my thoughts..."
                ),
                Err(err) => {
                    debug!("tool `{tool}` failed: {err}");
                    format!(
                        "\"{tool}\" tool returned error: \"{err}\", proceeding further with my thoughts..."
                    )
                }
            };
            role = Role::User;
            prompt = self.relay(thoughts);
        }

        Err(Error::TurnsExhausted(self.max_turns))
    }

    /// Returns the system prompt sent ahead of the transcript.
    #[inline]
    pub fn system_prompt(&self) -> String {
        prompt::system_prompt(self.protocol.as_ref(), &self.registry)
    }

    /// Returns everything said so far.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the tools available to the model.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Wraps engine-authored text as a thoughts-only message.
    #[inline]
    fn relay(&self, thoughts: String) -> String {
        self.protocol
            .serialize(&StructuredMessage::thoughts_only(thoughts), false)
    }

    async fn request_reply(&self) -> Result<String, Error> {
        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(ModelMessage::System(self.system_prompt()));
        messages.extend_from_slice(self.transcript.items());
        let req = ModelRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };

        let reply = self.model_client.send_request(req).await?;
        reply
            .choices
            .into_iter()
            .next_back()
            .map(|choice| choice.content)
            .ok_or(Error::EmptyReply)
    }
}
