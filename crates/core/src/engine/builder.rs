use std::sync::Arc;

use parley_model::ModelProvider;

use super::{Engine, StepFn};
use crate::conversation::Transcript;
use crate::message::StructuredMessage;
use crate::model_client::ModelClient;
use crate::protocol::{ConversationProtocol, ProtocolKind};
use crate::tool::Registry;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_MAX_TURNS: usize = 16;

/// [`Engine`] builder.
pub struct EngineBuilder {
    model_client: ModelClient,
    model: String,
    temperature: Option<f32>,
    protocol: Box<dyn ConversationProtocol>,
    registry: Arc<Registry>,
    transcript: Transcript,
    max_turns: usize,
    on_step: Option<StepFn>,
}

impl EngineBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            model: DEFAULT_MODEL.to_owned(),
            temperature: None,
            protocol: ProtocolKind::default().build(),
            registry: Default::default(),
            transcript: Default::default(),
            max_turns: DEFAULT_MAX_TURNS,
            on_step: None,
        }
    }

    /// Sets the model identifier sent with every request.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Selects one of the built-in protocols.
    #[inline]
    pub fn with_protocol(mut self, kind: ProtocolKind) -> Self {
        self.protocol = kind.build();
        self
    }

    /// Uses a custom protocol.
    #[inline]
    pub fn with_custom_protocol<P: ConversationProtocol + 'static>(
        mut self,
        protocol: P,
    ) -> Self {
        self.protocol = Box::new(protocol);
        self
    }

    /// Sets the tools available to the model. A registry may be shared by
    /// many engines.
    #[inline]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Continues an earlier conversation.
    #[inline]
    pub fn with_transcript(mut self, transcript: Transcript) -> Self {
        self.transcript = transcript;
        self
    }

    /// Bounds the number of model requests a single `chat` call may make.
    #[inline]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Attaches a callback invoked with every valid message, before a
    /// requested tool runs.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&StructuredMessage) + Send + Sync + 'static,
    ) -> Self {
        self.on_step = Some(Box::new(on_step));
        self
    }

    /// Builds the engine.
    #[inline]
    pub fn build(self) -> Engine {
        let EngineBuilder {
            model_client,
            model,
            temperature,
            protocol,
            registry,
            transcript,
            max_turns,
            on_step,
        } = self;
        Engine {
            model_client,
            model,
            temperature,
            protocol,
            registry,
            transcript,
            max_turns,
            on_step,
        }
    }
}
