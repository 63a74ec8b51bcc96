use std::sync::Arc;

use parley_core::conversation::Transcript;
use parley_core::tool::Registry;
use parley_core::{
    Engine, EngineBuilder, Error, ProtocolKind, StructuredMessage,
};
use parley_model::{ModelMessage, ModelProvider};

use crate::tools::*;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    engine_builder: EngineBuilder,
    search_base_url: String,
    wikipedia_api_url: String,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        let engine_builder = EngineBuilder::with_model_provider(provider);
        Self {
            engine_builder,
            search_base_url: everything::DEFAULT_BASE_URL.to_owned(),
            wikipedia_api_url: DEFAULT_WIKIPEDIA_API_URL.to_owned(),
        }
    }

    /// Sets the model identifier.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.engine_builder = self.engine_builder.with_model(model);
        self
    }

    /// Selects the wire protocol spoken with the model.
    #[inline]
    pub fn with_protocol(mut self, kind: ProtocolKind) -> Self {
        self.engine_builder = self.engine_builder.with_protocol(kind);
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.engine_builder = self.engine_builder.with_temperature(temperature);
        self
    }

    /// Bounds the number of model requests per message.
    #[inline]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.engine_builder = self.engine_builder.with_max_turns(max_turns);
        self
    }

    /// Sets the address of the local file search service.
    #[inline]
    pub fn with_search_base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.search_base_url = url.into();
        self
    }

    /// Sets the MediaWiki API endpoint used by the Wikipedia tools.
    #[inline]
    pub fn with_wikipedia_api_url<S: Into<String>>(mut self, url: S) -> Self {
        self.wikipedia_api_url = url.into();
        self
    }

    /// Attaches a callback to be invoked with every message of the model,
    /// before the tool it requests runs.
    #[inline]
    pub fn on_step(
        mut self,
        on_step: impl Fn(&StructuredMessage) + Send + Sync + 'static,
    ) -> Self {
        self.engine_builder = self.engine_builder.on_step(on_step);
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let registry =
            builtin_registry(self.search_base_url, self.wikipedia_api_url);
        let engine = self
            .engine_builder
            .with_registry(Arc::new(registry))
            .build();

        Session { engine }
    }
}

/// Returns a registry holding every built-in tool.
pub fn builtin_registry(
    search_base_url: String,
    wikipedia_api_url: String,
) -> Registry {
    Registry::new()
        .with_tool(CurrentDateTool::new())
        .with_tool(OsUsernameTool::new())
        .with_tool(FetchWebpageTool::new())
        .with_tool(DownloadFileTool::new())
        .with_tool(DownloadFilesBulkTool::new())
        .with_tool(WikipediaSearchTool::new(wikipedia_api_url.clone()))
        .with_tool(WikipediaSummaryTool::new(wikipedia_api_url))
        .with_tool(ListFilesTool::new())
        .with_tool(ReadFileTool::new())
        .with_tool(ReadFilesBulkTool::new())
        .with_tool(WriteFileTool::new())
        .with_tool(CreateFileTool::new())
        .with_tool(CreateFilesBulkTool::new())
        .with_tool(DeleteFileTool::new())
        .with_tool(DeleteFilesBulkTool::new())
        .with_tool(CreateFolderTool::new())
        .with_tool(CreateFoldersBulkTool::new())
        .with_tool(CheckFileExistenceTool::new())
        .with_tool(ExecuteShellTool::new())
        .with_tool(ExecuteShellBulkTool::new())
        .with_tool(SearchFilesTool::new(search_base_url))
}

/// A chat session, like a window that displays messages and has a input box.
///
/// The session holds an engine with every built-in tool, and it is basically
/// a wrapper around [`Engine`].
pub struct Session {
    engine: Engine,
}

impl Session {
    /// Sends a message to the session and waits for the final answer.
    #[inline]
    pub async fn send_message(
        &mut self,
        message: &str,
    ) -> Result<StructuredMessage, Error> {
        self.engine.chat(message).await
    }

    /// Returns the system prompt the model currently sees.
    #[inline]
    pub fn system_prompt(&self) -> String {
        self.engine.system_prompt()
    }

    /// Returns everything said so far.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        self.engine.transcript()
    }

    /// Renders the system prompt followed by the transcript, as a pretty
    /// JSON array of `{role, content}` objects.
    pub fn history_json(&self) -> String {
        let mut history = Vec::with_capacity(self.transcript().len() + 1);
        history.push(ModelMessage::System(self.system_prompt()));
        history.extend_from_slice(self.transcript().items());
        serde_json::to_string_pretty(&history).unwrap_or_default()
    }
}
