use parley_model::{ErrorKind, ModelProviderError};

/// The error returned by [`Engine::chat`](crate::Engine::chat).
///
/// Malformed replies and failed tool calls are not errors at this level,
/// the engine turns them into corrective turns and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model backend failed. Not retried.
    #[error("model backend failed: {0}")]
    Backend(Box<dyn ModelProviderError>),
    /// The backend answered without any choice.
    #[error("model reply has no choices")]
    EmptyReply,
    /// The reply parsed but lacks `thoughts`, or has neither a tool nor a
    /// response.
    #[error("invalid response: {reply}")]
    InvalidResponse {
        /// The raw reply text.
        reply: String,
    },
    /// The turn limit was reached before the model gave a final response.
    #[error("no final response after {0} turn(s)")]
    TurnsExhausted(usize),
}

impl Error {
    /// Returns the backend error kind, if the backend failed.
    #[inline]
    pub fn backend_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Backend(err) => Some(err.kind()),
            _ => None,
        }
    }
}

impl From<Box<dyn ModelProviderError>> for Error {
    #[inline]
    fn from(err: Box<dyn ModelProviderError>) -> Self {
        Error::Backend(err)
    }
}
