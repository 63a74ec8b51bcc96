use serde::{Deserialize, Serialize};

/// A completed reply from the model provider.
///
/// Chat-completion backends may return several alternatives; they are kept
/// in the order the backend listed them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelReply {
    /// Alternatives produced by the model.
    pub choices: Vec<ModelChoice>,
}

/// One alternative of a [`ModelReply`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelChoice {
    /// The assistant text.
    pub content: String,
}

impl ModelReply {
    /// Creates a reply with a single choice.
    #[inline]
    pub fn with_content<S: Into<String>>(content: S) -> Self {
        Self {
            choices: vec![ModelChoice {
                content: content.into(),
            }],
        }
    }

    /// Returns the content of the last choice, which is the one consumers
    /// should treat as the reply.
    #[inline]
    pub fn last_content(&self) -> Option<&str> {
        self.choices.last().map(|choice| choice.content.as_str())
    }
}
