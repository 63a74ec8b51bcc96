use serde::{Deserialize, Serialize};

/// The preset response for an assistant step.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// The reply text. Each entry becomes one choice, the last one being
    /// the reply consumers read.
    pub choices: Vec<String>,
    /// If set, the request will fail in the first `failures` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with a single choice.
    #[inline]
    pub fn with_text<S: Into<String>>(text: S) -> Self {
        Self {
            choices: vec![text.into()],
            failures: None,
        }
    }

    /// Creates a `PresetResponse` with several choices.
    #[inline]
    pub fn with_choices<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
            failures: None,
        }
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}
