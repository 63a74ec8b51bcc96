//! Conversation-related types.

use parley_model::{ModelMessage, Role};
use serde::{Deserialize, Serialize};

/// The ordered record of every turn in a conversation.
///
/// Turns are only ever appended. Synthetic turns produced by the engine, such
/// as tool results, are recorded like any other.
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    items: Vec<ModelMessage>,
}

impl Transcript {
    #[inline]
    pub(crate) fn push<S: Into<String>>(&mut self, role: Role, content: S) {
        self.items.push(ModelMessage::new(role, content));
    }

    /// Returns all turns, oldest first.
    #[inline]
    pub fn items(&self) -> &[ModelMessage] {
        &self.items
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the most recent turn.
    #[inline]
    pub fn last(&self) -> Option<&ModelMessage> {
        self.items.last()
    }
}

impl From<Vec<ModelMessage>> for Transcript {
    /// Restores a transcript, for example one loaded from disk.
    #[inline]
    fn from(items: Vec<ModelMessage>) -> Self {
        Self { items }
    }
}
