use serde::{Deserialize, Serialize};

use crate::message::{Message, Source};

/// Partial update applied to a message by id. `None` fields are left as-is.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub sources: Option<Vec<Source>>,
    pub error: Option<bool>,
}

/// The whole conversation: an ordered transcript plus a loading flag.
///
/// Invariants: message ids are unique and insertion order is display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatState {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub is_loading: bool,
}

impl ChatState {
    /// A fresh conversation seeded with the assistant greeting.
    pub fn initial() -> Self {
        Self {
            messages: vec![Message::greeting()],
            is_loading: false,
        }
    }

    /// Appends a message. A duplicate id is rejected to keep patch-by-id
    /// unambiguous; returns whether the message was added.
    pub fn push(&mut self, message: Message) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            tracing::warn!(id = %message.id, "dropping message with duplicate id");
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Applies a partial update to the message with the given id. An unknown
    /// id is a no-op; returns whether a message was patched.
    pub fn patch(&mut self, id: &str, patch: MessagePatch) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            return false;
        };
        if let Some(content) = patch.content {
            message.content = content;
        }
        if let Some(sources) = patch.sources {
            message.sources = sources;
        }
        if let Some(error) = patch.error {
            message.error = error;
        }
        true
    }

    pub fn set_loading(&mut self, value: bool) {
        self.is_loading = value;
    }

    pub fn reset(&mut self) {
        *self = Self::initial();
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::initial()
    }
}
