use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Content shown by the assistant placeholder until tokens start arriving.
pub const PLACEHOLDER_TEXT: &str = "…";

/// Fixed id of the greeting message seeded into a fresh conversation.
pub const GREETING_ID: &str = "sys-hello";

pub const GREETING_TEXT: &str =
    "Hi! I am a demo chatbot. Ask me about time, weather (mock), or an FAQ like \"what is RAG?\"";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A citation attached to an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A single turn in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub error: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: now_millis(),
            sources: Vec::new(),
            error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Provisional assistant message, patched in place as the reply streams in.
    pub fn placeholder() -> Self {
        Self::new(Role::Assistant, PLACEHOLDER_TEXT)
    }

    /// The rendered `Sources:` line, `None` when there are no citations.
    pub fn sources_summary(&self) -> Option<String> {
        if self.sources.is_empty() {
            return None;
        }
        let rendered: Vec<String> = self
            .sources
            .iter()
            .map(|s| match &s.url {
                Some(url) => format!("{} ({})", s.title, url),
                None => s.title.clone(),
            })
            .collect();
        Some(format!("Sources: {}", rendered.join(", ")))
    }

    pub fn greeting() -> Self {
        Self {
            id: GREETING_ID.to_string(),
            role: Role::Assistant,
            content: GREETING_TEXT.to_string(),
            timestamp: now_millis(),
            sources: Vec::new(),
            error: false,
        }
    }
}
