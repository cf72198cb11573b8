use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::message::{Message, Source};

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

/// Backend reply: the full answer plus any citation sources.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub content: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Client for the chat backend. The backend is an opaque collaborator; the
/// whole wire contract is one JSON POST/response pair.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Posts the transcript and returns the parsed reply. Non-2xx statuses
    /// and transport failures surface as a single undifferentiated error.
    pub async fn send(&self, messages: &[Message]) -> Result<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { messages })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "chat request failed with status: {}",
                response.status()
            ));
        }

        Ok(response.json().await?)
    }

    /// Like [`send`](Self::send), but reveals the reply one character at a
    /// time through `on_token` with a fixed delay per character. There is no
    /// real streaming protocol; the body has already fully arrived.
    pub async fn send_streaming<F>(
        &self,
        messages: &[Message],
        delay: Duration,
        mut on_token: F,
    ) -> Result<ChatReply>
    where
        F: FnMut(char),
    {
        let reply = self.send(messages).await?;

        for ch in reply.content.chars() {
            tokio::time::sleep(delay).await;
            on_token(ch);
        }

        Ok(reply)
    }
}
