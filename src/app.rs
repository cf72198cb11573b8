use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::api::{ChatClient, ChatReply};
use crate::message::Message;
use crate::state::{ChatState, MessagePatch};
use crate::store::StateStore;
use crate::tui::AppEvent;

/// Shown in the placeholder when the request fails for any reason.
pub const FAILURE_TEXT: &str = "Sorry, something went wrong.";

/// Progress of the in-flight chat request, reported over the event channel.
#[derive(Debug)]
pub enum ChatEvent {
    /// Next character of the simulated token reveal.
    Token(String),
    /// Full reply arrived and the reveal finished.
    Done(ChatReply),
    Failed(String),
}

/// Tracks the placeholder being filled in while a request is in flight.
struct PendingChat {
    placeholder_id: String,
    revealed: String,
}

pub struct App {
    pub should_quit: bool,
    pub state: ChatState,

    // Input bar state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Transcript view state
    pub transcript_scroll: u16,
    pub transcript_height: u16, // inner height, updated during render
    pub transcript_width: u16,  // inner width, for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pending: Option<PendingChat>,
    store: StateStore,
    client: ChatClient,
    typing_delay: Duration,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        state: ChatState,
        store: StateStore,
        client: ChatClient,
        typing_delay: Duration,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            state,
            input: String::new(),
            cursor: 0,
            transcript_scroll: 0,
            transcript_height: 0,
            transcript_width: 0,
            animation_frame: 0,
            pending: None,
            store,
            client,
            typing_delay,
            events,
        }
    }

    /// Sends the current input: appends the user message and an assistant
    /// placeholder, then spawns the request task. A blank input or an
    /// already in-flight request makes this a no-op.
    pub fn submit(&mut self) {
        if self.state.is_loading || self.pending.is_some() || self.input.trim().is_empty() {
            return;
        }

        let content = std::mem::take(&mut self.input);
        self.cursor = 0;

        self.state.push(Message::user(content));
        // Snapshot before the placeholder goes in; the placeholder is never
        // part of the request body.
        let transcript = self.state.messages.clone();

        let placeholder = Message::placeholder();
        self.pending = Some(PendingChat {
            placeholder_id: placeholder.id.clone(),
            revealed: String::new(),
        });
        self.state.push(placeholder);
        self.state.set_loading(true);

        self.scroll_to_bottom();
        self.persist();

        tracing::debug!(messages = transcript.len(), "sending chat request");

        let client = self.client.clone();
        let delay = self.typing_delay;
        let tx = self.events.clone();
        let token_tx = tx.clone();
        tokio::spawn(async move {
            let result = client
                .send_streaming(&transcript, delay, move |ch| {
                    let _ = token_tx.send(AppEvent::Chat(ChatEvent::Token(ch.to_string())));
                })
                .await;

            let event = match result {
                Ok(reply) => ChatEvent::Done(reply),
                Err(err) => ChatEvent::Failed(err.to_string()),
            };
            let _ = tx.send(AppEvent::Chat(event));
        });
    }

    /// Applies progress from the request task to the placeholder. Events
    /// arriving after a reset (no pending placeholder) are dropped.
    pub fn apply_chat_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Token(token) => {
                let Some(pending) = self.pending.as_mut() else {
                    return;
                };
                pending.revealed.push_str(&token);
                let id = pending.placeholder_id.clone();
                let revealed = pending.revealed.clone();
                self.state.patch(
                    &id,
                    MessagePatch {
                        content: Some(revealed),
                        ..Default::default()
                    },
                );
            }
            ChatEvent::Done(reply) => {
                let Some(pending) = self.pending.take() else {
                    return;
                };
                tracing::debug!(
                    chars = reply.content.chars().count(),
                    sources = reply.sources.len(),
                    "chat reply complete"
                );
                self.state.patch(
                    &pending.placeholder_id,
                    MessagePatch {
                        content: Some(reply.content),
                        sources: Some(reply.sources),
                        error: None,
                    },
                );
                self.state.set_loading(false);
            }
            ChatEvent::Failed(err) => {
                let Some(pending) = self.pending.take() else {
                    return;
                };
                tracing::warn!(error = %err, "chat request failed");
                self.state.patch(
                    &pending.placeholder_id,
                    MessagePatch {
                        content: Some(FAILURE_TEXT.to_string()),
                        sources: None,
                        error: Some(true),
                    },
                );
                self.state.set_loading(false);
            }
        }

        self.scroll_to_bottom();
        self.persist();
    }

    /// Drops the conversation and starts fresh. An in-flight request keeps
    /// running but its events no longer match a placeholder and are ignored.
    pub fn reset(&mut self) {
        tracing::info!("resetting conversation");
        self.pending = None;
        self.state.reset();
        self.transcript_scroll = 0;
        self.persist();
    }

    pub fn pending_placeholder_id(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.placeholder_id.as_str())
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.state.is_loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.transcript_scroll = self.transcript_scroll.saturating_add(1);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.transcript_height / 2;
        self.transcript_scroll = self.transcript_scroll.saturating_sub(half_page);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.transcript_height / 2;
        self.transcript_scroll = self.transcript_scroll.saturating_add(half_page);
    }

    /// Scroll the transcript so the newest message is visible.
    pub fn scroll_to_bottom(&mut self) {
        // Use actual transcript width for wrap calculation, default to 50 if not set
        let wrap_width = if self.transcript_width > 0 {
            self.transcript_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.state.messages {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            if let Some(summary) = msg.sources_summary() {
                // The sources line wraps like any other line
                let char_count = summary.chars().count();
                total_lines += ((char_count / wrap_width) + 1) as u16;
            }
            total_lines += 1; // Blank line after message
        }

        let visible_height = if self.transcript_height > 0 {
            self.transcript_height
        } else {
            20
        };

        self.transcript_scroll = total_lines.saturating_sub(visible_height);
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.state) {
            tracing::warn!(error = %err, "failed to persist chat state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Role, Source, PLACEHOLDER_TEXT};
    use tokio::sync::mpsc;

    fn test_app(dir: &tempfile::TempDir) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        // Port 9 is discard; nothing answers there, which is fine since these
        // tests drive apply_chat_event directly.
        App::new(
            ChatState::initial(),
            StateStore::at(dir.path().join("chat-state.json")),
            ChatClient::new("http://127.0.0.1:9"),
            Duration::from_millis(0),
            tx,
        )
    }

    #[tokio::test]
    async fn submit_appends_user_then_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input = "what is RAG?".to_string();

        app.submit();

        let messages = &app.state.messages;
        assert_eq!(messages.len(), 3); // greeting + user + placeholder
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "what is RAG?");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, PLACEHOLDER_TEXT);
        assert!(app.state.is_loading);
        assert!(app.input.is_empty());
        assert_eq!(
            app.pending_placeholder_id(),
            Some(messages[2].id.as_str())
        );
    }

    #[tokio::test]
    async fn blank_submit_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input = "   ".to_string();

        app.submit();

        assert_eq!(app.state.messages.len(), 1);
        assert!(!app.state.is_loading);
    }

    #[tokio::test]
    async fn submit_while_loading_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input = "first".to_string();
        app.submit();

        app.input = "second".to_string();
        app.submit();

        assert_eq!(app.state.messages.len(), 3);
        assert_eq!(app.input, "second");
    }

    #[tokio::test]
    async fn tokens_accumulate_into_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input = "hi".to_string();
        app.submit();
        let id = app.pending_placeholder_id().unwrap().to_string();

        app.apply_chat_event(ChatEvent::Token("h".to_string()));
        app.apply_chat_event(ChatEvent::Token("e".to_string()));
        assert_eq!(app.state.get(&id).unwrap().content, "he");

        app.apply_chat_event(ChatEvent::Done(ChatReply {
            content: "hello".to_string(),
            sources: vec![Source {
                title: "FAQ".to_string(),
                url: None,
            }],
        }));

        let msg = app.state.get(&id).unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.sources.len(), 1);
        assert!(!msg.error);
        assert!(!app.state.is_loading);
        assert!(app.pending_placeholder_id().is_none());
    }

    #[tokio::test]
    async fn failure_sets_fixed_text_and_error_flag() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input = "hi".to_string();
        app.submit();
        let id = app.pending_placeholder_id().unwrap().to_string();

        app.apply_chat_event(ChatEvent::Failed("connection refused".to_string()));

        let msg = app.state.get(&id).unwrap();
        assert_eq!(msg.content, FAILURE_TEXT);
        assert!(msg.error);
        assert!(!app.state.is_loading);
    }

    #[tokio::test]
    async fn events_after_reset_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input = "hi".to_string();
        app.submit();

        app.reset();
        app.apply_chat_event(ChatEvent::Token("x".to_string()));
        app.apply_chat_event(ChatEvent::Done(ChatReply {
            content: "late".to_string(),
            sources: Vec::new(),
        }));

        assert_eq!(app.state.messages.len(), 1);
        assert!(!app.state.is_loading);
    }

    #[test]
    fn bottom_snap_counts_wrapped_sources_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.transcript_width = 10;
        app.transcript_height = 1;

        let mut msg = Message::new(crate::message::Role::Assistant, "hi");
        let id = msg.id.clone();
        app.state.push(msg.clone());
        app.scroll_to_bottom();
        let without_sources = app.transcript_scroll;

        msg.sources = vec![Source {
            // Summary is "Sources: " + 26 chars = 35 chars, 4 rows at width 10
            title: "abcdefghijklmnopqrstuvwxyz".to_string(),
            url: None,
        }];
        assert_eq!(msg.sources_summary().unwrap().chars().count(), 35);
        app.state.patch(
            &id,
            MessagePatch {
                sources: Some(msg.sources),
                ..Default::default()
            },
        );
        app.scroll_to_bottom();

        assert_eq!(app.transcript_scroll - without_sources, 4);
    }

    #[tokio::test]
    async fn submit_persists_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = test_app(&dir);
        app.input = "remember me".to_string();
        app.submit();

        let restored = StateStore::at(dir.path().join("chat-state.json")).load();
        assert_eq!(restored.messages.len(), 3);
        assert_eq!(restored.messages[1].content, "remember me");
        assert!(!restored.is_loading);
    }
}
