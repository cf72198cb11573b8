use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;

use chaterm::api::ChatClient;
use chaterm::app::{App, FAILURE_TEXT};
use chaterm::message::PLACEHOLDER_TEXT;
use chaterm::state::ChatState;
use chaterm::store::StateStore;
use chaterm::tui::AppEvent;

fn app_for(dir: &tempfile::TempDir, base_url: &str) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = App::new(
        ChatState::initial(),
        StateStore::at(dir.path().join("chat-state.json")),
        ChatClient::new(base_url),
        Duration::ZERO,
        tx,
    );
    (app, rx)
}

/// Pump chat events back into the app until the request settles, the way the
/// main loop does.
async fn pump_until_settled(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>) {
    while app.pending_placeholder_id().is_some() {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("chat task stalled")
            .expect("event channel closed");
        if let AppEvent::Chat(chat_event) = event {
            app.apply_chat_event(chat_event);
        }
    }
}

#[tokio::test]
async fn request_body_excludes_placeholder() {
    let server = MockServer::start_async().await;
    let ok_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_contains("what is RAG?");
            then.status(200).json_body(json!({
                "content": "RAG combines retrieval with generation.",
                "sources": [{ "title": "What is RAG?" }]
            }));
        })
        .await;
    // Defined after ok_mock so it takes precedence if the body ever carries
    // the provisional assistant entry
    let placeholder_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .body_contains(PLACEHOLDER_TEXT);
            then.status(500);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (mut app, mut rx) = app_for(&dir, &server.base_url());

    app.input = "what is RAG?".to_string();
    app.submit();
    let placeholder_id = app.pending_placeholder_id().unwrap().to_string();
    pump_until_settled(&mut app, &mut rx).await;

    placeholder_mock.assert_hits_async(0).await;
    ok_mock.assert_async().await;

    let reply = app.state.get(&placeholder_id).unwrap();
    assert_eq!(reply.content, "RAG combines retrieval with generation.");
    assert_eq!(reply.sources.len(), 1);
    assert!(!reply.error);
    assert!(!app.state.is_loading);
}

#[tokio::test]
async fn backend_failure_lands_in_placeholder() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(500);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (mut app, mut rx) = app_for(&dir, &server.base_url());

    app.input = "hello".to_string();
    app.submit();
    let placeholder_id = app.pending_placeholder_id().unwrap().to_string();
    pump_until_settled(&mut app, &mut rx).await;

    let reply = app.state.get(&placeholder_id).unwrap();
    assert_eq!(reply.content, FAILURE_TEXT);
    assert!(reply.error);
    assert!(!app.state.is_loading);
}
