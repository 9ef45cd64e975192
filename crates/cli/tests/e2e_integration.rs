//! End-to-end tests for the Linksort assistant.
//!
//! These tests exercise the full pipeline a `linksort chat` turn runs:
//! raw Anthropic SSE bytes → stream parser → agent loop → tools → store.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use linksort_agent::{AgentLoop, AgentStreamEvent, DEFAULT_SYSTEM_PROMPT, live_channel, system_prompt};
use linksort_core::domain::{Folder, LinkController, User};
use linksort_core::error::{Error, ProviderError};
use linksort_core::event::EventBus;
use linksort_core::message::{Conversation, Message, Role, ToolStatus};
use linksort_core::provider::{EventStream, Provider, ProviderRequest, StopReason};
use linksort_core::store::ConversationStore;
use linksort_providers::AnthropicStreamParser;
use linksort_store::{InMemoryStore, NewLink};
use linksort_tools::{ToolContext, default_registry};
use tokio_util::sync::CancellationToken;

// ── Wire-level mock provider ─────────────────────────────────────────────

/// Replays recorded SSE bodies, feeding them to the parser in small
/// slices the way they arrive off a socket.
struct SseReplayProvider {
    bodies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SseReplayProvider {
    fn new(bodies: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            bodies: Mutex::new(bodies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SseReplayProvider {
    fn name(&self) -> &str {
        "sse_replay"
    }

    async fn stream(
        &self,
        request: ProviderRequest,
        _cancel: CancellationToken,
    ) -> Result<EventStream, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let body = self
            .bodies
            .lock()
            .unwrap()
            .pop_front()
            .expect("SseReplayProvider exhausted");

        let mut parser = AnthropicStreamParser::new();
        let mut events = Vec::new();
        for slice in body.as_bytes().chunks(5) {
            match parser.feed(slice) {
                Ok(batch) => events.extend(batch.into_iter().map(Ok)),
                Err(e) => {
                    events.push(Err(e));
                    break;
                }
            }
        }
        Ok(EventStream::from_events(events))
    }
}

// ── SSE body builders ────────────────────────────────────────────────────

fn sse(data: serde_json::Value) -> String {
    let kind = data["type"].as_str().unwrap().to_string();
    format!("event: {kind}\ndata: {data}\n\n")
}

fn message_start(input_tokens: u32) -> String {
    sse(serde_json::json!({
        "type": "message_start",
        "message": {
            "id": "msg_e2e", "type": "message", "role": "assistant", "content": [],
            "model": "claude-sonnet-4-20250514", "stop_reason": null,
            "usage": { "input_tokens": input_tokens, "output_tokens": 1 }
        }
    }))
}

fn text_block(index: u32, text: &str) -> String {
    let mut out = sse(serde_json::json!({
        "type": "content_block_start", "index": index,
        "content_block": { "type": "text", "text": "" }
    }));
    out += &sse(serde_json::json!({
        "type": "content_block_delta", "index": index,
        "delta": { "type": "text_delta", "text": text }
    }));
    out += &sse(serde_json::json!({ "type": "content_block_stop", "index": index }));
    out
}

/// A tool_use block whose input JSON arrives split in two deltas.
fn tool_block(index: u32, id: &str, name: &str, input: serde_json::Value) -> String {
    let json = input.to_string();
    let (head, tail) = json.split_at(json.len() / 2);
    let mut out = sse(serde_json::json!({
        "type": "content_block_start", "index": index,
        "content_block": { "type": "tool_use", "id": id, "name": name, "input": {} }
    }));
    for part in [head, tail] {
        out += &sse(serde_json::json!({
            "type": "content_block_delta", "index": index,
            "delta": { "type": "input_json_delta", "partial_json": part }
        }));
    }
    out += &sse(serde_json::json!({ "type": "content_block_stop", "index": index }));
    out
}

fn message_end(stop_reason: &str, output_tokens: u32) -> String {
    let mut out = sse(serde_json::json!({
        "type": "message_delta",
        "delta": { "stop_reason": stop_reason, "stop_sequence": null },
        "usage": { "output_tokens": output_tokens }
    }));
    out += &sse(serde_json::json!({ "type": "message_stop" }));
    out
}

// ── Library fixture ──────────────────────────────────────────────────────

struct Library {
    store: Arc<InMemoryStore>,
    ctx: ToolContext,
    book_id: String,
}

async fn library() -> Library {
    let store = Arc::new(InMemoryStore::new());
    let mut user = User::new("u1", "reader@example.com");
    user.folder_tree.children.push(Folder {
        id: "f1".into(),
        name: "Reading".into(),
        children: vec![],
    });
    store.put_user(user.clone()).await;

    let book = store
        .save_link(
            &user,
            NewLink {
                url: "https://doc.rust-lang.org/book".into(),
                title: "The Rust Programming Language".into(),
                description: "The book".into(),
                site_name: "rust-lang.org".into(),
                is_favorite: false,
            },
        )
        .await;

    let ctx = ToolContext::new(user, store.clone(), store.clone());
    Library {
        store,
        ctx,
        book_id: book.id,
    }
}

fn agent(provider: Arc<SseReplayProvider>, lib: &Library) -> AgentLoop {
    AgentLoop::new(
        provider,
        "claude-sonnet-4-20250514",
        Arc::new(default_registry(lib.ctx.clone())),
        Arc::new(EventBus::default()),
    )
    .with_store(lib.store.clone())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_files_a_link_over_three_rounds() {
    let lib = library().await;

    let round1 = message_start(120)
        + &text_block(0, "Let me look through your links.")
        + &tool_block(1, "toolu_1", "get_links", serde_json::json!({ "search": "rust" }))
        + &tool_block(2, "toolu_2", "create_folder", serde_json::json!({ "name": "Archive" }))
        + &message_end("tool_use", 40);
    let round2 = message_start(300)
        + &tool_block(
            0,
            "toolu_3",
            "add_link_to_folder",
            serde_json::json!({ "link_id": lib.book_id, "folder_id": "f1" }),
        )
        + &message_end("tool_use", 20);
    let round3 = message_start(400)
        + &text_block(0, "I filed the Rust book under Reading and made an Archive folder.")
        + &message_end("end_turn", 18);

    let provider = SseReplayProvider::new(vec![round1, round2, round3]);
    let mut agent = agent(provider.clone(), &lib);
    agent.set_system_prompt(system_prompt(DEFAULT_SYSTEM_PROMPT, &lib.ctx.user().await));

    let mut conv = Conversation::new();
    conv.push(Message::user("Put the Rust book somewhere sensible."));

    let (live, mut rx) = live_channel(64, Duration::from_millis(500));
    let summary = agent
        .run(&mut conv, live, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.rounds, 3);
    assert_eq!(summary.tool_calls_made, 3);
    assert_eq!(summary.stop_reason, StopReason::EndTurn);
    assert_eq!(summary.usage.input_tokens, 820);
    assert_eq!(summary.usage.output_tokens, 78);

    // user, tools, results, tools, results, answer
    assert_eq!(conv.len(), 6);
    let results = conv.messages[2].tool_uses();
    assert_eq!(conv.messages[2].role, Role::User);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "toolu_1");
    assert!(results[0].text().unwrap().contains("The Rust Programming Language"));
    assert_eq!(results[1].id, "toolu_2");
    assert!(results[1].text().unwrap().starts_with("Created folder \"Archive\""));
    assert_eq!(conv.messages[4].tool_uses()[0].status(), Some(ToolStatus::Success));
    assert_eq!(
        conv.last_assistant_text(),
        Some("I filed the Rust book under Reading and made an Archive folder.")
    );

    // The library changed.
    let user = lib.ctx.user().await;
    let book = lib.store.get_link(&user, &lib.book_id).await.unwrap();
    assert_eq!(book.folder_id, "f1");
    assert!(user.folder_tree.children.iter().any(|f| f.name == "Archive"));

    // Every round was persisted.
    let stored = lib.store.load(&conv.id).await.unwrap();
    assert_eq!(stored.len(), 6);

    // The model saw the folder tree and the tool results.
    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].system_prompt.contains("Reading (id: f1)"));
    assert_eq!(requests[0].tools.len(), 7);
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[2].messages.len(), 5);

    // Live consumer saw both text blocks and the tool progress.
    let mut text = String::new();
    let mut tool_calls = Vec::new();
    while let Some(event) = rx.recv().await {
        match event {
            AgentStreamEvent::Chunk { content } => text.push_str(&content),
            AgentStreamEvent::ToolCall { name, .. } => tool_calls.push(name),
            _ => {}
        }
    }
    assert!(text.starts_with("Let me look through your links."));
    assert!(text.ends_with("made an Archive folder."));
    assert_eq!(tool_calls, vec!["get_links", "create_folder", "add_link_to_folder"]);
}

#[tokio::test]
async fn e2e_tool_failure_is_reported_to_the_model() {
    let lib = library().await;

    let round1 = message_start(50)
        + &tool_block(0, "toolu_1", "delete_folder", serde_json::json!({ "folder_id": "missing" }))
        + &message_end("tool_use", 10);
    let round2 = message_start(80)
        + &text_block(0, "That folder does not exist.")
        + &message_end("end_turn", 8);

    let provider = SseReplayProvider::new(vec![round1, round2]);
    let agent = agent(provider.clone(), &lib);

    let mut conv = Conversation::new();
    conv.push(Message::user("Delete my Old folder."));
    let summary = agent
        .run(&mut conv, linksort_agent::LiveText::disabled(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.rounds, 2);
    let result = &conv.messages[2].tool_uses()[0];
    assert_eq!(result.status(), Some(ToolStatus::Error));
    assert_eq!(result.text(), Some("folder not found"));
}

#[tokio::test]
async fn e2e_stream_error_event_aborts_the_turn() {
    let lib = library().await;

    let body = message_start(50)
        + &sse(serde_json::json!({
            "type": "error",
            "error": { "type": "rate_limit_error", "message": "slow down" }
        }));
    let provider = SseReplayProvider::new(vec![body]);
    let agent = agent(provider, &lib);

    let mut conv = Conversation::new();
    conv.push(Message::user("hello"));
    let err = agent
        .run(&mut conv, linksort_agent::LiveText::disabled(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Provider(ProviderError::RateLimited { .. })
    ));
    assert_eq!(conv.len(), 1);
    assert!(lib.store.load(&conv.id).await.unwrap().is_empty());
}
