//! Anthropic Messages API provider.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks
//! - Streaming via SSE, decoded by [`AnthropicStreamParser`]

use async_trait::async_trait;
use futures::StreamExt;
use linksort_core::error::ProviderError;
use linksort_core::message::{Message, MessageContent, Role, ToolStatus, ToolUseKind};
use linksort_core::provider::{EventStream, Provider, ProviderRequest};
use linksort_core::tool::ToolSpec;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::sse::AnthropicStreamParser;

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;
const EVENT_BUFFER: usize = 64;

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider. `timeout` bounds a whole model call,
    /// streaming included.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Anthropic API key is empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert messages to Anthropic API format with content blocks.
    fn to_api_messages(messages: &[Message]) -> Vec<AnthropicMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                let content = match &msg.content {
                    MessageContent::Text(text) => AnthropicContent::Text(text.clone()),
                    MessageContent::ToolUse(uses) => AnthropicContent::Blocks(
                        uses.iter()
                            .map(|u| match &u.kind {
                                ToolUseKind::Request { input } => ContentBlock::ToolUse {
                                    id: u.id.clone(),
                                    name: u.name.clone(),
                                    input: parse_tool_input(input),
                                },
                                ToolUseKind::Response { status, text } => {
                                    ContentBlock::ToolResult {
                                        tool_use_id: u.id.clone(),
                                        content: text.clone(),
                                        is_error: *status == ToolStatus::Error,
                                    }
                                }
                            })
                            .collect(),
                    ),
                };
                AnthropicMessage {
                    role: role.into(),
                    content,
                }
            })
            .collect()
    }

    /// Convert tool specs to Anthropic format.
    fn to_api_tools(tools: &[ToolSpec]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": request.temperature,
            "stream": true,
        });

        if !request.system_prompt.is_empty() {
            body["system"] = serde_json::json!(request.system_prompt);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }
}

/// Tool input as the API expects it: a JSON object. The model streamed it
/// as text; anything unparseable is sent as `{}`.
fn parse_tool_input(raw: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value @ serde_json::Value::Object(_)) => value,
        _ => serde_json::json!({}),
    }
}

fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(
        &self,
        request: ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending streaming request"
        );

        let send = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ProviderError::StreamInterrupted("request cancelled".into()));
            }
            response = send => response.map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?,
        };

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after(&response),
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut parser = AnthropicStreamParser::new();

            while !parser.is_finished() {
                // Returning drops `byte_stream`, which closes the connection.
                let chunk = tokio::select! {
                    _ = task_cancel.cancelled() => {
                        debug!("Anthropic stream released by consumer");
                        return;
                    }
                    chunk = byte_stream.next() => chunk,
                };

                let bytes = match chunk {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                    None => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(
                                "connection closed before message_stop".into(),
                            )))
                            .await;
                        return;
                    }
                };

                match parser.feed(&bytes) {
                    Ok(events) => {
                        for event in events {
                            if tx.send(Ok(event)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                }
            }
        });

        Ok(EventStream::new(rx, cancel))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use linksort_core::message::ToolUse;

    fn request(messages: Vec<Message>, tools: Vec<ToolSpec>) -> ProviderRequest {
        ProviderRequest {
            model: "claude-sonnet-4-20250514".into(),
            system_prompt: "You sort links.".into(),
            messages,
            tools,
            max_tokens: None,
            temperature: 0.2,
        }
    }

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test", Duration::from_secs(30)).unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = AnthropicProvider::new("sk-ant-test", Duration::from_secs(30))
            .unwrap()
            .with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = AnthropicProvider::new("  ", Duration::from_secs(30)).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn body_has_top_level_system_and_streams() {
        let body = AnthropicProvider::build_body(&request(vec![Message::user("Hi")], vec![]));
        assert_eq!(body["system"], "You sort links.");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Hi");
        // No tools registered means no tool configuration at all.
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn tools_are_sent_when_present() {
        let spec = ToolSpec {
            name: "get_links".into(),
            description: "List links".into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        };
        let body = AnthropicProvider::build_body(&request(vec![Message::user("Hi")], vec![spec]));
        assert_eq!(body["tools"][0]["name"], "get_links");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn tool_round_trip_becomes_content_blocks() {
        let messages = vec![
            Message::user("Make a folder"),
            Message::tool_use(
                Role::Assistant,
                vec![
                    ToolUse::request("toolu_1", "create_folder", r#"{"name":"Recipes"}"#),
                    ToolUse::request("toolu_2", "get_links", ""),
                ],
            ),
            Message::tool_use(
                Role::User,
                vec![
                    ToolUse::response("toolu_1", "create_folder", ToolStatus::Success, "ok"),
                    ToolUse::response("toolu_2", "get_links", ToolStatus::Error, "db unavailable"),
                ],
            ),
        ];
        let api = serde_json::to_value(AnthropicProvider::to_api_messages(&messages)).unwrap();

        let requests = &api[1]["content"];
        assert_eq!(api[1]["role"], "assistant");
        assert_eq!(requests[0]["type"], "tool_use");
        assert_eq!(requests[0]["input"]["name"], "Recipes");
        // Blank streamed input is sent as an empty object.
        assert_eq!(requests[1]["input"], serde_json::json!({}));

        let results = &api[2]["content"];
        assert_eq!(api[2]["role"], "user");
        assert_eq!(results[0]["type"], "tool_result");
        assert_eq!(results[0]["tool_use_id"], "toolu_1");
        assert!(results[0].get("is_error").is_none());
        assert_eq!(results[1]["is_error"], true);
        assert_eq!(results[1]["content"], "db unavailable");
    }

    #[test]
    fn malformed_tool_input_falls_back_to_empty_object() {
        assert_eq!(parse_tool_input("{\"a\":"), serde_json::json!({}));
        assert_eq!(parse_tool_input("[1]"), serde_json::json!({}));
        assert_eq!(parse_tool_input("{\"a\":1}")["a"], 1);
    }
}
