//! Incremental parser for Anthropic's Messages API event stream.
//!
//! Bytes go in as they arrive off the wire; provider-neutral
//! [`StreamEvent`]s come out. The parser keeps the little state the mapping
//! needs: token usage (split across `message_start` and `message_delta`),
//! the stop reason (sent before `message_stop`), and content blocks we do
//! not surface, such as extended thinking.

use linksort_core::error::ProviderError;
use linksort_core::message::Role;
use linksort_core::provider::{ContentBlockStart, ContentDelta, StopReason, StreamEvent, Usage};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{trace, warn};

#[derive(Debug, Default)]
pub struct AnthropicStreamParser {
    buffer: Vec<u8>,
    usage: Usage,
    stop_reason: Option<StopReason>,
    ignored_blocks: HashSet<u32>,
    finished: bool,
}

impl AnthropicStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once `message_stop` has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed raw bytes. Returns every event completed by them, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<StreamEvent>, ProviderError> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            // Event names duplicate the payload's `type`, so only data lines matter.
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() || self.finished {
                continue;
            }

            let event: SseEvent = serde_json::from_str(data).map_err(|e| {
                ProviderError::InvalidEvent(format!("unparseable Anthropic event: {e}"))
            })?;
            if let Some(mapped) = self.map(event)? {
                events.push(mapped);
            }
        }
        Ok(events)
    }

    fn map(&mut self, event: SseEvent) -> Result<Option<StreamEvent>, ProviderError> {
        let mapped = match event {
            SseEvent::MessageStart { message } => {
                if let Some(usage) = message.usage {
                    self.usage.input_tokens = usage.input_tokens;
                    self.usage.output_tokens = usage.output_tokens;
                }
                let role = match message.role.as_str() {
                    "user" => Role::User,
                    _ => Role::Assistant,
                };
                Some(StreamEvent::MessageStart { role })
            }
            SseEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                SseBlock::Text => Some(StreamEvent::ContentBlockStart {
                    block: ContentBlockStart::Text,
                }),
                SseBlock::ToolUse { id, name } => Some(StreamEvent::ContentBlockStart {
                    block: ContentBlockStart::ToolUse { id, name },
                }),
                SseBlock::Other => {
                    trace!(index, "Skipping unsupported content block");
                    self.ignored_blocks.insert(index);
                    None
                }
            },
            SseEvent::ContentBlockDelta { index, delta } => {
                if self.ignored_blocks.contains(&index) {
                    return Ok(None);
                }
                match delta {
                    SseDelta::TextDelta { text } => Some(StreamEvent::ContentBlockDelta {
                        delta: ContentDelta::Text(text),
                    }),
                    SseDelta::InputJsonDelta { partial_json } => {
                        Some(StreamEvent::ContentBlockDelta {
                            delta: ContentDelta::ToolInput(partial_json),
                        })
                    }
                    SseDelta::Other => None,
                }
            }
            SseEvent::ContentBlockStop { index } => {
                if self.ignored_blocks.contains(&index) {
                    None
                } else {
                    Some(StreamEvent::ContentBlockStop)
                }
            }
            SseEvent::MessageDelta { delta, usage } => {
                if let Some(raw) = delta.stop_reason {
                    self.stop_reason = Some(map_stop_reason(&raw));
                }
                if let Some(usage) = usage {
                    // Counts in message_delta are cumulative.
                    if usage.input_tokens > 0 {
                        self.usage.input_tokens = usage.input_tokens;
                    }
                    self.usage.output_tokens = usage.output_tokens;
                }
                None
            }
            SseEvent::MessageStop => {
                self.finished = true;
                let stop_reason = self.stop_reason.take().unwrap_or_else(|| {
                    warn!("message_stop without a stop reason, assuming end_turn");
                    StopReason::EndTurn
                });
                Some(StreamEvent::MessageStop {
                    stop_reason,
                    usage: Some(self.usage),
                })
            }
            SseEvent::Ping | SseEvent::Unknown => None,
            SseEvent::Error { error } => {
                return Err(match error.kind.as_str() {
                    "rate_limit_error" => ProviderError::RateLimited {
                        retry_after_secs: 5,
                    },
                    "authentication_error" | "permission_error" => {
                        ProviderError::AuthenticationFailed(error.message)
                    }
                    _ => ProviderError::StreamInterrupted(format!(
                        "{}: {}",
                        error.kind, error.message
                    )),
                });
            }
        };
        Ok(mapped)
    }
}

/// Map Anthropic's stop reasons onto ours. `refusal` is Anthropic's name
/// for a content-filter stop.
fn map_stop_reason(raw: &str) -> StopReason {
    match raw {
        "refusal" => StopReason::ContentFiltered,
        other => StopReason::parse(other),
    }
}

// --- Anthropic SSE payloads ---

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseEvent {
    MessageStart {
        message: SseMessage,
    },
    ContentBlockStart {
        index: u32,
        content_block: SseBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: SseDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: SseMessageDelta,
        #[serde(default)]
        usage: Option<SseUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: SseError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct SseMessage {
    role: String,
    #[serde(default)]
    usage: Option<SseUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseBlock {
    Text,
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SseDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SseMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SseUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct SseError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}
