//! Provider trait: the boundary to streaming LLM backends.
//!
//! A Provider sends the system prompt, the conversation and the tool specs
//! to a model and hands back an [`EventStream`] of low-level streaming
//! events. The agent loop never sees vendor request or response shapes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderError;
use crate::message::{Message, Role};
use crate::tool::ToolSpec;

/// Everything a provider needs for one model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    pub system_prompt: String,

    /// Full conversation history, oldest first
    pub messages: Vec<Message>,

    /// Tools the model may call. Empty means no tool configuration is sent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSpec>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

/// Why a model round ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StopReason {
    EndTurn,
    /// The only non-terminal reason: the model wants tool results.
    ToolUse,
    MaxTokens,
    StopSequence,
    GuardrailIntervened,
    ContentFiltered,
    /// Anything else the provider sends. Treated as terminal.
    Unknown(String),
}

impl StopReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "end_turn" => Self::EndTurn,
            "tool_use" => Self::ToolUse,
            "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            "guardrail_intervened" => Self::GuardrailIntervened,
            "content_filtered" => Self::ContentFiltered,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::EndTurn => "end_turn",
            Self::ToolUse => "tool_use",
            Self::MaxTokens => "max_tokens",
            Self::StopSequence => "stop_sequence",
            Self::GuardrailIntervened => "guardrail_intervened",
            Self::ContentFiltered => "content_filtered",
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether the loop must stop after this round.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ToolUse)
    }
}

impl From<String> for StopReason {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<StopReason> for String {
    fn from(reason: StopReason) -> Self {
        reason.as_str().to_string()
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Kind of content block being opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlockStart {
    Text,
    ToolUse { id: String, name: String },
}

/// Incremental payload for the current content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "fragment", rename_all = "snake_case")]
pub enum ContentDelta {
    Text(String),
    /// Partial JSON for the input of the most recent tool use.
    ToolInput(String),
}

/// Low-level streaming events, in provider order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart { role: Role },
    ContentBlockStart { block: ContentBlockStart },
    ContentBlockDelta { delta: ContentDelta },
    ContentBlockStop,
    MessageStop {
        stop_reason: StopReason,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
}

/// Handle over the events of one model call.
///
/// The producer side watches the paired cancellation token; closing or
/// dropping the handle cancels it so the underlying connection is released
/// whether the stream was drained, abandoned early, or failed.
pub struct EventStream {
    rx: mpsc::Receiver<Result<StreamEvent, ProviderError>>,
    cancel: CancellationToken,
}

impl EventStream {
    pub fn new(
        rx: mpsc::Receiver<Result<StreamEvent, ProviderError>>,
        cancel: CancellationToken,
    ) -> Self {
        Self { rx, cancel }
    }

    /// A stream over a fixed list of events. Used by scripted providers.
    pub fn from_events(events: Vec<Result<StreamEvent, ProviderError>>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity matches the event count, so this never fails.
            let _ = tx.try_send(event);
        }
        Self::new(rx, CancellationToken::new())
    }

    /// Next event, or `None` once the producer is done.
    pub async fn next(&mut self) -> Option<Result<StreamEvent, ProviderError>> {
        self.rx.recv().await
    }

    /// Stop the producer and release the stream.
    pub fn close(mut self) {
        self.rx.close();
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The core Provider trait.
///
/// Every streaming model backend implements this trait. The agent loop
/// calls `stream()` without knowing which vendor is behind it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Start a streaming model call.
    ///
    /// Implementations must stop producing events once `cancel` fires.
    async fn stream(
        &self,
        request: ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream, ProviderError>;
}
