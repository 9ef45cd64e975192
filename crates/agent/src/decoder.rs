//! Assembles one model message from a provider's event stream.
//!
//! A decoder lives for exactly one round. If the round aborts the decoder
//! is dropped with it, so a half-built message can never leak into the
//! conversation.

use linksort_core::error::DecodeError;
use linksort_core::message::{Message, Role, ToolUse, ToolUseKind};
use linksort_core::provider::{ContentBlockStart, ContentDelta, StopReason, StreamEvent, Usage};
use tracing::{trace, warn};

/// What the caller should do after feeding one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Nothing to act on yet.
    Pending,
    /// A text fragment to stream to the live consumer.
    Text(String),
    /// `message_stop` arrived. The message can be taken with [`MessageDecoder::finish`].
    Stop(StopReason),
}

#[derive(Debug, Default)]
pub struct MessageDecoder {
    role: Option<Role>,
    text: Option<String>,
    text_closed: bool,
    tool_uses: Vec<ToolUse>,
    /// Parallel to `tool_uses`: whether the block's stop has arrived
    tool_closed: Vec<bool>,
    /// Index into `tool_uses` of the tool block currently streaming
    open_tool: Option<usize>,
    usage: Option<Usage>,
}

impl MessageDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next stream event.
    pub fn apply(&mut self, event: StreamEvent) -> Result<Decoded, DecodeError> {
        if self.role.is_none() && !matches!(event, StreamEvent::MessageStart { .. }) {
            return Err(DecodeError::MissingMessageStart);
        }

        match event {
            StreamEvent::MessageStart { role } => {
                self.role = Some(role);
            }
            StreamEvent::ContentBlockStart { block } => match block {
                ContentBlockStart::Text => {
                    self.open_tool = None;
                }
                ContentBlockStart::ToolUse { id, name } => {
                    if let Some(pos) = self.tool_uses.iter().position(|t| t.id == id) {
                        trace!(tool_use_id = %id, "Duplicate tool_use block ignored");
                        self.open_tool = Some(pos);
                    } else {
                        self.tool_uses.push(ToolUse::request(id, name, String::new()));
                        self.tool_closed.push(false);
                        self.open_tool = Some(self.tool_uses.len() - 1);
                    }
                }
            },
            StreamEvent::ContentBlockDelta { delta } => match delta {
                ContentDelta::Text(fragment) => {
                    self.text.get_or_insert_with(String::new).push_str(&fragment);
                    return Ok(Decoded::Text(fragment));
                }
                ContentDelta::ToolInput(fragment) => {
                    let last = self
                        .tool_uses
                        .last_mut()
                        .ok_or(DecodeError::DeltaWithoutToolUse)?;
                    if let ToolUseKind::Request { input } = &mut last.kind {
                        input.push_str(&fragment);
                    }
                }
            },
            StreamEvent::ContentBlockStop => match self.open_tool.take() {
                Some(pos) => self.tool_closed[pos] = true,
                None => self.text_closed = true,
            },
            StreamEvent::MessageStop { stop_reason, usage } => {
                self.usage = usage;
                return Ok(Decoded::Stop(stop_reason));
            }
        }
        Ok(Decoded::Pending)
    }

    /// Token usage reported with `message_stop`, if any.
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// Number of tool-use requests seen so far.
    pub fn tool_use_count(&self) -> usize {
        self.tool_uses.len()
    }

    /// The finished message, or `None` if no content block was completed.
    ///
    /// Only closed blocks count: a tool request whose block never stopped
    /// has truncated input and is dropped. When a message carries both
    /// text and tool requests, the tool requests win: the text was already
    /// streamed live as a preamble and is not kept.
    pub fn finish(self) -> Option<Message> {
        let role = self.role?;

        let mut requests = Vec::with_capacity(self.tool_uses.len());
        for (tool_use, closed) in self.tool_uses.into_iter().zip(self.tool_closed) {
            if closed {
                requests.push(tool_use);
            } else {
                warn!(
                    tool_use_id = %tool_use.id,
                    tool = %tool_use.name,
                    "Dropping tool request whose block never closed"
                );
            }
        }
        if !requests.is_empty() {
            return Some(Message::tool_use(role, requests));
        }

        if !self.text_closed {
            return None;
        }
        let text = self.text?;
        Some(match role {
            Role::Assistant => Message::assistant(text),
            Role::User => Message::user(text),
        })
    }
}
