//! The agent tool-use loop.
//!
//! One run drives rounds of `call model → decide → execute tools` until the
//! model stops for a terminal reason:
//!
//! 1. **Call** the provider with the system prompt, the full history and
//!    the tool specs, decoding the event stream into one message
//! 2. **Decide**: any stop reason other than `tool_use` ends the run
//! 3. **Execute** every requested tool in order, then append the request
//!    message and a user-role message with the responses
//!
//! Tool failures are answers the model reads, never run failures. Only
//! transport, protocol, cancellation, persistence and round-limit errors
//! abort a run.

use chrono::Utc;
use linksort_core::error::{DecodeError, Error, Result};
use linksort_core::event::{DomainEvent, EventBus};
use linksort_core::message::{Conversation, Message, Role, ToolStatus, ToolUse};
use linksort_core::provider::{Provider, ProviderRequest, StopReason, Usage};
use linksort_core::store::ConversationStore;
use linksort_core::tool::{ToolRegistry, ToolSpec};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::decoder::{Decoded, MessageDecoder};
use crate::live::{DEFAULT_LIVE_BUFFER, DEFAULT_PUBLISH_TIMEOUT, LiveText, live_channel};
use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::stream_event::AgentStreamEvent;

pub const DEFAULT_MAX_ROUNDS: u32 = 25;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Model calls made
    pub rounds: u32,
    pub tool_calls_made: usize,
    /// Token usage summed over all rounds
    pub usage: Usage,
    pub stop_reason: StopReason,
}

/// One decoded model round.
struct Round {
    message: Option<Message>,
    stop_reason: StopReason,
    usage: Option<Usage>,
}

/// The core agent loop that orchestrates model calls and tool execution.
pub struct AgentLoop {
    /// The streaming model backend
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    system_prompt: String,

    temperature: f32,

    /// Max tokens per model call
    max_tokens: Option<u32>,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Model calls allowed per run
    max_rounds: u32,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    /// Optional store each completed round is appended to
    store: Option<Arc<dyn ConversationStore>>,

    live_buffer: usize,
    publish_timeout: Duration,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: None,
            tools,
            max_rounds: DEFAULT_MAX_ROUNDS,
            event_bus,
            store: None,
            live_buffer: DEFAULT_LIVE_BUFFER,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the max tokens per model call.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of model calls per run.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    /// Persist every completed round to `store`.
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Buffer size and publish timeout of the channel made by [`AgentLoop::run_stream`].
    pub fn with_live_channel(mut self, capacity: usize, publish_timeout: Duration) -> Self {
        self.live_buffer = capacity;
        self.publish_timeout = publish_timeout;
        self
    }

    /// Replace the system prompt between runs, e.g. after the folder tree changed.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Drive the conversation until the model gives a final answer.
    ///
    /// `conversation` must already end with the new user message. Text
    /// fragments and tool progress are published on `live`, which is
    /// closed when the run ends. On error the conversation keeps every
    /// completed round and nothing of the failed one.
    pub async fn run(
        &self,
        conversation: &mut Conversation,
        mut live: LiveText,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.len(),
            "Starting assistant run"
        );

        let result = self.drive(conversation, &mut live, cancel).await;
        match &result {
            Ok(summary) => {
                info!(
                    conversation_id = %conversation.id,
                    rounds = summary.rounds,
                    tool_calls = summary.tool_calls_made,
                    stop_reason = %summary.stop_reason,
                    "Assistant run finished"
                );
                live.publish(AgentStreamEvent::Done {
                    conversation_id: conversation.id.to_string(),
                    usage: Some(summary.usage),
                    rounds: summary.rounds,
                    tool_calls_made: summary.tool_calls_made,
                })
                .await;
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "Assistant run failed");
                self.event_bus.publish(DomainEvent::RunFailed {
                    conversation_id: conversation.id.to_string(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                live.publish(AgentStreamEvent::Error {
                    message: e.to_string(),
                })
                .await;
            }
        }
        live.close();
        result
    }

    /// Run on a background task, streaming events to the returned receiver.
    ///
    /// The task hands the conversation back together with the outcome.
    pub fn run_stream(
        self: Arc<Self>,
        mut conversation: Conversation,
        cancel: CancellationToken,
    ) -> (
        mpsc::Receiver<AgentStreamEvent>,
        JoinHandle<(Conversation, Result<RunSummary>)>,
    ) {
        let (live, rx) = live_channel(self.live_buffer, self.publish_timeout);
        let handle = tokio::spawn(async move {
            let result = self.run(&mut conversation, live, &cancel).await;
            (conversation, result)
        });
        (rx, handle)
    }

    async fn drive(
        &self,
        conversation: &mut Conversation,
        live: &mut LiveText,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let specs = self.tools.specs();
        let mut usage = Usage::default();
        let mut tool_calls_made = 0;

        for round in 1..=self.max_rounds {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            debug!(conversation_id = %conversation.id, round, "Agent loop round");

            let Round {
                message,
                stop_reason,
                usage: round_usage,
            } = self.call_model(conversation, &specs, live, cancel).await?;

            if let Some(u) = round_usage {
                usage += u;
            }
            self.event_bus.publish(DomainEvent::ModelRoundCompleted {
                conversation_id: conversation.id.to_string(),
                round,
                stop_reason: stop_reason.clone(),
                usage: round_usage,
                timestamp: Utc::now(),
            });

            let finished = |stop_reason| RunSummary {
                rounds: round,
                tool_calls_made,
                usage,
                stop_reason,
            };

            let Some(message) = message else {
                if !stop_reason.is_terminal() {
                    warn!(round, "Model asked for tools but sent no content, ending run");
                }
                self.persist(conversation).await?;
                return Ok(finished(stop_reason));
            };

            if stop_reason.is_terminal() {
                if message.is_tool_use() {
                    warn!(
                        round,
                        stop_reason = %stop_reason,
                        "Dropping tool requests from a terminal round"
                    );
                } else {
                    conversation.push(message);
                }
                self.persist(conversation).await?;
                return Ok(finished(stop_reason));
            }

            if !message.is_tool_use() {
                warn!(round, "tool_use stop without tool requests, treating as final");
                conversation.push(message);
                self.persist(conversation).await?;
                return Ok(finished(stop_reason));
            }

            let responses = self
                .execute_tools(conversation, message.tool_uses(), live, cancel)
                .await?;
            tool_calls_made += responses.len();
            conversation.push(message);
            conversation.push(Message::tool_use(Role::User, responses));
            self.persist(conversation).await?;
        }

        warn!(
            conversation_id = %conversation.id,
            rounds = self.max_rounds,
            "Round limit reached"
        );
        Err(Error::RoundLimit {
            rounds: self.max_rounds,
        })
    }

    /// Make one model call and decode its stream into a message.
    async fn call_model(
        &self,
        conversation: &Conversation,
        specs: &[ToolSpec],
        live: &mut LiveText,
        cancel: &CancellationToken,
    ) -> Result<Round> {
        let request = ProviderRequest {
            model: self.model.clone(),
            system_prompt: self.system_prompt.clone(),
            messages: conversation.messages.clone(),
            tools: specs.to_vec(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.provider.stream(request, cancel.child_token()) => result?,
        };

        // Returning early drops `stream`, which releases the connection.
        let mut decoder = MessageDecoder::new();
        let stop_reason = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                next = stream.next() => next,
            };
            let event = match next {
                Some(event) => event?,
                None => return Err(DecodeError::UnexpectedEnd.into()),
            };
            match decoder.apply(event)? {
                Decoded::Pending => {}
                Decoded::Text(fragment) => live.text(&fragment).await,
                Decoded::Stop(reason) => break reason,
            }
        };
        stream.close();

        debug!(
            provider = self.provider.name(),
            stop_reason = %stop_reason,
            tool_uses = decoder.tool_use_count(),
            "Model round decoded"
        );
        let usage = decoder.usage();
        Ok(Round {
            message: decoder.finish(),
            stop_reason,
            usage,
        })
    }

    /// Run each request in order. Cancellation is checked before every tool.
    async fn execute_tools(
        &self,
        conversation: &Conversation,
        requests: &[ToolUse],
        live: &mut LiveText,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolUse>> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let input = request.input().unwrap_or_default();
            live.publish(AgentStreamEvent::ToolCall {
                id: request.id.clone(),
                name: request.name.clone(),
                input: input.to_string(),
            })
            .await;

            let start = Instant::now();
            let response = self.tools.dispatch(&request.name, &request.id, input).await;
            let duration_ms = start.elapsed().as_millis() as u64;
            let success = response.status() == Some(ToolStatus::Success);

            debug!(tool = %request.name, id = %request.id, success, duration_ms, "Tool executed");
            self.event_bus.publish(DomainEvent::ToolExecuted {
                conversation_id: conversation.id.to_string(),
                tool_name: request.name.clone(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
            live.publish(AgentStreamEvent::ToolResult {
                id: response.id.clone(),
                name: response.name.clone(),
                output: response.text().unwrap_or_default().to_string(),
                success,
            })
            .await;

            responses.push(response);
        }
        Ok(responses)
    }

    async fn persist(&self, conversation: &mut Conversation) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let pending = conversation.unpersisted();
        if pending.is_empty() {
            return Ok(());
        }
        store
            .append(&conversation.id, pending)
            .await
            .map_err(Error::Persistence)?;
        debug!(conversation_id = %conversation.id, count = pending.len(), "Round persisted");
        conversation.mark_persisted();
        Ok(())
    }
}
