//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is what a live consumer (terminal, SSE endpoint)
//! sees during a run: text fragments as the model produces them, tool
//! progress, and a final `done` or `error` frame.

use linksort_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Events emitted by the agent during a run.
///
/// - `chunk` - partial text from the model
/// - `tool_call` - the assistant is invoking a tool
/// - `tool_result` - the tool finished
/// - `done` - the run completed
/// - `error` - the run aborted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text from the model.
    Chunk { content: String },

    /// The assistant is calling a tool. `input` is the raw JSON it streamed.
    ToolCall {
        id: String,
        name: String,
        input: String,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// The run is complete.
    Done {
        conversation_id: String,
        usage: Option<Usage>,
        rounds: u32,
        tool_calls_made: usize,
    },

    /// The run aborted.
    Error { message: String },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_chunk() {
        let event = AgentStreamEvent::Chunk {
            content: "Hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"chunk""#));
        assert!(json.contains(r#""content":"Hello""#));
    }

    #[test]
    fn event_serialization_tool_call() {
        let event = AgentStreamEvent::ToolCall {
            id: "t1".into(),
            name: "get_links".into(),
            input: "{}".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_call""#));
        assert!(json.contains(r#""name":"get_links""#));
    }

    #[test]
    fn event_serialization_done() {
        let event = AgentStreamEvent::Done {
            conversation_id: "abc".into(),
            usage: Some(Usage {
                input_tokens: 10,
                output_tokens: 20,
            }),
            rounds: 2,
            tool_calls_made: 1,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"done""#));
        assert!(json.contains(r#""rounds":2"#));
    }

    #[test]
    fn event_type_names() {
        let cases = [
            (AgentStreamEvent::Chunk { content: "x".into() }, "chunk"),
            (
                AgentStreamEvent::ToolCall {
                    id: "a".into(),
                    name: "b".into(),
                    input: "{}".into(),
                },
                "tool_call",
            ),
            (
                AgentStreamEvent::ToolResult {
                    id: "a".into(),
                    name: "b".into(),
                    output: "c".into(),
                    success: true,
                },
                "tool_result",
            ),
            (
                AgentStreamEvent::Done {
                    conversation_id: "x".into(),
                    usage: None,
                    rounds: 0,
                    tool_calls_made: 0,
                },
                "done",
            ),
            (AgentStreamEvent::Error { message: "x".into() }, "error"),
        ];
        for (event, name) in cases {
            assert_eq!(event.event_type(), name);
        }
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"chunk","content":"hi"}"#;
        let event: AgentStreamEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, AgentStreamEvent::Chunk { content: "hi".into() });
    }
}
