//! Message and Conversation domain types.
//!
//! A conversation is replayed to the model on every round and grows by
//! appending messages:
//! user asks → assistant requests tools → user-role tool results → assistant answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user, or tool results sent back on the user's behalf
    User,
    /// The model
    Assistant,
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// Whether a [`ToolUse`] is the model's request or our answer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolUseKind {
    /// Raw JSON input as streamed by the provider.
    Request { input: String },
    Response { status: ToolStatus, text: String },
}

/// One tool invocation request, or its paired response, inside a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Provider-assigned correlation id
    pub id: String,

    /// Registered tool name
    pub name: String,

    #[serde(flatten)]
    pub kind: ToolUseKind,
}

impl ToolUse {
    pub fn request(id: impl Into<String>, name: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ToolUseKind::Request { input: input.into() },
        }
    }

    pub fn response(
        id: impl Into<String>,
        name: impl Into<String>,
        status: ToolStatus,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ToolUseKind::Response {
                status,
                text: text.into(),
            },
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self.kind, ToolUseKind::Request { .. })
    }

    /// The raw input of a request, `None` for responses.
    pub fn input(&self) -> Option<&str> {
        match &self.kind {
            ToolUseKind::Request { input } => Some(input),
            ToolUseKind::Response { .. } => None,
        }
    }

    /// Status of a response, `None` for requests.
    pub fn status(&self) -> Option<ToolStatus> {
        match &self.kind {
            ToolUseKind::Response { status, .. } => Some(*status),
            ToolUseKind::Request { .. } => None,
        }
    }

    /// Body of a response, `None` for requests.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ToolUseKind::Response { text, .. } => Some(text),
            ToolUseKind::Request { .. } => None,
        }
    }
}

/// A message holds either free text or a list of tool uses, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    ToolUse(Vec<ToolUse>),
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    pub content: MessageContent,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_content(role: Role, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user text message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_content(Role::User, MessageContent::Text(text.into()))
    }

    /// Create a new assistant text message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_content(Role::Assistant, MessageContent::Text(text.into()))
    }

    /// Create a tool-use message. Requests belong to the assistant,
    /// responses are sent back with the user role.
    pub fn tool_use(role: Role, uses: Vec<ToolUse>) -> Self {
        Self::with_content(role, MessageContent::ToolUse(uses))
    }

    pub fn is_tool_use(&self) -> bool {
        matches!(self.content, MessageContent::ToolUse(_))
    }

    /// The text body, `None` for tool-use messages.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::ToolUse(_) => None,
        }
    }

    /// The tool uses, empty for text messages.
    pub fn tool_uses(&self) -> &[ToolUse] {
        match &self.content {
            MessageContent::ToolUse(uses) => uses,
            MessageContent::Text(_) => &[],
        }
    }
}

/// An append-only, ordered conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,

    /// Number of leading messages already written to a store.
    #[serde(skip)]
    persisted: usize,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        Self::from_history(ConversationId::new(), Vec::new())
    }

    /// Rebuild a conversation from previously persisted messages.
    pub fn from_history(id: ConversationId, messages: Vec<Message>) -> Self {
        let now = Utc::now();
        let created_at = messages.first().map(|m| m.timestamp).unwrap_or(now);
        let updated_at = messages.last().map(|m| m.timestamp).unwrap_or(now);
        Self {
            id,
            persisted: messages.len(),
            messages,
            created_at,
            updated_at,
        }
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Text of the trailing assistant message, if the conversation ends with one.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == Role::Assistant)
            .and_then(Message::text)
    }

    /// Messages appended since the last [`Conversation::mark_persisted`].
    pub fn unpersisted(&self) -> &[Message] {
        &self.messages[self.persisted.min(self.messages.len())..]
    }

    pub fn mark_persisted(&mut self) {
        self.persisted = self.messages.len();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
