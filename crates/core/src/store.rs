//! ConversationStore trait: persistence boundary for conversation history.
//!
//! The agent loop hands each completed round's new messages to the store
//! in a single `append` call, so a round is persisted all-or-nothing.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::message::{ConversationId, Message};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All persisted messages of a conversation, oldest first.
    /// Unknown conversations have an empty history.
    async fn load(&self, id: &ConversationId) -> Result<Vec<Message>, DomainError>;

    /// Append messages atomically, preserving their order.
    async fn append(&self, id: &ConversationId, messages: &[Message]) -> Result<(), DomainError>;
}
