//! # Linksort Core
//!
//! Domain types, traits, and error definitions for the Linksort assistant.
//! This crate has **no I/O**; it defines the model every other crate
//! implements against.
//!
//! ## Design Philosophy
//!
//! Every boundary is a trait here. Implementations live in their
//! respective crates:
//! - [`Provider`]: streaming model backends (`linksort-providers`)
//! - [`Tool`]: capabilities exposed to the model (`linksort-tools`)
//! - [`LinkController`], [`FolderController`], [`ConversationStore`]:
//!   the link library (`linksort-store` for the in-memory version)

pub mod domain;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use domain::{
    Folder, FolderController, FolderUpdate, Link, LinkController, LinkFilter, LinkUpdate,
    NewFolder, ROOT_FOLDER_ID, User,
};
pub use error::{DecodeError, DomainError, Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{
    Conversation, ConversationId, Message, MessageContent, Role, ToolStatus, ToolUse, ToolUseKind,
};
pub use provider::{
    ContentBlockStart, ContentDelta, EventStream, Provider, ProviderRequest, StopReason,
    StreamEvent, Usage,
};
pub use store::ConversationStore;
pub use tool::{TOOL_NOT_FOUND, Tool, ToolOutput, ToolRegistry, ToolSpec};
