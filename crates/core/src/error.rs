//! Error types for the Linksort assistant.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type. Only provider, decoding,
//! cancellation and persistence failures ever escape the agent loop; tool
//! and domain failures are reported back to the model as tool results.

use thiserror::Error;

/// The top-level error type for assistant operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Transport ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Protocol ---
    #[error("Stream decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Persistence error: {0}")]
    Persistence(DomainError),

    #[error("Round limit reached after {rounds} model calls")]
    RoundLimit { rounds: u32 },
}

impl Error {
    /// True when the error came from the caller's cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Invalid stream event: {0}")]
    InvalidEvent(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Malformed or out-of-order streaming events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("tool input delta received before any tool_use block started")]
    DeltaWithoutToolUse,

    #[error("content event received before message_start")]
    MissingMessageStart,

    #[error("event stream ended before message_stop")]
    UnexpectedEnd,
}

/// Failures reported by the domain controllers and stores.
///
/// The display text is passed verbatim to the model, so variants render
/// only their message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Unavailable(String),
}

/// Input problems detected by a tool before it reaches a controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("The '{0}' field is required.")]
    MissingField(&'static str),

    #[error("The '{field}' field must be {expected}.")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Failed to encode tool output: {0}")]
    Output(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
