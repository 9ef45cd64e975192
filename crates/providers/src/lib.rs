//! Streaming model providers for the Linksort assistant.
//!
//! All providers implement the `linksort_core::Provider` trait.

pub mod anthropic;
pub mod sse;

pub use anthropic::AnthropicProvider;
pub use sse::AnthropicStreamParser;
