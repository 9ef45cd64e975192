//! The Linksort assistant's tool-use loop.
//!
//! The agent follows a **Call → Decide → Execute** cycle:
//!
//! 1. **Call** the model with the conversation and the tool specs
//! 2. **Decode** the event stream into one message, streaming text live
//! 3. **If tool requests**: run them in order, append the results, loop
//! 4. **Otherwise**: append the final answer and stop
//!
//! The loop ends on any terminal stop reason, on cancellation, on a
//! transport or protocol error, or when the round limit is reached.

pub mod decoder;
pub mod live;
pub mod loop_runner;
pub mod prompt;
pub mod stream_event;

pub use decoder::{Decoded, MessageDecoder};
pub use live::{LiveText, live_channel};
pub use loop_runner::{AgentLoop, RunSummary};
pub use prompt::{DEFAULT_SYSTEM_PROMPT, system_prompt};
pub use stream_event::AgentStreamEvent;
