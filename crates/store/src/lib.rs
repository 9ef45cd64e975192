//! Link library and conversation store implementations for Linksort.
//!
//! The production service keeps users, links and conversations in a
//! document database; this crate provides the in-memory equivalent used
//! by the CLI and by tests.

pub mod in_memory;

pub use in_memory::{InMemoryStore, NewLink};
