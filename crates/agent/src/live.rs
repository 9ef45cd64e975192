//! The per-run live channel.
//!
//! Publishing never blocks the loop for longer than the configured
//! timeout. Once the consumer disconnects or stalls the publisher detaches
//! for good and the rest of the run proceeds silently.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tracing::{debug, warn};

use crate::stream_event::AgentStreamEvent;

pub const DEFAULT_LIVE_BUFFER: usize = 64;
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(500);

/// Sending half of a run's live channel.
#[derive(Debug)]
pub struct LiveText {
    tx: Option<mpsc::Sender<AgentStreamEvent>>,
    timeout: Duration,
}

/// Create a bounded live channel.
pub fn live_channel(
    capacity: usize,
    timeout: Duration,
) -> (LiveText, mpsc::Receiver<AgentStreamEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        LiveText {
            tx: Some(tx),
            timeout,
        },
        rx,
    )
}

impl LiveText {
    /// A publisher with no consumer. Every publish is a no-op.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            timeout: DEFAULT_PUBLISH_TIMEOUT,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.tx.is_some()
    }

    pub async fn publish(&mut self, event: AgentStreamEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.send_timeout(event, self.timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Closed(_)) => {
                debug!("Live consumer disconnected, detaching");
                self.tx = None;
            }
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Live consumer stalled, detaching"
                );
                self.tx = None;
            }
        }
    }

    pub async fn text(&mut self, fragment: &str) {
        if self.tx.is_some() {
            self.publish(AgentStreamEvent::Chunk {
                content: fragment.to_string(),
            })
            .await;
        }
    }

    /// Detach and close the channel.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
