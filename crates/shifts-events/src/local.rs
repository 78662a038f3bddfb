//! In-process event channel.

use async_trait::async_trait;
use shifts_core::JobEvent;
use tokio::sync::broadcast;
use tracing::debug;

use crate::channel::{EventChannel, Subscription};
use crate::errors::Result;

/// Default number of events retained per subscriber before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out hub on `tokio::sync::broadcast`.
///
/// Cloning yields another handle to the same hub.
#[derive(Clone)]
pub struct LocalChannel {
    tx: broadcast::Sender<JobEvent>,
}

impl LocalChannel {
    /// Create a hub retaining up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish without going through the async trait.
    ///
    /// Returns the number of subscribers the event was queued for. Zero
    /// subscribers is not an error: the event is simply dropped.
    pub fn send(&self, event: JobEvent) -> usize {
        let status = event.status.as_str();
        match self.tx.send(event) {
            Ok(recipients) => {
                debug!(status, recipients, "event published");
                recipients
            }
            Err(_) => {
                debug!(status, "event published with no subscribers");
                0
            }
        }
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventChannel for LocalChannel {
    async fn publish(&self, event: &JobEvent) -> Result<()> {
        let _ = self.send(event.clone());
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.tx.subscribe())
    }

    fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
