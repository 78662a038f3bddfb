//! The event channel contract and per-subscriber cursors.

use async_trait::async_trait;
use shifts_core::JobEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

use crate::errors::Result;

/// Counter bumped every time a subscriber falls behind and skips events.
pub const NOTIFICATIONS_LAGGED_TOTAL: &str = "notifications_lagged_total";

/// A pub/sub medium for job-status events.
///
/// Publishing never waits on subscribers. Each [`Subscription`] sees every
/// event published after it was created, in publish order.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Publish one event to every current subscriber.
    async fn publish(&self, event: &JobEvent) -> Result<()>;

    /// Open a new independent cursor on the channel.
    fn subscribe(&self) -> Subscription;

    /// Number of subscriptions currently open on this process's side.
    fn subscriber_count(&self) -> usize;
}

/// One subscriber's cursor into the channel.
pub struct Subscription {
    rx: broadcast::Receiver<JobEvent>,
}

impl Subscription {
    pub(crate) fn new(rx: broadcast::Receiver<JobEvent>) -> Self {
        Self { rx }
    }

    /// Take the next pending event without waiting.
    ///
    /// Returns `None` when nothing is pending or the channel is closed. When
    /// the subscriber fell behind, the skipped events are logged and the
    /// oldest retained event is returned.
    pub fn poll_one(&mut self) -> Option<JobEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => record_lag(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next event. Returns `None` once the channel is closed.
    ///
    /// Cancel safe: dropping the future loses no event.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

fn record_lag(skipped: u64) {
    warn!(skipped, "subscriber lagged, dropped events");
    metrics::counter!(NOTIFICATIONS_LAGGED_TOTAL).increment(skipped);
}
