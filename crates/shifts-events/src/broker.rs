//! Redis-backed event channel.
//!
//! Publishing goes through Redis `PUBLISH`, so producers in other processes
//! reach this server's clients too. Delivery to local subscribers goes through
//! a bridge: one Redis subscription per process whose messages are re-sent
//! into a [`LocalChannel`] hub. Every WebSocket connection subscribes to the
//! hub and gets its own cursor.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use shifts_core::JobEvent;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{EventChannel, Subscription};
use crate::errors::Result;
use crate::local::LocalChannel;

/// Default Redis channel name.
pub const DEFAULT_CHANNEL: &str = "notifications";

/// Delay before re-subscribing after the broker connection drops.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Event channel that publishes through Redis and fans out locally.
pub struct RedisChannel {
    client: redis::Client,
    channel: String,
    hub: LocalChannel,
    publisher: Mutex<Option<redis::aio::MultiplexedConnection>>,
}

impl RedisChannel {
    /// Create a channel for `url` and Redis channel `channel`.
    ///
    /// Does not connect; the first publish or the bridge does.
    pub fn open(url: &str, channel: impl Into<String>, capacity: usize) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            channel: channel.into(),
            hub: LocalChannel::new(capacity),
            publisher: Mutex::new(None),
        })
    }

    /// Redis channel name.
    pub fn channel_name(&self) -> &str {
        &self.channel
    }

    /// Local fan-out hub fed by the bridge.
    pub fn hub(&self) -> &LocalChannel {
        &self.hub
    }

    /// Spawn the bridge task that feeds the local hub from Redis.
    ///
    /// The task runs until `cancel` fires, re-subscribing after broker errors.
    pub fn spawn_bridge(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let client = self.client.clone();
        let channel = self.channel.clone();
        let hub = self.hub.clone();
        tokio::spawn(run_bridge(client, channel, hub, cancel))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let mut guard = self.publisher.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl EventChannel for RedisChannel {
    async fn publish(&self, event: &JobEvent) -> Result<()> {
        let payload = event.to_payload()?;
        let mut conn = self.connection().await?;
        let result = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await;
        match result {
            Ok(receivers) => {
                debug!(channel = %self.channel, receivers, "event published to broker");
                Ok(())
            }
            Err(e) => {
                // Drop the cached connection so the next publish reconnects
                *self.publisher.lock().await = None;
                Err(e.into())
            }
        }
    }

    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }
}

async fn run_bridge(
    client: redis::Client,
    channel: String,
    hub: LocalChannel,
    cancel: CancellationToken,
) {
    while !cancel.is_cancelled() {
        match bridge_once(&client, &channel, &hub, &cancel).await {
            Ok(()) if cancel.is_cancelled() => break,
            Ok(()) => warn!(channel, "broker subscription ended, resubscribing"),
            Err(e) => warn!(channel, error = %e, "broker subscription failed"),
        }
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
    info!(channel, "broker bridge stopped");
}

async fn bridge_once(
    client: &redis::Client,
    channel: &str,
    hub: &LocalChannel,
    cancel: &CancellationToken,
) -> redis::RedisResult<()> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!(channel, "subscribed to broker channel");

    let mut messages = pubsub.on_message();
    loop {
        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            msg = messages.next() => {
                let Some(msg) = msg else {
                    return Ok(());
                };
                match msg.get_payload::<String>() {
                    Ok(payload) => forward(hub, &payload),
                    Err(e) => warn!(channel, error = %e, "non-text broker payload dropped"),
                }
            }
        }
    }
}

/// Decode a broker payload and hand it to the local hub.
fn forward(hub: &LocalChannel, payload: &str) {
    match decode_payload(payload) {
        Some(event) => {
            let _ = hub.send(event);
        }
        None => warn!(payload, "malformed event payload dropped"),
    }
}

/// Parse a broker payload as a [`JobEvent`].
pub fn decode_payload(payload: &str) -> Option<JobEvent> {
    JobEvent::from_payload(payload).ok()
}
