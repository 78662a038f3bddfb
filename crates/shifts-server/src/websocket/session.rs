//! Per-connection broadcast loop, from registration to unregistration.
//!
//! Each iteration probes the peer first. A live peer then gets at most one
//! pending event from this connection's own subscription; when nothing is
//! pending the loop waits up to the poll interval, waking early as soon as an
//! event arrives.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use shifts_core::ServerFrame;
use shifts_events::Subscription;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::connection::Connection;
use super::probe::{DeadReason, Liveness, LivenessProbe};
use super::registry::ConnectionRegistry;
use crate::metrics::NOTIFICATIONS_DELIVERED_TOTAL;

/// Why a broadcast loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// The liveness probe failed.
    Evicted(DeadReason),
    /// Writing a notification failed.
    DeliveryFailed,
    /// The event channel closed.
    ChannelClosed,
    /// Server shutdown.
    Shutdown,
    /// The loop panicked.
    Panicked,
}

impl fmt::Display for LoopExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Evicted(reason) => write!(f, "evicted ({reason})"),
            Self::DeliveryFailed => f.write_str("delivery failed"),
            Self::ChannelClosed => f.write_str("channel closed"),
            Self::Shutdown => f.write_str("shutdown"),
            Self::Panicked => f.write_str("panicked"),
        }
    }
}

/// Loop timing.
#[derive(Clone, Copy, Debug)]
pub struct LoopSettings {
    /// Liveness prober.
    pub probe: LivenessProbe,
    /// Longest wait for an event between two probes.
    pub poll_interval: Duration,
}

/// Drive `conn` until it must stop. Does not touch the registry.
pub async fn run_broadcast_loop(
    conn: &Connection,
    sub: &mut Subscription,
    settings: LoopSettings,
    cancel: &CancellationToken,
) -> LoopExit {
    loop {
        let liveness = tokio::select! {
            biased;
            () = cancel.cancelled() => return LoopExit::Shutdown,
            liveness = settings.probe.probe(conn) => liveness,
        };
        if let Liveness::NotAlive(reason) = liveness {
            return LoopExit::Evicted(reason);
        }

        let waited = tokio::select! {
            biased;
            () = cancel.cancelled() => return LoopExit::Shutdown,
            waited = timeout(settings.poll_interval, sub.recv()) => waited,
        };
        let event = match waited {
            Err(_) => continue,
            Ok(None) => return LoopExit::ChannelClosed,
            Ok(Some(event)) => event,
        };

        let text = match ServerFrame::notification(&event).and_then(|frame| frame.to_text()) {
            Ok(text) => text,
            Err(e) => {
                warn!(conn_id = %conn.id, error = %e, "failed to encode notification");
                continue;
            }
        };
        if let Err(e) = conn.send_text(text).await {
            debug!(conn_id = %conn.id, error = %e, "notification send failed");
            return LoopExit::DeliveryFailed;
        }
        metrics::counter!(NOTIFICATIONS_DELIVERED_TOTAL).increment(1);
        debug!(conn_id = %conn.id, task_id = ?event.task_id, status = event.status.as_str(), "notification delivered");
    }
}

/// Run the broadcast loop for a registered connection, then unregister it.
///
/// The loop runs in its own task so a panic ends only this connection.
/// Whatever the exit, `registry.disconnect` is called exactly once.
#[instrument(skip_all, fields(conn_id = %conn.id))]
pub async fn supervise(
    registry: Arc<ConnectionRegistry>,
    conn: Arc<Connection>,
    mut sub: Subscription,
    settings: LoopSettings,
    cancel: CancellationToken,
) -> LoopExit {
    let task_conn = conn.clone();
    let task = tokio::spawn(async move {
        run_broadcast_loop(&task_conn, &mut sub, settings, &cancel).await
    });

    let exit = match task.await {
        Ok(exit) => exit,
        Err(e) => {
            error!(error = %e, "broadcast loop panicked");
            LoopExit::Panicked
        }
    };

    let _ = registry.disconnect(&conn).await;
    info!(
        reason = %exit,
        age_ms = conn.age().as_millis() as u64,
        "broadcast loop ended"
    );
    exit
}
