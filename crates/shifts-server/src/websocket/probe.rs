//! Application-level liveness probe.
//!
//! The server sends `{"type":"ping"}` and the very next frame from the peer
//! must be `{"type":"pong"}`. The ping send and the reply wait are each
//! bounded by the probe timeout.

use std::fmt;
use std::time::Duration;

use shifts_core::ServerFrame;
use shifts_core::events::{PONG_TAG, frame_tag};
use tokio::time::timeout;
use tracing::debug;

use super::connection::Connection;
use super::transport::TransportError;
use crate::metrics::WS_PROBE_FAILURES_TOTAL;

/// Default bound on each half of a probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a probe failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeadReason {
    /// A side of the connection was already not open; no I/O was attempted.
    NotOpen,
    /// Writing the ping failed.
    SendFailed,
    /// The ping send or the reply wait exceeded the timeout.
    TimedOut,
    /// The reply was not a `pong` frame.
    UnexpectedReply,
    /// The peer closed or errored while we waited.
    PeerDisconnected,
}

impl DeadReason {
    /// Stable label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotOpen => "not_open",
            Self::SendFailed => "send_failed",
            Self::TimedOut => "timed_out",
            Self::UnexpectedReply => "unexpected_reply",
            Self::PeerDisconnected => "peer_disconnected",
        }
    }
}

impl fmt::Display for DeadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// The peer answered `pong` in time.
    Alive,
    /// The peer should be evicted.
    NotAlive(DeadReason),
}

/// Ping/pong prober with a per-step timeout.
#[derive(Clone, Copy, Debug)]
pub struct LivenessProbe {
    timeout: Duration,
}

impl LivenessProbe {
    /// Probe bounding each step by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The per-step timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one ping/pong exchange on `conn`.
    pub async fn probe(&self, conn: &Connection) -> Liveness {
        let liveness = self.exchange(conn).await;
        if let Liveness::NotAlive(reason) = liveness {
            metrics::counter!(WS_PROBE_FAILURES_TOTAL, "reason" => reason.as_str()).increment(1);
            debug!(conn_id = %conn.id, %reason, "liveness probe failed");
        }
        liveness
    }

    /// Shorthand for `probe(conn) == Alive`.
    pub async fn is_alive(&self, conn: &Connection) -> bool {
        self.probe(conn).await == Liveness::Alive
    }

    async fn exchange(&self, conn: &Connection) -> Liveness {
        use Liveness::NotAlive;

        if !conn.is_open() {
            return NotAlive(DeadReason::NotOpen);
        }
        let Ok(ping) = ServerFrame::Ping.to_text() else {
            return NotAlive(DeadReason::SendFailed);
        };

        match timeout(self.timeout, conn.send_text(ping)).await {
            Err(_) => return NotAlive(DeadReason::TimedOut),
            Ok(Err(_)) => return NotAlive(DeadReason::SendFailed),
            Ok(Ok(())) => {}
        }

        let reply = match timeout(self.timeout, conn.recv_text()).await {
            Err(_) => return NotAlive(DeadReason::TimedOut),
            Ok(Err(TransportError::NonText)) => return NotAlive(DeadReason::UnexpectedReply),
            Ok(Err(_)) => return NotAlive(DeadReason::PeerDisconnected),
            Ok(Ok(text)) => text,
        };

        if frame_tag(&reply).as_deref() == Some(PONG_TAG) {
            Liveness::Alive
        } else {
            NotAlive(DeadReason::UnexpectedReply)
        }
    }
}

impl Default for LivenessProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}
