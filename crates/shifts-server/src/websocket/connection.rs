//! One live notification connection.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use shifts_core::ConnectionId;
use tokio::sync::Mutex;

use super::transport::{FrameSink, FrameStream, TransportError};

/// State of one side of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting = 0,
    /// Frames may flow.
    Open = 1,
    /// A close has been started.
    Closing = 2,
    /// Gone.
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// A connected client.
///
/// Sends are serialized through the sink lock and reads through the stream
/// lock, so the broadcast loop and a registry-wide broadcast can share one
/// connection safely.
pub struct Connection {
    /// Unique connection ID.
    pub id: ConnectionId,
    local: AtomicU8,
    remote: AtomicU8,
    sink: Mutex<Box<dyn FrameSink>>,
    stream: Mutex<Box<dyn FrameStream>>,
    /// When the upgrade completed.
    pub connected_at: Instant,
}

impl Connection {
    /// Wrap an upgraded transport. Both sides start open.
    pub fn new(sink: Box<dyn FrameSink>, stream: Box<dyn FrameStream>) -> Self {
        Self {
            id: ConnectionId::new(),
            local: AtomicU8::new(ConnectionState::Open as u8),
            remote: AtomicU8::new(ConnectionState::Open as u8),
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            connected_at: Instant::now(),
        }
    }

    /// Our side of the connection.
    pub fn local_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.local.load(Ordering::Acquire))
    }

    /// The peer's side, as last observed.
    pub fn remote_state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.remote.load(Ordering::Acquire))
    }

    /// Whether both sides are open.
    pub fn is_open(&self) -> bool {
        self.local_state() == ConnectionState::Open && self.remote_state() == ConnectionState::Open
    }

    fn mark_remote_closed(&self) {
        self.remote
            .store(ConnectionState::Closed as u8, Ordering::Release);
    }

    /// Send one text frame. A failed send marks the peer closed.
    pub async fn send_text(&self, text: String) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let mut sink = self.sink.lock().await;
        sink.send_text(text).await.inspect_err(|_| {
            self.mark_remote_closed();
        })
    }

    /// Wait for the next text frame from the peer.
    ///
    /// A closed or failed stream marks the peer closed. A frame that is not
    /// text leaves the connection open.
    pub async fn recv_text(&self) -> Result<String, TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let mut stream = self.stream.lock().await;
        match stream.next_text().await {
            Some(Ok(text)) => Ok(text),
            Some(Err(TransportError::NonText)) => Err(TransportError::NonText),
            Some(Err(e)) => {
                self.mark_remote_closed();
                Err(e)
            }
            None => {
                self.mark_remote_closed();
                Err(TransportError::PeerClosed)
            }
        }
    }

    /// Close our side. Errors from a half-closed transport are swallowed.
    ///
    /// Returns `true` only for the call that performed the close.
    pub async fn close(&self) -> bool {
        if self
            .local
            .compare_exchange(
                ConnectionState::Open as u8,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }
        if let Err(e) = self.sink.lock().await.close().await {
            tracing::debug!(conn_id = %self.id, error = %e, "close on broken transport");
        }
        self.local
            .store(ConnectionState::Closed as u8, Ordering::Release);
        true
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
