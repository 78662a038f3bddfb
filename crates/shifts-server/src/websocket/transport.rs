//! Text-frame transport halves.
//!
//! A [`Connection`](super::connection::Connection) owns one [`FrameSink`] and
//! one [`FrameStream`]. Axum's split `WebSocket` implements both; tests plug in
//! in-memory fakes.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use thiserror::Error;

/// Transport failures. Every one of them ends the connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The local side already closed the connection.
    #[error("connection is closed")]
    Closed,
    /// The peer went away.
    #[error("peer disconnected")]
    PeerClosed,
    /// The peer sent a binary frame that is not UTF-8.
    #[error("non-text frame received")]
    NonText,
    /// The underlying `WebSocket` failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),
}

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one text frame.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a close frame. Errors on an already-broken transport are expected.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Inbound half of a connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Next text frame. `None` once the peer has closed.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;
}

#[async_trait]
impl FrameSink for SplitSink<WebSocket, Message> {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.send(Message::Close(None)).await?;
        SinkExt::close(self).await?;
        Ok(())
    }
}

#[async_trait]
impl FrameStream for SplitStream<WebSocket> {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let msg = match self.next().await? {
                Ok(msg) => msg,
                Err(e) => return Some(Err(e.into())),
            };
            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Binary(data) => {
                    return Some(
                        String::from_utf8(data.to_vec()).map_err(|_| TransportError::NonText),
                    );
                }
                Message::Close(_) => return None,
                // Control frames are answered by axum itself
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    }
}

/// Split an upgraded socket into boxed transport halves.
pub fn split_socket(socket: WebSocket) -> (Box<dyn FrameSink>, Box<dyn FrameStream>) {
    let (sink, stream) = socket.split();
    (Box::new(sink), Box::new(stream))
}
