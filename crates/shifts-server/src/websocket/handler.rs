//! `GET /api/v1/trips/live` upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;

use super::connection::Connection;
use super::probe::LivenessProbe;
use super::session::{self, LoopSettings};
use super::transport::split_socket;
use crate::server::AppState;

/// Upgrade to a notification `WebSocket`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Register the new connection and run its broadcast loop to the end.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, stream) = split_socket(socket);
    let conn = Arc::new(Connection::new(sink, stream));

    // Subscribe before registering so nothing published after registration is missed
    let sub = state.channel.subscribe();
    state.registry.connect(conn.clone());

    let settings = LoopSettings {
        probe: LivenessProbe::new(state.config.probe_timeout()),
        poll_interval: state.config.poll_interval(),
    };
    let _ = session::supervise(
        state.registry.clone(),
        conn,
        sub,
        settings,
        state.shutdown.token(),
    )
    .await;
}
