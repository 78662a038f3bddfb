//! # shifts-server
//!
//! Axum HTTP + `WebSocket` server for optimized-shifts.
//!
//! - HTTP endpoints: trip ingestion and statistics under `/api/v1`, health, metrics
//! - Live notifications at `/api/v1/trips/live`: every connection runs its own
//!   broadcast loop that probes liveness with `ping`/`pong` and forwards job
//!   events from its own channel subscription
//! - [`ConnectionRegistry`](websocket::registry::ConnectionRegistry): the live
//!   connection set, held in [`AppState`](server::AppState)
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use server::{AppState, ShiftsServer};
