//! Live notification connections: transport, registry, liveness probe, and
//! the per-connection broadcast loop.

pub mod connection;
pub mod handler;
pub mod probe;
pub mod registry;
pub mod session;
pub mod transport;
