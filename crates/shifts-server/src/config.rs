//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shifts_settings::ShiftsSettings;

/// Configuration for the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Bound on each of the ping send and the `pong` wait.
    pub probe_timeout_ms: u64,
    /// Longest wait for an event between two probes.
    pub poll_interval_ms: u64,
    /// Grace period for connection loops on shutdown.
    pub shutdown_timeout_ms: u64,
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ShiftsSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            probe_timeout_ms: settings.notifications.probe_timeout_ms,
            poll_interval_ms: settings.notifications.poll_interval_ms,
            shutdown_timeout_ms: settings.server.shutdown_timeout_ms,
        }
    }

    /// Probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Poll interval as a [`Duration`], never zero.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            probe_timeout_ms: 5_000,
            poll_interval_ms: 100,
            shutdown_timeout_ms: 10_000,
        }
    }
}
