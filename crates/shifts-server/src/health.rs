//! `/health` endpoint.
//!
//! Reports whether the server still accepts work and how much of the
//! notification fan-out is live: registered connections and open event
//! subscriptions. The two differ briefly while a connection is upgrading or
//! being torn down.

use serde::Serialize;

use crate::server::AppState;

/// Serving state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Accepting connections and jobs.
    Ok,
    /// Shutdown has started; live loops are winding down.
    Draining,
}

/// `/health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Serving state.
    pub status: HealthStatus,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Registered notification connections.
    pub connections: usize,
    /// Open subscriptions on the event channel.
    pub subscribers: usize,
}

impl HealthResponse {
    /// Snapshot the live counters in `state`.
    pub fn collect(state: &AppState) -> Self {
        let status = if state.shutdown.is_shutting_down() {
            HealthStatus::Draining
        } else {
            HealthStatus::Ok
        };
        Self {
            status,
            uptime_secs: state.start_time.elapsed().as_secs(),
            connections: state.registry.len(),
            subscribers: state.channel.subscriber_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use shifts_events::{EventChannel, LocalChannel};
    use shifts_jobs::JobQueue;
    use shifts_store::TripStore;

    use super::*;
    use crate::config::ServerConfig;
    use crate::server::ShiftsServer;

    fn server_over(channel: &LocalChannel) -> ShiftsServer {
        let (jobs, _rx) = JobQueue::bounded(1);
        ShiftsServer::new(
            ServerConfig::default(),
            TripStore::in_memory().unwrap(),
            jobs,
            Arc::new(channel.clone()),
        )
    }

    #[test]
    fn idle_server_is_ok() {
        let channel = LocalChannel::new(4);
        let resp = HealthResponse::collect(server_over(&channel).state());
        assert_eq!(resp.status, HealthStatus::Ok);
        assert_eq!(resp.connections, 0);
        assert_eq!(resp.subscribers, 0);
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn counts_open_subscriptions() {
        let channel = LocalChannel::new(4);
        let server = server_over(&channel);
        let _a = channel.subscribe();
        let b = channel.subscribe();
        assert_eq!(HealthResponse::collect(server.state()).subscribers, 2);
        drop(b);
        assert_eq!(HealthResponse::collect(server.state()).subscribers, 1);
    }

    #[test]
    fn draining_after_shutdown() {
        let channel = LocalChannel::new(4);
        let server = server_over(&channel);
        server.shutdown().shutdown();
        assert_eq!(
            HealthResponse::collect(server.state()).status,
            HealthStatus::Draining
        );
    }

    #[test]
    fn uptime_counts_from_start() {
        let channel = LocalChannel::new(4);
        let mut state = server_over(&channel).state().clone();
        state.start_time = Instant::now()
            .checked_sub(Duration::from_secs(60))
            .unwrap();
        assert!(HealthResponse::collect(&state).uptime_secs >= 59);
    }

    #[test]
    fn serializes_lowercase_status() {
        let channel = LocalChannel::new(4);
        let resp = HealthResponse::collect(server_over(&channel).state());
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["connections"], 0);
        assert_eq!(parsed["subscribers"], 0);
        assert!(parsed["uptime_secs"].is_number());
    }
}
