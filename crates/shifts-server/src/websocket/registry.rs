//! The set of live notification connections.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::connection::Connection;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};

/// Outcome of one [`ConnectionRegistry::broadcast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was written to.
    pub delivered: usize,
    /// Connections whose send failed.
    pub failed: usize,
}

/// Ordered set of live connections.
///
/// The lock covers insert, remove and snapshot only. Sends happen on a
/// snapshot with the lock released.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<Vec<Arc<Connection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection. Registering the same connection twice is a caller bug.
    pub fn connect(&self, conn: Arc<Connection>) {
        let active = {
            let mut conns = self.connections.write();
            debug_assert!(!conns.iter().any(|c| c.id == conn.id));
            conns.push(conn.clone());
            conns.len()
        };
        metrics::counter!(WS_CONNECTIONS_TOTAL).increment(1);
        metrics::gauge!(WS_CONNECTIONS_ACTIVE).set(active as f64);
        info!(conn_id = %conn.id, active, "connection registered");
    }

    /// Remove `conn`, then close it.
    ///
    /// Returns `false` without touching the transport when `conn` was not
    /// registered, so a connection is closed by at most one disconnect.
    pub async fn disconnect(&self, conn: &Connection) -> bool {
        let removed = {
            let mut conns = self.connections.write();
            conns
                .iter()
                .position(|c| c.id == conn.id)
                .map(|pos| (conns.remove(pos), conns.len()))
        };
        let Some((_, active)) = removed else {
            return false;
        };

        let _ = conn.close().await;
        metrics::counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
        metrics::gauge!(WS_CONNECTIONS_ACTIVE).set(active as f64);
        info!(conn_id = %conn.id, active, "connection unregistered");
        true
    }

    /// Send `message` to every live connection in registration order.
    ///
    /// A failed send is counted and skipped; the prober evicts the connection
    /// on its next iteration.
    pub async fn broadcast(&self, message: &str) -> BroadcastReport {
        let snapshot = self.snapshot();
        let mut report = BroadcastReport::default();
        for conn in &snapshot {
            match conn.send_text(message.to_owned()).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(conn_id = %conn.id, error = %e, "broadcast send failed");
                    report.failed += 1;
                }
            }
        }
        debug!(
            recipients = snapshot.len(),
            delivered = report.delivered,
            failed = report.failed,
            "broadcast finished"
        );
        report
    }

    /// Disconnect every connection. Returns how many were closed.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        for conn in self.snapshot() {
            if self.disconnect(&conn).await {
                closed += 1;
            }
        }
        closed
    }

    /// Current connections in registration order.
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.connections.read().clone()
    }

    /// Whether `conn` is registered.
    pub fn contains(&self, conn: &Connection) -> bool {
        self.connections.read().iter().any(|c| c.id == conn.id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::transport::fake::{self, PeerBehavior, Wire};
    use std::sync::atomic::Ordering;

    fn make_connection() -> (Arc<Connection>, Wire) {
        let (sink, stream, wire) = fake::transport(PeerBehavior::pong());
        (Arc::new(Connection::new(sink, stream)), wire)
    }

    #[test]
    fn connect_appends_in_order() {
        let registry = ConnectionRegistry::new();
        let (a, _) = make_connection();
        let (b, _) = make_connection();
        registry.connect(a.clone());
        registry.connect(b.clone());

        let ids: Vec<_> = registry.snapshot().iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![a.id.clone(), b.id.clone()]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&a));
    }

    #[tokio::test]
    async fn disconnect_removes_then_closes_once() {
        let registry = ConnectionRegistry::new();
        let (conn, wire) = make_connection();
        registry.connect(conn.clone());

        assert!(registry.disconnect(&conn).await);
        assert!(registry.is_empty());
        assert!(!conn.is_open());
        assert_eq!(wire.close_count(), 1);

        assert!(!registry.disconnect(&conn).await);
        assert_eq!(wire.close_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_unknown_is_noop() {
        let registry = ConnectionRegistry::new();
        let (conn, wire) = make_connection();
        assert!(!registry.disconnect(&conn).await);
        assert_eq!(wire.close_count(), 0);
        assert!(conn.is_open());
    }

    #[tokio::test]
    async fn disconnect_half_closed_connection() {
        let registry = ConnectionRegistry::new();
        let (conn, wire) = make_connection();
        registry.connect(conn.clone());
        wire.fail_sends.store(true, Ordering::SeqCst);
        assert!(conn.send_text("x".into()).await.is_err());

        assert!(registry.disconnect(&conn).await);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn broadcast_skips_failed_connection() {
        let registry = ConnectionRegistry::new();
        let (a, wa) = make_connection();
        let (b, wb) = make_connection();
        let (c, wc) = make_connection();
        for conn in [&a, &b, &c] {
            registry.connect(conn.clone());
        }
        wb.fail_sends.store(true, Ordering::SeqCst);

        let report = registry.broadcast("hello").await;
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                failed: 1
            }
        );
        assert_eq!(wa.sent(), vec!["hello".to_string()]);
        assert!(wb.sent().is_empty());
        assert_eq!(wc.sent(), vec!["hello".to_string()]);
        // Eviction is left to the prober
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn broadcast_to_empty_registry() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.broadcast("x").await, BroadcastReport::default());
    }

    #[tokio::test]
    async fn close_all_empties_registry() {
        let registry = ConnectionRegistry::new();
        let (a, wa) = make_connection();
        let (b, wb) = make_connection();
        registry.connect(a);
        registry.connect(b);

        assert_eq!(registry.close_all().await, 2);
        assert!(registry.is_empty());
        assert_eq!(wa.close_count(), 1);
        assert_eq!(wb.close_count(), 1);
    }
}
