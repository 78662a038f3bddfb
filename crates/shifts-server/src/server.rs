//! `ShiftsServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use shifts_events::EventChannel;
use shifts_jobs::JobQueue;
use shifts_store::TripStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api;
use crate::config::ServerConfig;
use crate::health::HealthResponse;
use crate::metrics;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::registry::ConnectionRegistry;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live notification connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Job-status events; every connection subscribes on upgrade.
    pub channel: Arc<dyn EventChannel>,
    /// Trip storage.
    pub store: TripStore,
    /// Submission side of the job queue.
    pub jobs: JobQueue,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown coordinator.
    pub shutdown: ShutdownCoordinator,
    /// When the server started.
    pub start_time: Instant,
    /// Renders `/metrics`.
    pub metrics: PrometheusHandle,
}

/// The optimized-shifts server.
pub struct ShiftsServer {
    state: AppState,
}

impl ShiftsServer {
    /// Create a server over `store`, `jobs` and `channel`.
    ///
    /// Uses a fresh shutdown coordinator and a metrics handle with no global
    /// recorder; see [`with_shutdown`](Self::with_shutdown) and
    /// [`with_metrics`](Self::with_metrics).
    pub fn new(
        config: ServerConfig,
        store: TripStore,
        jobs: JobQueue,
        channel: Arc<dyn EventChannel>,
    ) -> Self {
        Self {
            state: AppState {
                registry: Arc::new(ConnectionRegistry::new()),
                channel,
                store,
                jobs,
                config: Arc::new(config),
                shutdown: ShutdownCoordinator::new(),
                start_time: Instant::now(),
                metrics: metrics::detached_handle(),
            },
        }
    }

    /// Share an existing shutdown coordinator.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.state.shutdown = shutdown;
        self
    }

    /// Render `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.state.metrics = handle;
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .nest("/api/v1", api::routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.state.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        info!(%addr, "server listening");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
            info!("server stopped");
        });
        Ok((addr, handle))
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The live connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// The shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.state.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::collect(&state))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
