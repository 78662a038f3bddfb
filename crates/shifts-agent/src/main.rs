//! # shifts-agent
//!
//! optimized-shifts server binary: wires settings, storage, the event channel
//! and the job worker together and starts the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shifts_core::logging;
use shifts_events::{EventChannel, LocalChannel, RedisChannel};
use shifts_jobs::{JobQueue, JobWorker};
use shifts_server::ServerConfig;
use shifts_server::server::ShiftsServer;
use shifts_server::shutdown::ShutdownCoordinator;
use shifts_settings::{NotificationSettings, ShiftsSettings};
use shifts_store::TripStore;
use shifts_store::store::MEMORY_PATH;
use tokio::task::JoinHandle;

/// Trip ingestion server with live job notifications.
#[derive(Parser, Debug)]
#[command(name = "optimized-shifts", about = "Trip ingestion server with live job notifications")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database, or `:memory:`.
    #[arg(long)]
    db_path: Option<String>,

    /// Redis URL for the event channel; without one events stay in-process.
    #[arg(long)]
    redis_url: Option<String>,

    /// Settings file (default `~/.optimized-shifts/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides on top of loaded settings.
    fn apply(&self, settings: &mut ShiftsSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = &self.db_path {
            settings.database.path.clone_from(path);
        }
        if let Some(url) = &self.redis_url {
            settings.notifications.redis_url = Some(url.clone());
        }
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Redis when a URL is configured, in-process otherwise. The Redis bridge task
/// is pushed onto `tasks`.
fn build_channel(
    settings: &NotificationSettings,
    shutdown: &ShutdownCoordinator,
    tasks: &mut Vec<JoinHandle<()>>,
) -> Result<Arc<dyn EventChannel>> {
    let capacity = settings.channel_capacity;
    if let Some(url) = &settings.redis_url {
        let channel = RedisChannel::open(url, settings.channel_name.clone(), capacity)
            .context("Failed to configure Redis event channel")?;
        tasks.push(channel.spawn_bridge(shutdown.token()));
        tracing::info!(channel = channel.channel_name(), "using Redis event channel");
        Ok(Arc::new(channel))
    } else {
        tracing::info!(capacity, "using in-process event channel");
        Ok(Arc::new(LocalChannel::new(capacity)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(shifts_settings::settings_path);
    let mut settings = shifts_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    if settings.logging.json {
        logging::init_json_subscriber(&settings.logging.level);
    } else {
        logging::init_subscriber(&settings.logging.level);
    }
    let metrics_handle = shifts_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let db_path = settings.database.path.clone();
    if db_path != MEMORY_PATH {
        ensure_parent_dir(Path::new(&db_path))?;
    }
    let store = TripStore::open(&db_path)
        .with_context(|| format!("Failed to open database: {db_path}"))?;

    let shutdown = ShutdownCoordinator::new();
    let mut tasks = Vec::new();
    let channel = build_channel(&settings.notifications, &shutdown, &mut tasks)?;

    let (jobs, jobs_rx) = JobQueue::bounded(settings.jobs.queue_capacity);
    let worker = JobWorker::new(jobs_rx, store.clone(), channel.clone());
    tasks.push(tokio::spawn(worker.run(shutdown.token())));

    let server = ShiftsServer::new(ServerConfig::from_settings(&settings), store, jobs, channel)
        .with_shutdown(shutdown.clone())
        .with_metrics(metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("optimized-shifts listening on http://{addr}");

    shutdown.wait_for_signal().await;
    tracing::info!("Shutting down...");
    tasks.push(handle);
    shutdown
        .graceful_shutdown(tasks, server.config().shutdown_timeout())
        .await;

    let closed = server.registry().close_all().await;
    if closed > 0 {
        tracing::info!(closed, "closed remaining connections");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_leave_settings_alone() {
        let cli = Cli::parse_from(["optimized-shifts"]);
        let mut settings = ShiftsSettings::default();
        cli.apply(&mut settings);
        let defaults = ShiftsSettings::default();
        assert_eq!(settings.server.host, defaults.server.host);
        assert_eq!(settings.server.port, defaults.server.port);
        assert_eq!(settings.database.path, defaults.database.path);
        assert!(settings.notifications.redis_url.is_none());
    }

    #[test]
    fn cli_overrides_settings() {
        let cli = Cli::parse_from([
            "optimized-shifts",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
            "--db-path",
            "/tmp/trips.db",
            "--redis-url",
            "redis://localhost:6379/",
        ]);
        let mut settings = ShiftsSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.path, "/tmp/trips.db");
        assert_eq!(
            settings.notifications.redis_url.as_deref(),
            Some("redis://localhost:6379/")
        );
    }

    #[test]
    fn cli_settings_path() {
        let cli = Cli::parse_from(["optimized-shifts", "--settings", "/etc/shifts.json"]);
        assert_eq!(cli.settings, Some(PathBuf::from("/etc/shifts.json")));
    }

    #[test]
    fn ensure_parent_dir_creates_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("trips.db");
        ensure_parent_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
    }

    #[test]
    fn ensure_parent_dir_accepts_bare_file_name() {
        ensure_parent_dir(Path::new("trips.db")).unwrap();
    }

    #[tokio::test]
    async fn in_process_channel_without_redis_url() {
        let shutdown = ShutdownCoordinator::new();
        let mut tasks = Vec::new();
        let settings = NotificationSettings::default();
        let _channel = build_channel(&settings, &shutdown, &mut tasks).unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn redis_channel_spawns_bridge() {
        let shutdown = ShutdownCoordinator::new();
        let mut tasks = Vec::new();
        let settings = NotificationSettings {
            redis_url: Some("redis://127.0.0.1:1/".into()),
            ..NotificationSettings::default()
        };
        let _channel = build_channel(&settings, &shutdown, &mut tasks).unwrap();
        assert_eq!(tasks.len(), 1);
        shutdown
            .graceful_shutdown(tasks, std::time::Duration::from_secs(5))
            .await;
    }
}
