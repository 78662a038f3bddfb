//! Settings type definitions.
//!
//! Field names are camelCase in JSON. Every section is `#[serde(default)]`, so
//! a partial file only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShiftsSettings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Live notification delivery.
    pub notifications: NotificationSettings,
    /// Relational store.
    pub database: DatabaseSettings,
    /// Background ingestion jobs.
    pub jobs: JobSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl ShiftsSettings {
    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.notifications.poll_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "notifications.pollIntervalMs must be positive".into(),
            ));
        }
        if self.notifications.probe_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "notifications.probeTimeoutMs must be positive".into(),
            ));
        }
        if self.notifications.channel_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "notifications.channelCapacity must be positive".into(),
            ));
        }
        if self.jobs.queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "jobs.queueCapacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Grace period for in-flight tasks on shutdown, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Live notification settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    /// How long a liveness probe waits for each of send and `pong`.
    pub probe_timeout_ms: u64,
    /// Longest wait between two probes while no event is pending.
    pub poll_interval_ms: u64,
    /// Events retained per subscriber before it starts lagging.
    pub channel_capacity: usize,
    /// Redis URL; when absent events stay in-process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,
    /// Redis pub/sub channel name.
    pub channel_name: String,
}

impl NotificationSettings {
    /// Probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 5_000,
            poll_interval_ms: 100,
            channel_capacity: 256,
            redis_url: None,
            channel_name: "notifications".to_string(),
        }
    }
}

/// Relational store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// `SQLite` file path; `:memory:` keeps everything in memory.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "trips.db".to_string(),
        }
    }
}

/// Background job settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSettings {
    /// Jobs that may wait in the queue before submissions are refused.
    pub queue_capacity: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ShiftsSettings::default().validate().unwrap();
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let mut settings = ShiftsSettings::default();
        settings.notifications.poll_interval_ms = 0;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("pollIntervalMs"));
    }

    #[test]
    fn zero_queue_capacity_is_invalid() {
        let mut settings = ShiftsSettings::default();
        settings.jobs.queue_capacity = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn durations() {
        let n = NotificationSettings::default();
        assert_eq!(n.probe_timeout(), Duration::from_secs(5));
        assert_eq!(n.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn json_uses_camel_case() {
        let json = serde_json::to_value(ShiftsSettings::default()).unwrap();
        assert_eq!(json["notifications"]["probeTimeoutMs"], 5_000);
        assert_eq!(json["server"]["shutdownTimeoutMs"], 10_000);
        assert!(json["notifications"].get("redisUrl").is_none());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: ShiftsSettings =
            serde_json::from_str(r#"{"notifications":{"redisUrl":"redis://cache/"}}"#).unwrap();
        assert_eq!(
            settings.notifications.redis_url.as_deref(),
            Some("redis://cache/")
        );
        assert_eq!(settings.notifications.poll_interval_ms, 100);
        assert_eq!(settings.server.port, 8000);
    }
}
