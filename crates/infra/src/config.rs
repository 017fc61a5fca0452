//! Configuration loading and representation.
//!
//! Settings come from the process environment with documented fallbacks:
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `EVENTSTORE_IP` | `localhost` | `host` |
//! | `EVENTSTORE_PORT` | `2113` | `port` |
//! | `EVENTSTORE_STREAM_NAME` | `cricket_events_v1` | `stream_name` |
//! | `EVENTSTORE_SCHEMA_PATH` | unset (no validation) | `schema_path` |
//! | `EVENTSTORE_EVENT_TYPE` | `cricket_event` | `event_type` |
//! | `EVENTSTORE_DEDUP_WINDOW_SECS` | `300` | `dedup.window` |
//! | `EVENTSTORE_DEDUP_CLEANUP_SECS` | `30` | `dedup.cleanup_interval` |
//! | `EVENTSTORE_READ_BACKOFF_SECS` | `30` | `replay.backoff` |
//!
//! Empty values are treated the same as absent ones.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use eventgate_events::DEFAULT_EVENT_TYPE;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 2113;
pub const DEFAULT_STREAM_NAME: &str = "cricket_events_v1";

pub const ENV_HOST: &str = "EVENTSTORE_IP";
pub const ENV_PORT: &str = "EVENTSTORE_PORT";
pub const ENV_STREAM_NAME: &str = "EVENTSTORE_STREAM_NAME";
pub const ENV_SCHEMA_PATH: &str = "EVENTSTORE_SCHEMA_PATH";
pub const ENV_EVENT_TYPE: &str = "EVENTSTORE_EVENT_TYPE";
pub const ENV_DEDUP_WINDOW_SECS: &str = "EVENTSTORE_DEDUP_WINDOW_SECS";
pub const ENV_DEDUP_CLEANUP_SECS: &str = "EVENTSTORE_DEDUP_CLEANUP_SECS";
pub const ENV_READ_BACKOFF_SECS: &str = "EVENTSTORE_READ_BACKOFF_SECS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} must be a port number (0-65535), got '{value}'")]
    InvalidPort { var: &'static str, value: String },
}

/// Deduplication window settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// How long a fingerprint stays visible after its most recent insert.
    pub window: Duration,
    /// How often expired fingerprints are physically removed.
    pub cleanup_interval: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(5 * 60),
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

/// Stream replay settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Fixed pause before re-reading after a transient store fault.
    pub backoff: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(30),
        }
    }
}

/// Full client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub stream_name: String,
    /// JSON-Schema document for raw-document validation (none = no validation).
    pub schema_path: Option<PathBuf>,
    pub event_type: String,
    pub dedup: DedupConfig,
    pub replay: ReplayConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            stream_name: DEFAULT_STREAM_NAME.to_string(),
            schema_path: None,
            event_type: DEFAULT_EVENT_TYPE.to_string(),
            dedup: DedupConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let host = get(ENV_HOST).unwrap_or_else(|| {
            info!(value = ENV_HOST, "unable to find env var, using default `{DEFAULT_HOST}`");
            defaults.host.clone()
        });

        let port = match get(ENV_PORT) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort {
                var: ENV_PORT,
                value: raw.clone(),
            })?,
            None => {
                info!(value = ENV_PORT, "unable to find env var, using default `{DEFAULT_PORT}`");
                defaults.port
            }
        };

        let stream_name = get(ENV_STREAM_NAME).unwrap_or_else(|| {
            info!(
                value = ENV_STREAM_NAME,
                "unable to find env var, using default `{DEFAULT_STREAM_NAME}`"
            );
            defaults.stream_name.clone()
        });

        let schema_path = get(ENV_SCHEMA_PATH).map(PathBuf::from);
        let event_type = get(ENV_EVENT_TYPE).unwrap_or(defaults.event_type);

        let dedup = DedupConfig {
            window: secs(&get, ENV_DEDUP_WINDOW_SECS)?.unwrap_or(defaults.dedup.window),
            cleanup_interval: secs(&get, ENV_DEDUP_CLEANUP_SECS)?
                .unwrap_or(defaults.dedup.cleanup_interval),
        };
        let replay = ReplayConfig {
            backoff: secs(&get, ENV_READ_BACKOFF_SECS)?.unwrap_or(defaults.replay.backoff),
        };

        Ok(Self {
            host,
            port,
            stream_name,
            schema_path,
            event_type,
            dedup,
            replay,
        })
    }

    /// Base URL of the store's HTTP endpoint.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn secs<G>(get: &G, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidNumber { var, value: raw })
        })
        .transpose()
}
