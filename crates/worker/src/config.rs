use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ffpipe_engine::EngineConfig;

use crate::gate::DEFAULT_INBOUND_CAPACITY;

/// Default delay between a lost connection and the next attempt.
const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Dispatch server WebSocket endpoint.
    pub server_url: String,
    /// Delay before reconnecting after a connection ends (default: 5 s).
    pub reconnect_delay: Duration,
    /// Inbound frames buffered ahead of the protocol task (default: `64`).
    pub inbound_capacity: usize,
    pub engine: EngineConfig,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                  | Required | Default                 |
    /// |--------------------------|----------|-------------------------|
    /// | `SERVER_WS_URL`          | yes      | --                      |
    /// | `RECONNECT_DELAY_SECS`   | no       | `5`                     |
    /// | `FFMPEG_BIN`             | no       | `ffmpeg`                |
    /// | `FFPROBE_BIN`            | no       | `ffprobe`               |
    /// | `SCRATCH_DIR`            | no       | `<system temp>/ffpipe`  |
    /// | `INBOUND_QUEUE_CAPACITY` | no       | `64`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_url = lookup("SERVER_WS_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SERVER_WS_URL"))?;

        let reconnect_secs: u64 = parse_or(&lookup, "RECONNECT_DELAY_SECS", DEFAULT_RECONNECT_DELAY_SECS)?;
        let inbound_capacity: usize = parse_or(&lookup, "INBOUND_QUEUE_CAPACITY", DEFAULT_INBOUND_CAPACITY)?;
        if inbound_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "INBOUND_QUEUE_CAPACITY",
                value: "0".into(),
            });
        }

        let mut engine = EngineConfig::default();
        if let Some(bin) = lookup("FFMPEG_BIN") {
            engine.ffmpeg_bin = PathBuf::from(bin);
        }
        if let Some(bin) = lookup("FFPROBE_BIN") {
            engine.ffprobe_bin = PathBuf::from(bin);
        }
        if let Some(dir) = lookup("SCRATCH_DIR") {
            engine.scratch_root = PathBuf::from(dir);
        }

        Ok(Self {
            server_url: server_url.trim().to_string(),
            reconnect_delay: Duration::from_secs(reconnect_secs),
            inbound_capacity,
            engine,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
