//! Runtime configuration (persisted as `ezviewer.toml` in the app directory).
//!
//! Every field has a serde default, so a missing file or a partial file both
//! produce a usable configuration. The CLI applies `--port`/`--host` on top.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub history: HistorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Knobs of a streaming session: history size and live batching thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamSettings {
    /// Lines of history sent before going live.
    #[serde(default = "default_history_lines")]
    pub history_lines: usize,
    /// Maximum lines per history message.
    #[serde(default = "default_history_chunk_lines")]
    pub history_chunk_lines: usize,
    /// Live buffer is flushed once it holds this many lines.
    #[serde(default = "default_batch_max_lines")]
    pub batch_max_lines: usize,
    /// Live buffer is flushed once its oldest line has waited this long.
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
    /// Sleep between polls when the file has nothing new.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            history_lines: default_history_lines(),
            history_chunk_lines: default_history_chunk_lines(),
            batch_max_lines: default_batch_max_lines(),
            batch_interval_ms: default_batch_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl StreamSettings {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistorySettings {
    /// Upper bound for `count` in a pagination request.
    #[serde(default = "default_max_page_lines")]
    pub max_page_lines: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_page_lines: default_max_page_lines(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_history_lines() -> usize {
    500
}

fn default_history_chunk_lines() -> usize {
    200
}

fn default_batch_max_lines() -> usize {
    50
}

fn default_batch_interval_ms() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_max_page_lines() -> usize {
    5000
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load the config from `path`; a missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
