//! Host configuration schema.
//!
//! Deserialized from a TOML file plus environment overlay via the
//! `config` crate. Every field has a default so an embedder can start a
//! host with `HostConfig::default()` and no file on disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Root host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Directory layout for the host instance.
    #[serde(default)]
    pub directories: DirectoryConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Tick and load cadence settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            directories: DirectoryConfig::default(),
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl HostConfig {
    /// Loads configuration from the given TOML file (without extension),
    /// overlaid with `MODHUB`-prefixed environment variables.
    pub fn load(path: &str) -> Result<Self, HostError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("MODHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| HostError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| HostError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

/// Directory layout of a host instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory scanned for plugin sources.
    #[serde(default = "default_plugin_dir")]
    pub plugins: PathBuf,
    /// Directory for plugin data files.
    #[serde(default = "default_data_dir")]
    pub data: PathBuf,
    /// Directory for log output.
    #[serde(default = "default_log_dir")]
    pub logs: PathBuf,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            plugins: default_plugin_dir(),
            data: default_data_dir(),
            logs: default_log_dir(),
        }
    }
}

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `"trace"`, `"debug"`, `"info"`, `"warn"`, `"error"`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format: `"json"` or `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Tick cadence and load-wait settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Milliseconds between host ticks in the standalone binary.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Milliseconds slept between polls while waiting for asynchronous
    /// plugin loads to finish.
    #[serde(default = "default_load_poll_ms")]
    pub load_poll_ms: u64,
    /// Seconds after which the bulk-load path stops waiting for a loader
    /// that still reports pending loads.
    #[serde(default = "default_load_wait_secs")]
    pub load_wait_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            load_poll_ms: default_load_poll_ms(),
            load_wait_secs: default_load_wait_secs(),
        }
    }
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("plugins")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("data/logs")
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_load_poll_ms() -> u64 {
    25
}

fn default_load_wait_secs() -> u64 {
    30
}
