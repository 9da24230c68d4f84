//! Configuration module for Listen Monitor.
//!
//! This module handles parsing configuration from environment variables.
//! Every variable is optional; an unset variable falls back to its default.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LISTEN_MONITOR_ROOT` | `.` | Directory tree to watch |
//! | `LISTEN_MONITOR_RELATIVE_PATHS` | `false` | Report paths relative to the root |
//! | `LISTEN_MONITOR_LATENCY_MS` | 100 | Window used to group events into one batch |
//! | `LISTEN_MONITOR_FORCE_POLLING` | `false` | Use the polling backend instead of native events |
//! | `LISTEN_MONITOR_POLL_INTERVAL_MS` | 1000 | Polling interval when polling is forced |
//! | `LISTEN_MONITOR_BUFFER_SIZE` | 1000 | Capacity of the watcher's event and batch channels |
//! | `LISTEN_MONITOR_IGNORE` | (none) | Comma-separated extra names to ignore |
//! | `LISTEN_MONITOR_STARTUP_URL` | `http://apple.com` | Target of the startup notification |
//!
//! # Example
//!
//! ```no_run
//! use listen_monitor::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Watching: {}", config.root.display());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::ignore::IgnoreRules;
use crate::watcher::WatchOptions;

/// Default root directory.
const DEFAULT_ROOT: &str = ".";

/// Default batch window in milliseconds.
pub const DEFAULT_LATENCY_MS: u64 = 100;

/// Default polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default change batch channel capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Default activation target of the startup notification.
pub const DEFAULT_STARTUP_URL: &str = "http://apple.com";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the Listen Monitor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the watched directory tree.
    pub root: PathBuf,

    /// Whether paths are reported relative to `root` instead of absolute.
    pub relative_paths: bool,

    /// Window during which raw events are grouped into one batch.
    pub latency: Duration,

    /// Whether to use the polling backend.
    pub force_polling: bool,

    /// Interval of the polling backend.
    pub poll_interval: Duration,

    /// Capacity of the watcher's internal event channel and of the change
    /// batch channel.
    pub buffer_size: usize,

    /// Extra path component names to ignore on top of the defaults.
    pub extra_ignores: Vec<String>,

    /// URI attached to the startup notification.
    pub startup_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            relative_paths: false,
            latency: Duration::from_millis(DEFAULT_LATENCY_MS),
            force_polling: false,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            buffer_size: DEFAULT_BUFFER_SIZE,
            extra_ignores: Vec::new(),
            startup_url: DEFAULT_STARTUP_URL.to_string(),
        }
    }
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a boolean variable is not a recognised
    /// boolean, or a numeric variable is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let root = env::var("LISTEN_MONITOR_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.root);

        let relative_paths = parse_bool("LISTEN_MONITOR_RELATIVE_PATHS")?.unwrap_or(false);

        let latency = parse_positive::<u64>("LISTEN_MONITOR_LATENCY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.latency);

        let force_polling = parse_bool("LISTEN_MONITOR_FORCE_POLLING")?.unwrap_or(false);

        let poll_interval = parse_positive::<u64>("LISTEN_MONITOR_POLL_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        let buffer_size =
            parse_positive::<usize>("LISTEN_MONITOR_BUFFER_SIZE")?.unwrap_or(DEFAULT_BUFFER_SIZE);

        let extra_ignores = env::var("LISTEN_MONITOR_IGNORE")
            .map(|val| {
                val.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let startup_url = env::var("LISTEN_MONITOR_STARTUP_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.startup_url);

        Ok(Self {
            root,
            relative_paths,
            latency,
            force_polling,
            poll_interval,
            buffer_size,
            extra_ignores,
            startup_url,
        })
    }

    /// Builds the watcher options described by this configuration.
    #[must_use]
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            root: self.root.clone(),
            relative_paths: self.relative_paths,
            latency: self.latency,
            force_polling: self.force_polling,
            poll_interval: self.poll_interval,
            buffer_size: self.buffer_size,
            ignore: IgnoreRules::default().with_extra(self.extra_ignores.iter().cloned()),
        }
    }
}

/// Parses an optional boolean variable.
fn parse_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    let Ok(val) = env::var(key) else {
        return Ok(None);
    };

    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected boolean, got '{val}'"),
        }),
    }
}

/// Parses an optional integer variable that must be greater than zero.
fn parse_positive<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Ok(val) = env::var(key) else {
        return Ok(None);
    };

    let parsed = val
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected positive integer, got '{val}'"),
        })?;

    if parsed <= T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value must be greater than 0".to_string(),
        });
    }

    Ok(Some(parsed))
}
