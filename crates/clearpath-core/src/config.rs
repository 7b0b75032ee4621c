//! Configuration loading and typed config structures.
//!
//! The optional configuration file is `clearpath-config.yaml` in the
//! working directory. Every field has a default, so an empty or missing
//! file yields the stock demo: port 5000, a 34-second scenario, and an
//! analytics refresh every 30 seconds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration. Mirrors the structure of `clearpath-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClearPathConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Scenario timeline delays.
    #[serde(default)]
    pub scenario: ScenarioConfig,

    /// Analytics ticker settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl ClearPathConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values for the listener:
    /// - `CLEARPATH_HOST` overrides `server.host`
    /// - `CLEARPATH_PORT` overrides `server.port`
    /// - `CLEARPATH_STATIC_DIR` overrides `server.static_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidEnv`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_yaml(yaml)?;
        config.server.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not to an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of dashboard assets served at `/`. Disabled when unset.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl ServerSection {
    /// Apply `CLEARPATH_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if `CLEARPATH_PORT` is not a
    /// valid port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("CLEARPATH_HOST") {
            self.host = val;
        }
        if let Ok(val) = std::env::var("CLEARPATH_PORT") {
            self.port = val.parse().map_err(|_parse_err| ConfigError::InvalidEnv {
                name: "CLEARPATH_PORT",
                value: val.clone(),
            })?;
        }
        if let Ok(val) = std::env::var("CLEARPATH_STATIC_DIR") {
            self.static_dir = Some(PathBuf::from(val));
        }
        Ok(())
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Delays of the scripted emergency timeline, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Wait after trigger before the first alert.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Wait between an alert and its driver notification.
    #[serde(default = "default_half_second_ms")]
    pub notification_delay_ms: u64,

    /// Wait between a notification and the signal preemption.
    #[serde(default = "default_half_second_ms")]
    pub preempt_delay_ms: u64,

    /// Wait before alerting the next junction.
    #[serde(default = "default_two_seconds_ms")]
    pub next_signal_delay_ms: u64,

    /// Wait between ambulance position updates.
    #[serde(default = "default_two_seconds_ms")]
    pub position_interval_ms: u64,

    /// Number of position updates before arrival.
    #[serde(default = "default_position_steps")]
    pub position_steps: u32,

    /// Wait after the last position update before arrival.
    #[serde(default = "default_two_seconds_ms")]
    pub completion_delay_ms: u64,
}

impl ScenarioConfig {
    /// Delay before the first alert.
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Delay between alert and notification.
    pub const fn notification_delay(&self) -> Duration {
        Duration::from_millis(self.notification_delay_ms)
    }

    /// Delay between notification and preemption.
    pub const fn preempt_delay(&self) -> Duration {
        Duration::from_millis(self.preempt_delay_ms)
    }

    /// Delay before moving on to the next junction.
    pub const fn next_signal_delay(&self) -> Duration {
        Duration::from_millis(self.next_signal_delay_ms)
    }

    /// Delay between position updates.
    pub const fn position_interval(&self) -> Duration {
        Duration::from_millis(self.position_interval_ms)
    }

    /// Delay before arrival.
    pub const fn completion_delay(&self) -> Duration {
        Duration::from_millis(self.completion_delay_ms)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            notification_delay_ms: default_half_second_ms(),
            preempt_delay_ms: default_half_second_ms(),
            next_signal_delay_ms: default_two_seconds_ms(),
            position_interval_ms: default_two_seconds_ms(),
            position_steps: default_position_steps(),
            completion_delay_ms: default_two_seconds_ms(),
        }
    }
}

/// Analytics ticker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalyticsConfig {
    /// Milliseconds between analytics refreshes.
    #[serde(default = "default_analytics_interval_ms")]
    pub interval_ms: u64,
}

impl AnalyticsConfig {
    /// Refresh interval.
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_analytics_interval_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_initial_delay_ms() -> u64 {
    1000
}

const fn default_half_second_ms() -> u64 {
    500
}

const fn default_two_seconds_ms() -> u64 {
    2000
}

const fn default_position_steps() -> u32 {
    12
}

const fn default_analytics_interval_ms() -> u64 {
    30_000
}
