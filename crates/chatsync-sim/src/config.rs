//! Simulator configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (CHATSYNC_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use chatsync_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Simulator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Synthetic workload.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Synthetic workload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Signed-in user ID.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Number of rooms joined at any time.
    #[serde(default = "default_rooms")]
    pub rooms: usize,

    /// Number of steps each producer runs.
    #[serde(default = "default_events_per_producer")]
    pub events_per_producer: usize,

    /// Delay between producer steps in milliseconds.
    #[serde(default = "default_producer_interval")]
    pub producer_interval_ms: u64,

    /// Delay between visibility flips in milliseconds.
    #[serde(default = "default_visibility_interval")]
    pub visibility_interval_ms: u64,

    /// Number of snapshot consumers.
    #[serde(default = "default_consumers")]
    pub consumers: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default)]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_user_id() -> String {
    std::env::var("CHATSYNC_USER").unwrap_or_else(|_| "danielle".to_string())
}

fn default_rooms() -> usize {
    std::env::var("CHATSYNC_ROOMS")
        .ok()
        .and_then(|r| r.parse().ok())
        .unwrap_or(8)
}

fn default_events_per_producer() -> usize {
    200
}

fn default_producer_interval() -> u64 {
    5
}

fn default_visibility_interval() -> u64 {
    250
}

fn default_consumers() -> usize {
    3
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            rooms: default_rooms(),
            events_per_producer: default_events_per_producer(),
            producer_interval_ms: default_producer_interval(),
            visibility_interval_ms: default_visibility_interval(),
            consumers: default_consumers(),
        }
    }
}

impl SimulationConfig {
    /// Delay between producer steps. Never zero.
    #[must_use]
    pub fn producer_interval(&self) -> Duration {
        Duration::from_millis(self.producer_interval_ms.max(1))
    }

    /// Delay between visibility flips. Never zero.
    #[must_use]
    pub fn visibility_interval(&self) -> Duration {
        Duration::from_millis(self.visibility_interval_ms.max(1))
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "chatsync.toml",
            "/etc/chatsync/chatsync.toml",
            "~/.config/chatsync/chatsync.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}
