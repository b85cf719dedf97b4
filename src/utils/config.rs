// src/utils/config.rs
//! Engine configuration
//!
//! Loaded once at startup from an optional `redirector.toml` in the working
//! directory, with `REDIRECTOR__`-prefixed environment variables layered on
//! top (e.g. `REDIRECTOR__SERVER__PORT=3128`). Every field has a default so
//! the binary runs with no configuration at all.

use crate::engine::loop_guard::LoopGuardConfig;
use crate::utils::errors::{RedirectorError, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Proxy listener address
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host for the interception proxy
    pub host: String,

    /// Bind port for the interception proxy
    pub port: u16,
}

impl ServerConfig {
    /// Bind address in `host:port` form
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
        }
    }
}

/// Settings store location and change-polling cadence
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsSourceConfig {
    /// Path to the persisted settings file (JSON)
    pub path: PathBuf,

    /// How often to poll the file for out-of-band edits (seconds)
    pub poll_interval_secs: u64,
}

impl Default for SettingsSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("settings.json"),
            poll_interval_secs: 2,
        }
    }
}

/// Prometheus exporter settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the Prometheus scrape endpoint
    pub enabled: bool,

    /// Bind host for the scrape endpoint
    pub host: String,

    /// Bind port for the scrape endpoint
    pub port: u16,
}

impl MetricsConfig {
    /// Bind address in `host:port` form
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 9000,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interception proxy listener
    pub server: ServerConfig,

    /// Settings store glue
    pub settings: SettingsSourceConfig,

    /// Loop guard tunables (cooldown, high-water mark, retain count)
    pub guard: LoopGuardConfig,

    /// Metrics exporter
    pub metrics: MetricsConfig,
}

impl EngineConfig {
    /// Load configuration from `redirector.toml` (optional) and environment
    pub fn load() -> Result<Self> {
        Self::load_from("redirector")
    }

    /// Load configuration with an explicit file stem (used in tests)
    pub fn load_from(name: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(name).required(false))
            .add_source(config::Environment::with_prefix("REDIRECTOR").separator("__"))
            .build()
            .map_err(|e| RedirectorError::ConfigError(format!("Failed to read config: {}", e)))?
            .try_deserialize()
            .map_err(|e| RedirectorError::ConfigError(format!("Invalid config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8888);
        assert_eq!(config.settings.path, PathBuf::from("settings.json"));
        assert_eq!(config.settings.poll_interval_secs, 2);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_guard_defaults_wired_in() {
        let config = EngineConfig::default();
        assert_eq!(config.guard.cooldown_ms, 5_000);
        assert_eq!(config.guard.high_water_mark, 100);
        assert_eq!(config.guard.retain_count, 50);
        assert_eq!(config.guard.sweep_interval_secs, 60);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        // No "does-not-exist.toml" anywhere; the source is optional.
        let config = EngineConfig::load_from("does-not-exist").unwrap();
        assert_eq!(config.server.port, 8888);
    }
}
