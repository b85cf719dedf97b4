// src/utils/errors.rs
//! Error types for the redirector
//!
//! The decision core itself never raises: malformed input degrades to a
//! passthrough verdict. These errors cover the surrounding facilities,
//! namely configuration, the settings store, and the interception proxy.

use thiserror::Error;

/// Errors produced by the redirector's supporting layers
#[derive(Debug, Error)]
pub enum RedirectorError {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A settings snapshot failed producer-side validation
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings store I/O or (de)serialization failure
    #[error("Settings store error: {0}")]
    SettingsFailed(String),

    /// Proxy listener or upstream forwarding failure
    #[error("Interception error: {0}")]
    InterceptionFailed(String),

    /// Tracing or metrics initialization failure
    #[error("Observability error: {0}")]
    ObservabilityFailed(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, RedirectorError>;
