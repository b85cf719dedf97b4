// src/utils/mod.rs
//! Common utilities: configuration loading and error types

pub mod config;
pub mod errors;

// Re-export commonly used types
pub use config::EngineConfig;
pub use errors::{RedirectorError, Result};
