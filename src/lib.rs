// src/lib.rs
//! Redlib Redirector Library
//!
//! This library provides the core components for rerouting Reddit traffic
//! to a self-hosted Redlib instance.
//!
//! # Architecture
//!
//! The redirector is structured into several key modules:
//!
//! - **engine**: Redirect policy, loop guard, and per-request orchestration
//! - **interception**: Watch list and the redirecting forward proxy
//! - **settings**: Settings snapshot, persistence, and change notification
//! - **observability**: Metrics, tracing, and logging
//! - **utils**: Configuration and error types

// Public module exports
pub mod engine;
pub mod interception;
pub mod observability;
pub mod settings;
pub mod utils;

// Re-export commonly used types
pub use engine::loop_guard::{LoopGuard, LoopGuardConfig};
pub use engine::policy::{decide, Verdict};
pub use engine::redirector::RedirectEngine;
pub use interception::proxy::RedirectProxy;
pub use interception::watch_list::WatchList;
pub use settings::{RedirectMode, Settings, SettingsStore};
pub use utils::config::EngineConfig;
pub use utils::errors::{RedirectorError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
