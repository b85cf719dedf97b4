// src/observability/mod.rs
//! Observability bootstrap
//!
//! Tracing and metrics initialization for the redirector process. Logging
//! honors `RUST_LOG` and falls back to info globally with debug for this
//! crate; `LOG_FORMAT=json` switches to machine-readable output.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::utils::config::MetricsConfig;
use crate::utils::errors::{RedirectorError, Result};

/// Initialize the tracing subscriber
pub fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,redlib_redirector=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    let result = if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| {
        RedirectorError::ObservabilityFailed(format!("Failed to init tracing: {}", e))
    })
}

/// Install the Prometheus recorder and its scrape endpoint
pub fn init_metrics(config: &MetricsConfig) -> Result<()> {
    let addr: SocketAddr = config.listen_addr().parse().map_err(|e| {
        RedirectorError::ObservabilityFailed(format!("Invalid metrics address: {}", e))
    })?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            RedirectorError::ObservabilityFailed(format!(
                "Failed to install metrics exporter: {}",
                e
            ))
        })?;

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::new("info,redlib_redirector=debug");
        assert!(format!("{}", filter).contains("redlib_redirector"));
    }
}
