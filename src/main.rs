// src/main.rs
//! Redlib Redirector
//!
//! Self-hosted redirect engine that intercepts Reddit-bound HTTP traffic
//! and reroutes it to a configured Redlib instance.

use anyhow::Result;
use redlib_redirector::engine::loop_guard::LoopGuard;
use redlib_redirector::engine::redirector::RedirectEngine;
use redlib_redirector::interception::proxy::RedirectProxy;
use redlib_redirector::interception::watch_list::WatchList;
use redlib_redirector::observability::{init_metrics, init_tracing};
use redlib_redirector::settings::SettingsStore;
use redlib_redirector::utils::config::EngineConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize observability (tracing, logging)
    init_tracing()?;

    info!(
        "Starting Redlib Redirector v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = EngineConfig::load()?;
    info!("Configuration loaded: {:?}", config);

    if config.metrics.enabled {
        init_metrics(&config.metrics)?;
    }

    // Settings store with live change notification
    let store = Arc::new(SettingsStore::new(config.settings.path.clone()));
    store.spawn_watcher(Duration::from_secs(config.settings.poll_interval_secs));

    // Decision engine behind its readiness gate
    let guard = Arc::new(LoopGuard::new(config.guard.clone()));
    guard.spawn_sweeper();
    let engine = Arc::new(RedirectEngine::new(store.subscribe(), guard));

    // Load settings in the background. A failed load leaves the default
    // snapshot in place and opens the gate anyway, so the process degrades
    // to redirecting with defaults instead of never redirecting.
    {
        let store = Arc::clone(&store);
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if let Err(e) = store.load().await {
                warn!("Initial settings load failed, using defaults: {}", e);
            }
            engine.mark_ready();
        });
    }

    // Interception proxy
    let watch_list = Arc::new(WatchList::with_defaults());
    let proxy = Arc::new(RedirectProxy::new(
        config.server.clone(),
        watch_list,
        engine,
    ));

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    // Run proxy with graceful shutdown
    tokio::select! {
        result = proxy.start() => match result {
            Ok(_) => {
                info!("Proxy stopped");
                Ok(())
            }
            Err(e) => {
                error!("Proxy error: {}", e);
                Err(e.into())
            }
        },
        _ = shutdown_signal => {
            info!("Proxy stopped gracefully");
            Ok(())
        }
    }
}
