// src/engine/loop_guard.rs
//! Redirect loop guard
//!
//! Tracks recently redirected URLs so the same URL is not rewritten again
//! within a cooldown window. The map is bounded by dual eviction: an age
//! pass drops entries past the cooldown, and a capacity trim keeps only
//! the most recently redirected entries when the map still exceeds its
//! high-water mark after the age pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::gauge;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::debug;

/// Loop guard tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoopGuardConfig {
    /// Suppression window in milliseconds
    pub cooldown_ms: u64,

    /// Map size that triggers the bounded cleanup
    pub high_water_mark: usize,

    /// Entries kept by the capacity trim
    pub retain_count: usize,

    /// Cadence of the background sweep in seconds
    pub sweep_interval_secs: u64,
}

impl Default for LoopGuardConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 5_000,      // 5 seconds
            high_water_mark: 100,
            retain_count: 50,
            sweep_interval_secs: 60, // 1 minute
        }
    }
}

impl LoopGuardConfig {
    /// Suppression window as a `Duration`
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Recently-redirected URL tracker
pub struct LoopGuard {
    /// Guard tuning
    config: LoopGuardConfig,

    /// URL to instant of its last redirect
    entries: DashMap<String, Instant>,

    /// Redirects suppressed inside the cooldown window
    suppress_count: AtomicU64,

    /// Redirects recorded
    record_count: AtomicU64,

    /// Entries dropped by age or capacity
    evict_count: AtomicU64,
}

impl LoopGuard {
    /// Create a new loop guard
    pub fn new(config: LoopGuardConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
            suppress_count: AtomicU64::new(0),
            record_count: AtomicU64::new(0),
            evict_count: AtomicU64::new(0),
        }
    }

    /// True when `url` was redirected less than a cooldown ago. Does not
    /// touch the tracked entries.
    pub fn should_suppress(&self, url: &str, now: Instant) -> bool {
        let suppressed = match self.entries.get(url) {
            Some(entry) => now.saturating_duration_since(*entry) < self.config.cooldown(),
            None => false,
        };
        if suppressed {
            self.suppress_count.fetch_add(1, Ordering::Relaxed);
            debug!("Suppressing repeat redirect for {}", url);
        }
        suppressed
    }

    /// Record a redirect for `url`, overwriting any prior timestamp, then
    /// run the bounded cleanup if the map has grown past the high-water
    /// mark.
    pub fn record(&self, url: &str, now: Instant) {
        self.entries.insert(url.to_string(), now);
        self.record_count.fetch_add(1, Ordering::Relaxed);

        if self.entries.len() > self.config.high_water_mark {
            self.cleanup(now);
        }
    }

    /// Drop every entry whose last redirect is at least a cooldown old.
    /// Idempotent; safe to call on any cadence.
    pub fn sweep(&self, now: Instant) {
        let before = self.entries.len();
        let cooldown = self.config.cooldown();
        self.entries
            .retain(|_, recorded| now.saturating_duration_since(*recorded) < cooldown);

        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.evict_count.fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Swept {} expired redirect entries", removed);
        }
    }

    /// Bounded cleanup: age pass first, then a capacity trim that sorts
    /// the surviving entries by recency and keeps only the retain count.
    fn cleanup(&self, now: Instant) {
        self.sweep(now);

        if self.entries.len() <= self.config.high_water_mark {
            return;
        }

        let mut survivors: Vec<(String, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        survivors.sort_by(|a, b| b.1.cmp(&a.1));

        let mut trimmed = 0u64;
        for (url, _) in survivors.iter().skip(self.config.retain_count) {
            if self.entries.remove(url).is_some() {
                trimmed += 1;
            }
        }
        if trimmed > 0 {
            self.evict_count.fetch_add(trimmed, Ordering::Relaxed);
            debug!("Trimmed {} entries past the retain count", trimmed);
        }
    }

    /// Number of tracked URLs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the guard is tracking nothing
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get guard statistics
    pub fn stats(&self) -> GuardStats {
        GuardStats {
            suppress_count: self.suppress_count.load(Ordering::Relaxed),
            record_count: self.record_count.load(Ordering::Relaxed),
            evict_count: self.evict_count.load(Ordering::Relaxed),
            tracked: self.entries.len(),
        }
    }

    /// Spawn the periodic sweep task
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let guard = Arc::clone(self);
        let interval = Duration::from_secs(self.config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                guard.sweep(Instant::now());
                gauge!("redirector_tracked_urls").set(guard.len() as f64);
            }
        })
    }
}

/// Guard statistics
#[derive(Debug, Clone)]
pub struct GuardStats {
    /// Redirects suppressed inside the cooldown window
    pub suppress_count: u64,

    /// Redirects recorded
    pub record_count: u64,

    /// Entries evicted by age or capacity
    pub evict_count: u64,

    /// URLs currently tracked
    pub tracked: usize,
}
