// src/engine/redirector.rs
//! Redirect engine orchestration
//!
//! Composes the pieces the interception hook must consult per request:
//! the readiness gate, the loop guard, and the pure decision policy.
//! Before the initial settings load completes the engine answers
//! `NoAction` unconditionally, so startup fails open to passthrough
//! rather than redirecting on default or partial settings.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::engine::loop_guard::LoopGuard;
use crate::engine::policy::{decide, Verdict};
use crate::settings::Settings;

/// Per-request decision engine
pub struct RedirectEngine {
    /// Live settings snapshot, replaced wholesale on every change
    settings_rx: watch::Receiver<Settings>,

    /// Shared loop guard
    guard: Arc<LoopGuard>,

    /// Flips once the initial settings load has finished
    ready: AtomicBool,

    /// Candidate URLs evaluated
    decision_count: AtomicU64,

    /// Redirect verdicts issued
    redirect_count: AtomicU64,
}

impl RedirectEngine {
    /// Create a new engine. Starts not ready; call
    /// [`RedirectEngine::mark_ready`] once settings have loaded.
    pub fn new(settings_rx: watch::Receiver<Settings>, guard: Arc<LoopGuard>) -> Self {
        Self {
            settings_rx,
            guard,
            ready: AtomicBool::new(false),
            decision_count: AtomicU64::new(0),
            redirect_count: AtomicU64::new(0),
        }
    }

    /// Open the gate. Called exactly once settings are in the channel,
    /// whether the initial load succeeded or fell back to defaults.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        info!("Redirect engine ready");
    }

    /// Check whether the engine is answering with real settings yet
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Evaluate one candidate URL at `now`.
    ///
    /// Order matters: the suppression check runs before the policy so a
    /// URL redirected moments ago passes through untouched, and a redirect
    /// is recorded in the guard only when one is actually issued.
    pub fn evaluate(&self, url: &str, now: Instant) -> Verdict {
        if !self.is_ready() {
            debug!("Engine not ready, passing {} through", url);
            return Verdict::NoAction;
        }

        self.decision_count.fetch_add(1, Ordering::Relaxed);

        if self.guard.should_suppress(url, now) {
            return Verdict::NoAction;
        }

        let settings = self.settings_rx.borrow().clone();
        let verdict = decide(&settings, url);

        if verdict.is_redirect() {
            self.guard.record(url, now);
            self.redirect_count.fetch_add(1, Ordering::Relaxed);
        }
        verdict
    }

    /// Get engine statistics
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            decision_count: self.decision_count.load(Ordering::Relaxed),
            redirect_count: self.redirect_count.load(Ordering::Relaxed),
            ready: self.is_ready(),
        }
    }
}

/// Engine statistics
#[derive(Debug, Clone)]
pub struct EngineStats {
    /// Candidate URLs evaluated since readiness
    pub decision_count: u64,

    /// Redirect verdicts issued
    pub redirect_count: u64,

    /// Whether the readiness gate is open
    pub ready: bool,
}
