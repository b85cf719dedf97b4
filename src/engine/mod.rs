// src/engine/mod.rs
//! Redirect decision engine
//!
//! - Policy: the pure settings-plus-URL to verdict function
//! - Loop guard: cooldown tracking with bounded memory
//! - Redirector: the per-request orchestration the hook layer calls

pub mod loop_guard;
pub mod policy;
pub mod redirector;

pub use loop_guard::{GuardStats, LoopGuard, LoopGuardConfig};
pub use policy::{decide, Verdict};
pub use redirector::{EngineStats, RedirectEngine};
