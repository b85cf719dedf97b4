// src/settings/mod.rs
//! Settings layer
//!
//! - Model: the `Settings` snapshot and its validation/normalization rules
//! - Store: JSON persistence plus watch-channel change notification

pub mod model;
pub mod store;

pub use model::{RedirectMode, Settings};
pub use store::SettingsStore;
