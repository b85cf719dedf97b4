// src/settings/model.rs
//! Redirect settings snapshot
//!
//! `Settings` is an immutable snapshot, replaced wholesale on every change.
//! The persisted JSON shape uses the same keys as the snapshot (`enabled`,
//! `baseUrl`, `mode`); any key missing from a stored document falls back to
//! its default, so partial files always deserialize into a complete,
//! self-consistent snapshot.

use crate::utils::errors::{RedirectorError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Transformation strategy applied to candidate URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectMode {
    /// Graft the candidate's path, query, and fragment onto the base URL
    PathPreserve,

    /// Hand the full original URL to the base as a `url` query parameter
    PassUrl,

    /// Any mode string this build does not know; the engine fails safe on it
    #[serde(other)]
    Unrecognized,
}

/// Redirect settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Global kill switch
    pub enabled: bool,

    /// Destination origin, e.g. `https://redlib.perennialte.ch`
    pub base_url: String,

    /// Transformation strategy
    pub mode: RedirectMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://redlib.perennialte.ch".to_string(),
            mode: RedirectMode::PathPreserve,
        }
    }
}

impl Settings {
    /// Producer-side validation, applied when a snapshot is saved through
    /// the store's update hook. The decision engine never relies on this:
    /// it degrades to passthrough on anything validation would reject.
    pub fn validate(&self) -> Result<()> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(RedirectorError::InvalidSettings(
                "base URL cannot be empty".to_string(),
            ));
        }

        let parsed = Url::parse(trimmed).map_err(|e| {
            RedirectorError::InvalidSettings(format!("base URL does not parse: {}", e))
        })?;

        if parsed.scheme() != "https" {
            return Err(RedirectorError::InvalidSettings(
                "base URL must use https".to_string(),
            ));
        }

        if self.mode == RedirectMode::Unrecognized {
            return Err(RedirectorError::InvalidSettings(
                "unrecognized redirect mode".to_string(),
            ));
        }

        Ok(())
    }

    /// Trim surrounding whitespace and a single trailing slash from the
    /// base URL. Applied before persisting so stored base URLs compose
    /// cleanly in path-preserve mode.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.base_url.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        self.base_url = trimmed.to_string();
        self
    }
}
