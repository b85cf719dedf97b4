// src/settings/store.rs
//! Settings persistence and change notification
//!
//! The store is the source of truth for `Settings`. The canonical
//! in-process state lives in a `tokio::sync::watch` channel: every read is
//! a complete snapshot and every publish replaces the snapshot wholesale,
//! so consumers never observe a half-applied change. On disk the settings
//! are a small JSON document; a missing file self-initializes to defaults
//! and a corrupt file leaves the last good snapshot in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::settings::model::Settings;
use crate::utils::errors::{RedirectorError, Result};

/// Settings store backed by a JSON file and a watch channel
pub struct SettingsStore {
    path: PathBuf,
    tx: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Create a store for `path`, seeded with default settings. Nothing is
    /// read from disk until [`SettingsStore::load`] runs.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (tx, _rx) = watch::channel(Settings::default());
        Self {
            path: path.into(),
            tx,
        }
    }

    /// Current snapshot. Complete by construction; defaults until the
    /// first load finishes.
    pub fn current(&self) -> Settings {
        self.tx.borrow().clone()
    }

    /// Change-notification stream. Each received value is the full new
    /// snapshot, never a delta.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Initial load from disk. A missing file publishes defaults and
    /// writes them out so a fresh deployment starts configured; a file
    /// that cannot be read or parsed is an error and the channel keeps
    /// the defaults seeded at construction.
    pub async fn load(&self) -> Result<Settings> {
        match fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let settings = parse_snapshot(&raw)?;
                self.tx.send_replace(settings.clone());
                info!("Settings loaded from {}", self.path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let defaults = Settings::default();
                self.persist(&defaults).await?;
                self.tx.send_replace(defaults.clone());
                info!(
                    "No settings file at {}, wrote defaults",
                    self.path.display()
                );
                Ok(defaults)
            }
            Err(e) => Err(RedirectorError::SettingsFailed(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    /// Re-read the file and publish if the snapshot differs from the one
    /// in the channel. Returns `true` when a new snapshot was published.
    pub async fn reload(&self) -> Result<bool> {
        let raw = fs::read_to_string(&self.path).await.map_err(|e| {
            RedirectorError::SettingsFailed(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let settings = parse_snapshot(&raw)?;

        if settings == self.current() {
            return Ok(false);
        }

        info!(
            "Settings changed: enabled={} base_url={} mode={:?}",
            settings.enabled, settings.base_url, settings.mode
        );
        self.tx.send_replace(settings);
        Ok(true)
    }

    /// Update hook: normalize, validate, persist, then publish. A snapshot
    /// that fails validation is never written and never published.
    pub async fn update(&self, settings: Settings) -> Result<Settings> {
        let settings = settings.normalized();
        settings.validate()?;

        self.persist(&settings).await?;
        self.tx.send_replace(settings.clone());
        info!(
            "Settings updated: enabled={} base_url={} mode={:?}",
            settings.enabled, settings.base_url, settings.mode
        );
        Ok(settings)
    }

    async fn persist(&self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings).map_err(|e| {
            RedirectorError::SettingsFailed(format!("Failed to serialize settings: {}", e))
        })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    RedirectorError::SettingsFailed(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        fs::write(&self.path, json).await.map_err(|e| {
            RedirectorError::SettingsFailed(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Spawn the file watcher. Polls the file's mtime at `interval` and
    /// reloads when it moves; a reload failure keeps the last good
    /// snapshot and logs at warn.
    pub fn spawn_watcher(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut last_seen = modified_at(&store.path).await;
            loop {
                ticker.tick().await;
                let modified = modified_at(&store.path).await;
                if modified == last_seen {
                    continue;
                }
                last_seen = modified;
                match store.reload().await {
                    Ok(true) => debug!("Settings file change applied"),
                    Ok(false) => debug!("Settings file touched, snapshot unchanged"),
                    Err(e) => warn!("Settings file changed but reload failed: {}", e),
                }
            }
        })
    }
}

fn parse_snapshot(raw: &str) -> Result<Settings> {
    serde_json::from_str(raw)
        .map_err(|e| RedirectorError::SettingsFailed(format!("Failed to parse settings: {}", e)))
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).await.ok().and_then(|m| m.modified().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::model::RedirectMode;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("settings.json"))
    }

    #[tokio::test]
    async fn test_load_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, Settings::default());

        let raw = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let on_disk: Settings = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, Settings::default());
    }

    #[tokio::test]
    async fn test_load_partial_file_merges_over_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"baseUrl": "https://redlib.example"}"#,
        )
        .unwrap();

        let store = store_in(&dir);
        let loaded = store.load().await.unwrap();
        assert!(loaded.enabled);
        assert_eq!(loaded.base_url, "https://redlib.example");
        assert_eq!(loaded.mode, RedirectMode::PathPreserve);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_keeps_defaults_in_channel() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();

        let store = store_in(&dir);
        assert!(store.load().await.is_err());
        assert_eq!(store.current(), Settings::default());
    }

    #[tokio::test]
    async fn test_update_persists_and_publishes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.load().await.unwrap();

        let mut rx = store.subscribe();
        let updated = store
            .update(Settings {
                enabled: false,
                base_url: "https://redlib.example/".to_string(),
                mode: RedirectMode::PassUrl,
            })
            .await
            .unwrap();

        // Normalization ran before persisting.
        assert_eq!(updated.base_url, "https://redlib.example");

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), updated);

        let raw = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let on_disk: Settings = serde_json::from_str(&raw).unwrap();
        assert_eq!(on_disk, updated);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_without_publishing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.load().await.unwrap();

        let before = store.current();
        let result = store
            .update(Settings {
                base_url: "http://insecure.example".to_string(),
                ..Default::default()
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.current(), before);
    }

    #[tokio::test]
    async fn test_reload_detects_change() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.load().await.unwrap();

        assert!(!store.reload().await.unwrap());

        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"enabled": false}"#,
        )
        .unwrap();
        assert!(store.reload().await.unwrap());
        assert!(!store.current().enabled);
    }
}
