//! Queue configuration.
//!
//! An optional TOML file overlays the built-in defaults; missing keys keep
//! their defaults so a partial config file is always valid.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw TOML-deserializable config. All fields optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UploadQueueConfig {
    pub db_dir: Option<String>,
    pub notify_capacity: Option<usize>,
}

impl UploadQueueConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

/// Resolved settings the queue actually runs with.
#[derive(Debug, Clone)]
pub struct UploadQueueSettings {
    /// Directory holding upload_queue.db.
    pub db_dir: PathBuf,
    /// Broadcast channel capacity for change notifications.
    pub notify_capacity: usize,
}

impl Default for UploadQueueSettings {
    fn default() -> Self {
        Self {
            db_dir: PathBuf::from("."),
            notify_capacity: 64,
        }
    }
}

impl UploadQueueSettings {
    /// Resolve settings from an optional file config.
    pub fn resolve(file_config: Option<UploadQueueConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let defaults = Self::default();

        let db_dir = file.db_dir.map(PathBuf::from).unwrap_or(defaults.db_dir);
        if db_dir.exists() && !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let notify_capacity = file.notify_capacity.unwrap_or(defaults.notify_capacity);
        if notify_capacity == 0 {
            bail!("notify_capacity must be at least 1");
        }

        Ok(Self {
            db_dir,
            notify_capacity,
        })
    }

    pub fn upload_queue_db_path(&self) -> PathBuf {
        self.db_dir.join("upload_queue.db")
    }
}
