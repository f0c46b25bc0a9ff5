//! Tracker configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::bundle::{default_hot_buttons, HotButton};

/// Team name used when a game is created without one.
pub const DEFAULT_TEAM_NAME: &str = "Ravens";

/// Default directory for [`JsonDirStore`](super::store::JsonDirStore).
pub const DEFAULT_DATA_DIR: &str = "data";

/// Session configuration. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    pub default_team_name: String,

    /// Root directory for file-backed storage
    pub data_dir: PathBuf,

    /// Quick-entry buttons shown before any import overrides them
    pub hot_buttons: Vec<HotButton>,

    /// Byte limit for in-memory storage
    pub storage_quota: Option<usize>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_team_name: DEFAULT_TEAM_NAME.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            hot_buttons: default_hot_buttons(),
            storage_quota: None,
        }
    }
}

impl TrackerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
