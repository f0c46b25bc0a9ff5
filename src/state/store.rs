//! Game persistence.
//!
//! [`GameStore`] is the contract the session writes through after every
//! mutation. Two implementations are provided:
//!
//! - [`MemoryStore`] - serialized games in memory, with an optional byte quota
//!   to model device storage limits.
//! - [`JsonDirStore`] - one JSON file per game plus an `index.json` metadata
//!   list, written atomically (temp file, sync, rename).

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::config::TrackerConfig;
use super::game::Game;
use super::stats::team_stats;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    #[error("Invalid game ID: {0}")]
    InvalidId(String),
}

/// Library listing entry for a stored game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    pub game_id: String,
    pub game_name: String,
    pub team_name: String,
    pub total_points: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub last_modified: chrono::DateTime<chrono::Utc>,
}

impl GameMetadata {
    pub fn from_game(game: &Game) -> Self {
        Self {
            game_id: game.id.clone(),
            game_name: game.name.clone(),
            team_name: game.team_name.clone(),
            total_points: team_stats(game.events(), game.roster()).points,
            created_at: game.created_at,
            last_modified: game.last_modified,
        }
    }
}

/// Most recently modified first.
fn sort_by_recency(list: &mut [GameMetadata]) {
    list.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| b.game_id.cmp(&a.game_id))
    });
}

/// Durable storage for games.
pub trait GameStore {
    /// Write a game, replacing any previous version.
    fn save(&mut self, game: &Game) -> StoreResult<()>;

    /// Read a game by ID.
    fn load(&self, game_id: &str) -> StoreResult<Option<Game>>;

    /// Metadata for every stored game, most recently modified first.
    fn list_metadata(&self) -> StoreResult<Vec<GameMetadata>>;

    /// Remove a game. Returns false if it did not exist.
    fn delete(&mut self, game_id: &str) -> StoreResult<bool>;

    /// Check if a game ID is taken.
    fn contains(&self, game_id: &str) -> StoreResult<bool> {
        Ok(self
            .list_metadata()?
            .iter()
            .any(|m| m.game_id == game_id))
    }
}

/// In-memory store holding serialized games.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: HashMap<String, String>,
    metadata: HashMap<String, GameMetadata>,
    /// Total bytes allowed across all games
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes past `bytes` total.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Store using the configured quota.
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            quota: config.storage_quota,
            ..Self::default()
        }
    }

    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Bytes used by stored games.
    pub fn used_bytes(&self) -> usize {
        self.games.values().map(String::len).sum()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl GameStore for MemoryStore {
    fn save(&mut self, game: &Game) -> StoreResult<()> {
        let data = serde_json::to_string(game)?;

        if let Some(quota) = self.quota {
            let replaced = self.games.get(&game.id).map_or(0, String::len);
            let available = quota.saturating_sub(self.used_bytes() - replaced);
            if data.len() > available {
                return Err(StoreError::QuotaExceeded {
                    needed: data.len(),
                    available,
                });
            }
        }

        self.metadata
            .insert(game.id.clone(), GameMetadata::from_game(game));
        self.games.insert(game.id.clone(), data);
        Ok(())
    }

    fn load(&self, game_id: &str) -> StoreResult<Option<Game>> {
        match self.games.get(game_id) {
            Some(data) => Ok(Some(serde_json::from_str(data)?)),
            None => Ok(None),
        }
    }

    fn list_metadata(&self) -> StoreResult<Vec<GameMetadata>> {
        let mut list: Vec<GameMetadata> = self.metadata.values().cloned().collect();
        sort_by_recency(&mut list);
        Ok(list)
    }

    fn delete(&mut self, game_id: &str) -> StoreResult<bool> {
        self.metadata.remove(game_id);
        Ok(self.games.remove(game_id).is_some())
    }

    fn contains(&self, game_id: &str) -> StoreResult<bool> {
        Ok(self.games.contains_key(game_id))
    }
}

/// File-backed store: `<dir>/games/<id>.json` plus `<dir>/index.json`.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open a store rooted at `dir`, creating it if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join("games"))?;
        Ok(Self { dir })
    }

    /// Open the configured data directory.
    pub fn from_config(config: &TrackerConfig) -> StoreResult<Self> {
        Self::open(&config.data_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    fn game_path(&self, game_id: &str) -> StoreResult<PathBuf> {
        let valid = !game_id.is_empty()
            && game_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidId(game_id.to_string()));
        }
        Ok(self.dir.join("games").join(format!("{}.json", game_id)))
    }

    fn read_index(&self) -> StoreResult<Vec<GameMetadata>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_index(&self, mut index: Vec<GameMetadata>) -> StoreResult<()> {
        sort_by_recency(&mut index);
        let data = serde_json::to_string_pretty(&index)?;
        atomic_write(&self.index_path(), &data)?;
        Ok(())
    }
}

impl GameStore for JsonDirStore {
    /// Writes the game file, then the index.
    ///
    /// If the index write fails the game file is already current but its
    /// listing is stale until the next successful save.
    fn save(&mut self, game: &Game) -> StoreResult<()> {
        let path = self.game_path(&game.id)?;
        let data = serde_json::to_string(game)?;
        atomic_write(&path, &data)?;

        let mut index = self.read_index()?;
        index.retain(|m| m.game_id != game.id);
        index.push(GameMetadata::from_game(game));
        self.write_index(index)
    }

    fn load(&self, game_id: &str) -> StoreResult<Option<Game>> {
        let path = self.game_path(game_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    fn list_metadata(&self) -> StoreResult<Vec<GameMetadata>> {
        let mut index = self.read_index()?;
        sort_by_recency(&mut index);
        Ok(index)
    }

    fn delete(&mut self, game_id: &str) -> StoreResult<bool> {
        let path = self.game_path(game_id)?;
        let existed = path.exists();
        if existed {
            fs::remove_file(path)?;
        }

        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|m| m.game_id != game_id);
        if index.len() != before {
            self.write_index(index)?;
        }

        Ok(existed)
    }
}

/// Write to a temp file, sync it, then rename over `path`.
fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(&temp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path)
}
