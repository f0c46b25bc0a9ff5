//! State management module for courtside stat tracking.
//!
//! This module provides the core state types and services:
//!
//! - `ids` - Game ID and event index allocation
//! - `event` - Events and their status state machine
//! - `game` - Roster, names and the event log
//! - `stats` - Box-score aggregation
//! - `store` - Persistence gateway
//! - `bundle` - Versioned export/import
//! - `notify` - Change signals for rendering collaborators
//! - `session` - The controller that ties them together
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Session                                     │
//! │                                                                          │
//! │  UI action                                                               │
//! │     │                                                                    │
//! │     ▼                                                                    │
//! │  ┌─────────────┐   ┌─────────────┐   ┌────────────┐   ┌─────────────┐  │
//! │  │ Game        │──▶│ StatsCache  │──▶│ Notifier   │──▶│ GameStore   │  │
//! │  │ (mutate)    │   │ (recompute) │   │ (signals)  │   │ (persist)   │  │
//! │  └─────────────┘   └─────────────┘   └────────────┘   └─────────────┘  │
//! │        ▲                                                                 │
//! │        │ next index                                                      │
//! │  ┌─────────────┐   ┌─────────────────────────────────────────────────┐  │
//! │  │ IdAllocator │   │ AppState: mode, selection, staged shot, target  │  │
//! │  └─────────────┘   └─────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use courtside_stats::state::{MemoryStore, Session, TrackerConfig};
//!
//! let mut session = Session::new(MemoryStore::new(), TrackerConfig::default());
//! let game = session.create_game(Some("Opener"), None, [4, 5], Default::default())?;
//! session.set_current_game(game);
//! session.record_stat(5, StatCode::Reb)?;
//! session.undo()?;
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub mod bundle;
pub mod config;
pub mod event;
pub mod game;
pub mod ids;
pub mod notify;
pub mod session;
pub mod stats;
pub mod store;

// Re-export commonly used types
pub use bundle::{
    default_hot_buttons, parse_import, BundleError, ExportBundle, HotButton, ImportPayload,
    TeamTemplate, EXPORT_TYPE_FULL, EXPORT_VERSION,
};
pub use config::{ConfigError, TrackerConfig, DEFAULT_TEAM_NAME};
pub use event::{
    ActionKind, CourtLocation, Event, EventAction, EventStatus, EventTransition, FoulCode,
    InvalidTransition, ShotCategory, StatCode,
};
pub use game::{Game, GameError, ShotMark, MAX_EVENT_INDEX, MAX_JERSEY};
pub use ids::IdAllocator;
pub use notify::{Notifier, Observer, ObserverError, ObserverId, Signal};
pub use session::{Session, TrackerError};
pub use stats::{
    combined_stats, stats_for, team_stats, BoxScore, Fouls, PlayerStats, ShotLine, StatsCache,
};
pub use store::{GameMetadata, GameStore, JsonDirStore, MemoryStore, StoreError, StoreResult};

/// UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Recording events for one selected player
    #[default]
    Edit,
    /// Reviewing stats for a set of players
    View,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::View => "view",
        }
    }
}

/// Ephemeral UI state. Never persisted.
///
/// Reset whenever a game is loaded or the mode changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    mode: Mode,
    /// Edit mode: the player events are recorded for
    selected: Option<u8>,
    /// View mode: players whose stats are combined
    view_selection: BTreeSet<u8>,
    /// Shot type waiting for a court tap
    pending_shot: Option<ShotCategory>,
    /// Event being corrected
    correction_target: Option<u64>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected_player(&self) -> Option<u8> {
        self.selected
    }

    pub fn view_selection(&self) -> &BTreeSet<u8> {
        &self.view_selection
    }

    pub fn pending_shot(&self) -> Option<ShotCategory> {
        self.pending_shot
    }

    pub fn correction_target(&self) -> Option<u64> {
        self.correction_target
    }

    /// Clear everything except the mode.
    pub fn reset(&mut self) {
        *self = Self {
            mode: self.mode,
            ..Self::default()
        };
    }

    /// Switch mode. Returns false if already in that mode.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        self.reset();
        true
    }

    /// Select a player according to the mode.
    ///
    /// Edit mode replaces the single selection; view mode toggles membership.
    /// Returns whether the player is selected afterwards.
    pub fn select(&mut self, jersey: u8) -> bool {
        match self.mode {
            Mode::Edit => {
                self.selected = Some(jersey);
                true
            }
            Mode::View => self.toggle_view_player(jersey),
        }
    }

    /// Add or remove a player from the view set.
    pub fn toggle_view_player(&mut self, jersey: u8) -> bool {
        if self.view_selection.remove(&jersey) {
            false
        } else {
            self.view_selection.insert(jersey);
            true
        }
    }

    /// Drop a player from every selection (e.g. removed from the roster).
    pub fn forget_player(&mut self, jersey: u8) {
        if self.selected == Some(jersey) {
            self.selected = None;
        }
        self.view_selection.remove(&jersey);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.view_selection.clear();
    }

    pub fn stage_shot(&mut self, category: ShotCategory) {
        self.pending_shot = Some(category);
    }

    /// Take the staged shot type, clearing it.
    pub fn take_pending_shot(&mut self) -> Option<ShotCategory> {
        self.pending_shot.take()
    }

    pub fn set_correction_target(&mut self, index: Option<u64>) {
        self.correction_target = index;
    }
}
