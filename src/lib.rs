//! Courtside Stats Library
//!
//! This crate provides the offline stat-tracking core for a basketball
//! scorekeeper.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Event Log** - Shots, fouls and box-score stats per player, each with an
//!   active / archived / deleted status and validated transitions.
//!
//! - **Undo/Redo** - Archive the newest active event and restore it later.
//!
//! - **Stat Aggregation** - Per-player, combined and team box scores derived
//!   from the active events, recomputed after every change.
//!
//! - **Persistence** - A `GameStore` gateway with in-memory and JSON-directory
//!   implementations, plus versioned export bundles.
//!
//! # Design Principles
//!
//! 1. **State machines validate transitions** - Invalid status changes are
//!    rejected with clear errors.
//!
//! 2. **Stats are derived, never patched** - Every mutation recomputes the box
//!    score from the log.
//!
//! 3. **No UI** - Rendering collaborators subscribe to signals and read state.
//!
//! 4. **Serialization-ready** - Games, events and stats convert to JSON.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use courtside_stats::state::{
//!     MemoryStore, Session, ShotCategory, StatCode, TrackerConfig,
//! };
//!
//! let mut session = Session::new(MemoryStore::new(), TrackerConfig::default());
//!
//! // Start a game with two players
//! let game = session
//!     .create_game(Some("Opener"), None, [4, 5], BTreeMap::new())
//!     .unwrap();
//! session.set_current_game(game);
//!
//! session.record_shot(4, ShotCategory::FieldGoal, true, None).unwrap();
//! session.record_stat(5, StatCode::Reb).unwrap();
//! assert_eq!(session.team_stats().unwrap().points, 2);
//!
//! // Undo the rebound, then bring it back
//! session.undo().unwrap();
//! assert_eq!(session.team_stats().unwrap().reb, 0);
//! session.redo().unwrap();
//! assert_eq!(session.team_stats().unwrap().reb, 1);
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
