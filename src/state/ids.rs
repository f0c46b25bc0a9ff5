//! Identifier allocation.
//!
//! Game IDs come from the wall clock; event indices come from a per-process
//! counter that is resynced every time a game is loaded.

use super::event::Event;

/// Prefix for generated game IDs.
pub const GAME_ID_PREFIX: &str = "game_";

/// Allocates game IDs and event indices.
#[derive(Debug, Default)]
pub struct IdAllocator {
    /// Next event index to hand out
    next_index: u64,

    /// Last clock reading used for a game ID (microseconds)
    last_game_micros: i64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new game ID from the current time.
    ///
    /// Two calls within the same microsecond still get distinct IDs.
    pub fn new_game_id(&mut self) -> String {
        let now = chrono::Utc::now().timestamp_micros();
        let micros = if now <= self.last_game_micros {
            self.last_game_micros + 1
        } else {
            now
        };
        self.last_game_micros = micros;
        format!("{}{}", GAME_ID_PREFIX, micros)
    }

    /// Get the next event index.
    pub fn next_event_index(&mut self) -> u64 {
        let index = self.next_index;
        self.next_index = self.next_index.saturating_add(1);
        index
    }

    /// Peek at the index the next call will return.
    pub fn peek_event_index(&self) -> u64 {
        self.next_index
    }

    /// Resync the counter against a loaded event log.
    ///
    /// Must run on every game load or switch.
    pub fn sync_counter(&mut self, events: &[Event]) {
        self.next_index = events
            .iter()
            .map(|e| e.index)
            .max()
            .map_or(0, |max| max.saturating_add(1));
    }
}
