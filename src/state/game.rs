//! Game state management.
//!
//! A [`Game`] is the aggregate root: roster, player names and the event log.
//! Status changes go through [`Game`] methods so the active-foul index always
//! matches the log.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::event::{
    CourtLocation, Event, EventAction, EventStatus, EventTransition, FoulCode, InvalidTransition,
    ShotCategory,
};

/// Highest jersey number allowed on a roster.
pub const MAX_JERSEY: u8 = 99;

/// Highest event index a log may hold; one slot is left for the next index.
pub const MAX_EVENT_INDEX: u64 = u64::MAX - 1;

/// Placeholder name for a game created without one.
pub fn default_game_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("Game {}", now.format("%Y-%m-%d"))
}

/// A located shot for the shot chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotMark {
    pub index: u64,
    pub player_number: u8,
    pub category: ShotCategory,
    pub made: bool,
    pub location: CourtLocation,
}

/// Game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GameRecord")]
pub struct Game {
    /// Unique game ID
    pub id: String,

    /// Display name
    pub name: String,

    pub team_name: String,

    /// Jersey numbers, ascending and unique
    roster: Vec<u8>,

    /// Names by jersey (missing entries use a placeholder)
    player_names: BTreeMap<u8, String>,

    /// Event log in index order
    events: Vec<Event>,

    pub created_at: chrono::DateTime<chrono::Utc>,

    pub last_modified: chrono::DateTime<chrono::Utc>,

    /// Bumped on every mutation, used to key derived caches
    #[serde(skip)]
    revision: u64,

    /// (jersey, code) -> index of the active foul event
    #[serde(skip)]
    active_fouls: HashMap<(u8, FoulCode), u64>,

    /// Fouls deleted as a side effect of another event becoming active
    #[serde(skip)]
    replaced_fouls: Vec<u64>,
}

/// Serialized shape of a [`Game`], validated on the way in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameRecord {
    id: String,
    name: String,
    team_name: String,
    #[serde(default)]
    roster: Vec<u8>,
    #[serde(default)]
    player_names: BTreeMap<u8, String>,
    #[serde(default)]
    events: Vec<Event>,
    created_at: chrono::DateTime<chrono::Utc>,
    last_modified: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<GameRecord> for Game {
    type Error = GameError;

    fn try_from(record: GameRecord) -> Result<Self, Self::Error> {
        let mut game = Game {
            id: record.id,
            name: record.name,
            team_name: record.team_name,
            roster: Vec::new(),
            player_names: BTreeMap::new(),
            events: Vec::new(),
            created_at: record.created_at,
            last_modified: record.last_modified,
            revision: 0,
            active_fouls: HashMap::new(),
            replaced_fouls: Vec::new(),
        };
        game.set_roster(record.roster, record.player_names)?;

        let mut events = record.events;
        events.sort_by_key(|e| e.index);
        for pair in events.windows(2) {
            if pair[0].index == pair[1].index {
                return Err(GameError::DuplicateEventIndex(pair[0].index));
            }
        }
        if let Some(e) = events.iter().find(|e| e.player_number > MAX_JERSEY) {
            return Err(GameError::InvalidJersey(e.player_number));
        }
        if let Some(e) = events.iter().find(|e| e.index > MAX_EVENT_INDEX) {
            return Err(GameError::IndexOutOfRange(e.index));
        }
        game.events = events;
        game.rebuild_foul_index();
        game.replaced_fouls.clear();

        Ok(game)
    }
}

impl Game {
    /// Create a new game with an empty roster and log.
    pub fn new(id: String, name: String, team_name: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id,
            name,
            team_name,
            roster: Vec::new(),
            player_names: BTreeMap::new(),
            events: Vec::new(),
            created_at: now,
            last_modified: now,
            revision: 0,
            active_fouls: HashMap::new(),
            replaced_fouls: Vec::new(),
        }
    }

    /// Set the starting roster and names.
    pub fn with_roster(
        mut self,
        roster: impl IntoIterator<Item = u8>,
        names: BTreeMap<u8, String>,
    ) -> Result<Self, GameError> {
        self.set_roster(roster, names)?;
        Ok(self)
    }

    fn set_roster(
        &mut self,
        roster: impl IntoIterator<Item = u8>,
        names: BTreeMap<u8, String>,
    ) -> Result<(), GameError> {
        let mut roster: Vec<u8> = roster.into_iter().collect();
        roster.sort_unstable();
        for pair in roster.windows(2) {
            if pair[0] == pair[1] {
                return Err(GameError::DuplicateJersey(pair[0]));
            }
        }
        if let Some(&bad) = roster.iter().find(|&&j| j > MAX_JERSEY) {
            return Err(GameError::InvalidJersey(bad));
        }

        self.player_names = names
            .into_iter()
            .filter(|(j, name)| roster.binary_search(j).is_ok() && !name.trim().is_empty())
            .collect();
        self.roster = roster;
        Ok(())
    }

    /// Mark the game as changed.
    fn touch(&mut self) {
        self.last_modified = chrono::Utc::now();
        self.revision += 1;
    }

    /// Revision counter for cache keys. Not persisted.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // Roster

    pub fn roster(&self) -> &[u8] {
        &self.roster
    }

    pub fn player_names(&self) -> &BTreeMap<u8, String> {
        &self.player_names
    }

    /// Check if a jersey is on the roster.
    pub fn has_player(&self, jersey: u8) -> bool {
        self.roster.binary_search(&jersey).is_ok()
    }

    /// Display name for a jersey.
    pub fn player_name(&self, jersey: u8) -> String {
        self.player_names
            .get(&jersey)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", jersey))
    }

    /// Add or remove a jersey. Returns whether it is now on the roster.
    pub fn toggle_jersey(&mut self, jersey: u8) -> Result<bool, GameError> {
        if jersey > MAX_JERSEY {
            return Err(GameError::InvalidJersey(jersey));
        }

        let on_roster = match self.roster.binary_search(&jersey) {
            Ok(pos) => {
                self.roster.remove(pos);
                self.player_names.remove(&jersey);
                false
            }
            Err(_) => {
                self.roster.push(jersey);
                self.roster.sort_unstable();
                true
            }
        };

        self.touch();
        Ok(on_roster)
    }

    /// Set a player's name. A blank name clears it.
    pub fn rename_player(&mut self, jersey: u8, name: &str) -> Result<(), GameError> {
        if !self.has_player(jersey) {
            return Err(GameError::NotOnRoster(jersey));
        }

        let name = name.trim();
        if name.is_empty() {
            self.player_names.remove(&jersey);
        } else {
            self.player_names.insert(jersey, name.to_string());
        }

        self.touch();
        Ok(())
    }

    // Event log

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn position(&self, index: u64) -> Option<usize> {
        self.events.binary_search_by_key(&index, |e| e.index).ok()
    }

    /// Get an event by index.
    pub fn event(&self, index: u64) -> Option<&Event> {
        self.position(index).map(|pos| &self.events[pos])
    }

    /// Highest index in the log.
    pub fn last_index(&self) -> Option<u64> {
        self.events.last().map(|e| e.index)
    }

    /// Events with a given status (or all), in index order.
    pub fn query_by_status(
        &self,
        status: Option<EventStatus>,
    ) -> impl Iterator<Item = &Event> + '_ {
        self.events
            .iter()
            .filter(move |e| status.map_or(true, |s| e.status == s))
    }

    /// Append a new event.
    ///
    /// A foul replaces any active foul with the same code for that player.
    pub fn add_event(
        &mut self,
        index: u64,
        jersey: u8,
        action: EventAction,
    ) -> Result<&Event, GameError> {
        if !self.has_player(jersey) {
            return Err(GameError::NotOnRoster(jersey));
        }
        if self.last_index().is_some_and(|last| index <= last) {
            return Err(GameError::IndexReused(index));
        }
        if index > MAX_EVENT_INDEX {
            return Err(GameError::IndexOutOfRange(index));
        }

        self.events.push(Event::new(index, jersey, action));
        let pos = self.events.len() - 1;
        self.index_active_foul(pos)?;

        self.touch();
        Ok(&self.events[pos])
    }

    /// Replace an event's action in place.
    ///
    /// The index, timestamp and status are kept; `edited` is set.
    pub fn edit_event(&mut self, index: u64, action: EventAction) -> Result<&Event, GameError> {
        let pos = self
            .position(index)
            .filter(|&pos| self.events[pos].status != EventStatus::Deleted)
            .ok_or(GameError::EventNotFound(index))?;

        self.unindex_foul(pos);
        let event = &mut self.events[pos];
        event.action = action;
        event.edited = true;
        self.index_active_foul(pos)?;

        self.touch();
        Ok(&self.events[pos])
    }

    /// Delete an event. Returns `false` if it was already deleted.
    pub fn delete_event(&mut self, index: u64) -> Result<bool, GameError> {
        let pos = self
            .position(index)
            .ok_or(GameError::EventNotFound(index))?;

        if self.events[pos].status == EventStatus::Deleted {
            return Ok(false);
        }

        self.transition_at(pos, EventTransition::Delete)?;
        self.touch();
        Ok(true)
    }

    /// Archive the most recently added active event.
    pub fn undo(&mut self) -> Option<u64> {
        let pos = self.events.iter().rposition(|e| e.is_active())?;
        self.transition_at(pos, EventTransition::Undo).ok()?;
        self.touch();
        Some(self.events[pos].index)
    }

    /// Reactivate the oldest archived event newer than every active event.
    pub fn redo(&mut self) -> Option<u64> {
        let start = self
            .events
            .iter()
            .rposition(|e| e.is_active())
            .map_or(0, |pos| pos + 1);

        let pos = self.events[start..]
            .iter()
            .position(|e| e.status == EventStatus::Archived)?
            + start;

        self.transition_at(pos, EventTransition::Redo).ok()?;
        self.touch();
        Some(self.events[pos].index)
    }

    /// Index of the active foul event for a player and code.
    pub fn active_foul(&self, jersey: u8, code: FoulCode) -> Option<u64> {
        self.active_fouls.get(&(jersey, code)).copied()
    }

    /// Foul codes currently on for a player.
    pub fn active_foul_codes(&self, jersey: u8) -> Vec<FoulCode> {
        FoulCode::ALL
            .into_iter()
            .filter(|code| self.active_fouls.contains_key(&(jersey, *code)))
            .collect()
    }

    /// Take the indices of fouls deleted because a newer foul with the same
    /// code became active (add, edit or redo).
    pub fn take_replaced_fouls(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.replaced_fouls)
    }

    /// Active located shots for the given players.
    pub fn shot_chart(&self, jerseys: &[u8]) -> Vec<ShotMark> {
        self.query_by_status(Some(EventStatus::Active))
            .filter(|e| jerseys.contains(&e.player_number))
            .filter_map(|e| match e.action {
                EventAction::Shot {
                    made,
                    category,
                    location: Some(location),
                } => Some(ShotMark {
                    index: e.index,
                    player_number: e.player_number,
                    category,
                    made,
                    location,
                }),
                _ => None,
            })
            .collect()
    }

    /// Apply a status transition and keep the foul index in step.
    fn transition_at(
        &mut self,
        pos: usize,
        transition: EventTransition,
    ) -> Result<(), InvalidTransition> {
        self.unindex_foul(pos);
        let result = self.events[pos].transition(transition);
        // Re-index even on failure so the index matches the unchanged status.
        let _ = self.index_active_foul(pos);
        result
    }

    fn unindex_foul(&mut self, pos: usize) {
        let event = &self.events[pos];
        if let Some(code) = event.action.foul_code() {
            let key = (event.player_number, code);
            if self.active_fouls.get(&key) == Some(&event.index) {
                self.active_fouls.remove(&key);
            }
        }
    }

    /// Record an active foul, deleting any other active one with the same key.
    fn index_active_foul(&mut self, pos: usize) -> Result<(), InvalidTransition> {
        let event = &self.events[pos];
        let Some(code) = event.action.foul_code() else {
            return Ok(());
        };
        if !event.is_active() {
            return Ok(());
        }

        let key = (event.player_number, code);
        let index = event.index;
        if let Some(previous) = self.active_fouls.insert(key, index) {
            if previous != index {
                if let Some(prev_pos) = self.position(previous) {
                    self.events[prev_pos].transition(EventTransition::Delete)?;
                    self.replaced_fouls.push(previous);
                }
            }
        }
        Ok(())
    }

    fn rebuild_foul_index(&mut self) {
        self.active_fouls.clear();
        for pos in 0..self.events.len() {
            let _ = self.index_active_foul(pos);
        }
    }

    /// Convert the game to a JSON summary for rendering.
    pub fn to_json(&self) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self
            .roster
            .iter()
            .map(|j| serde_json::json!({"jersey": j, "name": self.player_name(*j)}))
            .collect();
        let events: Vec<serde_json::Value> = self.events.iter().map(|e| e.to_json()).collect();

        serde_json::json!({
            "game_id": self.id,
            "name": self.name,
            "team_name": self.team_name,
            "players": players,
            "events": events,
            "created_at": self.created_at.to_rfc3339(),
            "last_modified": self.last_modified.to_rfc3339()
        })
    }
}

/// Game errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Jersey {0} is outside 0-99")]
    InvalidJersey(u8),

    #[error("Jersey {0} is listed twice")]
    DuplicateJersey(u8),

    #[error("Jersey {0} is not on the roster")]
    NotOnRoster(u8),

    #[error("No event with index {0}")]
    EventNotFound(u64),

    #[error("Event index {0} is not newer than the log")]
    IndexReused(u64),

    #[error("Event index {0} appears twice")]
    DuplicateEventIndex(u64),

    #[error("Event index {0} leaves no room for another event")]
    IndexOutOfRange(u64),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::event::StatCode;
    use pretty_assertions::assert_eq;

    fn make_game(roster: &[u8]) -> Game {
        Game::new("game-1".to_string(), "Test".to_string(), "Ravens".to_string())
            .with_roster(roster.iter().copied(), BTreeMap::new())
            .unwrap()
    }

    fn shot(made: bool, category: ShotCategory) -> EventAction {
        EventAction::Shot {
            made,
            category,
            location: None,
        }
    }

    fn statuses(game: &Game) -> Vec<(u64, EventStatus)> {
        game.events().iter().map(|e| (e.index, e.status)).collect()
    }

    #[test]
    fn test_game_new() {
        let game = make_game(&[]);
        assert!(game.roster().is_empty());
        assert!(game.events().is_empty());
        assert_eq!(game.created_at, game.last_modified);
    }

    #[test]
    fn test_roster_toggle_sorted() {
        let mut game = make_game(&[]);

        assert!(game.toggle_jersey(23).unwrap());
        assert!(game.toggle_jersey(4).unwrap());
        assert!(game.toggle_jersey(11).unwrap());
        assert_eq!(game.roster(), &[4, 11, 23]);

        game.rename_player(11, "Jordan").unwrap();
        assert_eq!(game.player_name(11), "Jordan");

        // Removing the jersey drops the name
        assert!(!game.toggle_jersey(11).unwrap());
        assert_eq!(game.roster(), &[4, 23]);
        assert!(game.player_names().is_empty());
        assert_eq!(game.player_name(11), "Player 11");

        assert_eq!(game.toggle_jersey(100), Err(GameError::InvalidJersey(100)));
    }

    #[test]
    fn test_rename_player() {
        let mut game = make_game(&[5]);

        assert_eq!(
            game.rename_player(6, "Nobody"),
            Err(GameError::NotOnRoster(6))
        );

        game.rename_player(5, "  Sam ").unwrap();
        assert_eq!(game.player_name(5), "Sam");

        game.rename_player(5, "   ").unwrap();
        assert_eq!(game.player_name(5), "Player 5");
    }

    #[test]
    fn test_with_roster_rejects_duplicates() {
        let result = Game::new("g".into(), "n".into(), "t".into())
            .with_roster([3, 1, 3], BTreeMap::new());
        assert_eq!(result.unwrap_err(), GameError::DuplicateJersey(3));
    }

    #[test]
    fn test_add_event() {
        let mut game = make_game(&[4]);
        let before = game.revision();

        let event = game.add_event(0, 4, shot(true, ShotCategory::FieldGoal)).unwrap();
        assert_eq!(event.index, 0);
        assert!(event.is_active());
        assert!(!event.edited);
        assert!(game.revision() > before);

        assert_eq!(
            game.add_event(1, 9, shot(true, ShotCategory::FieldGoal)).unwrap_err(),
            GameError::NotOnRoster(9)
        );
        assert_eq!(
            game.add_event(0, 4, shot(true, ShotCategory::FieldGoal)).unwrap_err(),
            GameError::IndexReused(0)
        );
    }

    #[test]
    fn test_edit_event_keeps_identity() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, shot(true, ShotCategory::FieldGoal)).unwrap();
        let original = game.event(0).unwrap().clone();

        let edited = game.edit_event(0, shot(true, ShotCategory::ThreePoint)).unwrap();
        assert_eq!(edited.index, original.index);
        assert_eq!(edited.timestamp, original.timestamp);
        assert_eq!(edited.status, EventStatus::Active);
        assert!(edited.edited);

        assert_eq!(
            game.edit_event(42, shot(false, ShotCategory::FreeThrow)).unwrap_err(),
            GameError::EventNotFound(42)
        );
    }

    #[test]
    fn test_delete_event_idempotent() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Stat { stat: StatCode::Ast }).unwrap();

        assert!(game.delete_event(0).unwrap());
        assert!(!game.delete_event(0).unwrap());
        assert_eq!(game.event(0).unwrap().status, EventStatus::Deleted);

        // Deleted events are gone for editing
        assert_eq!(
            game.edit_event(0, EventAction::Stat { stat: StatCode::Reb }).unwrap_err(),
            GameError::EventNotFound(0)
        );
    }

    #[test]
    fn test_archived_event_cannot_be_deleted() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Stat { stat: StatCode::Stl }).unwrap();
        game.undo().unwrap();

        assert!(matches!(
            game.delete_event(0),
            Err(GameError::InvalidTransition(_))
        ));
        assert_eq!(game.event(0).unwrap().status, EventStatus::Archived);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut game = make_game(&[4]);
        for i in 0..3 {
            game.add_event(i, 4, EventAction::Stat { stat: StatCode::Reb }).unwrap();
        }
        let before = statuses(&game);

        assert_eq!(game.undo(), Some(2));
        assert_eq!(game.redo(), Some(2));
        assert_eq!(statuses(&game), before);
    }

    #[test]
    fn test_undo_picks_highest_index_not_last_edited() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Stat { stat: StatCode::Reb }).unwrap();
        game.add_event(1, 4, EventAction::Stat { stat: StatCode::Ast }).unwrap();
        game.edit_event(0, EventAction::Stat { stat: StatCode::Blk }).unwrap();

        assert_eq!(game.undo(), Some(1));
    }

    #[test]
    fn test_redo_ordering() {
        let mut game = make_game(&[4]);
        for i in 0..3 {
            game.add_event(i, 4, EventAction::Stat { stat: StatCode::Reb }).unwrap();
        }
        game.undo();
        assert_eq!(
            statuses(&game),
            vec![
                (0, EventStatus::Active),
                (1, EventStatus::Active),
                (2, EventStatus::Archived),
            ]
        );

        assert_eq!(game.redo(), Some(2));
        assert_eq!(game.redo(), None);
    }

    #[test]
    fn test_redo_blocked_by_newer_active() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Stat { stat: StatCode::Reb }).unwrap();
        game.undo();
        game.add_event(1, 4, EventAction::Stat { stat: StatCode::Ast }).unwrap();

        // Index 0 is older than active index 1
        assert_eq!(game.redo(), None);

        // Undoing the newer event unblocks it, oldest first
        assert_eq!(game.undo(), Some(1));
        assert_eq!(game.redo(), Some(0));
        assert_eq!(game.redo(), Some(1));
    }

    #[test]
    fn test_undo_empty() {
        let mut game = make_game(&[4]);
        assert_eq!(game.undo(), None);
        assert_eq!(game.redo(), None);
    }

    #[test]
    fn test_foul_replaces_active_same_code() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Foul { foul: FoulCode::P1 }).unwrap();
        game.add_event(1, 4, EventAction::Foul { foul: FoulCode::P1 }).unwrap();
        game.add_event(2, 4, EventAction::Foul { foul: FoulCode::P2 }).unwrap();

        assert_eq!(game.event(0).unwrap().status, EventStatus::Deleted);
        assert_eq!(game.active_foul(4, FoulCode::P1), Some(1));
        assert_eq!(game.active_foul_codes(4), vec![FoulCode::P1, FoulCode::P2]);

        let active_p1 = game
            .query_by_status(Some(EventStatus::Active))
            .filter(|e| e.action.foul_code() == Some(FoulCode::P1))
            .count();
        assert_eq!(active_p1, 1);
    }

    #[test]
    fn test_replaced_fouls_reported() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Foul { foul: FoulCode::P1 }).unwrap();
        game.undo();
        game.add_event(1, 4, EventAction::Foul { foul: FoulCode::P1 }).unwrap();
        assert!(game.take_replaced_fouls().is_empty());

        game.undo();
        assert_eq!(game.redo(), Some(0));
        assert_eq!(game.redo(), Some(1));

        assert_eq!(game.take_replaced_fouls(), vec![0]);
        assert!(game.take_replaced_fouls().is_empty());
        assert_eq!(game.event(0).unwrap().status, EventStatus::Deleted);
    }

    #[test]
    fn test_add_event_rejects_last_index() {
        let mut game = make_game(&[4]);
        assert_eq!(
            game.add_event(u64::MAX, 4, EventAction::Stat { stat: StatCode::Reb })
                .unwrap_err(),
            GameError::IndexOutOfRange(u64::MAX)
        );
        game.add_event(MAX_EVENT_INDEX, 4, EventAction::Stat { stat: StatCode::Reb })
            .unwrap();
    }

    #[test]
    fn test_foul_index_follows_undo() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Foul { foul: FoulCode::T1 }).unwrap();

        game.undo();
        assert_eq!(game.active_foul(4, FoulCode::T1), None);

        game.redo();
        assert_eq!(game.active_foul(4, FoulCode::T1), Some(0));
    }

    #[test]
    fn test_edit_into_foul_keeps_invariant() {
        let mut game = make_game(&[4]);
        game.add_event(0, 4, EventAction::Foul { foul: FoulCode::P3 }).unwrap();
        game.add_event(1, 4, EventAction::Stat { stat: StatCode::To }).unwrap();

        game.edit_event(1, EventAction::Foul { foul: FoulCode::P3 }).unwrap();

        assert_eq!(game.event(0).unwrap().status, EventStatus::Deleted);
        assert_eq!(game.active_foul(4, FoulCode::P3), Some(1));
    }

    #[test]
    fn test_query_by_status() {
        let mut game = make_game(&[4]);
        for i in 0..4 {
            game.add_event(i, 4, EventAction::Stat { stat: StatCode::Reb }).unwrap();
        }
        game.delete_event(1).unwrap();
        game.undo();

        let all: Vec<u64> = game.query_by_status(None).map(|e| e.index).collect();
        let active: Vec<u64> = game
            .query_by_status(Some(EventStatus::Active))
            .map(|e| e.index)
            .collect();
        let archived: Vec<u64> = game
            .query_by_status(Some(EventStatus::Archived))
            .map(|e| e.index)
            .collect();

        assert_eq!(all, vec![0, 1, 2, 3]);
        assert_eq!(active, vec![0, 2]);
        assert_eq!(archived, vec![3]);
    }

    #[test]
    fn test_shot_chart() {
        let mut game = make_game(&[4, 5]);
        let loc = CourtLocation::new(0.2, 0.8).unwrap();
        game.add_event(
            0,
            4,
            EventAction::Shot {
                made: true,
                category: ShotCategory::FieldGoal,
                location: Some(loc),
            },
        )
        .unwrap();
        game.add_event(1, 4, shot(false, ShotCategory::FreeThrow)).unwrap();
        game.add_event(
            2,
            5,
            EventAction::Shot {
                made: false,
                category: ShotCategory::ThreePoint,
                location: Some(loc),
            },
        )
        .unwrap();

        let chart = game.shot_chart(&[4]);
        assert_eq!(chart.len(), 1);
        assert_eq!(chart[0].index, 0);
        assert!(chart[0].made);

        assert_eq!(game.shot_chart(&[4, 5]).len(), 2);
    }

    #[test]
    fn test_serde_restores_foul_index() {
        let mut game = make_game(&[4, 12]);
        game.rename_player(12, "Alex").unwrap();
        game.add_event(0, 4, EventAction::Foul { foul: FoulCode::P4 }).unwrap();

        let json = serde_json::to_string(&game).unwrap();
        assert!(json.contains("\"teamName\":\"Ravens\""));
        assert!(json.contains("\"playerNames\":{\"12\":\"Alex\"}"));

        let mut restored: Game = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.roster(), &[4, 12]);
        assert_eq!(restored.active_foul(4, FoulCode::P4), Some(0));

        // The toggle still applies after a reload
        restored
            .add_event(1, 4, EventAction::Foul { foul: FoulCode::P4 })
            .unwrap();
        assert_eq!(restored.event(0).unwrap().status, EventStatus::Deleted);
    }

    #[test]
    fn test_serde_rejects_bad_roster() {
        let json = serde_json::json!({
            "id": "g",
            "name": "n",
            "teamName": "t",
            "roster": [4, 4],
            "createdAt": "2024-01-01T00:00:00Z",
            "lastModified": "2024-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<Game>(json).is_err());
    }

    #[test]
    fn test_serde_rejects_unfollowable_index() {
        let json = serde_json::json!({
            "id": "g",
            "name": "n",
            "teamName": "t",
            "roster": [4],
            "events": [{
                "index": u64::MAX,
                "timestamp": "2024-01-01T00:00:00Z",
                "playerNumber": 4,
                "action": {"type": "stat", "stat": "REB"}
            }],
            "createdAt": "2024-01-01T00:00:00Z",
            "lastModified": "2024-01-01T00:00:00Z"
        });

        let err = serde_json::from_value::<Game>(json).unwrap_err();
        assert!(err.to_string().contains("leaves no room"));
    }
}
