//! Session controller.
//!
//! [`Session`] owns the single current game and runs every mutation as one
//! synchronous unit:
//!
//! 1. Mutate the game
//! 2. Recompute the box score
//! 3. Emit signals
//! 4. Persist through the [`GameStore`]
//!
//! A failed write never rolls back the in-memory game; it is logged and
//! reported as [`Signal::StorageWarning`].

use std::collections::{BTreeMap, HashSet};

use super::bundle::{parse_import, BundleError, ExportBundle, HotButton, TeamTemplate};
use super::config::TrackerConfig;
use super::event::{CourtLocation, Event, EventAction, FoulCode, ShotCategory, StatCode};
use super::game::{default_game_name, Game, GameError};
use super::ids::IdAllocator;
use super::notify::{Notifier, Observer, ObserverId, Signal};
use super::stats::{combined_stats, stats_for, BoxScore, PlayerStats, StatsCache};
use super::store::{GameMetadata, GameStore, StoreError};
use super::{AppState, Mode};

/// Session errors. All are recoverable.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("No game is loaded")]
    NoActiveGame,

    #[error("No event with index {0}")]
    EventNotFound(u64),

    #[error("No game with ID {0}")]
    GameNotFound(String),

    #[error("No player selected")]
    NoPlayerSelected,

    #[error("No shot type staged")]
    NoShotStaged,

    #[error("No correction in progress")]
    NoCorrectionTarget,

    #[error("No hot button at position {0}")]
    UnknownHotButton(usize),

    #[error(transparent)]
    Game(GameError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("Invalid import format: {0}")]
    InvalidImportFormat(#[from] BundleError),

    #[error("Export failed: {0}")]
    Export(#[source] BundleError),
}

impl From<GameError> for TrackerError {
    fn from(e: GameError) -> Self {
        match e {
            GameError::EventNotFound(index) => Self::EventNotFound(index),
            other => Self::Game(other),
        }
    }
}

fn no_active_game() -> TrackerError {
    tracing::warn!("Operation attempted with no game loaded");
    TrackerError::NoActiveGame
}

/// The controller for one user's tracking session.
pub struct Session<S: GameStore> {
    config: TrackerConfig,
    ids: IdAllocator,
    store: S,
    notifier: Notifier,
    current: Option<Game>,
    app: AppState,
    stats: StatsCache,
    team_template: TeamTemplate,
    hot_buttons: Vec<HotButton>,
}

impl<S: GameStore> Session<S> {
    /// Create a session with no game loaded.
    pub fn new(store: S, config: TrackerConfig) -> Self {
        let team_template = TeamTemplate::new(config.default_team_name.clone());
        let hot_buttons = config.hot_buttons.clone();
        Self {
            config,
            ids: IdAllocator::new(),
            store,
            notifier: Notifier::new(),
            current: None,
            app: AppState::new(),
            stats: StatsCache::new(),
            team_template,
            hot_buttons,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn app_state(&self) -> &AppState {
        &self.app
    }

    pub fn current_game(&self) -> Option<&Game> {
        self.current.as_ref()
    }

    pub fn team_template(&self) -> &TeamTemplate {
        &self.team_template
    }

    pub fn set_team_template(&mut self, template: TeamTemplate) {
        self.team_template = template;
    }

    pub fn hot_buttons(&self) -> &[HotButton] {
        &self.hot_buttons
    }

    pub fn set_hot_buttons(&mut self, buttons: Vec<HotButton>) {
        self.hot_buttons = buttons;
    }

    /// Register an observer for signals.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> ObserverId {
        self.notifier.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // Game lifecycle

    /// Build a new game. It is not loaded or saved.
    pub fn create_game(
        &mut self,
        name: Option<&str>,
        team_name: Option<&str>,
        roster: impl IntoIterator<Item = u8>,
        names: BTreeMap<u8, String>,
    ) -> Result<Game, TrackerError> {
        let id = self.ids.new_game_id();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| default_game_name(chrono::Utc::now()));
        let team_name = team_name
            .unwrap_or(self.config.default_team_name.as_str())
            .to_string();

        Ok(Game::new(id, name, team_name).with_roster(roster, names)?)
    }

    /// Start a new game from the team template, load it and save it.
    pub fn new_game(&mut self, name: Option<&str>) -> Result<&Game, TrackerError> {
        let template = self.team_template.clone();
        let team_name = Some(template.team_name.as_str()).filter(|t| !t.trim().is_empty());
        let game = self.create_game(name, team_name, template.team_roster, template.player_names)?;

        self.set_current_game(game);
        self.persist();
        self.current.as_ref().ok_or(TrackerError::NoActiveGame)
    }

    /// Make `game` the current game.
    ///
    /// Resyncs the event counter, resets UI state and recomputes stats.
    pub fn set_current_game(&mut self, mut game: Game) {
        game.take_replaced_fouls();
        self.ids.sync_counter(game.events());
        self.app.reset();
        self.stats.clear();
        self.stats.refresh(&game);

        tracing::info!(
            game_id = %game.id,
            events = game.events().len(),
            next_index = self.ids.peek_event_index(),
            "Game loaded"
        );

        let game_id = game.id.clone();
        self.current = Some(game);
        self.notifier.emit(&Signal::GameLoaded { game_id });
        self.notifier.emit(&Signal::StatsUpdated);
    }

    /// Load a stored game and make it current.
    pub fn open_game(&mut self, game_id: &str) -> Result<&Game, TrackerError> {
        let game = self
            .store
            .load(game_id)?
            .ok_or_else(|| TrackerError::GameNotFound(game_id.to_string()))?;

        self.set_current_game(game);
        self.current.as_ref().ok_or(TrackerError::NoActiveGame)
    }

    /// Unload the current game without deleting it.
    pub fn close_game(&mut self) -> Option<Game> {
        self.app.reset();
        self.stats.clear();
        self.current.take()
    }

    /// Stored games, most recently modified first.
    pub fn list_games(&self) -> Result<Vec<GameMetadata>, TrackerError> {
        Ok(self.store.list_metadata()?)
    }

    /// Delete a stored game. Deleting the current game unloads it.
    pub fn delete_game(&mut self, game_id: &str) -> Result<bool, TrackerError> {
        let existed = self.store.delete(game_id)?;
        if self.current.as_ref().is_some_and(|g| g.id == game_id) {
            self.close_game();
        }
        tracing::info!(game_id, existed, "Game deleted");
        Ok(existed)
    }

    // Event log

    /// Append an event for a player.
    pub fn add_event(&mut self, jersey: u8, action: EventAction) -> Result<Event, TrackerError> {
        let game = self.current.as_mut().ok_or_else(no_active_game)?;
        let index = self.ids.next_event_index();

        let event = match game.add_event(index, jersey, action) {
            Ok(event) => event.clone(),
            Err(e) => {
                tracing::warn!(jersey, index, error = %e, "Event rejected");
                return Err(e.into());
            }
        };

        tracing::debug!(index, jersey, kind = event.kind().as_str(), "Event added");
        self.commit(Some(Signal::EventAdded { index }));
        Ok(event)
    }

    pub fn record_shot(
        &mut self,
        jersey: u8,
        category: ShotCategory,
        made: bool,
        location: Option<CourtLocation>,
    ) -> Result<Event, TrackerError> {
        self.add_event(
            jersey,
            EventAction::Shot {
                made,
                category,
                location,
            },
        )
    }

    /// Record a foul. Replaces an active foul with the same code.
    pub fn record_foul(&mut self, jersey: u8, foul: FoulCode) -> Result<Event, TrackerError> {
        self.add_event(jersey, EventAction::Foul { foul })
    }

    /// Flip a foul code. Returns whether it is on afterwards.
    pub fn toggle_foul(&mut self, jersey: u8, foul: FoulCode) -> Result<bool, TrackerError> {
        let game = self.current.as_ref().ok_or_else(no_active_game)?;
        match game.active_foul(jersey, foul) {
            Some(index) => {
                self.delete_event(index)?;
                Ok(false)
            }
            None => {
                self.record_foul(jersey, foul)?;
                Ok(true)
            }
        }
    }

    pub fn record_stat(&mut self, jersey: u8, stat: StatCode) -> Result<Event, TrackerError> {
        self.add_event(jersey, EventAction::Stat { stat })
    }

    /// Record the action bound to a hot button.
    pub fn press_hot_button(&mut self, jersey: u8, position: usize) -> Result<Event, TrackerError> {
        let action = self
            .hot_buttons
            .get(position)
            .map(|b| b.action.clone())
            .ok_or(TrackerError::UnknownHotButton(position))?;
        self.add_event(jersey, action)
    }

    /// Correct an event's action in place.
    pub fn edit_event(&mut self, index: u64, action: EventAction) -> Result<Event, TrackerError> {
        let game = self.current.as_mut().ok_or_else(no_active_game)?;

        let event = match game.edit_event(index, action) {
            Ok(event) => event.clone(),
            Err(e) => {
                tracing::warn!(index, error = %e, "Edit rejected");
                return Err(e.into());
            }
        };

        tracing::debug!(index, "Event edited");
        self.commit(Some(Signal::EventEdited { index }));
        Ok(event)
    }

    /// Delete an event. Deleting twice is a no-op returning `false`.
    pub fn delete_event(&mut self, index: u64) -> Result<bool, TrackerError> {
        let game = self.current.as_mut().ok_or_else(no_active_game)?;

        match game.delete_event(index) {
            Ok(true) => {
                tracing::debug!(index, "Event deleted");
                self.commit(Some(Signal::EventDeleted { index }));
                Ok(true)
            }
            Ok(false) => {
                tracing::debug!(index, "Event already deleted");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "Delete rejected");
                Err(e.into())
            }
        }
    }

    /// Archive the most recently added active event.
    pub fn undo(&mut self) -> Result<Option<u64>, TrackerError> {
        let game = self.current.as_mut().ok_or_else(no_active_game)?;

        let Some(index) = game.undo() else {
            tracing::info!("Nothing to undo");
            self.notifier.emit(&Signal::StatsUpdated);
            return Ok(None);
        };

        tracing::debug!(index, "Event undone");
        self.commit(Some(Signal::EventUndone { index }));
        Ok(Some(index))
    }

    /// Restore the next archived event, if no newer event blocks it.
    pub fn redo(&mut self) -> Result<Option<u64>, TrackerError> {
        let game = self.current.as_mut().ok_or_else(no_active_game)?;

        let Some(index) = game.redo() else {
            tracing::info!("Nothing to redo");
            self.notifier.emit(&Signal::StatsUpdated);
            return Ok(None);
        };

        tracing::debug!(index, "Event redone");
        self.commit(Some(Signal::EventRedone { index }));
        Ok(Some(index))
    }

    // Roster

    /// Add or remove a jersey. Returns whether it is on the roster afterwards.
    pub fn toggle_jersey(&mut self, jersey: u8) -> Result<bool, TrackerError> {
        let game = self.current.as_mut().ok_or_else(no_active_game)?;
        let on_roster = game.toggle_jersey(jersey)?;

        if !on_roster {
            self.app.forget_player(jersey);
        }
        tracing::debug!(jersey, on_roster, "Roster changed");
        self.commit(None);
        Ok(on_roster)
    }

    pub fn rename_player(&mut self, jersey: u8, name: &str) -> Result<(), TrackerError> {
        let game = self.current.as_mut().ok_or_else(no_active_game)?;
        game.rename_player(jersey, name)?;

        tracing::debug!(jersey, "Player renamed");
        self.commit(None);
        Ok(())
    }

    // UI state

    pub fn set_mode(&mut self, mode: Mode) {
        if self.app.set_mode(mode) {
            tracing::debug!(mode = mode.as_str(), "Mode changed");
            self.notifier.emit(&Signal::ModeChanged { mode });
        }
    }

    /// Select a player (edit mode) or toggle one in the view set (view mode).
    pub fn select_player(&mut self, jersey: u8) -> Result<bool, TrackerError> {
        let game = self.current.as_ref().ok_or_else(no_active_game)?;
        if !game.has_player(jersey) {
            return Err(GameError::NotOnRoster(jersey).into());
        }
        Ok(self.app.select(jersey))
    }

    /// Add or remove a player from the view-mode selection.
    pub fn toggle_view_player(&mut self, jersey: u8) -> Result<bool, TrackerError> {
        let game = self.current.as_ref().ok_or_else(no_active_game)?;
        if !game.has_player(jersey) {
            return Err(GameError::NotOnRoster(jersey).into());
        }
        Ok(self.app.toggle_view_player(jersey))
    }

    pub fn clear_selection(&mut self) {
        self.app.clear_selection();
    }

    /// Stage a shot type to be placed by a court tap.
    pub fn stage_shot(&mut self, category: ShotCategory) {
        self.app.stage_shot(category);
    }

    /// Record the staged shot for the selected player.
    pub fn commit_staged_shot(
        &mut self,
        made: bool,
        location: Option<CourtLocation>,
    ) -> Result<Event, TrackerError> {
        let jersey = self
            .app
            .selected_player()
            .ok_or(TrackerError::NoPlayerSelected)?;
        let category = self.app.pending_shot().ok_or(TrackerError::NoShotStaged)?;

        let event = self.record_shot(jersey, category, made, location)?;
        self.app.take_pending_shot();
        Ok(event)
    }

    /// Pick an event to correct.
    pub fn begin_correction(&mut self, index: u64) -> Result<(), TrackerError> {
        let game = self.current.as_ref().ok_or_else(no_active_game)?;
        let exists = game.event(index).is_some_and(|e| !e.status.is_terminal());
        if !exists {
            tracing::warn!(index, "Correction target not found");
            return Err(TrackerError::EventNotFound(index));
        }
        self.app.set_correction_target(Some(index));
        Ok(())
    }

    pub fn cancel_correction(&mut self) {
        self.app.set_correction_target(None);
    }

    /// Apply the correction to the target event.
    pub fn commit_correction(&mut self, action: EventAction) -> Result<Event, TrackerError> {
        let index = self
            .app
            .correction_target()
            .ok_or(TrackerError::NoCorrectionTarget)?;

        let event = self.edit_event(index, action)?;
        self.app.set_correction_target(None);
        Ok(event)
    }

    // Stats

    /// Box score as of the last mutation.
    pub fn box_score(&self) -> Result<&BoxScore, TrackerError> {
        self.current.as_ref().ok_or_else(no_active_game)?;
        Ok(self.stats.box_score())
    }

    /// Stats for one jersey, including players since removed from the roster.
    pub fn player_stats(&self, jersey: u8) -> Result<PlayerStats, TrackerError> {
        let game = self.current.as_ref().ok_or_else(no_active_game)?;
        match self.stats.box_score().players.get(&jersey) {
            Some(stats) => Ok(stats.clone()),
            None => Ok(stats_for(jersey, game.events())),
        }
    }

    pub fn team_stats(&self) -> Result<PlayerStats, TrackerError> {
        Ok(self.box_score()?.team.clone())
    }

    /// Stats for whatever the UI has selected.
    ///
    /// Edit mode: the selected player (zeroes if none). View mode: the
    /// combined selection, or the whole team when nothing is selected.
    pub fn selection_stats(&self) -> Result<PlayerStats, TrackerError> {
        let game = self.current.as_ref().ok_or_else(no_active_game)?;

        match self.app.mode() {
            Mode::Edit => match self.app.selected_player() {
                Some(jersey) => self.player_stats(jersey),
                None => Ok(PlayerStats::default()),
            },
            Mode::View if self.app.view_selection().is_empty() => self.team_stats(),
            Mode::View => {
                let jerseys: Vec<u8> = self.app.view_selection().iter().copied().collect();
                Ok(combined_stats(&jerseys, game.events()))
            }
        }
    }

    // Export / import

    /// Bundle the current game with the team template and hot buttons.
    pub fn export_current(&self) -> Result<ExportBundle, TrackerError> {
        let game = self.current.as_ref().ok_or_else(no_active_game)?;
        Ok(ExportBundle::new(
            game.clone(),
            TeamTemplate::from_game(game),
            self.hot_buttons.clone(),
        ))
    }

    pub fn export_json(&self) -> Result<String, TrackerError> {
        self.export_current()?
            .to_json_string()
            .map_err(TrackerError::Export)
    }

    /// Import a bundle or legacy game and make it current.
    ///
    /// The game always gets a fresh ID. Nothing changes unless the whole
    /// import parses and the game is saved.
    pub fn import_json(&mut self, json: &str) -> Result<String, TrackerError> {
        let payload = parse_import(json).map_err(|e| {
            tracing::warn!(error = %e, "Import rejected");
            TrackerError::from(e)
        })?;

        let mut taken: HashSet<String> = self
            .store
            .list_metadata()?
            .into_iter()
            .map(|m| m.game_id)
            .collect();
        if let Some(current) = &self.current {
            taken.insert(current.id.clone());
        }

        let mut game = payload.game;
        let source_id = std::mem::take(&mut game.id);
        game.id = loop {
            let id = self.ids.new_game_id();
            if id != source_id && !taken.contains(&id) {
                break id;
            }
        };

        self.store.save(&game)?;

        if let Some(template) = payload.team_template {
            self.team_template = template;
        }
        if let Some(buttons) = payload.hot_buttons {
            self.hot_buttons = buttons;
        }

        tracing::info!(
            source_id = %source_id,
            game_id = %game.id,
            legacy = payload.legacy,
            "Game imported"
        );

        let game_id = game.id.clone();
        self.set_current_game(game);
        Ok(game_id)
    }

    // Internals

    /// Recompute, notify, then persist.
    fn commit(&mut self, signal: Option<Signal>) {
        let Some(game) = self.current.as_mut() else {
            return;
        };
        let replaced = game.take_replaced_fouls();
        self.stats.refresh(game);

        if let Some(signal) = signal {
            self.notifier.emit(&signal);
        }
        for index in replaced {
            tracing::debug!(index, "Foul replaced");
            self.notifier.emit(&Signal::EventDeleted { index });
        }
        self.notifier.emit(&Signal::StatsUpdated);
        self.persist();
    }

    fn persist(&mut self) {
        let Some(game) = self.current.as_ref() else {
            return;
        };
        if let Err(e) = self.store.save(game) {
            tracing::warn!(game_id = %game.id, error = %e, "Failed to persist game");
            self.notifier.emit(&Signal::StorageWarning {
                message: e.to_string(),
            });
        }
    }
}
