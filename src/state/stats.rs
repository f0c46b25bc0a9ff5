//! Box-score aggregation.
//!
//! Stats are always derived from the active events of a log and recomputed
//! wholesale. Nothing here mutates its input.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::event::{Event, EventAction, FoulCode, ShotCategory, StatCode};
use super::game::Game;

/// Made/attempted counts for one shot category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShotLine {
    pub made: u32,
    pub attempts: u32,
}

impl ShotLine {
    pub fn new(made: u32, attempts: u32) -> Self {
        Self { made, attempts }
    }

    fn record(&mut self, made: bool) {
        self.attempts += 1;
        if made {
            self.made += 1;
        }
    }

    /// Shooting percentage in `[0, 100]`, or `None` with no attempts.
    pub fn percentage(&self) -> Option<f64> {
        (self.attempts > 0).then(|| f64::from(self.made) * 100.0 / f64::from(self.attempts))
    }

    fn add(&mut self, other: &ShotLine) {
        self.made += other.made;
        self.attempts += other.attempts;
    }
}

/// Foul state. `codes` are flags; `total` is the number of fouls charged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fouls {
    pub codes: BTreeSet<FoulCode>,
    pub total: u32,
}

impl Fouls {
    pub fn has(&self, code: FoulCode) -> bool {
        self.codes.contains(&code)
    }
}

/// Box-score line for one player or a group of players.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub points: u32,
    pub ft: ShotLine,
    pub fg: ShotLine,
    pub three: ShotLine,
    pub reb: u32,
    pub ast: u32,
    pub stl: u32,
    pub blk: u32,
    pub to: u32,
    pub fouls: Fouls,
}

impl PlayerStats {
    /// Shot line for a category.
    pub fn shots(&self, category: ShotCategory) -> &ShotLine {
        match category {
            ShotCategory::FreeThrow => &self.ft,
            ShotCategory::FieldGoal => &self.fg,
            ShotCategory::ThreePoint => &self.three,
        }
    }

    fn shots_mut(&mut self, category: ShotCategory) -> &mut ShotLine {
        match category {
            ShotCategory::FreeThrow => &mut self.ft,
            ShotCategory::FieldGoal => &mut self.fg,
            ShotCategory::ThreePoint => &mut self.three,
        }
    }

    /// Counter for a stat code.
    pub fn counter(&self, stat: StatCode) -> u32 {
        match stat {
            StatCode::Reb => self.reb,
            StatCode::Ast => self.ast,
            StatCode::Stl => self.stl,
            StatCode::Blk => self.blk,
            StatCode::To => self.to,
        }
    }

    fn counter_mut(&mut self, stat: StatCode) -> &mut u32 {
        match stat {
            StatCode::Reb => &mut self.reb,
            StatCode::Ast => &mut self.ast,
            StatCode::Stl => &mut self.stl,
            StatCode::Blk => &mut self.blk,
            StatCode::To => &mut self.to,
        }
    }

    /// Add another line's totals into this one.
    pub fn merge(&mut self, other: &PlayerStats) {
        self.points += other.points;
        self.ft.add(&other.ft);
        self.fg.add(&other.fg);
        self.three.add(&other.three);
        for stat in StatCode::ALL {
            *self.counter_mut(stat) += other.counter(stat);
        }
        self.fouls.codes.extend(other.fouls.codes.iter().copied());
        self.fouls.total += other.fouls.total;
    }

    pub fn to_json(&self) -> serde_json::Value {
        let line = |s: &ShotLine| {
            serde_json::json!({
                "made": s.made,
                "attempts": s.attempts,
                "pct": s.percentage()
            })
        };
        serde_json::json!({
            "pts": self.points,
            "ft": line(&self.ft),
            "fg": line(&self.fg),
            "3pt": line(&self.three),
            "reb": self.reb,
            "ast": self.ast,
            "stl": self.stl,
            "blk": self.blk,
            "to": self.to,
            "fouls": self.fouls.codes.iter().map(|c| c.as_str()).collect::<Vec<_>>(),
            "total_fouls": self.fouls.total
        })
    }
}

/// Stats for one jersey over the active events.
pub fn stats_for(jersey: u8, events: &[Event]) -> PlayerStats {
    let mut stats = PlayerStats::default();

    for event in events
        .iter()
        .filter(|e| e.is_active() && e.player_number == jersey)
    {
        match event.action {
            EventAction::Shot { made, category, .. } => {
                stats.shots_mut(category).record(made);
                if made {
                    stats.points += category.points();
                }
            }
            EventAction::Stat { stat } => *stats.counter_mut(stat) += 1,
            EventAction::Foul { foul } => {
                stats.fouls.codes.insert(foul);
            }
        }
    }

    // Flags, not events: duplicates of one code count once.
    stats.fouls.total = stats.fouls.codes.len() as u32;
    stats
}

/// Summed stats for a set of jerseys.
///
/// `fouls.total` is the sum of each player's own total.
pub fn combined_stats(jerseys: &[u8], events: &[Event]) -> PlayerStats {
    let unique: BTreeSet<u8> = jerseys.iter().copied().collect();
    unique
        .into_iter()
        .map(|j| stats_for(j, events))
        .fold(PlayerStats::default(), |mut acc, s| {
            acc.merge(&s);
            acc
        })
}

/// Team totals over the roster.
pub fn team_stats(events: &[Event], roster: &[u8]) -> PlayerStats {
    combined_stats(roster, events)
}

/// Full box score for a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoxScore {
    pub players: BTreeMap<u8, PlayerStats>,
    pub team: PlayerStats,
}

impl BoxScore {
    pub fn compute(game: &Game) -> Self {
        let events = game.events();
        let players: BTreeMap<u8, PlayerStats> = game
            .roster()
            .iter()
            .map(|&j| (j, stats_for(j, events)))
            .collect();

        let mut team = PlayerStats::default();
        for stats in players.values() {
            team.merge(stats);
        }

        Self { players, team }
    }

    /// Stats for a jersey; zeroes for players not on the roster.
    pub fn player(&self, jersey: u8) -> PlayerStats {
        self.players.get(&jersey).cloned().unwrap_or_default()
    }
}

/// Box score cached against a game's revision.
#[derive(Debug, Default)]
pub struct StatsCache {
    key: Option<(String, u64)>,
    box_score: BoxScore,
}

impl StatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute if the game changed since the last call.
    pub fn refresh(&mut self, game: &Game) -> &BoxScore {
        let key = (game.id.clone(), game.revision());
        if self.key.as_ref() != Some(&key) {
            self.box_score = BoxScore::compute(game);
            self.key = Some(key);
        }
        &self.box_score
    }

    /// Last computed box score.
    pub fn box_score(&self) -> &BoxScore {
        &self.box_score
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.box_score = BoxScore::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::event::EventTransition;
    use pretty_assertions::assert_eq;

    fn shot(index: u64, jersey: u8, made: bool, category: ShotCategory) -> Event {
        Event::new(
            index,
            jersey,
            EventAction::Shot {
                made,
                category,
                location: None,
            },
        )
    }

    fn stat(index: u64, jersey: u8, stat: StatCode) -> Event {
        Event::new(index, jersey, EventAction::Stat { stat })
    }

    fn foul(index: u64, jersey: u8, foul: FoulCode) -> Event {
        Event::new(index, jersey, EventAction::Foul { foul })
    }

    #[test]
    fn test_team_stats_example() {
        let events = vec![
            shot(0, 4, true, ShotCategory::FieldGoal),
            shot(1, 4, false, ShotCategory::ThreePoint),
            stat(2, 5, StatCode::Reb),
        ];

        let team = team_stats(&events, &[4, 5]);
        assert_eq!(team.points, 2);
        assert_eq!(team.fg, ShotLine::new(1, 1));
        assert_eq!(team.three, ShotLine::new(0, 1));
        assert_eq!(team.reb, 1);
    }

    #[test]
    fn test_points_per_category() {
        let events = vec![
            shot(0, 7, true, ShotCategory::FreeThrow),
            shot(1, 7, false, ShotCategory::FreeThrow),
            shot(2, 7, true, ShotCategory::FieldGoal),
            shot(3, 7, true, ShotCategory::ThreePoint),
        ];

        let stats = stats_for(7, &events);
        assert_eq!(stats.points, 6);
        assert_eq!(stats.ft, ShotLine::new(1, 2));
        assert_eq!(stats.ft.percentage(), Some(50.0));
        assert_eq!(stats.fg.percentage(), Some(100.0));
    }

    #[test]
    fn test_only_active_events_count() {
        let mut archived = stat(1, 4, StatCode::Ast);
        archived.transition(EventTransition::Undo).unwrap();
        let mut deleted = shot(2, 4, true, ShotCategory::ThreePoint);
        deleted.transition(EventTransition::Delete).unwrap();

        let events = vec![stat(0, 4, StatCode::Ast), archived, deleted];
        let stats = stats_for(4, &events);

        assert_eq!(stats.ast, 1);
        assert_eq!(stats.points, 0);
        assert_eq!(stats.three.attempts, 0);
    }

    #[test]
    fn test_stats_for_is_pure() {
        let events = vec![
            shot(0, 4, true, ShotCategory::FieldGoal),
            foul(1, 4, FoulCode::P1),
        ];
        let snapshot = events.clone();

        let first = stats_for(4, &events);
        let second = stats_for(4, &events);

        assert_eq!(first, second);
        assert_eq!(events, snapshot);
    }

    #[test]
    fn test_duplicate_foul_flags_count_once() {
        let events = vec![
            foul(0, 4, FoulCode::P1),
            foul(1, 4, FoulCode::P1),
            foul(2, 4, FoulCode::T1),
        ];

        let stats = stats_for(4, &events);
        assert_eq!(stats.fouls.total, 2);
        assert!(stats.fouls.has(FoulCode::P1));
        assert!(stats.fouls.has(FoulCode::T1));
        assert!(!stats.fouls.has(FoulCode::P2));
    }

    #[test]
    fn test_combined_fouls_sum_totals() {
        // Same code on two players is two fouls, not one flag
        let events = vec![
            foul(0, 4, FoulCode::P1),
            foul(1, 5, FoulCode::P1),
            foul(2, 5, FoulCode::P2),
        ];

        let combined = combined_stats(&[4, 5], &events);
        assert_eq!(combined.fouls.total, 3);
        assert_eq!(combined.fouls.codes.len(), 2);
    }

    #[test]
    fn test_combined_ignores_repeated_jerseys() {
        let events = vec![stat(0, 4, StatCode::Stl)];
        assert_eq!(combined_stats(&[4, 4], &events).stl, 1);
    }

    #[test]
    fn test_box_score_and_cache() {
        let mut game = Game::new("g".into(), "n".into(), "t".into())
            .with_roster([4, 5], BTreeMap::new())
            .unwrap();
        game.add_event(0, 4, EventAction::Stat { stat: StatCode::Blk })
            .unwrap();

        let mut cache = StatsCache::new();
        assert_eq!(cache.refresh(&game).team.blk, 1);
        assert_eq!(cache.box_score().player(5), PlayerStats::default());

        game.add_event(1, 5, EventAction::Stat { stat: StatCode::Blk })
            .unwrap();
        let box_score = cache.refresh(&game);
        assert_eq!(box_score.team.blk, 2);
        assert_eq!(box_score.player(5).blk, 1);
    }

    #[test]
    fn test_stats_json() {
        let events = vec![shot(0, 4, true, ShotCategory::ThreePoint)];
        let json = stats_for(4, &events).to_json();
        assert_eq!(json["pts"], 3);
        assert_eq!(json["3pt"]["made"], 1);
        assert!(json["ft"]["pct"].is_null());
    }
}
