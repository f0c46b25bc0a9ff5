//! Game events and their status state machine.
//!
//! Every recorded action is an [`Event`] with an immutable index. Undo, redo
//! and deletion never remove an event; they move it between statuses.
//!
//! # State Diagram
//!
//! ```text
//!              undo
//! ┌────────┐ ────────▶ ┌──────────┐
//! │ Active │           │ Archived │
//! └───┬────┘ ◀──────── └──────────┘
//!     │         redo
//!     │ delete / foul toggled off
//!     ▼
//! ┌─────────┐
//! │ Deleted │  (terminal)
//! └─────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shot categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShotCategory {
    #[serde(rename = "FT")]
    FreeThrow,
    #[serde(rename = "FG")]
    FieldGoal,
    #[serde(rename = "3PT")]
    ThreePoint,
}

impl ShotCategory {
    pub const ALL: [ShotCategory; 3] = [Self::FreeThrow, Self::FieldGoal, Self::ThreePoint];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeThrow => "FT",
            Self::FieldGoal => "FG",
            Self::ThreePoint => "3PT",
        }
    }

    /// Points awarded for a made shot.
    pub fn points(&self) -> u32 {
        match self {
            Self::FreeThrow => 1,
            Self::FieldGoal => 2,
            Self::ThreePoint => 3,
        }
    }
}

/// Foul codes. Each code is a flag, not a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FoulCode {
    P1,
    P2,
    P3,
    P4,
    P5,
    T1,
    T2,
}

impl FoulCode {
    pub const ALL: [FoulCode; 7] = [
        Self::P1,
        Self::P2,
        Self::P3,
        Self::P4,
        Self::P5,
        Self::T1,
        Self::T2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::P5 => "P5",
            Self::T1 => "T1",
            Self::T2 => "T2",
        }
    }

    pub fn is_technical(&self) -> bool {
        matches!(self, Self::T1 | Self::T2)
    }
}

/// Box-score counter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatCode {
    Reb,
    Ast,
    Stl,
    Blk,
    To,
}

impl StatCode {
    pub const ALL: [StatCode; 5] = [Self::Reb, Self::Ast, Self::Stl, Self::Blk, Self::To];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reb => "REB",
            Self::Ast => "AST",
            Self::Stl => "STL",
            Self::Blk => "BLK",
            Self::To => "TO",
        }
    }
}

/// Shot location in normalized court coordinates.
///
/// Both axes are in `[0, 1]`, independent of the rendered court size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourtLocation {
    pub x: f64,
    pub y: f64,
}

impl CourtLocation {
    /// Create a location from already-normalized coordinates.
    ///
    /// Returns `None` if either axis is outside `[0, 1]` or not a number.
    pub fn new(x: f64, y: f64) -> Option<Self> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if in_range(x) && in_range(y) {
            Some(Self { x, y })
        } else {
            None
        }
    }

    /// Normalize a tap on a court rendered at `width` x `height`.
    ///
    /// Taps outside the court are clamped to the nearest edge.
    pub fn from_tap(px: f64, py: f64, width: f64, height: f64) -> Option<Self> {
        if !(width > 0.0 && height > 0.0) || px.is_nan() || py.is_nan() {
            return None;
        }
        Some(Self {
            x: (px / width).clamp(0.0, 1.0),
            y: (py / height).clamp(0.0, 1.0),
        })
    }
}

/// Kind of action an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Shot,
    Foul,
    Stat,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shot => "shot",
            Self::Foul => "foul",
            Self::Stat => "stat",
        }
    }
}

/// Action kind plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventAction {
    Shot {
        made: bool,
        category: ShotCategory,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<CourtLocation>,
    },
    Foul {
        foul: FoulCode,
    },
    Stat {
        stat: StatCode,
    },
}

impl EventAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Shot { .. } => ActionKind::Shot,
            Self::Foul { .. } => ActionKind::Foul,
            Self::Stat { .. } => ActionKind::Stat,
        }
    }

    pub fn foul_code(&self) -> Option<FoulCode> {
        match self {
            Self::Foul { foul } => Some(*foul),
            _ => None,
        }
    }

    /// Short text for the event log.
    pub fn label(&self) -> String {
        match self {
            Self::Shot { made, category, .. } => {
                let verb = if *made { "Made" } else { "Missed" };
                format!("{} {}", verb, category.as_str())
            }
            Self::Foul { foul } => format!("Foul {}", foul.as_str()),
            Self::Stat { stat } => stat.as_str().to_string(),
        }
    }
}

/// Event visibility status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Counts toward stats
    #[default]
    Active,
    /// Undone, can be redone
    Archived,
    /// Permanently excluded
    Deleted,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleted)
    }

    /// Apply a transition, returning the new status or an error.
    pub fn apply(self, transition: EventTransition) -> Result<Self, InvalidTransition> {
        use EventStatus::*;
        use EventTransition::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self,
            transition,
            reason,
        };

        match (self, transition) {
            (Active, Undo) => Ok(Archived),
            (Active, Delete) => Ok(Deleted),
            (Active, Redo) => Err(invalid("Event is not undone")),

            (Archived, Redo) => Ok(Active),
            (Archived, Undo) => Err(invalid("Event is already undone")),
            (Archived, Delete) => Err(invalid("Undone events cannot be deleted")),

            (Deleted, _) => Err(invalid("Event is deleted")),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTransition {
    Undo,
    Redo,
    Delete,
}

/// Error when a status transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid transition from {from} via {transition:?}: {reason}")]
pub struct InvalidTransition {
    pub from: EventStatus,
    pub transition: EventTransition,
    pub reason: &'static str,
}

/// A recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Sequence index, unique for the life of the game
    pub index: u64,

    /// When the event was recorded
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Jersey number of the player
    pub player_number: u8,

    /// What happened
    pub action: EventAction,

    #[serde(default)]
    pub status: EventStatus,

    /// Set by an explicit correction
    #[serde(default)]
    pub edited: bool,
}

impl Event {
    /// Create a new active event stamped with the current time.
    pub fn new(index: u64, player_number: u8, action: EventAction) -> Self {
        Self {
            index,
            timestamp: chrono::Utc::now(),
            player_number,
            action,
            status: EventStatus::Active,
            edited: false,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    /// Move to a new status in place.
    pub fn transition(&mut self, transition: EventTransition) -> Result<(), InvalidTransition> {
        self.status = self.status.apply(transition)?;
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "index": self.index,
            "timestamp": self.timestamp.to_rfc3339(),
            "player_number": self.player_number,
            "kind": self.kind().as_str(),
            "label": self.action.label(),
            "status": self.status.as_str(),
            "edited": self.edited
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let status = EventStatus::Active;

        let archived = status.apply(EventTransition::Undo).unwrap();
        assert_eq!(archived, EventStatus::Archived);

        let active = archived.apply(EventTransition::Redo).unwrap();
        assert_eq!(active, EventStatus::Active);

        let deleted = active.apply(EventTransition::Delete).unwrap();
        assert_eq!(deleted, EventStatus::Deleted);
        assert!(deleted.is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        // Archived events can only come back
        let err = EventStatus::Archived
            .apply(EventTransition::Delete)
            .unwrap_err();
        assert_eq!(err.from, EventStatus::Archived);

        assert!(EventStatus::Active.apply(EventTransition::Redo).is_err());

        // Nothing leaves Deleted
        for t in [EventTransition::Undo, EventTransition::Redo, EventTransition::Delete] {
            assert!(EventStatus::Deleted.apply(t).is_err());
        }
    }

    #[test]
    fn test_court_location() {
        assert!(CourtLocation::new(0.5, 1.0).is_some());
        assert!(CourtLocation::new(-0.1, 0.5).is_none());
        assert!(CourtLocation::new(0.5, f64::NAN).is_none());

        let loc = CourtLocation::from_tap(150.0, 50.0, 300.0, 200.0).unwrap();
        assert_eq!(loc, CourtLocation { x: 0.5, y: 0.25 });

        // Off-court taps clamp
        let edge = CourtLocation::from_tap(-20.0, 500.0, 300.0, 200.0).unwrap();
        assert_eq!(edge, CourtLocation { x: 0.0, y: 1.0 });

        assert!(CourtLocation::from_tap(1.0, 1.0, 0.0, 200.0).is_none());
    }

    #[test]
    fn test_action_labels() {
        let made = EventAction::Shot {
            made: true,
            category: ShotCategory::FieldGoal,
            location: None,
        };
        let missed = EventAction::Shot {
            made: false,
            category: ShotCategory::ThreePoint,
            location: None,
        };
        assert_eq!(made.label(), "Made FG");
        assert_eq!(missed.label(), "Missed 3PT");
        assert_eq!(EventAction::Foul { foul: FoulCode::P2 }.label(), "Foul P2");
        assert_eq!(EventAction::Stat { stat: StatCode::Reb }.label(), "REB");
    }

    #[test]
    fn test_event_wire_format() {
        let event = Event::new(
            7,
            23,
            EventAction::Shot {
                made: true,
                category: ShotCategory::ThreePoint,
                location: CourtLocation::new(0.25, 0.75),
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["index"], 7);
        assert_eq!(json["playerNumber"], 23);
        assert_eq!(json["action"]["type"], "shot");
        assert_eq!(json["action"]["category"], "3PT");
        assert_eq!(json["status"], "active");

        let foul = serde_json::to_value(EventAction::Foul { foul: FoulCode::T1 }).unwrap();
        assert_eq!(foul, serde_json::json!({"type": "foul", "foul": "T1"}));
    }
}
