//! Export/import bundles.
//!
//! A bundle is a versioned JSON document holding a game, the reusable team
//! template and the hot-button layout:
//!
//! ```text
//! {
//!   "version": 1,
//!   "exportType": "full",
//!   "exportedAt": "...",
//!   "game": { ... },
//!   "teamTemplate": { "teamName": "...", "teamRoster": [...], "playerNames": {...} },
//!   "hotButtons": [ ... ]
//! }
//! ```
//!
//! Older exports were a bare game object; those are detected by the absence
//! of both `version` and `exportType`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::event::{EventAction, StatCode};
use super::game::{Game, MAX_JERSEY};

/// Current bundle format version.
pub const EXPORT_VERSION: u32 = 1;

/// The only export type written.
pub const EXPORT_TYPE_FULL: &str = "full";

/// Reusable roster for new games.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTemplate {
    pub team_name: String,
    #[serde(default)]
    pub team_roster: Vec<u8>,
    #[serde(default)]
    pub player_names: BTreeMap<u8, String>,
}

impl TeamTemplate {
    pub fn new(team_name: impl Into<String>) -> Self {
        Self {
            team_name: team_name.into(),
            ..Self::default()
        }
    }

    /// Template matching a game's team.
    pub fn from_game(game: &Game) -> Self {
        Self {
            team_name: game.team_name.clone(),
            team_roster: game.roster().to_vec(),
            player_names: game.player_names().clone(),
        }
    }

    fn validate(&self) -> Result<(), BundleError> {
        let mut seen = BTreeSet::new();
        for &jersey in &self.team_roster {
            if jersey > MAX_JERSEY || !seen.insert(jersey) {
                return Err(BundleError::InvalidTemplate(format!(
                    "bad roster entry {}",
                    jersey
                )));
            }
        }
        Ok(())
    }
}

/// A quick-entry button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotButton {
    pub label: String,
    pub action: EventAction,
}

impl HotButton {
    pub fn new(label: impl Into<String>, action: EventAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// One button per box-score counter.
pub fn default_hot_buttons() -> Vec<HotButton> {
    StatCode::ALL
        .into_iter()
        .map(|stat| HotButton::new(stat.as_str(), EventAction::Stat { stat }))
        .collect()
}

/// Full export document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: u32,
    pub export_type: String,
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub game: Game,
    pub team_template: TeamTemplate,
    #[serde(default)]
    pub hot_buttons: Vec<HotButton>,
}

impl ExportBundle {
    pub fn new(game: Game, team_template: TeamTemplate, hot_buttons: Vec<HotButton>) -> Self {
        Self {
            version: EXPORT_VERSION,
            export_type: EXPORT_TYPE_FULL.to_string(),
            exported_at: chrono::Utc::now(),
            game,
            team_template,
            hot_buttons,
        }
    }

    pub fn to_json_string(&self) -> Result<String, BundleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parsed import, not yet applied.
#[derive(Debug, Clone)]
pub struct ImportPayload {
    pub game: Game,
    pub team_template: Option<TeamTemplate>,
    pub hot_buttons: Option<Vec<HotButton>>,
    /// Came from a bare game object
    pub legacy: bool,
}

/// Parse an import document without touching any state.
pub fn parse_import(json: &str) -> Result<ImportPayload, BundleError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let obj = value.as_object().ok_or(BundleError::NotAnObject)?;

    if !obj.contains_key("version") && !obj.contains_key("exportType") {
        let game: Game = serde_json::from_value(value)?;
        return Ok(ImportPayload {
            game,
            team_template: None,
            hot_buttons: None,
            legacy: true,
        });
    }

    let bundle: ExportBundle = serde_json::from_value(value)?;
    if bundle.export_type != EXPORT_TYPE_FULL {
        return Err(BundleError::UnsupportedExportType(bundle.export_type));
    }
    if bundle.version == 0 || bundle.version > EXPORT_VERSION {
        return Err(BundleError::UnsupportedVersion(bundle.version));
    }
    bundle.team_template.validate()?;

    Ok(ImportPayload {
        game: bundle.game,
        team_template: Some(bundle.team_template),
        hot_buttons: Some(bundle.hot_buttons),
        legacy: false,
    })
}

/// Import format errors.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Malformed import: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import must be a JSON object")]
    NotAnObject,

    #[error("Unsupported export type: {0}")]
    UnsupportedExportType(String),

    #[error("Unsupported bundle version: {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid team template: {0}")]
    InvalidTemplate(String),
}
