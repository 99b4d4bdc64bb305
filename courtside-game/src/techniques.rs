//! Special techniques and the requirements for learning them.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::character::{Character, Position};

const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/techniques.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: u32,
    #[serde(default = "one")]
    pub required_level: u32,
    #[serde(default)]
    pub required_power: u32,
    #[serde(default)]
    pub required_speed: u32,
    #[serde(default)]
    pub required_technique: u32,
    #[serde(default)]
    pub required_jump: u32,
    #[serde(default)]
    pub required_mental: u32,
    pub allowed_positions: Vec<Position>,
}

const fn one() -> u32 {
    1
}

impl Technique {
    /// Level and stat thresholds are all met by `character`.
    #[must_use]
    pub fn requirements_met(&self, character: &Character) -> bool {
        let stats = &character.stats;
        character.level >= self.required_level
            && stats.power >= self.required_power
            && stats.speed >= self.required_speed
            && stats.technique >= self.required_technique
            && stats.jump >= self.required_jump
            && stats.mental >= self.required_mental
    }

    #[must_use]
    pub fn allows(&self, position: Position) -> bool {
        self.allowed_positions.contains(&position)
    }
}

/// Bundled technique catalog. Empty, with a warning, if the bundled data
/// fails to parse.
#[must_use]
pub fn load_catalog_from_static() -> Vec<Technique> {
    parse_catalog(DEFAULT_CATALOG_DATA).unwrap_or_else(|err| {
        log::warn!("bundled technique catalog is invalid: {err}");
        Vec::new()
    })
}

/// # Errors
///
/// Returns an error if the JSON is not a list of techniques.
pub fn parse_catalog(json: &str) -> Result<Vec<Technique>, serde_json::Error> {
    serde_json::from_str(json)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TechniqueError {
    #[error("Technique already learned")]
    AlreadyLearned,
    #[error("Position not allowed for this technique")]
    PositionNotAllowed,
    #[error("Requirements not met")]
    RequirementsNotMet,
}

/// Techniques `character` could learn right now, easiest first.
///
/// Only the primary position is considered here; [`check_learn`] also accepts
/// the secondary position.
#[must_use]
pub fn eligible_techniques<'a>(
    character: &Character,
    learned: &[String],
    catalog: &'a [Technique],
) -> Vec<&'a Technique> {
    let mut eligible: Vec<&Technique> = catalog
        .iter()
        .filter(|t| !learned.contains(&t.id))
        .filter(|t| t.allows(character.primary_position))
        .filter(|t| t.requirements_met(character))
        .collect();
    eligible.sort_by_key(|t| (t.difficulty, t.required_level));
    eligible
}

/// # Errors
///
/// Fails when the technique is already known, when neither of the character's
/// positions may use it, or when a level or stat threshold is not met.
pub fn check_learn(
    character: &Character,
    learned: &[String],
    technique: &Technique,
) -> Result<(), TechniqueError> {
    if learned.contains(&technique.id) {
        return Err(TechniqueError::AlreadyLearned);
    }
    let position_ok = technique.allows(character.primary_position)
        || character
            .secondary_position
            .is_some_and(|p| technique.allows(p));
    if !position_ok {
        return Err(TechniqueError::PositionNotAllowed);
    }
    if !technique.requirements_met(character) {
        return Err(TechniqueError::RequirementsNotMet);
    }
    Ok(())
}
