//! Immutable balance configuration shared by the engines.
//!
//! Everything the progression, training, team and match code needs to know
//! about game balance lives here. Engines own an `Arc<BalanceConfig>` handed to
//! them at construction so tests can swap tables without touching globals.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::character::{Position, StatName};
use crate::constants::{
    BASE_EXP_REQUIRED, DEFAULT_CHEMISTRY, DURATION_MULTIPLIER_CAP, DURATION_REFERENCE_MINUTES,
    ENERGY_RECOVERY_PER_HOUR, EXP_MULTIPLIER, INTENSITY_COST_STEP, INTENSITY_GAIN_STEP,
    LEVEL_PENALTY_FLOOR, LEVEL_PENALTY_STEP, MATCH_BLOWOUT_THRESHOLD, MATCH_CHEMISTRY_PIVOT,
    MATCH_CLOSE_THRESHOLD, MATCH_MODERATE_ONE_SET_CHANCE, MATCH_SHUTOUT_CHANCE, MATCH_VARIANCE,
    MAX_CHEMISTRY, MAX_ENERGY, MAX_LEVEL, MAX_LIBEROS_IN_FORMATION, MAX_MOTIVATION, MAX_STAT,
    MAX_TEAM_MEMBERS, MAX_TRAINING_INTENSITY, MIN_ATTACKERS_IN_FORMATION, MIN_CHEMISTRY, MIN_LEVEL,
    MIN_STAT, MIN_TEAM_MEMBERS, MIN_TRAINING_INTENSITY, MOTIVATION_RECOVERY_PER_HOUR,
    POSITION_AFFINITY_BONUS, PRIMARY_EXP_WEIGHT, RECOVERY_RECOMMENDATION_THRESHOLD,
    SECONDARY_EXP_WEIGHT, SECONDARY_GAIN_SCALE, STARTING_LINEUP, TEAM_PRACTICE_CHEMISTRY_BONUS,
    TRAINING_STAT_GAIN_BASE,
};
use crate::items::Rarity;
use crate::training::TrainingType;

const DEFAULT_BALANCE_DATA: &str = include_str!("../assets/balance.json");

/// Errors raised when balance configuration invariants are violated.
#[derive(Debug, Error)]
pub enum BalanceConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} bounds invalid (min {min} > max {max})")]
    Bounds {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("no profile configured for position {0}")]
    MissingPosition(Position),
    #[error("no metadata configured for training type {0}")]
    MissingTrainingType(TrainingType),
    #[error("drop rates sum to {total:.2}, expected at most 100")]
    DropRates { total: f64 },
    #[error("balance data could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Experience curve and training gain formula parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionCfg {
    pub base_exp: u64,
    pub exp_multiplier: f64,
    pub min_level: u32,
    pub max_level: u32,
    pub stat_gain_base: u32,
    pub intensity_gain_step: f64,
    pub level_penalty_step: f64,
    pub level_penalty_floor: f64,
    pub intensity_cost_step: f64,
    pub min_intensity: u8,
    pub max_intensity: u8,
    pub secondary_gain_scale: f64,
    pub primary_exp_weight: u32,
    pub secondary_exp_weight: u32,
    pub position_bonus: f64,
    pub duration_reference_minutes: f64,
    pub duration_multiplier_cap: f64,
}

impl Default for ProgressionCfg {
    fn default() -> Self {
        Self {
            base_exp: BASE_EXP_REQUIRED,
            exp_multiplier: EXP_MULTIPLIER,
            min_level: MIN_LEVEL,
            max_level: MAX_LEVEL,
            stat_gain_base: TRAINING_STAT_GAIN_BASE,
            intensity_gain_step: INTENSITY_GAIN_STEP,
            level_penalty_step: LEVEL_PENALTY_STEP,
            level_penalty_floor: LEVEL_PENALTY_FLOOR,
            intensity_cost_step: INTENSITY_COST_STEP,
            min_intensity: MIN_TRAINING_INTENSITY,
            max_intensity: MAX_TRAINING_INTENSITY,
            secondary_gain_scale: SECONDARY_GAIN_SCALE,
            primary_exp_weight: PRIMARY_EXP_WEIGHT,
            secondary_exp_weight: SECONDARY_EXP_WEIGHT,
            position_bonus: POSITION_AFFINITY_BONUS,
            duration_reference_minutes: DURATION_REFERENCE_MINUTES,
            duration_multiplier_cap: DURATION_MULTIPLIER_CAP,
        }
    }
}

impl ProgressionCfg {
    fn validate(&self) -> Result<(), BalanceConfigError> {
        if self.base_exp == 0 {
            return Err(BalanceConfigError::MinViolation {
                field: "progression.base_exp",
                min: 1.0,
                value: 0.0,
            });
        }
        if self.exp_multiplier < 1.0 {
            return Err(BalanceConfigError::MinViolation {
                field: "progression.exp_multiplier",
                min: 1.0,
                value: self.exp_multiplier,
            });
        }
        if self.min_level == 0 || self.min_level > self.max_level {
            return Err(BalanceConfigError::Bounds {
                field: "progression.level",
                min: f64::from(self.min_level),
                max: f64::from(self.max_level),
            });
        }
        if self.min_intensity == 0 || self.min_intensity > self.max_intensity {
            return Err(BalanceConfigError::Bounds {
                field: "progression.intensity",
                min: f64::from(self.min_intensity),
                max: f64::from(self.max_intensity),
            });
        }
        if !(0.0..=1.0).contains(&self.level_penalty_floor) {
            return Err(BalanceConfigError::RangeViolation {
                field: "progression.level_penalty_floor",
                min: 0.0,
                max: 1.0,
                value: self.level_penalty_floor,
            });
        }
        if !(0.0..=1.0).contains(&self.secondary_gain_scale) {
            return Err(BalanceConfigError::RangeViolation {
                field: "progression.secondary_gain_scale",
                min: 0.0,
                max: 1.0,
                value: self.secondary_gain_scale,
            });
        }
        if self.position_bonus < 1.0 {
            return Err(BalanceConfigError::MinViolation {
                field: "progression.position_bonus",
                min: 1.0,
                value: self.position_bonus,
            });
        }
        if self.duration_reference_minutes <= 0.0 {
            return Err(BalanceConfigError::MinViolation {
                field: "progression.duration_reference_minutes",
                min: 1.0,
                value: self.duration_reference_minutes,
            });
        }
        if self.duration_multiplier_cap <= 0.0 {
            return Err(BalanceConfigError::MinViolation {
                field: "progression.duration_multiplier_cap",
                min: 0.0,
                value: self.duration_multiplier_cap,
            });
        }
        Ok(())
    }
}

/// Energy and motivation caps plus passive recovery rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCfg {
    pub max_energy: i32,
    pub max_motivation: i32,
    pub energy_per_hour: i32,
    pub motivation_per_hour: i32,
    /// Below this energy or motivation only recovery is recommended.
    pub recovery_threshold: i32,
}

impl Default for ResourceCfg {
    fn default() -> Self {
        Self {
            max_energy: MAX_ENERGY,
            max_motivation: MAX_MOTIVATION,
            energy_per_hour: ENERGY_RECOVERY_PER_HOUR,
            motivation_per_hour: MOTIVATION_RECOVERY_PER_HOUR,
            recovery_threshold: RECOVERY_RECOMMENDATION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for StatBounds {
    fn default() -> Self {
        Self {
            min: MIN_STAT,
            max: MAX_STAT,
        }
    }
}

impl StatBounds {
    #[must_use]
    pub fn clamp(self, value: u32) -> u32 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionProfile {
    pub name: String,
    pub description: String,
    /// Stats this position trains faster.
    pub affinity: Vec<StatName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTypeSpec {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub primary_stat: Option<StatName>,
    #[serde(default)]
    pub secondary_stats: Vec<StatName>,
    /// Negative costs restore the resource instead.
    pub energy_cost: i32,
    pub motivation_cost: i32,
    #[serde(default)]
    pub chemistry_bonus: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityProfile {
    pub name: String,
    /// Percentage chance in `[0, 100]`.
    pub drop_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCfg {
    pub max_members: usize,
    pub min_members: usize,
    pub starting_lineup: usize,
    pub min_chemistry: u32,
    pub max_chemistry: u32,
    pub default_chemistry: u32,
    pub max_liberos: usize,
    pub min_attackers: usize,
}

impl Default for TeamCfg {
    fn default() -> Self {
        Self {
            max_members: MAX_TEAM_MEMBERS,
            min_members: MIN_TEAM_MEMBERS,
            starting_lineup: STARTING_LINEUP,
            min_chemistry: MIN_CHEMISTRY,
            max_chemistry: MAX_CHEMISTRY,
            default_chemistry: DEFAULT_CHEMISTRY,
            max_liberos: MAX_LIBEROS_IN_FORMATION,
            min_attackers: MIN_ATTACKERS_IN_FORMATION,
        }
    }
}

impl TeamCfg {
    fn validate(&self) -> Result<(), BalanceConfigError> {
        if self.starting_lineup == 0 || self.starting_lineup > self.max_members {
            return Err(BalanceConfigError::Bounds {
                field: "team.starting_lineup",
                min: 1.0,
                max: crate::numbers::usize_to_f64(self.max_members),
            });
        }
        if self.min_members > self.max_members {
            return Err(BalanceConfigError::Bounds {
                field: "team.members",
                min: crate::numbers::usize_to_f64(self.min_members),
                max: crate::numbers::usize_to_f64(self.max_members),
            });
        }
        if self.min_chemistry > self.max_chemistry
            || !(self.min_chemistry..=self.max_chemistry).contains(&self.default_chemistry)
        {
            return Err(BalanceConfigError::RangeViolation {
                field: "team.default_chemistry",
                min: f64::from(self.min_chemistry),
                max: f64::from(self.max_chemistry),
                value: f64::from(self.default_chemistry),
            });
        }
        Ok(())
    }
}

/// Match outcome model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCfg {
    pub chemistry_pivot: f64,
    /// Full width of the uniform variance band applied to each side.
    pub variance: f64,
    pub close_threshold: f64,
    pub blowout_threshold: f64,
    pub shutout_chance: f64,
    pub moderate_one_set_chance: f64,
}

impl Default for MatchCfg {
    fn default() -> Self {
        Self {
            chemistry_pivot: MATCH_CHEMISTRY_PIVOT,
            variance: MATCH_VARIANCE,
            close_threshold: MATCH_CLOSE_THRESHOLD,
            blowout_threshold: MATCH_BLOWOUT_THRESHOLD,
            shutout_chance: MATCH_SHUTOUT_CHANCE,
            moderate_one_set_chance: MATCH_MODERATE_ONE_SET_CHANCE,
        }
    }
}

impl MatchCfg {
    fn validate(&self) -> Result<(), BalanceConfigError> {
        for (field, value) in [
            ("matches.variance", self.variance),
            ("matches.shutout_chance", self.shutout_chance),
            ("matches.moderate_one_set_chance", self.moderate_one_set_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(BalanceConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        if self.close_threshold > self.blowout_threshold {
            return Err(BalanceConfigError::Bounds {
                field: "matches.thresholds",
                min: self.close_threshold,
                max: self.blowout_threshold,
            });
        }
        Ok(())
    }
}

/// Complete balance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub progression: ProgressionCfg,
    pub resources: ResourceCfg,
    pub stats: StatBounds,
    pub positions: BTreeMap<Position, PositionProfile>,
    pub training: BTreeMap<TrainingType, TrainingTypeSpec>,
    pub rarities: BTreeMap<Rarity, RarityProfile>,
    pub team: TeamCfg,
    pub matches: MatchCfg,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            progression: ProgressionCfg::default(),
            resources: ResourceCfg::default(),
            stats: StatBounds::default(),
            positions: default_positions(),
            training: default_training_types(),
            rarities: default_rarities(),
            team: TeamCfg::default(),
            matches: MatchCfg::default(),
        }
    }
}

impl BalanceConfig {
    /// Load the bundled balance table, falling back to compiled defaults.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_BALANCE_DATA).unwrap_or_default()
    }

    /// Parse and validate a balance table from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the table fails validation.
    pub fn from_json(json: &str) -> Result<Self, BalanceConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every table invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), BalanceConfigError> {
        self.progression.validate()?;
        if self.stats.min > self.stats.max {
            return Err(BalanceConfigError::Bounds {
                field: "stats",
                min: f64::from(self.stats.min),
                max: f64::from(self.stats.max),
            });
        }
        if self.resources.max_energy <= 0 || self.resources.max_motivation <= 0 {
            return Err(BalanceConfigError::MinViolation {
                field: "resources.max",
                min: 1.0,
                value: f64::from(self.resources.max_energy.min(self.resources.max_motivation)),
            });
        }
        if let Some(missing) = Position::ALL
            .into_iter()
            .find(|p| !self.positions.contains_key(p))
        {
            return Err(BalanceConfigError::MissingPosition(missing));
        }
        if let Some(missing) = TrainingType::ALL
            .into_iter()
            .find(|t| !self.training.contains_key(t))
        {
            return Err(BalanceConfigError::MissingTrainingType(missing));
        }
        let total: f64 = self.rarities.values().map(|r| r.drop_rate).sum();
        if self.rarities.values().any(|r| r.drop_rate < 0.0) || total > 100.0 + f64::EPSILON {
            return Err(BalanceConfigError::DropRates { total });
        }
        self.team.validate()?;
        self.matches.validate()?;
        Ok(())
    }

    /// Metadata for a training type, if configured.
    #[must_use]
    pub fn training_spec(&self, kind: TrainingType) -> Option<&TrainingTypeSpec> {
        self.training.get(&kind)
    }

    /// Whether `stat` is one of the affinity stats of `position`.
    #[must_use]
    pub fn has_affinity(&self, position: Position, stat: StatName) -> bool {
        self.positions
            .get(&position)
            .is_some_and(|p| p.affinity.contains(&stat))
    }
}

fn position(name: &str, description: &str, affinity: [StatName; 3]) -> PositionProfile {
    PositionProfile {
        name: name.to_string(),
        description: description.to_string(),
        affinity: affinity.to_vec(),
    }
}

fn default_positions() -> BTreeMap<Position, PositionProfile> {
    BTreeMap::from([
        (
            Position::WingSpiker,
            position(
                "Wing Spiker",
                "Versatile attacker who plays on the wings",
                [StatName::Power, StatName::Jump, StatName::Attack],
            ),
        ),
        (
            Position::Setter,
            position(
                "Setter",
                "Playmaker who sets up attacks",
                [StatName::Technique, StatName::Mental, StatName::Set],
            ),
        ),
        (
            Position::MiddleBlocker,
            position(
                "Middle Blocker",
                "Central defender and quick attacker",
                [StatName::Jump, StatName::Power, StatName::Block],
            ),
        ),
        (
            Position::Libero,
            position(
                "Libero",
                "Defensive specialist",
                [StatName::Speed, StatName::Receive, StatName::Mental],
            ),
        ),
        (
            Position::OutsideHitter,
            position(
                "Outside Hitter",
                "Primary attacker from the left side",
                [StatName::Power, StatName::Attack, StatName::Jump],
            ),
        ),
    ])
}

fn training(
    name: &str,
    description: &str,
    primary_stat: Option<StatName>,
    secondary_stats: &[StatName],
    costs: (i32, i32),
    chemistry_bonus: u32,
) -> TrainingTypeSpec {
    TrainingTypeSpec {
        name: name.to_string(),
        description: description.to_string(),
        primary_stat,
        secondary_stats: secondary_stats.to_vec(),
        energy_cost: costs.0,
        motivation_cost: costs.1,
        chemistry_bonus,
    }
}

fn default_training_types() -> BTreeMap<TrainingType, TrainingTypeSpec> {
    BTreeMap::from([
        (
            TrainingType::PowerTraining,
            training(
                "Power Training",
                "Weight training and spike practice",
                Some(StatName::Power),
                &[StatName::Attack],
                (25, 15),
                0,
            ),
        ),
        (
            TrainingType::SpeedTraining,
            training(
                "Speed Training",
                "Agility and footwork drills",
                Some(StatName::Speed),
                &[StatName::Receive],
                (20, 10),
                0,
            ),
        ),
        (
            TrainingType::TechniqueTraining,
            training(
                "Technique Training",
                "Ball handling and precision work",
                Some(StatName::Technique),
                &[StatName::Set],
                (15, 20),
                0,
            ),
        ),
        (
            TrainingType::JumpTraining,
            training(
                "Jump Training",
                "Plyometrics and vertical training",
                Some(StatName::Jump),
                &[StatName::Block],
                (30, 15),
                0,
            ),
        ),
        (
            TrainingType::StaminaTraining,
            training(
                "Stamina Training",
                "Endurance and cardio work",
                Some(StatName::Stamina),
                &[StatName::Speed],
                (20, 10),
                0,
            ),
        ),
        (
            TrainingType::MentalTraining,
            training(
                "Mental Training",
                "Strategy and focus exercises",
                Some(StatName::Mental),
                &[StatName::Set],
                (10, 25),
                0,
            ),
        ),
        (
            TrainingType::TeamPractice,
            training(
                "Team Practice",
                "Scrimmage and coordination",
                None,
                &[StatName::Technique, StatName::Mental],
                (25, 20),
                TEAM_PRACTICE_CHEMISTRY_BONUS,
            ),
        ),
        (
            TrainingType::Recovery,
            training(
                "Recovery",
                "Rest and recovery session",
                None,
                &[],
                (-30, -20),
                0,
            ),
        ),
    ])
}

fn default_rarities() -> BTreeMap<Rarity, RarityProfile> {
    [
        (Rarity::Common, "Common", 60.0),
        (Rarity::Uncommon, "Uncommon", 25.0),
        (Rarity::Rare, "Rare", 10.0),
        (Rarity::Epic, "Epic", 4.0),
        (Rarity::Legendary, "Legendary", 1.0),
    ]
    .into_iter()
    .map(|(rarity, name, drop_rate)| {
        (
            rarity,
            RarityProfile {
                name: name.to_string(),
                drop_rate,
            },
        )
    })
    .collect()
}
