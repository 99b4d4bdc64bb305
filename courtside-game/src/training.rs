//! Training sessions: validation, cost, stat gains and experience.
//!
//! [`TrainingEngine::train`] is pure. It reads a character snapshot and a
//! session request and returns a [`TrainingReport`] describing what would
//! change. Callers persist the report themselves, usually through
//! [`TrainingReport::apply`] and a store commit.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::balance::BalanceConfig;
use crate::character::{Character, StatName};
use crate::constants::{LOG_LEVEL_UP, LOG_TRAINING_COMPLETE};
use crate::numbers::{floor_f64_to_u32, floor_f64_to_u64, u64_to_f64};
use crate::progression::{
    duration_multiplier, level_from_experience, position_bonus, stat_gain, training_cost,
};

/// Kinds of training a character can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingType {
    PowerTraining,
    SpeedTraining,
    TechniqueTraining,
    JumpTraining,
    StaminaTraining,
    MentalTraining,
    TeamPractice,
    Recovery,
}

impl TrainingType {
    pub const ALL: [TrainingType; 8] = [
        TrainingType::PowerTraining,
        TrainingType::SpeedTraining,
        TrainingType::TechniqueTraining,
        TrainingType::JumpTraining,
        TrainingType::StaminaTraining,
        TrainingType::MentalTraining,
        TrainingType::TeamPractice,
        TrainingType::Recovery,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            TrainingType::PowerTraining => "POWER_TRAINING",
            TrainingType::SpeedTraining => "SPEED_TRAINING",
            TrainingType::TechniqueTraining => "TECHNIQUE_TRAINING",
            TrainingType::JumpTraining => "JUMP_TRAINING",
            TrainingType::StaminaTraining => "STAMINA_TRAINING",
            TrainingType::MentalTraining => "MENTAL_TRAINING",
            TrainingType::TeamPractice => "TEAM_PRACTICE",
            TrainingType::Recovery => "RECOVERY",
        }
    }

    /// Dedicated training for one of the six core stats.
    #[must_use]
    pub const fn for_core_stat(stat: StatName) -> Option<Self> {
        match stat {
            StatName::Power => Some(TrainingType::PowerTraining),
            StatName::Speed => Some(TrainingType::SpeedTraining),
            StatName::Technique => Some(TrainingType::TechniqueTraining),
            StatName::Jump => Some(TrainingType::JumpTraining),
            StatName::Stamina => Some(TrainingType::StaminaTraining),
            StatName::Mental => Some(TrainingType::MentalTraining),
            _ => None,
        }
    }
}

impl fmt::Display for TrainingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown training type: {0}")]
pub struct ParseTrainingTypeError(pub String);

impl FromStr for TrainingType {
    type Err = ParseTrainingTypeError;

    /// Accepts `POWER_TRAINING`, `power-training` and `power training` alike.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| {
                if c == '-' || c == ' ' {
                    '_'
                } else {
                    c.to_ascii_uppercase()
                }
            })
            .collect();
        TrainingType::ALL
            .into_iter()
            .find(|t| t.code() == normalized)
            .ok_or_else(|| ParseTrainingTypeError(s.to_string()))
    }
}

/// Energy and motivation consumed by a session. Negative values restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingCost {
    pub energy: i32,
    pub motivation: i32,
}

/// A request to train one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub character_id: String,
    pub training_type: TrainingType,
    pub duration_minutes: u32,
    pub intensity: u8,
}

impl TrainingSession {
    #[must_use]
    pub fn new(
        character_id: impl Into<String>,
        training_type: TrainingType,
        duration_minutes: u32,
        intensity: u8,
    ) -> Self {
        Self {
            character_id: character_id.into(),
            training_type,
            duration_minutes,
            intensity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrainingError {
    #[error("Invalid training type: {0}")]
    UnknownTrainingType(TrainingType),
    #[error("Invalid training session: {0}")]
    InvalidSession(String),
    #[error("Not enough energy ({}) or motivation ({}) to train", .cost.energy, .cost.motivation)]
    InsufficientResources { cost: TrainingCost },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatGain {
    pub stat: StatName,
    pub amount: u32,
}

/// Outcome of a successful training computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub training_type: TrainingType,
    pub gains: SmallVec<[StatGain; 4]>,
    pub experience: u64,
    pub cost: TrainingCost,
    pub previous_level: u32,
    pub new_level: u32,
    pub chemistry_bonus: u32,
}

impl TrainingReport {
    /// New level when the session pushed the character over a threshold.
    #[must_use]
    pub fn level_up(&self) -> Option<u32> {
        (self.new_level > self.previous_level).then_some(self.new_level)
    }

    #[must_use]
    pub fn gain_for(&self, stat: StatName) -> u32 {
        self.gains
            .iter()
            .filter(|g| g.stat == stat)
            .map(|g| g.amount)
            .sum()
    }

    /// Post-training snapshot of `character`.
    ///
    /// Resources are clamped to `[0, max]` and stats to the configured bounds.
    /// The revision is left untouched; stores bump it on commit.
    #[must_use]
    pub fn apply(&self, character: &Character, balance: &BalanceConfig) -> Character {
        let mut next = character.clone();
        next.energy = character
            .energy
            .saturating_sub(self.cost.energy)
            .clamp(0, balance.resources.max_energy);
        next.motivation = character
            .motivation
            .saturating_sub(self.cost.motivation)
            .clamp(0, balance.resources.max_motivation);
        next.experience = character.experience.saturating_add(self.experience);
        for gain in &self.gains {
            let raised = next.stats.get(gain.stat).saturating_add(gain.amount);
            next.stats.set(gain.stat, balance.stats.clamp(raised));
        }
        next.level = next.level.max(self.new_level);
        next
    }
}

/// Caller-facing summary of a training attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub success: bool,
    pub message: String,
    pub stats_gained: BTreeMap<StatName, u32>,
    pub experience_gained: u64,
    pub energy_used: i32,
    pub motivation_used: i32,
    pub level_up: bool,
    pub new_level: Option<u32>,
    pub chemistry_bonus: u32,
}

impl TrainingResult {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ..Self::default()
        }
    }
}

impl From<&TrainingReport> for TrainingResult {
    fn from(report: &TrainingReport) -> Self {
        let mut stats_gained = BTreeMap::new();
        for gain in &report.gains {
            *stats_gained.entry(gain.stat).or_insert(0) += gain.amount;
        }
        let level_up = report.level_up();
        let message = match level_up {
            Some(level) => format!("Training completed successfully! Level up! Now level {level}"),
            None => "Training completed successfully!".to_string(),
        };
        Self {
            success: true,
            message,
            stats_gained,
            experience_gained: report.experience,
            energy_used: report.cost.energy,
            motivation_used: report.cost.motivation,
            level_up: level_up.is_some(),
            new_level: level_up,
            chemistry_bonus: report.chemistry_bonus,
        }
    }
}

impl From<Result<TrainingReport, TrainingError>> for TrainingResult {
    fn from(outcome: Result<TrainingReport, TrainingError>) -> Self {
        match outcome {
            Ok(report) => Self::from(&report),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}

/// Pure training calculator bound to one balance table.
#[derive(Debug, Clone)]
pub struct TrainingEngine {
    balance: Arc<BalanceConfig>,
}

impl TrainingEngine {
    #[must_use]
    pub const fn new(balance: Arc<BalanceConfig>) -> Self {
        Self { balance }
    }

    #[must_use]
    pub fn balance(&self) -> &BalanceConfig {
        &self.balance
    }

    /// Compute the outcome of `session` for `character`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::UnknownTrainingType`] when the balance table
    /// has no metadata for the requested type, [`TrainingError::InvalidSession`]
    /// for an out-of-range intensity or an empty session, and
    /// [`TrainingError::InsufficientResources`] when the character cannot pay.
    pub fn train(
        &self,
        character: &Character,
        session: &TrainingSession,
    ) -> Result<TrainingReport, TrainingError> {
        let progression = &self.balance.progression;
        let spec = self
            .balance
            .training_spec(session.training_type)
            .ok_or(TrainingError::UnknownTrainingType(session.training_type))?;
        if !(progression.min_intensity..=progression.max_intensity).contains(&session.intensity) {
            return Err(TrainingError::InvalidSession(format!(
                "intensity must be between {} and {} (got {})",
                progression.min_intensity, progression.max_intensity, session.intensity
            )));
        }
        if session.duration_minutes == 0 {
            return Err(TrainingError::InvalidSession(
                "duration must be at least one minute".to_string(),
            ));
        }

        let cost = training_cost(progression, spec, session.intensity);
        if character.energy < cost.energy || character.motivation < cost.motivation {
            return Err(TrainingError::InsufficientResources { cost });
        }

        let base = stat_gain(
            progression,
            progression.stat_gain_base,
            session.intensity,
            character.level,
        );
        let position = character.primary_position;
        let mut gains: SmallVec<[StatGain; 4]> = SmallVec::new();
        let mut experience: u64 = 0;

        if let Some(stat) = spec.primary_stat {
            let amount =
                floor_f64_to_u32(f64::from(base) * position_bonus(&self.balance, position, stat));
            experience += u64::from(amount) * u64::from(progression.primary_exp_weight);
            gains.push(StatGain { stat, amount });
        }
        let secondary_base = floor_f64_to_u32(f64::from(base) * progression.secondary_gain_scale);
        for &stat in &spec.secondary_stats {
            let amount = floor_f64_to_u32(
                f64::from(secondary_base) * position_bonus(&self.balance, position, stat),
            );
            experience += u64::from(amount) * u64::from(progression.secondary_exp_weight);
            gains.push(StatGain { stat, amount });
        }

        let duration = duration_multiplier(progression, session.duration_minutes);
        for gain in &mut gains {
            gain.amount = floor_f64_to_u32(f64::from(gain.amount) * duration);
        }
        let experience = floor_f64_to_u64(u64_to_f64(experience) * duration);

        let new_level = level_from_experience(
            progression,
            character.experience.saturating_add(experience),
        )
        .max(character.level);

        let report = TrainingReport {
            training_type: session.training_type,
            gains,
            experience,
            cost,
            previous_level: character.level,
            new_level,
            chemistry_bonus: spec.chemistry_bonus,
        };
        log::debug!(
            "{LOG_TRAINING_COMPLETE}: character={} type={} exp={} energy={} motivation={}",
            character.id,
            session.training_type,
            report.experience,
            cost.energy,
            cost.motivation
        );
        if let Some(level) = report.level_up() {
            log::debug!("{LOG_LEVEL_UP}: character={} level={level}", character.id);
        }
        Ok(report)
    }
}

/// Suggested training types for a character, best first.
///
/// A tired or unmotivated character is only offered [`TrainingType::Recovery`].
/// Otherwise the three weakest core stats map to their dedicated training,
/// followed by [`TrainingType::TeamPractice`].
#[must_use]
pub fn recommend_training(
    character: &Character,
    balance: &BalanceConfig,
) -> SmallVec<[TrainingType; 4]> {
    let threshold = balance.resources.recovery_threshold;
    if character.energy < threshold || character.motivation < threshold {
        return SmallVec::from_slice(&[TrainingType::Recovery]);
    }
    let mut core: SmallVec<[StatName; 6]> = SmallVec::from_slice(&StatName::CORE);
    core.sort_by_key(|stat| character.stats.get(*stat));
    let mut picks: SmallVec<[TrainingType; 4]> = core
        .iter()
        .take(3)
        .filter_map(|stat| TrainingType::for_core_stat(*stat))
        .collect();
    picks.push(TrainingType::TeamPractice);
    picks
}
