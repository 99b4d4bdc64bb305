//! Experience curve, stat gain and training cost formulas.
//!
//! Every function here is pure and reads its coefficients from a
//! [`ProgressionCfg`] or [`BalanceConfig`].
//!
//! The curve is expressed two ways. [`exp_to_next_level`] is the cost of
//! leaving a level, `floor(base * multiplier^(level-1))`. [`exp_required_for_level`]
//! is the cost of entering one, so entering level 2 costs 100 and entering
//! level 3 costs 150 with the default table.
use crate::balance::{BalanceConfig, ProgressionCfg, TrainingTypeSpec};
use crate::character::{Position, StatName};
use crate::numbers::{floor_f64_to_i32, floor_f64_to_u32, floor_f64_to_u64, u64_to_f64};
use crate::training::TrainingCost;

/// Experience needed to advance out of `level`. Levels below 1 are treated as 1.
#[must_use]
pub fn exp_to_next_level(cfg: &ProgressionCfg, level: u32) -> u64 {
    let exponent = i32::try_from(level.max(1) - 1).unwrap_or(i32::MAX);
    floor_f64_to_u64(u64_to_f64(cfg.base_exp) * cfg.exp_multiplier.powi(exponent))
}

/// Experience needed to advance into `level` from the level below it.
#[must_use]
pub fn exp_required_for_level(cfg: &ProgressionCfg, level: u32) -> u64 {
    if level <= 1 {
        return 0;
    }
    exp_to_next_level(cfg, level - 1)
}

/// Level reached with `total_experience` accumulated since level 1.
///
/// Monotonic non-decreasing in `total_experience` and capped at the configured
/// maximum level.
#[must_use]
pub fn level_from_experience(cfg: &ProgressionCfg, total_experience: u64) -> u32 {
    let mut level = cfg.min_level.max(1);
    let mut threshold: u64 = 0;
    while level < cfg.max_level {
        let next = threshold.saturating_add(exp_required_for_level(cfg, level + 1));
        if next > total_experience {
            break;
        }
        threshold = next;
        level += 1;
    }
    level
}

/// Stat points gained from one training action before position and duration scaling.
///
/// `floor(base * (1 + (intensity-1) * step) * max(floor, 1 - (level-1) * penalty))`
#[must_use]
pub fn stat_gain(cfg: &ProgressionCfg, base_gain: u32, intensity: u8, character_level: u32) -> u32 {
    let intensity_multiplier =
        1.0 + f64::from(intensity.saturating_sub(1)) * cfg.intensity_gain_step;
    let level_drop = f64::from(character_level.saturating_sub(1)) * cfg.level_penalty_step;
    let level_penalty = (1.0 - level_drop).max(cfg.level_penalty_floor);
    floor_f64_to_u32(f64::from(base_gain) * intensity_multiplier * level_penalty)
}

/// Multiplier applied to base costs for a given intensity.
#[must_use]
pub fn cost_multiplier(cfg: &ProgressionCfg, intensity: u8) -> f64 {
    1.0 + f64::from(intensity.saturating_sub(1)) * cfg.intensity_cost_step
}

/// Energy and motivation cost of a session. Negative base costs yield a net gain.
#[must_use]
pub fn training_cost(cfg: &ProgressionCfg, spec: &TrainingTypeSpec, intensity: u8) -> TrainingCost {
    let multiplier = cost_multiplier(cfg, intensity);
    TrainingCost {
        energy: floor_f64_to_i32(f64::from(spec.energy_cost) * multiplier),
        motivation: floor_f64_to_i32(f64::from(spec.motivation_cost) * multiplier),
    }
}

/// Gain multiplier for training `stat` while playing `position`.
#[must_use]
pub fn position_bonus(balance: &BalanceConfig, position: Position, stat: StatName) -> f64 {
    if balance.has_affinity(position, stat) {
        balance.progression.position_bonus
    } else {
        1.0
    }
}

/// Session length scaling, `min(cap, minutes / reference)`.
#[must_use]
pub fn duration_multiplier(cfg: &ProgressionCfg, minutes: u32) -> f64 {
    (f64::from(minutes) / cfg.duration_reference_minutes).min(cfg.duration_multiplier_cap)
}
