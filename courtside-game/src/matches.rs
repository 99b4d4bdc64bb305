//! Best-of-five match outcome model.
use rand::Rng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::balance::{BalanceConfig, MatchCfg};
use crate::constants::{LOG_MATCH_PLAYED, SETS_TO_WIN};
use crate::team::TeamAggregate;

/// Strength of one side going into a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamStrength {
    pub power: f64,
    pub chemistry: f64,
}

impl TeamStrength {
    #[must_use]
    pub const fn new(power: f64, chemistry: f64) -> Self {
        Self { power, chemistry }
    }
}

impl From<&TeamAggregate> for TeamStrength {
    fn from(aggregate: &TeamAggregate) -> Self {
        Self {
            power: f64::from(aggregate.total_power),
            chemistry: f64::from(aggregate.chemistry),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Home,
    Away,
    Draw,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Winner::Home => "home",
            Winner::Away => "away",
            Winner::Draw => "draw",
        })
    }
}

/// Set score of a simulated match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_score: u8,
    pub away_score: u8,
    pub winner: Winner,
}

impl MatchResult {
    fn from_scores(home_score: u8, away_score: u8) -> Self {
        let winner = match home_score.cmp(&away_score) {
            std::cmp::Ordering::Greater => Winner::Home,
            std::cmp::Ordering::Less => Winner::Away,
            std::cmp::Ordering::Equal => Winner::Draw,
        };
        Self {
            home_score,
            away_score,
            winner,
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} ({})", self.home_score, self.away_score, self.winner)
    }
}

/// Stochastic match simulator. All randomness comes from the caller's RNG.
#[derive(Debug, Clone)]
pub struct MatchSimulator {
    balance: Arc<BalanceConfig>,
}

impl MatchSimulator {
    #[must_use]
    pub const fn new(balance: Arc<BalanceConfig>) -> Self {
        Self { balance }
    }

    /// Simulate one match.
    ///
    /// Powers are scaled by chemistry around the pivot, each side then gets an
    /// independent uniform variance, and the normalized differential selects a
    /// score band. The winner always takes three sets.
    pub fn simulate<R: RngCore>(
        &self,
        home: TeamStrength,
        away: TeamStrength,
        rng: &mut R,
    ) -> MatchResult {
        let cfg = &self.balance.matches;
        let home_power = varied_power(cfg, home, rng);
        let away_power = varied_power(cfg, away, rng);
        let diff = power_differential(home_power, away_power);

        let (home_score, away_score) = if diff.abs() < cfg.close_threshold {
            if rng.r#gen::<f64>() < 0.5 {
                (SETS_TO_WIN, SETS_TO_WIN - 1)
            } else {
                (SETS_TO_WIN - 1, SETS_TO_WIN)
            }
        } else if diff > cfg.blowout_threshold {
            (SETS_TO_WIN, blowout_loser_sets(cfg, rng))
        } else if diff < -cfg.blowout_threshold {
            (blowout_loser_sets(cfg, rng), SETS_TO_WIN)
        } else if diff > 0.0 {
            (SETS_TO_WIN, moderate_loser_sets(cfg, rng))
        } else {
            (moderate_loser_sets(cfg, rng), SETS_TO_WIN)
        };

        let result = MatchResult::from_scores(home_score, away_score);
        log::debug!(
            "{LOG_MATCH_PLAYED}: home={:.1} away={:.1} diff={diff:.3} result={result}",
            home_power,
            away_power
        );
        result
    }
}

fn varied_power<R: RngCore>(cfg: &MatchCfg, side: TeamStrength, rng: &mut R) -> f64 {
    let adjusted = side.power * (1.0 + (side.chemistry - cfg.chemistry_pivot) / 100.0);
    let variance = (rng.r#gen::<f64>() - 0.5) * cfg.variance;
    adjusted * (1.0 + variance)
}

/// `(home - away) / max(home, away)`, zero when neither side has any power.
fn power_differential(home: f64, away: f64) -> f64 {
    let max = home.max(away);
    if max <= 0.0 || !max.is_finite() {
        return 0.0;
    }
    (home - away) / max
}

fn blowout_loser_sets<R: RngCore>(cfg: &MatchCfg, rng: &mut R) -> u8 {
    if rng.r#gen::<f64>() < cfg.shutout_chance {
        0
    } else {
        1
    }
}

fn moderate_loser_sets<R: RngCore>(cfg: &MatchCfg, rng: &mut R) -> u8 {
    if rng.r#gen::<f64>() < cfg.moderate_one_set_chance {
        1
    } else {
        2
    }
}
