//! Item rarity tiers and drop rolls.
use rand::Rng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::balance::BalanceConfig;
use crate::constants::DROP_RATE_SCALE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Tiers in roll order, most common first.
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        };
        f.write_str(label)
    }
}

/// Roll a rarity tier against the configured cumulative drop rates.
///
/// Draws a value in `[0, 100)` and walks the tiers in order until the running
/// total reaches it. Rates that sum short of 100 leave the remainder to
/// [`Rarity::Common`].
pub fn roll_rarity<R: RngCore>(cfg: &BalanceConfig, rng: &mut R) -> Rarity {
    let roll = rng.r#gen::<f64>() * DROP_RATE_SCALE;
    let mut accumulated = 0.0;
    for rarity in Rarity::ALL {
        let Some(profile) = cfg.rarities.get(&rarity) else {
            continue;
        };
        accumulated += profile.drop_rate;
        if roll <= accumulated {
            return rarity;
        }
    }
    Rarity::Common
}
