//! Character snapshots, positions and the eleven-stat block.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::balance::ResourceCfg;
use crate::constants::{DEFAULT_STAT, MAX_ENERGY, MAX_MOTIVATION, MIN_LEVEL};

/// Court positions a character can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "WS")]
    WingSpiker,
    #[serde(rename = "SE")]
    Setter,
    #[serde(rename = "MB")]
    MiddleBlocker,
    #[serde(rename = "LB")]
    Libero,
    #[serde(rename = "OH")]
    OutsideHitter,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::WingSpiker,
        Position::Setter,
        Position::MiddleBlocker,
        Position::Libero,
        Position::OutsideHitter,
    ];

    /// Canonical two-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Position::WingSpiker => "WS",
            Position::Setter => "SE",
            Position::MiddleBlocker => "MB",
            Position::Libero => "LB",
            Position::OutsideHitter => "OH",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Position::WingSpiker => "Wing Spiker",
            Position::Setter => "Setter",
            Position::MiddleBlocker => "Middle Blocker",
            Position::Libero => "Libero",
            Position::OutsideHitter => "Outside Hitter",
        }
    }

    /// Front-row attacking positions counted by formation checks.
    #[must_use]
    pub const fn is_attacker(self) -> bool {
        matches!(
            self,
            Position::OutsideHitter | Position::WingSpiker | Position::MiddleBlocker
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown position: {0}")]
pub struct ParsePositionError(pub String);

impl FromStr for Position {
    type Err = ParsePositionError;

    /// Accepts codes and display names in any casing, so `"Se"`, `"setter"`
    /// and `"SE"` all resolve to [`Position::Setter`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Position::ALL
            .into_iter()
            .find(|p| {
                normalized == p.code()
                    || normalized
                        == p.label()
                            .chars()
                            .filter(char::is_ascii_alphabetic)
                            .map(|c| c.to_ascii_uppercase())
                            .collect::<String>()
            })
            .ok_or_else(|| ParsePositionError(s.to_string()))
    }
}

/// The eleven trainable attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatName {
    Power,
    Speed,
    Technique,
    Jump,
    Stamina,
    Mental,
    Attack,
    Block,
    Receive,
    Serve,
    Set,
}

impl StatName {
    pub const ALL: [StatName; 11] = [
        StatName::Power,
        StatName::Speed,
        StatName::Technique,
        StatName::Jump,
        StatName::Stamina,
        StatName::Mental,
        StatName::Attack,
        StatName::Block,
        StatName::Receive,
        StatName::Serve,
        StatName::Set,
    ];

    /// Physical/mental core stats summed into team power.
    pub const CORE: [StatName; 6] = [
        StatName::Power,
        StatName::Speed,
        StatName::Technique,
        StatName::Jump,
        StatName::Stamina,
        StatName::Mental,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            StatName::Power => "power",
            StatName::Speed => "speed",
            StatName::Technique => "technique",
            StatName::Jump => "jump",
            StatName::Stamina => "stamina",
            StatName::Mental => "mental",
            StatName::Attack => "attack",
            StatName::Block => "block",
            StatName::Receive => "receive",
            StatName::Serve => "serve",
            StatName::Set => "set",
        }
    }
}

impl fmt::Display for StatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stat block of a character. Values live in the configured stat bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub power: u32,
    pub speed: u32,
    pub technique: u32,
    pub jump: u32,
    pub stamina: u32,
    pub mental: u32,
    pub attack: u32,
    pub block: u32,
    pub receive: u32,
    pub serve: u32,
    pub set: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self::uniform(DEFAULT_STAT)
    }
}

impl Stats {
    #[must_use]
    pub const fn uniform(value: u32) -> Self {
        Self {
            power: value,
            speed: value,
            technique: value,
            jump: value,
            stamina: value,
            mental: value,
            attack: value,
            block: value,
            receive: value,
            serve: value,
            set: value,
        }
    }

    #[must_use]
    pub const fn get(&self, stat: StatName) -> u32 {
        match stat {
            StatName::Power => self.power,
            StatName::Speed => self.speed,
            StatName::Technique => self.technique,
            StatName::Jump => self.jump,
            StatName::Stamina => self.stamina,
            StatName::Mental => self.mental,
            StatName::Attack => self.attack,
            StatName::Block => self.block,
            StatName::Receive => self.receive,
            StatName::Serve => self.serve,
            StatName::Set => self.set,
        }
    }

    pub const fn set(&mut self, stat: StatName, value: u32) {
        match stat {
            StatName::Power => self.power = value,
            StatName::Speed => self.speed = value,
            StatName::Technique => self.technique = value,
            StatName::Jump => self.jump = value,
            StatName::Stamina => self.stamina = value,
            StatName::Mental => self.mental = value,
            StatName::Attack => self.attack = value,
            StatName::Block => self.block = value,
            StatName::Receive => self.receive = value,
            StatName::Serve => self.serve = value,
            StatName::Set => self.set = value,
        }
    }

    /// Sum of the six core stats.
    #[must_use]
    pub fn core_total(&self) -> u32 {
        StatName::CORE.iter().map(|s| self.get(*s)).sum()
    }
}

/// Immutable snapshot of a character as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub level: u32,
    pub experience: u64,
    pub energy: i32,
    pub motivation: i32,
    pub primary_position: Position,
    #[serde(default)]
    pub secondary_position: Option<Position>,
    pub stats: Stats,
    /// Bumped by the store on every committed mutation.
    #[serde(default)]
    pub revision: u64,
}

impl Character {
    /// Fresh level-1 character with full resources and default stats.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        primary_position: Position,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            level: MIN_LEVEL,
            experience: 0,
            energy: MAX_ENERGY,
            motivation: MAX_MOTIVATION,
            primary_position,
            secondary_position: None,
            stats: Stats::default(),
            revision: 0,
        }
    }

    #[must_use]
    pub fn with_secondary(mut self, position: Position) -> Self {
        self.secondary_position = Some(position);
        self
    }

    /// Whether the character may play `position` as primary or secondary.
    #[must_use]
    pub fn plays(&self, position: Position) -> bool {
        self.primary_position == position || self.secondary_position == Some(position)
    }

    /// Snapshot with energy and motivation restored for `hours_elapsed` whole hours.
    #[must_use]
    pub fn recovered(&self, hours_elapsed: u32, cfg: &ResourceCfg) -> Self {
        let mut next = self.clone();
        if hours_elapsed == 0 {
            return next;
        }
        let hours = i32::try_from(hours_elapsed).unwrap_or(i32::MAX);
        next.energy = self
            .energy
            .saturating_add(hours.saturating_mul(cfg.energy_per_hour))
            .min(cfg.max_energy);
        next.motivation = self
            .motivation
            .saturating_add(hours.saturating_mul(cfg.motivation_per_hour))
            .min(cfg.max_motivation);
        next
    }
}
