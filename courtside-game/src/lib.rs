//! Courtside Game Engine
//!
//! Platform-agnostic core of the Courtside volleyball management game:
//! character progression, training, team rosters and match simulation.
//! The engines are pure; persistence goes through the [`LeagueStore`] trait
//! and the [`League`] service commits each action atomically.

pub mod balance;
pub mod character;
pub mod constants;
pub mod items;
pub mod league;
pub mod matches;
pub mod memory;
pub mod numbers;
pub mod progression;
pub mod seed;
pub mod team;
pub mod techniques;
pub mod training;

// Re-export commonly used types
pub use balance::{
    BalanceConfig, BalanceConfigError, MatchCfg, PositionProfile, ProgressionCfg, RarityProfile,
    ResourceCfg, StatBounds, TeamCfg, TrainingTypeSpec,
};
pub use character::{Character, ParsePositionError, Position, StatName, Stats};
pub use items::{Rarity, roll_rarity};
pub use league::{
    ActionResult, CharacterDetails, League, LeagueStore, MatchCommit, MatchRecord, MatchReport,
    NewCharacter, NewMember, NewTeam, RosterCommit, StoreError, TEAM_NAME, TeamPage, TeamRefresh,
    TrainingCommit, TrainingRecord,
};
pub use matches::{MatchResult, MatchSimulator, TeamStrength, Winner};
pub use memory::MemoryStore;
pub use progression::{
    exp_required_for_level, exp_to_next_level, level_from_experience, position_bonus, stat_gain,
    training_cost,
};
pub use seed::{MatchRng, derive_stream_seed, match_seed, parse_seed, stream_rng};
pub use team::{
    FormationReport, FormationSuggestion, LineupSlot, RosterError, Team, TeamAggregate,
    TeamMember, formation_suggestions, guild_standings, recompute_team_stats, validate_formation,
};
pub use techniques::{Technique, TechniqueError, check_learn, eligible_techniques};
pub use training::{
    StatGain, TrainingCost, TrainingEngine, TrainingError, TrainingReport, TrainingResult,
    TrainingSession, TrainingType, recommend_training,
};
