//! Centralized balance and tuning constants for Courtside game logic.
//!
//! These values seed [`crate::balance::BalanceConfig::default`]. Engines never
//! read them directly; they go through the configuration object so tests and
//! tools can substitute alternate balance tables.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_TRAINING_COMPLETE: &str = "log.training.complete";
pub(crate) const LOG_TRAINING_REJECTED: &str = "log.training.rejected";
pub(crate) const LOG_LEVEL_UP: &str = "log.training.level-up";
pub(crate) const LOG_MATCH_PLAYED: &str = "log.match.played";
pub(crate) const LOG_COMMIT_CONFLICT: &str = "log.store.conflict";

// Stats --------------------------------------------------------------------
pub(crate) const MIN_STAT: u32 = 1;
pub(crate) const MAX_STAT: u32 = 100;
pub(crate) const DEFAULT_STAT: u32 = 50;

// Level progression --------------------------------------------------------
pub(crate) const MIN_LEVEL: u32 = 1;
pub(crate) const MAX_LEVEL: u32 = 100;
pub(crate) const BASE_EXP_REQUIRED: u64 = 100;
pub(crate) const EXP_MULTIPLIER: f64 = 1.5;

// Energy and motivation ----------------------------------------------------
pub(crate) const MAX_ENERGY: i32 = 100;
pub(crate) const MAX_MOTIVATION: i32 = 100;
pub(crate) const ENERGY_RECOVERY_PER_HOUR: i32 = 10;
pub(crate) const MOTIVATION_RECOVERY_PER_HOUR: i32 = 5;
pub(crate) const RECOVERY_RECOMMENDATION_THRESHOLD: i32 = 30;

// Training -----------------------------------------------------------------
pub(crate) const TRAINING_STAT_GAIN_BASE: u32 = 2;
pub(crate) const MIN_TRAINING_INTENSITY: u8 = 1;
pub(crate) const MAX_TRAINING_INTENSITY: u8 = 5;
pub(crate) const INTENSITY_GAIN_STEP: f64 = 0.3;
pub(crate) const INTENSITY_COST_STEP: f64 = 0.5;
pub(crate) const LEVEL_PENALTY_STEP: f64 = 0.01;
pub(crate) const LEVEL_PENALTY_FLOOR: f64 = 0.5;
pub(crate) const SECONDARY_GAIN_SCALE: f64 = 0.6;
pub(crate) const PRIMARY_EXP_WEIGHT: u32 = 5;
pub(crate) const SECONDARY_EXP_WEIGHT: u32 = 3;
pub(crate) const POSITION_AFFINITY_BONUS: f64 = 1.2;
pub(crate) const DURATION_REFERENCE_MINUTES: f64 = 60.0;
pub(crate) const DURATION_MULTIPLIER_CAP: f64 = 2.0;
pub(crate) const TEAM_PRACTICE_CHEMISTRY_BONUS: u32 = 5;

// Team ---------------------------------------------------------------------
pub(crate) const MAX_TEAM_MEMBERS: usize = 12;
pub(crate) const MIN_TEAM_MEMBERS: usize = 6;
pub(crate) const STARTING_LINEUP: usize = 6;
pub(crate) const MIN_CHEMISTRY: u32 = 0;
pub(crate) const MAX_CHEMISTRY: u32 = 100;
pub(crate) const DEFAULT_CHEMISTRY: u32 = 50;
pub(crate) const MAX_LIBEROS_IN_FORMATION: usize = 2;
pub(crate) const MIN_ATTACKERS_IN_FORMATION: usize = 3;

// Match --------------------------------------------------------------------
pub(crate) const MATCH_CHEMISTRY_PIVOT: f64 = 50.0;
pub(crate) const MATCH_VARIANCE: f64 = 0.3;
pub(crate) const MATCH_CLOSE_THRESHOLD: f64 = 0.1;
pub(crate) const MATCH_BLOWOUT_THRESHOLD: f64 = 0.3;
pub(crate) const MATCH_SHUTOUT_CHANCE: f64 = 0.7;
pub(crate) const MATCH_MODERATE_ONE_SET_CHANCE: f64 = 0.6;
pub(crate) const SETS_TO_WIN: u8 = 3;

// Items --------------------------------------------------------------------
pub(crate) const DROP_RATE_SCALE: f64 = 100.0;

// Listings -----------------------------------------------------------------
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const RECENT_TRAINING_LIMIT: usize = 10;
