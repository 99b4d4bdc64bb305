//! Service layer tying the pure engines to a persistence backend.
//!
//! [`League`] loads snapshots through a [`LeagueStore`], runs the engines and
//! hands the resulting deltas back to the store as a single commit. Commits
//! carry the revision their snapshot was read at, so two requests racing on
//! the same character or team cannot both apply.
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::balance::BalanceConfig;
use crate::character::{Character, Position, StatName};
use crate::constants::{LOG_COMMIT_CONFLICT, LOG_TRAINING_REJECTED, RECENT_TRAINING_LIMIT};
use crate::items::{Rarity, roll_rarity};
use crate::matches::{MatchResult, MatchSimulator, TeamStrength, Winner};
use crate::seed::{LOOT_DOMAIN, MATCH_DOMAIN, match_seed, stream_rng};
use crate::team::{
    LineupSlot, RosterError, Team, TeamAggregate, TeamMember, apply_lineup, check_add_member,
    check_disband, check_remove_member, check_set_captain, check_starting_lineup,
    check_team_name, guild_standings, recompute_team_stats, search_teams,
};
use crate::techniques::{Technique, TechniqueError, check_learn, eligible_techniques};
use crate::training::{
    TrainingEngine, TrainingResult, TrainingSession, TrainingType, recommend_training,
};

/// Duplicate kind reported by [`LeagueStore::insert_team`] for a taken name.
pub const TEAM_NAME: &str = "Team name";

/// Failures reported by a [`LeagueStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{kind} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} was modified concurrently, please retry")]
    Conflict { kind: &'static str, id: String },
    #[error("{kind} already exists")]
    Duplicate { kind: &'static str, id: String },
    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn conflict(kind: &'static str, id: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            id: id.into(),
        }
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Log row persisted with every successful training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub character_id: String,
    pub training_type: TrainingType,
    pub duration_minutes: u32,
    pub intensity: u8,
    pub energy_cost: i32,
    pub motivation_cost: i32,
    pub experience: u64,
    pub gains: BTreeMap<StatName, u32>,
}

/// Team side effects of a training: refreshed aggregates and, for team
/// practice, the trainee's membership with its chemistry raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRefresh {
    pub team_id: String,
    pub expected_revision: u64,
    pub aggregate: TeamAggregate,
    pub member: Option<TeamMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCommit {
    pub character: Character,
    pub expected_revision: u64,
    pub record: TrainingRecord,
    pub team: Option<TeamRefresh>,
}

/// Full replacement of a team row and its roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterCommit {
    pub team: Team,
    pub expected_revision: u64,
    pub members: Vec<TeamMember>,
    /// Character joining the roster; the store rejects the commit if it has
    /// meanwhile joined another active team.
    pub joining: Option<String>,
    /// Revision of every member character the aggregate was computed from.
    #[serde(default)]
    pub member_revisions: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_score: u8,
    pub away_score: u8,
    pub winner: Winner,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCommit {
    pub record: MatchRecord,
    pub home: Team,
    pub home_revision: u64,
    pub away: Team,
    pub away_revision: u64,
}

/// Persistence seam of the league.
///
/// Loads return owned snapshots. Every `commit_*` must apply all of its parts
/// or none of them, and must fail with [`StoreError::Conflict`] when an
/// expected revision no longer matches. Successful commits bump the revision
/// of every row they touch.
pub trait LeagueStore {
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    fn character(&self, id: &str) -> Result<Character, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    fn team(&self, id: &str) -> Result<Team, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown teams.
    fn team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, StoreError>;

    /// Active team the character currently belongs to, if any.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn active_team_of(&self, character_id: &str) -> Result<Option<Team>, StoreError>;

    /// Every team of a guild, active or not.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn guild_teams(&self, guild_id: &str) -> Result<Vec<Team>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    fn technique(&self, id: &str) -> Result<Technique, StoreError>;

    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn technique_catalog(&self) -> Result<Vec<Technique>, StoreError>;

    /// Ids of the techniques a character has learned.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn learned_techniques(&self, character_id: &str) -> Result<Vec<String>, StoreError>;

    /// Number of matches already recorded between `home_id` and `away_id`.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn fixture_count(&self, home_id: &str, away_id: &str) -> Result<u64, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] when the id is taken.
    fn insert_character(&self, character: Character) -> Result<Character, StoreError>;

    /// Newest first, at most `limit` matches where the team played home or away.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn match_history(&self, team_id: &str, limit: usize) -> Result<Vec<MatchRecord>, StoreError>;

    /// Newest first, at most `limit` training records of a character.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn training_history(
        &self,
        character_id: &str,
        limit: usize,
    ) -> Result<Vec<TrainingRecord>, StoreError>;

    /// Team names are unique per guild, ignoring case and surrounding
    /// whitespace. The name check must happen under the same lock or
    /// transaction as the insert.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] when the id is taken, or with kind
    /// [`TEAM_NAME`] when the guild already has a team of that name.
    fn insert_team(&self, team: Team) -> Result<Team, StoreError>;

    /// Replace a character row without side effects, e.g. after recovery.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a revision mismatch.
    fn commit_character(
        &self,
        character: Character,
        expected_revision: u64,
    ) -> Result<Character, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a revision mismatch of the
    /// character or the refreshed team, or when the character's active team
    /// is no longer the refreshed one (no team included).
    fn commit_training(&self, commit: TrainingCommit) -> Result<Character, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a team or member revision mismatch,
    /// or when the joining character already belongs to another active team.
    fn commit_roster(&self, commit: RosterCommit) -> Result<Team, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] when the technique is already learned.
    fn commit_technique(&self, character_id: &str, technique_id: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] on a revision mismatch of either team.
    fn commit_match(&self, commit: MatchCommit) -> Result<(), StoreError>;
}

/// Outcome of a roster or character action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

macro_rules! failed_action_from {
    ($($err:ty),+) => {
        $(impl From<$err> for ActionResult {
            fn from(err: $err) -> Self {
                Self::fail(err.to_string())
            }
        })+
    };
}

failed_action_from!(StoreError, RosterError, TechniqueError);

/// Outcome of [`League::play_match`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub success: bool,
    pub message: String,
    pub result: Option<MatchResult>,
    pub seed: u64,
    /// Item tier dropped for the winning team.
    pub reward: Option<Rarity>,
}

impl MatchReport {
    fn fail(message: impl Into<String>, seed: u64) -> Self {
        Self {
            success: false,
            message: message.into(),
            result: None,
            seed,
            reward: None,
        }
    }
}

/// One page of a guild's active teams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPage {
    pub teams: Vec<Team>,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

/// Character snapshot with its learned techniques, active team and latest
/// training records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterDetails {
    pub character: Character,
    pub techniques: Vec<Technique>,
    pub team: Option<Team>,
    pub recent_training: Vec<TrainingRecord>,
}

/// Request to create a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCharacter {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub primary_position: Position,
    #[serde(default)]
    pub secondary_position: Option<Position>,
}

/// Request to create a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeam {
    pub id: String,
    pub guild_id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
}

/// Request to add a character to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub team_id: String,
    pub character_id: String,
    pub position: Position,
    #[serde(default)]
    pub starter: bool,
}

/// Game service over a store.
pub struct League<S: LeagueStore> {
    balance: Arc<BalanceConfig>,
    training: TrainingEngine,
    simulator: MatchSimulator,
    store: S,
}

impl<S: LeagueStore> League<S> {
    #[must_use]
    pub fn new(balance: Arc<BalanceConfig>, store: S) -> Self {
        Self {
            training: TrainingEngine::new(Arc::clone(&balance)),
            simulator: MatchSimulator::new(Arc::clone(&balance)),
            balance,
            store,
        }
    }

    #[must_use]
    pub fn balance(&self) -> &BalanceConfig {
        &self.balance
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn create_character(&self, request: NewCharacter) -> ActionResult {
        if request.name.trim().is_empty() {
            return ActionResult::fail("Character name cannot be empty");
        }
        if request.secondary_position == Some(request.primary_position) {
            return ActionResult::fail("Secondary position must differ from primary position");
        }
        let mut character = Character::new(
            request.id,
            request.owner_id,
            request.name.trim(),
            request.primary_position,
        );
        character.secondary_position = request.secondary_position;
        match self.store.insert_character(character) {
            Ok(created) => ActionResult::ok(format!("Character {} created", created.name)),
            Err(err) => err.into(),
        }
    }

    /// Run a training session and persist its outcome atomically.
    pub fn train_character(&self, session: &TrainingSession) -> TrainingResult {
        let character = match self.store.character(&session.character_id) {
            Ok(character) => character,
            Err(err) => return TrainingResult::failure(err.to_string()),
        };
        let report = match self.training.train(&character, session) {
            Ok(report) => report,
            Err(err) => {
                log::debug!(
                    "{LOG_TRAINING_REJECTED}: character={} reason={err}",
                    character.id
                );
                return TrainingResult::failure(err.to_string());
            }
        };
        let updated = report.apply(&character, &self.balance);
        let team = match self.team_refresh(&updated, report.chemistry_bonus) {
            Ok(team) => team,
            Err(err) => return TrainingResult::failure(err.to_string()),
        };
        let result = TrainingResult::from(&report);
        let commit = TrainingCommit {
            expected_revision: character.revision,
            record: TrainingRecord {
                character_id: character.id.clone(),
                training_type: session.training_type,
                duration_minutes: session.duration_minutes,
                intensity: session.intensity,
                energy_cost: report.cost.energy,
                motivation_cost: report.cost.motivation,
                experience: report.experience,
                gains: result.stats_gained.clone(),
            },
            character: updated,
            team,
        };
        match self.store.commit_training(commit) {
            Ok(_) => result,
            Err(err) => {
                self.log_store_error("training", &session.character_id, &err);
                TrainingResult::failure(err.to_string())
            }
        }
    }

    /// Restore energy and motivation for `hours_elapsed` whole hours.
    pub fn recover_character(&self, character_id: &str, hours_elapsed: u32) -> ActionResult {
        let character = match self.store.character(character_id) {
            Ok(character) => character,
            Err(err) => return err.into(),
        };
        if hours_elapsed == 0 {
            return ActionResult::ok("No time has passed, nothing to recover");
        }
        let rested = character.recovered(hours_elapsed, &self.balance.resources);
        let message = format!(
            "Recovered to {} energy and {} motivation",
            rested.energy, rested.motivation
        );
        match self.store.commit_character(rested, character.revision) {
            Ok(_) => ActionResult::ok(message),
            Err(err) => {
                self.log_store_error("recovery", character_id, &err);
                err.into()
            }
        }
    }

    /// Suggested trainings for a character.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown characters.
    pub fn training_recommendations(
        &self,
        character_id: &str,
    ) -> Result<Vec<TrainingType>, StoreError> {
        let character = self.store.character(character_id)?;
        Ok(recommend_training(&character, &self.balance).into_vec())
    }

    pub fn create_team(&self, request: NewTeam) -> ActionResult {
        let existing = match self.store.guild_teams(&request.guild_id) {
            Ok(teams) => teams,
            Err(err) => return err.into(),
        };
        if let Err(err) = check_team_name(existing.iter().map(|t| t.name.as_str()), &request.name)
        {
            return err.into();
        }
        let team = Team::new(
            request.id,
            request.guild_id,
            request.owner_id,
            request.name.trim(),
            request.tag,
        );
        match self.store.insert_team(team) {
            Ok(created) => ActionResult::ok(format!("Team {} created", created.name)),
            Err(StoreError::Duplicate { kind: TEAM_NAME, .. }) => RosterError::NameTaken.into(),
            Err(err) => err.into(),
        }
    }

    pub fn add_member(&self, request: &NewMember) -> ActionResult {
        let outcome = self.try_add_member(request);
        self.finish_roster_action(&request.team_id, outcome)
    }

    pub fn remove_member(&self, team_id: &str, character_id: &str) -> ActionResult {
        let outcome = self.try_remove_member(team_id, character_id);
        self.finish_roster_action(team_id, outcome)
    }

    pub fn set_captain(&self, team_id: &str, character_id: &str) -> ActionResult {
        let outcome = self.try_set_captain(team_id, character_id);
        self.finish_roster_action(team_id, outcome)
    }

    pub fn update_starting_lineup(&self, team_id: &str, lineup: &[LineupSlot]) -> ActionResult {
        let outcome = self.try_update_starting_lineup(team_id, lineup);
        self.finish_roster_action(team_id, outcome)
    }

    /// Deactivate a team. Its members become free to join other teams.
    pub fn disband_team(&self, team_id: &str, requester_id: &str) -> ActionResult {
        let outcome = self.try_disband_team(team_id, requester_id);
        self.finish_roster_action(team_id, outcome)
    }

    /// Active teams of a guild matching `query`, strongest first.
    ///
    /// # Errors
    ///
    /// Returns a store error if the guild's teams cannot be loaded.
    pub fn search_teams(
        &self,
        guild_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Team>, StoreError> {
        let teams = self.store.guild_teams(guild_id)?;
        Ok(search_teams(&teams, guild_id, query, limit)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Page `page` (1-based) of the guild's active teams, strongest first and
    /// ties broken by wins. Page 0 reads as page 1 and a zero page size as 1.
    ///
    /// # Errors
    ///
    /// Returns a store error if the guild's teams cannot be loaded.
    pub fn guild_teams(
        &self,
        guild_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<TeamPage, StoreError> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let teams = self.store.guild_teams(guild_id)?;
        let ranked = guild_standings(&teams, guild_id);
        let total = ranked.len();
        let teams = ranked
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect();
        Ok(TeamPage {
            teams,
            page,
            page_size,
            total,
            total_pages: total.div_ceil(page_size),
        })
    }

    /// Matches the team played home or away, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown teams.
    pub fn team_match_history(
        &self,
        team_id: &str,
        limit: usize,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        self.store.team(team_id)?;
        self.store.match_history(team_id, limit)
    }

    /// Character with learned techniques, active team and its latest
    /// training records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown characters.
    pub fn character_details(&self, character_id: &str) -> Result<CharacterDetails, StoreError> {
        let character = self.store.character(character_id)?;
        let learned = self.store.learned_techniques(character_id)?;
        let techniques = learned
            .iter()
            .map(|id| self.store.technique(id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CharacterDetails {
            team: self.store.active_team_of(character_id)?,
            recent_training: self
                .store
                .training_history(character_id, RECENT_TRAINING_LIMIT)?,
            character,
            techniques,
        })
    }

    /// Techniques the character could learn now, easiest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown characters.
    pub fn eligible_techniques(&self, character_id: &str) -> Result<Vec<Technique>, StoreError> {
        let character = self.store.character(character_id)?;
        let learned = self.store.learned_techniques(character_id)?;
        let catalog = self.store.technique_catalog()?;
        Ok(eligible_techniques(&character, &learned, &catalog)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn learn_technique(&self, character_id: &str, technique_id: &str) -> ActionResult {
        self.try_learn_technique(character_id, technique_id)
            .unwrap_or_else(ActionResult::from)
    }

    /// Simulate and record a match between two active teams.
    ///
    /// Without an explicit `seed` the fixture seed is derived from the team ids
    /// and the number of previous meetings, so replays are reproducible.
    pub fn play_match(&self, home_id: &str, away_id: &str, seed: Option<u64>) -> MatchReport {
        let seed = match seed {
            Some(seed) => seed,
            None => match self.store.fixture_count(home_id, away_id) {
                Ok(count) => match_seed(home_id, away_id, count),
                Err(err) => return MatchReport::fail(err.to_string(), 0),
            },
        };
        let mut rng = stream_rng(seed, MATCH_DOMAIN);
        let mut loot = stream_rng(seed, LOOT_DOMAIN);
        match self.play_match_with(home_id, away_id, seed, &mut rng, &mut loot) {
            Ok(report) => report,
            Err(err) => {
                self.log_store_error("match", home_id, &err);
                MatchReport::fail(err.to_string(), seed)
            }
        }
    }

    fn play_match_with<R: RngCore, L: RngCore>(
        &self,
        home_id: &str,
        away_id: &str,
        seed: u64,
        rng: &mut R,
        loot: &mut L,
    ) -> Result<MatchReport, StoreError> {
        if home_id == away_id {
            return Ok(MatchReport::fail("A team cannot play against itself", seed));
        }
        let home = self.store.team(home_id)?;
        let away = self.store.team(away_id)?;
        for team in [&home, &away] {
            if !team.active {
                return Ok(MatchReport::fail(
                    format!("Team {} is not active", team.name),
                    seed,
                ));
            }
        }
        let (home_size, home_aggregate) = self.fresh_aggregate(&home.id)?;
        let (away_size, away_aggregate) = self.fresh_aggregate(&away.id)?;
        for (team, size) in [(&home, home_size), (&away, away_size)] {
            if size < self.balance.team.min_members {
                return Ok(MatchReport::fail(
                    format!(
                        "Team {} needs at least {} members to play",
                        team.name, self.balance.team.min_members
                    ),
                    seed,
                ));
            }
        }

        let result = self.simulator.simulate(
            TeamStrength::from(&home_aggregate),
            TeamStrength::from(&away_aggregate),
            rng,
        );
        let mut next_home = home.clone();
        let mut next_away = away.clone();
        next_home.aggregate = home_aggregate;
        next_away.aggregate = away_aggregate;
        match result.winner {
            Winner::Home => {
                next_home.wins += 1;
                next_away.losses += 1;
            }
            Winner::Away => {
                next_away.wins += 1;
                next_home.losses += 1;
            }
            Winner::Draw => {}
        }
        let reward = (result.winner != Winner::Draw).then(|| roll_rarity(&self.balance, loot));
        self.store.commit_match(MatchCommit {
            record: MatchRecord {
                home_team_id: home.id.clone(),
                away_team_id: away.id.clone(),
                home_score: result.home_score,
                away_score: result.away_score,
                winner: result.winner,
                seed,
            },
            home: next_home,
            home_revision: home.revision,
            away: next_away,
            away_revision: away.revision,
        })?;
        let message = match result.winner {
            Winner::Home => format!("{} defeat {} {result}", home.name, away.name),
            Winner::Away => format!("{} defeat {} {result}", away.name, home.name),
            Winner::Draw => format!("{} and {} draw {result}", home.name, away.name),
        };
        Ok(MatchReport {
            success: true,
            message,
            result: Some(result),
            seed,
            reward,
        })
    }

    fn try_add_member(&self, request: &NewMember) -> Result<ActionResult, StoreError> {
        let team = self.store.team(&request.team_id)?;
        let members = self.store.team_members(&team.id)?;
        self.store.character(&request.character_id)?;
        let in_team = self.store.active_team_of(&request.character_id)?.is_some();
        if let Err(err) = check_add_member(
            &team,
            &members,
            in_team,
            request.position,
            request.starter,
            &self.balance.team,
        ) {
            return Ok(err.into());
        }
        let mut next = members;
        next.push(TeamMember::new(
            request.character_id.clone(),
            request.position,
            request.starter,
        ));
        self.commit_roster(team, next, Some(request.character_id.clone()))?;
        Ok(ActionResult::ok("Character added to team successfully"))
    }

    fn try_remove_member(
        &self,
        team_id: &str,
        character_id: &str,
    ) -> Result<ActionResult, StoreError> {
        let team = self.store.team(team_id)?;
        let members = self.store.team_members(team_id)?;
        if let Err(err) = check_remove_member(&team, &members, character_id) {
            return Ok(err.into());
        }
        let next: Vec<TeamMember> = members
            .into_iter()
            .filter(|m| m.character_id != character_id)
            .collect();
        self.commit_roster(team, next, None)?;
        Ok(ActionResult::ok("Character removed from team successfully"))
    }

    fn try_set_captain(
        &self,
        team_id: &str,
        character_id: &str,
    ) -> Result<ActionResult, StoreError> {
        let mut team = self.store.team(team_id)?;
        let members = self.store.team_members(team_id)?;
        if let Err(err) = check_set_captain(&members, character_id) {
            return Ok(err.into());
        }
        team.captain_id = Some(character_id.to_string());
        self.commit_roster(team, members, None)?;
        Ok(ActionResult::ok("Captain set successfully"))
    }

    fn try_update_starting_lineup(
        &self,
        team_id: &str,
        lineup: &[LineupSlot],
    ) -> Result<ActionResult, StoreError> {
        let team = self.store.team(team_id)?;
        let members = self.store.team_members(team_id)?;
        if let Err(err) = check_starting_lineup(&members, lineup, &self.balance.team) {
            return Ok(err.into());
        }
        let next = apply_lineup(&members, lineup);
        self.commit_roster(team, next, None)?;
        Ok(ActionResult::ok("Starting lineup updated successfully"))
    }

    fn try_disband_team(
        &self,
        team_id: &str,
        requester_id: &str,
    ) -> Result<ActionResult, StoreError> {
        let mut team = self.store.team(team_id)?;
        if let Err(err) = check_disband(&team, requester_id) {
            return Ok(err.into());
        }
        let members = self.store.team_members(team_id)?;
        team.active = false;
        self.commit_roster(team, members, None)?;
        Ok(ActionResult::ok("Team disbanded successfully"))
    }

    fn try_learn_technique(
        &self,
        character_id: &str,
        technique_id: &str,
    ) -> Result<ActionResult, StoreError> {
        let character = self.store.character(character_id)?;
        let technique = self.store.technique(technique_id)?;
        let learned = self.store.learned_techniques(character_id)?;
        if let Err(err) = check_learn(&character, &learned, &technique) {
            return Ok(err.into());
        }
        match self.store.commit_technique(character_id, technique_id) {
            Ok(()) => Ok(ActionResult::ok(format!(
                "Successfully learned {}!",
                technique.name
            ))),
            Err(StoreError::Duplicate { .. }) => Ok(TechniqueError::AlreadyLearned.into()),
            Err(err) => Err(err),
        }
    }

    /// Roster size and aggregates recomputed from the stored rows.
    fn fresh_aggregate(&self, team_id: &str) -> Result<(usize, TeamAggregate), StoreError> {
        let members = self.store.team_members(team_id)?;
        let characters = members
            .iter()
            .map(|m| self.store.character(&m.character_id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((
            members.len(),
            recompute_team_stats(members.iter().zip(characters.iter())),
        ))
    }

    fn team_refresh(
        &self,
        updated: &Character,
        chemistry_bonus: u32,
    ) -> Result<Option<TeamRefresh>, StoreError> {
        let Some(team) = self.store.active_team_of(&updated.id)? else {
            return Ok(None);
        };
        let mut members = self.store.team_members(&team.id)?;
        let mut bumped = None;
        for member in &mut members {
            if member.character_id == updated.id && chemistry_bonus > 0 {
                *member = member.with_chemistry_bonus(chemistry_bonus, &self.balance.team);
                bumped = Some(member.clone());
            }
        }
        let characters = members
            .iter()
            .map(|m| {
                if m.character_id == updated.id {
                    Ok(updated.clone())
                } else {
                    self.store.character(&m.character_id)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(TeamRefresh {
            team_id: team.id,
            expected_revision: team.revision,
            aggregate: recompute_team_stats(members.iter().zip(characters.iter())),
            member: bumped,
        }))
    }

    fn commit_roster(
        &self,
        mut team: Team,
        members: Vec<TeamMember>,
        joining: Option<String>,
    ) -> Result<Team, StoreError> {
        let characters = members
            .iter()
            .map(|m| self.store.character(&m.character_id))
            .collect::<Result<Vec<_>, _>>()?;
        team.aggregate = recompute_team_stats(members.iter().zip(characters.iter()));
        let member_revisions = characters
            .iter()
            .map(|c| (c.id.clone(), c.revision))
            .collect();
        let expected_revision = team.revision;
        self.store.commit_roster(RosterCommit {
            team,
            expected_revision,
            members,
            joining,
            member_revisions,
        })
    }

    fn finish_roster_action(
        &self,
        team_id: &str,
        outcome: Result<ActionResult, StoreError>,
    ) -> ActionResult {
        outcome.unwrap_or_else(|err| {
            self.log_store_error("roster", team_id, &err);
            err.into()
        })
    }

    fn log_store_error(&self, action: &str, id: &str, err: &StoreError) {
        if err.is_conflict() {
            log::warn!("{LOG_COMMIT_CONFLICT}: action={action} id={id} error={err}");
        } else {
            log::debug!("{action} failed for {id}: {err}");
        }
    }
}
