//! Teams, rosters and the rules that guard them.
//!
//! Everything here works on snapshots. The roster checks answer "may this
//! change happen?" and the aggregation recomputes derived team numbers from
//! scratch; persisting either is up to the caller.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::balance::TeamCfg;
use crate::character::{Character, Position};
use crate::constants::DEFAULT_CHEMISTRY;
use crate::numbers::{u64_to_f64, usize_to_f64};

/// Derived team numbers, recomputed wholesale after every roster change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamAggregate {
    pub average_level: f64,
    pub total_power: u32,
    pub chemistry: u32,
}

impl Default for TeamAggregate {
    fn default() -> Self {
        Self {
            average_level: 0.0,
            total_power: 0,
            chemistry: DEFAULT_CHEMISTRY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub guild_id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    pub active: bool,
    #[serde(default)]
    pub captain_id: Option<String>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub aggregate: TeamAggregate,
    #[serde(default)]
    pub revision: u64,
}

impl Team {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        guild_id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        tag: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            guild_id: guild_id.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            tag,
            active: true,
            captain_id: None,
            wins: 0,
            losses: 0,
            aggregate: TeamAggregate::default(),
            revision: 0,
        }
    }

    #[must_use]
    pub fn is_captain(&self, character_id: &str) -> bool {
        self.captain_id.as_deref() == Some(character_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub character_id: String,
    pub position: Position,
    pub starter: bool,
    pub chemistry: u32,
}

impl TeamMember {
    #[must_use]
    pub fn new(character_id: impl Into<String>, position: Position, starter: bool) -> Self {
        Self {
            character_id: character_id.into(),
            position,
            starter,
            chemistry: DEFAULT_CHEMISTRY,
        }
    }

    /// Copy with `bonus` chemistry added, capped at the configured maximum.
    #[must_use]
    pub fn with_chemistry_bonus(&self, bonus: u32, cfg: &TeamCfg) -> Self {
        let mut next = self.clone();
        next.chemistry = self
            .chemistry
            .saturating_add(bonus)
            .clamp(cfg.min_chemistry, cfg.max_chemistry);
        next
    }
}

/// One starter assignment in a lineup update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupSlot {
    pub character_id: String,
    pub position: Position,
}

impl LineupSlot {
    #[must_use]
    pub fn new(character_id: impl Into<String>, position: Position) -> Self {
        Self {
            character_id: character_id.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Team name cannot be empty")]
    EmptyName,
    #[error("Team name already exists in this guild")]
    NameTaken,
    #[error("Cannot add members to inactive team")]
    InactiveTeam,
    #[error("Team is full (max {max} members)")]
    TeamFull { max: usize },
    #[error("Character is already in an active team")]
    AlreadyInTeam,
    #[error("Position {0} is already taken by a starter")]
    PositionTaken(Position),
    #[error("Team already has {max} starters")]
    StartersFull { max: usize },
    #[error("Character is not a member of this team")]
    NotAMember,
    #[error("Cannot remove team captain. Transfer captaincy first.")]
    CaptainRemoval,
    #[error("Starting lineup must have exactly {expected} players")]
    LineupSize { expected: usize },
    #[error("Cannot have duplicate positions (except Libero)")]
    DuplicatePosition,
    #[error("Some characters are not team members")]
    UnknownStarters,
    #[error("Only team owner can disband the team")]
    NotOwner,
    #[error("Team is already disbanded")]
    AlreadyDisbanded,
}

/// Recompute a team's aggregates from its full roster.
///
/// Average level is the mean member level, total power the floored mean of the
/// six core stat sums and chemistry the floored mean member chemistry. An empty
/// roster yields zero level and power and the default chemistry.
#[must_use]
pub fn recompute_team_stats<'a, I>(roster: I) -> TeamAggregate
where
    I: IntoIterator<Item = (&'a TeamMember, &'a Character)>,
{
    let mut count = 0usize;
    let mut levels = 0u64;
    let mut power = 0u64;
    let mut chemistry = 0u64;
    for (member, character) in roster {
        count += 1;
        levels += u64::from(character.level);
        power += u64::from(character.stats.core_total());
        chemistry += u64::from(member.chemistry);
    }
    if count == 0 {
        return TeamAggregate::default();
    }
    let n = u64::try_from(count).unwrap_or(u64::MAX);
    TeamAggregate {
        average_level: u64_to_f64(levels) / usize_to_f64(count),
        total_power: u32::try_from(power / n).unwrap_or(u32::MAX),
        chemistry: u32::try_from(chemistry / n).unwrap_or(u32::MAX),
    }
}

/// Validate a new team name against the names already used in the guild.
///
/// # Errors
///
/// Returns [`RosterError::EmptyName`] for blank names and
/// [`RosterError::NameTaken`] when a case-insensitive match exists.
pub fn check_team_name<'a, I>(existing: I, name: &str) -> Result<(), RosterError>
where
    I: IntoIterator<Item = &'a str>,
{
    let candidate = name.trim();
    if candidate.is_empty() {
        return Err(RosterError::EmptyName);
    }
    let lowered = candidate.to_lowercase();
    if existing
        .into_iter()
        .any(|taken| taken.trim().to_lowercase() == lowered)
    {
        return Err(RosterError::NameTaken);
    }
    Ok(())
}

/// Check whether a character may join `team`.
///
/// # Errors
///
/// Fails when the team is inactive or full, when the character already
/// belongs to an active team, or when a starter slot is unavailable.
pub fn check_add_member(
    team: &Team,
    members: &[TeamMember],
    character_in_active_team: bool,
    position: Position,
    starter: bool,
    cfg: &TeamCfg,
) -> Result<(), RosterError> {
    if !team.active {
        return Err(RosterError::InactiveTeam);
    }
    if members.len() >= cfg.max_members {
        return Err(RosterError::TeamFull {
            max: cfg.max_members,
        });
    }
    if character_in_active_team {
        return Err(RosterError::AlreadyInTeam);
    }
    if starter {
        if position != Position::Libero
            && members.iter().any(|m| m.starter && m.position == position)
        {
            return Err(RosterError::PositionTaken(position));
        }
        if members.iter().filter(|m| m.starter).count() >= cfg.starting_lineup {
            return Err(RosterError::StartersFull {
                max: cfg.starting_lineup,
            });
        }
    }
    Ok(())
}

/// # Errors
///
/// Fails when the character is not on the roster or is the captain.
pub fn check_remove_member(
    team: &Team,
    members: &[TeamMember],
    character_id: &str,
) -> Result<(), RosterError> {
    if !members.iter().any(|m| m.character_id == character_id) {
        return Err(RosterError::NotAMember);
    }
    if team.is_captain(character_id) {
        return Err(RosterError::CaptainRemoval);
    }
    Ok(())
}

/// # Errors
///
/// Fails when the character is not on the roster.
pub fn check_set_captain(members: &[TeamMember], character_id: &str) -> Result<(), RosterError> {
    if members.iter().any(|m| m.character_id == character_id) {
        Ok(())
    } else {
        Err(RosterError::NotAMember)
    }
}

/// Check a full starting lineup replacement.
///
/// # Errors
///
/// Fails unless the lineup has exactly the configured number of slots, repeats
/// no position other than Libero and names only current members.
pub fn check_starting_lineup(
    members: &[TeamMember],
    lineup: &[LineupSlot],
    cfg: &TeamCfg,
) -> Result<(), RosterError> {
    if lineup.len() != cfg.starting_lineup {
        return Err(RosterError::LineupSize {
            expected: cfg.starting_lineup,
        });
    }
    let mut seen: BTreeMap<Position, usize> = BTreeMap::new();
    for slot in lineup {
        *seen.entry(slot.position).or_default() += 1;
    }
    if seen
        .iter()
        .any(|(position, count)| *position != Position::Libero && *count > 1)
    {
        return Err(RosterError::DuplicatePosition);
    }
    let all_members = lineup
        .iter()
        .all(|slot| members.iter().any(|m| m.character_id == slot.character_id));
    let distinct = lineup
        .iter()
        .enumerate()
        .all(|(i, slot)| {
            lineup[..i]
                .iter()
                .all(|other| other.character_id != slot.character_id)
        });
    if !all_members || !distinct {
        return Err(RosterError::UnknownStarters);
    }
    Ok(())
}

/// Roster after replacing every starter with `lineup`.
///
/// Members named in the lineup become starters at their new position; every
/// other member is benched with their position unchanged.
#[must_use]
pub fn apply_lineup(members: &[TeamMember], lineup: &[LineupSlot]) -> Vec<TeamMember> {
    members
        .iter()
        .map(|member| {
            let mut next = member.clone();
            match lineup
                .iter()
                .find(|slot| slot.character_id == member.character_id)
            {
                Some(slot) => {
                    next.starter = true;
                    next.position = slot.position;
                }
                None => next.starter = false,
            }
            next
        })
        .collect()
}

/// # Errors
///
/// Fails when `requester_id` does not own the team or it is already inactive.
pub fn check_disband(team: &Team, requester_id: &str) -> Result<(), RosterError> {
    if team.owner_id != requester_id {
        return Err(RosterError::NotOwner);
    }
    if !team.active {
        return Err(RosterError::AlreadyDisbanded);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationReport {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Soft validation of a six-player formation, collecting every issue.
#[must_use]
pub fn validate_formation(positions: &[Position], cfg: &TeamCfg) -> FormationReport {
    let mut issues = Vec::new();
    if positions.len() != cfg.starting_lineup {
        issues.push(format!(
            "Formation must have exactly {} players",
            cfg.starting_lineup
        ));
    }
    let count = |wanted: Position| positions.iter().filter(|p| **p == wanted).count();
    if count(Position::Setter) < 1 {
        issues.push("Formation must have at least 1 setter".to_string());
    }
    if count(Position::Libero) > cfg.max_liberos {
        issues.push(format!(
            "Formation cannot have more than {} liberos",
            cfg.max_liberos
        ));
    }
    let attackers = positions.iter().filter(|p| p.is_attacker()).count();
    if attackers < cfg.min_attackers {
        issues.push(format!(
            "Formation should have at least {} attackers",
            cfg.min_attackers
        ));
    }
    FormationReport {
        valid: issues.is_empty(),
        issues,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormationSuggestion {
    pub name: &'static str,
    pub positions: [Position; 6],
    pub description: &'static str,
}

const FORMATIONS: [FormationSuggestion; 4] = [
    FormationSuggestion {
        name: "5-1 Formation",
        positions: [
            Position::Setter,
            Position::OutsideHitter,
            Position::OutsideHitter,
            Position::MiddleBlocker,
            Position::WingSpiker,
            Position::Libero,
        ],
        description: "One setter, five attackers. Most common formation.",
    },
    FormationSuggestion {
        name: "6-2 Formation",
        positions: [
            Position::Setter,
            Position::Setter,
            Position::OutsideHitter,
            Position::MiddleBlocker,
            Position::WingSpiker,
            Position::Libero,
        ],
        description: "Two setters who also attack from back row.",
    },
    FormationSuggestion {
        name: "4-2 Formation",
        positions: [
            Position::Setter,
            Position::Setter,
            Position::OutsideHitter,
            Position::OutsideHitter,
            Position::MiddleBlocker,
            Position::Libero,
        ],
        description: "Two setters, four attackers. Good for beginners.",
    },
    FormationSuggestion {
        name: "Defensive Setup",
        positions: [
            Position::Setter,
            Position::OutsideHitter,
            Position::MiddleBlocker,
            Position::MiddleBlocker,
            Position::Libero,
            Position::Libero,
        ],
        description: "Extra defense with two middle blockers and liberos.",
    },
];

#[must_use]
pub const fn formation_suggestions() -> &'static [FormationSuggestion] {
    &FORMATIONS
}

/// Active teams of a guild whose name or tag contains `query`, strongest first.
#[must_use]
pub fn search_teams<'a>(
    teams: &'a [Team],
    guild_id: &str,
    query: &str,
    limit: usize,
) -> Vec<&'a Team> {
    let needle = query.trim().to_lowercase();
    let mut hits: Vec<&Team> = teams
        .iter()
        .filter(|t| t.active && t.guild_id == guild_id)
        .filter(|t| {
            t.name.to_lowercase().contains(&needle)
                || t
                    .tag
                    .as_deref()
                    .is_some_and(|tag| tag.to_lowercase().contains(&needle))
        })
        .collect();
    hits.sort_by(|a, b| {
        b.aggregate
            .total_power
            .cmp(&a.aggregate.total_power)
            .then_with(|| a.name.cmp(&b.name))
    });
    hits.truncate(limit);
    hits
}

/// Active teams of a guild ranked by total power, then wins, then name.
#[must_use]
pub fn guild_standings<'a>(teams: &'a [Team], guild_id: &str) -> Vec<&'a Team> {
    let mut ranked: Vec<&Team> = teams
        .iter()
        .filter(|t| t.active && t.guild_id == guild_id)
        .collect();
    ranked.sort_by(|a, b| {
        b.aggregate
            .total_power
            .cmp(&a.aggregate.total_power)
            .then_with(|| b.wins.cmp(&a.wins))
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked
}
