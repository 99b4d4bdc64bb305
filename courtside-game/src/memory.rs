//! In-memory [`LeagueStore`] used by tests and the QA harness.
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::character::Character;
use crate::league::{
    LeagueStore, MatchCommit, MatchRecord, RosterCommit, StoreError, TEAM_NAME, TrainingCommit,
    TrainingRecord,
};
use crate::team::{Team, TeamMember};
use crate::techniques::Technique;

const CHARACTER: &str = "Character";
const TEAM: &str = "Team";
const TECHNIQUE: &str = "Technique";

#[derive(Debug, Default)]
struct Tables {
    characters: HashMap<String, Character>,
    teams: BTreeMap<String, Team>,
    members: HashMap<String, Vec<TeamMember>>,
    techniques: BTreeMap<String, Technique>,
    learned: HashMap<String, Vec<String>>,
    training_log: Vec<TrainingRecord>,
    matches: Vec<MatchRecord>,
}

impl Tables {
    fn active_team_of(&self, character_id: &str) -> Option<&Team> {
        self.teams.values().find(|team| {
            team.active
                && self
                    .members
                    .get(&team.id)
                    .is_some_and(|roster| roster.iter().any(|m| m.character_id == character_id))
        })
    }

    fn check_character_revision(&self, id: &str, expected: u64) -> Result<(), StoreError> {
        let current = self
            .characters
            .get(id)
            .ok_or_else(|| StoreError::not_found(CHARACTER, id))?;
        if current.revision == expected {
            Ok(())
        } else {
            Err(StoreError::conflict(CHARACTER, id))
        }
    }

    fn check_team_revision(&self, id: &str, expected: u64) -> Result<(), StoreError> {
        let current = self
            .teams
            .get(id)
            .ok_or_else(|| StoreError::not_found(TEAM, id))?;
        if current.revision == expected {
            Ok(())
        } else {
            Err(StoreError::conflict(TEAM, id))
        }
    }

    fn put_character(&mut self, mut character: Character, expected: u64) -> Character {
        character.revision = expected + 1;
        self.characters
            .insert(character.id.clone(), character.clone());
        character
    }

    fn put_team(&mut self, mut team: Team, expected: u64) -> Team {
        team.revision = expected + 1;
        self.teams.insert(team.id.clone(), team.clone());
        team
    }
}

/// Thread-safe store keeping every table behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with a technique catalog.
    #[must_use]
    pub fn with_techniques(catalog: impl IntoIterator<Item = Technique>) -> Self {
        let store = Self::new();
        if let Ok(mut tables) = store.tables.lock() {
            tables.techniques = catalog.into_iter().map(|t| (t.id.clone(), t)).collect();
        }
        store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Every training record written so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lock is poisoned.
    pub fn training_log(&self) -> Result<Vec<TrainingRecord>, StoreError> {
        Ok(self.lock()?.training_log.clone())
    }

    /// Every match recorded so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lock is poisoned.
    pub fn match_log(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.lock()?.matches.clone())
    }
}

impl LeagueStore for MemoryStore {
    fn character(&self, id: &str) -> Result<Character, StoreError> {
        self.lock()?
            .characters
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(CHARACTER, id))
    }

    fn team(&self, id: &str) -> Result<Team, StoreError> {
        self.lock()?
            .teams
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(TEAM, id))
    }

    fn team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, StoreError> {
        let tables = self.lock()?;
        if !tables.teams.contains_key(team_id) {
            return Err(StoreError::not_found(TEAM, team_id));
        }
        Ok(tables.members.get(team_id).cloned().unwrap_or_default())
    }

    fn active_team_of(&self, character_id: &str) -> Result<Option<Team>, StoreError> {
        Ok(self.lock()?.active_team_of(character_id).cloned())
    }

    fn guild_teams(&self, guild_id: &str) -> Result<Vec<Team>, StoreError> {
        Ok(self
            .lock()?
            .teams
            .values()
            .filter(|t| t.guild_id == guild_id)
            .cloned()
            .collect())
    }

    fn technique(&self, id: &str) -> Result<Technique, StoreError> {
        self.lock()?
            .techniques
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(TECHNIQUE, id))
    }

    fn technique_catalog(&self) -> Result<Vec<Technique>, StoreError> {
        Ok(self.lock()?.techniques.values().cloned().collect())
    }

    fn learned_techniques(&self, character_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()?
            .learned
            .get(character_id)
            .cloned()
            .unwrap_or_default())
    }

    fn fixture_count(&self, home_id: &str, away_id: &str) -> Result<u64, StoreError> {
        let count = self
            .lock()?
            .matches
            .iter()
            .filter(|m| m.home_team_id == home_id && m.away_team_id == away_id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    fn match_history(&self, team_id: &str, limit: usize) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self
            .lock()?
            .matches
            .iter()
            .rev()
            .filter(|m| m.home_team_id == team_id || m.away_team_id == team_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn training_history(
        &self,
        character_id: &str,
        limit: usize,
    ) -> Result<Vec<TrainingRecord>, StoreError> {
        Ok(self
            .lock()?
            .training_log
            .iter()
            .rev()
            .filter(|r| r.character_id == character_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn insert_character(&self, character: Character) -> Result<Character, StoreError> {
        let mut tables = self.lock()?;
        if tables.characters.contains_key(&character.id) {
            return Err(StoreError::Duplicate {
                kind: CHARACTER,
                id: character.id,
            });
        }
        Ok(tables.put_character(character, 0))
    }

    fn insert_team(&self, team: Team) -> Result<Team, StoreError> {
        let mut tables = self.lock()?;
        if tables.teams.contains_key(&team.id) {
            return Err(StoreError::Duplicate {
                kind: TEAM,
                id: team.id,
            });
        }
        let name = team.name.trim().to_lowercase();
        if tables
            .teams
            .values()
            .any(|t| t.guild_id == team.guild_id && t.name.trim().to_lowercase() == name)
        {
            return Err(StoreError::Duplicate {
                kind: TEAM_NAME,
                id: team.name,
            });
        }
        tables.members.insert(team.id.clone(), Vec::new());
        Ok(tables.put_team(team, 0))
    }

    fn commit_character(
        &self,
        character: Character,
        expected_revision: u64,
    ) -> Result<Character, StoreError> {
        let mut tables = self.lock()?;
        tables.check_character_revision(&character.id, expected_revision)?;
        Ok(tables.put_character(character, expected_revision))
    }

    fn commit_training(&self, commit: TrainingCommit) -> Result<Character, StoreError> {
        let mut tables = self.lock()?;
        tables.check_character_revision(&commit.character.id, commit.expected_revision)?;
        let current_team = tables
            .active_team_of(&commit.character.id)
            .map(|t| t.id.as_str());
        if current_team != commit.team.as_ref().map(|r| r.team_id.as_str()) {
            return Err(StoreError::conflict(CHARACTER, commit.character.id));
        }
        if let Some(refresh) = &commit.team {
            tables.check_team_revision(&refresh.team_id, refresh.expected_revision)?;
        }

        let TrainingCommit {
            character,
            expected_revision,
            record,
            team,
        } = commit;
        if let Some(refresh) = team {
            if let Some(member) = refresh.member {
                if let Some(slot) = tables
                    .members
                    .get_mut(&refresh.team_id)
                    .and_then(|roster| {
                        roster
                            .iter_mut()
                            .find(|m| m.character_id == member.character_id)
                    })
                {
                    *slot = member;
                }
            }
            if let Some(current) = tables.teams.get(&refresh.team_id).cloned() {
                let mut next = current;
                next.aggregate = refresh.aggregate;
                tables.put_team(next, refresh.expected_revision);
            }
        }
        tables.training_log.push(record);
        Ok(tables.put_character(character, expected_revision))
    }

    fn commit_roster(&self, commit: RosterCommit) -> Result<Team, StoreError> {
        let mut tables = self.lock()?;
        tables.check_team_revision(&commit.team.id, commit.expected_revision)?;
        for (id, expected) in &commit.member_revisions {
            tables.check_character_revision(id, *expected)?;
        }
        if let Some(joining) = &commit.joining {
            if tables
                .active_team_of(joining)
                .is_some_and(|t| t.id != commit.team.id)
            {
                return Err(StoreError::conflict(CHARACTER, joining.clone()));
            }
        }
        tables
            .members
            .insert(commit.team.id.clone(), commit.members);
        Ok(tables.put_team(commit.team, commit.expected_revision))
    }

    fn commit_technique(&self, character_id: &str, technique_id: &str) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.characters.contains_key(character_id) {
            return Err(StoreError::not_found(CHARACTER, character_id));
        }
        let learned = tables.learned.entry(character_id.to_string()).or_default();
        if learned.iter().any(|id| id == technique_id) {
            return Err(StoreError::Duplicate {
                kind: TECHNIQUE,
                id: technique_id.to_string(),
            });
        }
        learned.push(technique_id.to_string());
        Ok(())
    }

    fn commit_match(&self, commit: MatchCommit) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        tables.check_team_revision(&commit.home.id, commit.home_revision)?;
        tables.check_team_revision(&commit.away.id, commit.away_revision)?;
        tables.put_team(commit.home, commit.home_revision);
        tables.put_team(commit.away, commit.away_revision);
        tables.matches.push(commit.record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Position;

    #[test]
    fn insert_assigns_first_revision_and_rejects_duplicates() {
        let store = MemoryStore::new();
        let created = store
            .insert_character(Character::new("c1", "m1", "Tsukishima", Position::MiddleBlocker))
            .unwrap();
        assert_eq!(created.revision, 1);
        let err = store
            .insert_character(Character::new("c1", "m2", "Other", Position::Setter))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[test]
    fn stale_character_commit_conflicts() {
        let store = MemoryStore::new();
        let created = store
            .insert_character(Character::new("c1", "m1", "Tanaka", Position::WingSpiker))
            .unwrap();
        let mut first = created.clone();
        first.energy = 40;
        let mut second = created.clone();
        second.energy = 30;
        assert!(store.commit_character(first, created.revision).is_ok());
        let err = store
            .commit_character(second, created.revision)
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.character("c1").unwrap().energy, 40);
        assert_eq!(store.character("c1").unwrap().revision, 2);
    }

    #[test]
    fn joining_a_second_active_team_conflicts() {
        let store = MemoryStore::new();
        store
            .insert_character(Character::new("c1", "m1", "Nishinoya", Position::Libero))
            .unwrap();
        let a = store
            .insert_team(Team::new("a", "g", "o", "Alpha", None))
            .unwrap();
        let b = store
            .insert_team(Team::new("b", "g", "o", "Bravo", None))
            .unwrap();
        let roster = vec![TeamMember::new("c1", Position::Libero, true)];
        store
            .commit_roster(RosterCommit {
                expected_revision: a.revision,
                team: a,
                members: roster.clone(),
                joining: Some("c1".to_string()),
                member_revisions: BTreeMap::new(),
            })
            .unwrap();
        let err = store
            .commit_roster(RosterCommit {
                expected_revision: b.revision,
                team: b,
                members: roster,
                joining: Some("c1".to_string()),
                member_revisions: BTreeMap::new(),
            })
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.active_team_of("c1").unwrap().unwrap().id, "a");
    }

    #[test]
    fn stale_member_revision_rejects_roster_commit() {
        let store = MemoryStore::new();
        let joining = store
            .insert_character(Character::new("c1", "m1", "Asahi", Position::WingSpiker))
            .unwrap();
        let team = store
            .insert_team(Team::new("a", "g", "o", "Alpha", None))
            .unwrap();
        let mut trained = joining.clone();
        trained.stats.power += 3;
        store.commit_character(trained, joining.revision).unwrap();

        let err = store
            .commit_roster(RosterCommit {
                expected_revision: team.revision,
                team,
                members: vec![TeamMember::new("c1", Position::WingSpiker, true)],
                joining: Some("c1".to_string()),
                member_revisions: BTreeMap::from([("c1".to_string(), joining.revision)]),
            })
            .unwrap_err();
        assert_eq!(err, StoreError::conflict(CHARACTER, "c1"));
        assert!(store.team_members("a").unwrap().is_empty());
    }

    #[test]
    fn team_names_are_unique_per_guild_ignoring_case() {
        let store = MemoryStore::new();
        store
            .insert_team(Team::new("a", "g", "o", "Karasuno", None))
            .unwrap();
        let err = store
            .insert_team(Team::new("b", "g", "o", " karasuno ", None))
            .unwrap_err();
        assert_eq!(err.to_string(), "Team name already exists");
        assert!(
            store
                .insert_team(Team::new("c", "other", "o", "Karasuno", None))
                .is_ok()
        );
    }

    #[test]
    fn histories_are_newest_first_and_limited() {
        let store = MemoryStore::new();
        {
            let mut tables = store.lock().unwrap();
            for (i, (home, away)) in [("a", "b"), ("c", "d"), ("b", "a"), ("a", "c")]
                .into_iter()
                .enumerate()
            {
                tables.matches.push(MatchRecord {
                    home_team_id: home.to_string(),
                    away_team_id: away.to_string(),
                    home_score: 3,
                    away_score: 0,
                    winner: crate::matches::Winner::Home,
                    seed: i as u64,
                });
            }
        }
        let seeds: Vec<u64> = store
            .match_history("a", 2)
            .unwrap()
            .iter()
            .map(|m| m.seed)
            .collect();
        assert_eq!(seeds, [3, 2]);
        assert_eq!(store.match_history("d", 10).unwrap().len(), 1);
        assert!(store.training_history("c1", 10).unwrap().is_empty());
    }

    #[test]
    fn unknown_rows_are_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.character("nope").unwrap_err().to_string(),
            "Character not found"
        );
        assert_eq!(store.team("nope").unwrap_err().to_string(), "Team not found");
        assert!(store.team_members("nope").is_err());
        assert!(store.active_team_of("nope").unwrap().is_none());
    }
}
