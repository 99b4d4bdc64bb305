use courtside_game::constants::{DEFAULT_HISTORY_LIMIT, DEFAULT_PAGE_SIZE};
use courtside_game::techniques::load_catalog_from_static;
use courtside_game::{
    BalanceConfig, Character, League, LeagueStore, LineupSlot, MatchCommit, MatchRecord,
    MemoryStore, NewCharacter, NewMember, NewTeam, Position, RosterCommit, StoreError, Team,
    TeamMember, Technique, TrainingCommit, TrainingRecord, TrainingSession, TrainingType, Winner,
    match_seed, recompute_team_stats,
};
use std::cell::RefCell;
use std::sync::Arc;
use std::thread;

const GUILD: &str = "guild-1";
const OWNER: &str = "coach";

fn store() -> MemoryStore {
    MemoryStore::with_techniques(load_catalog_from_static())
}

fn league() -> League<MemoryStore> {
    League::new(Arc::new(BalanceConfig::load_from_static()), store())
}

fn create_character<S: LeagueStore>(league: &League<S>, id: &str, position: Position) {
    let created = league.create_character(NewCharacter {
        id: id.to_string(),
        owner_id: format!("owner-{id}"),
        name: format!("Player {id}"),
        primary_position: position,
        secondary_position: None,
    });
    assert!(created.success, "{}", created.message);
}

fn create_team<S: LeagueStore>(league: &League<S>, id: &str, name: &str) {
    let created = league.create_team(NewTeam {
        id: id.to_string(),
        guild_id: GUILD.to_string(),
        owner_id: OWNER.to_string(),
        name: name.to_string(),
        tag: None,
    });
    assert!(created.success, "{}", created.message);
}

fn add<S: LeagueStore>(
    league: &League<S>,
    team: &str,
    character: &str,
    position: Position,
    starter: bool,
) -> bool {
    league
        .add_member(&NewMember {
            team_id: team.to_string(),
            character_id: character.to_string(),
            position,
            starter,
        })
        .success
}

const STARTERS: [Position; 6] = [
    Position::Setter,
    Position::OutsideHitter,
    Position::MiddleBlocker,
    Position::WingSpiker,
    Position::Libero,
    Position::Libero,
];

/// Team `id` with six starters named `{id}-0` .. `{id}-5`.
fn full_team<S: LeagueStore>(league: &League<S>, id: &str, name: &str) {
    create_team(league, id, name);
    for (i, position) in STARTERS.into_iter().enumerate() {
        let character = format!("{id}-{i}");
        create_character(league, &character, position);
        assert!(add(league, id, &character, position, true), "{character}");
    }
}

/// Store over a shared [`MemoryStore`] that runs `before_commit` once, right
/// before its first write reaches the shared store.
struct Interleaved<'a> {
    inner: &'a MemoryStore,
    before_commit: RefCell<Option<Box<dyn FnOnce() + 'a>>>,
}

impl<'a> Interleaved<'a> {
    fn new(inner: &'a MemoryStore, hook: impl FnOnce() + 'a) -> Self {
        Self {
            inner,
            before_commit: RefCell::new(Some(Box::new(hook))),
        }
    }

    fn plain(inner: &'a MemoryStore) -> Self {
        Self {
            inner,
            before_commit: RefCell::new(None),
        }
    }

    fn fire(&self) {
        let hook = self.before_commit.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl LeagueStore for Interleaved<'_> {
    fn character(&self, id: &str) -> Result<Character, StoreError> {
        self.inner.character(id)
    }

    fn team(&self, id: &str) -> Result<Team, StoreError> {
        self.inner.team(id)
    }

    fn team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, StoreError> {
        self.inner.team_members(team_id)
    }

    fn active_team_of(&self, character_id: &str) -> Result<Option<Team>, StoreError> {
        self.inner.active_team_of(character_id)
    }

    fn guild_teams(&self, guild_id: &str) -> Result<Vec<Team>, StoreError> {
        self.inner.guild_teams(guild_id)
    }

    fn technique(&self, id: &str) -> Result<Technique, StoreError> {
        self.inner.technique(id)
    }

    fn technique_catalog(&self) -> Result<Vec<Technique>, StoreError> {
        self.inner.technique_catalog()
    }

    fn learned_techniques(&self, character_id: &str) -> Result<Vec<String>, StoreError> {
        self.inner.learned_techniques(character_id)
    }

    fn fixture_count(&self, home_id: &str, away_id: &str) -> Result<u64, StoreError> {
        self.inner.fixture_count(home_id, away_id)
    }

    fn match_history(&self, team_id: &str, limit: usize) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.match_history(team_id, limit)
    }

    fn training_history(
        &self,
        character_id: &str,
        limit: usize,
    ) -> Result<Vec<TrainingRecord>, StoreError> {
        self.inner.training_history(character_id, limit)
    }

    fn insert_character(&self, character: Character) -> Result<Character, StoreError> {
        self.fire();
        self.inner.insert_character(character)
    }

    fn insert_team(&self, team: Team) -> Result<Team, StoreError> {
        self.fire();
        self.inner.insert_team(team)
    }

    fn commit_character(
        &self,
        character: Character,
        expected_revision: u64,
    ) -> Result<Character, StoreError> {
        self.fire();
        self.inner.commit_character(character, expected_revision)
    }

    fn commit_training(&self, commit: TrainingCommit) -> Result<Character, StoreError> {
        self.fire();
        self.inner.commit_training(commit)
    }

    fn commit_roster(&self, commit: RosterCommit) -> Result<Team, StoreError> {
        self.fire();
        self.inner.commit_roster(commit)
    }

    fn commit_technique(&self, character_id: &str, technique_id: &str) -> Result<(), StoreError> {
        self.fire();
        self.inner.commit_technique(character_id, technique_id)
    }

    fn commit_match(&self, commit: MatchCommit) -> Result<(), StoreError> {
        self.fire();
        self.inner.commit_match(commit)
    }
}

fn assert_aggregate_current(store: &MemoryStore, team_id: &str) {
    let team = store.team(team_id).unwrap();
    let members = store.team_members(team_id).unwrap();
    let characters: Vec<Character> = members
        .iter()
        .map(|m| store.character(&m.character_id).unwrap())
        .collect();
    assert_eq!(
        team.aggregate,
        recompute_team_stats(members.iter().zip(characters.iter())),
        "aggregate of {team_id} lags its roster"
    );
}

fn power_session(id: &str) -> TrainingSession {
    TrainingSession::new(id, TrainingType::PowerTraining, 60, 3)
}

#[test]
fn roster_rules_hold_through_the_service() {
    let league = league();
    full_team(&league, "karasuno", "Karasuno");

    let duplicate = league.create_team(NewTeam {
        id: "other".into(),
        guild_id: GUILD.into(),
        owner_id: "someone".into(),
        name: " KARASUNO ".into(),
        tag: None,
    });
    assert!(!duplicate.success);
    assert_eq!(duplicate.message, "Team name already exists in this guild");

    let team = league.store().team("karasuno").unwrap();
    assert_eq!(team.aggregate.total_power, 300);
    assert_eq!(team.aggregate.chemistry, 50);
    assert!((team.aggregate.average_level - 1.0).abs() < f64::EPSILON);

    let again = league.add_member(&NewMember {
        team_id: "karasuno".into(),
        character_id: "karasuno-1".into(),
        position: Position::OutsideHitter,
        starter: false,
    });
    assert_eq!(again.message, "Character is already in an active team");

    create_character(&league, "bench-oh", Position::OutsideHitter);
    let taken = league.add_member(&NewMember {
        team_id: "karasuno".into(),
        character_id: "bench-oh".into(),
        position: Position::OutsideHitter,
        starter: true,
    });
    assert_eq!(taken.message, "Position OH is already taken by a starter");
    assert!(add(&league, "karasuno", "bench-oh", Position::OutsideHitter, false));

    assert!(league.set_captain("karasuno", "karasuno-0").success);
    let removal = league.remove_member("karasuno", "karasuno-0");
    assert_eq!(
        removal.message,
        "Cannot remove team captain. Transfer captaincy first."
    );
    assert!(league.remove_member("karasuno", "karasuno-3").success);
    assert!(league.store().active_team_of("karasuno-3").unwrap().is_none());

    let short = league.update_starting_lineup(
        "karasuno",
        &[LineupSlot::new("karasuno-0", Position::Setter)],
    );
    assert_eq!(short.message, "Starting lineup must have exactly 6 players");

    let lineup = [
        LineupSlot::new("karasuno-0", Position::Setter),
        LineupSlot::new("karasuno-1", Position::OutsideHitter),
        LineupSlot::new("karasuno-2", Position::MiddleBlocker),
        LineupSlot::new("bench-oh", Position::WingSpiker),
        LineupSlot::new("karasuno-4", Position::Libero),
        LineupSlot::new("karasuno-5", Position::Libero),
    ];
    let updated = league.update_starting_lineup("karasuno", &lineup);
    assert!(updated.success, "{}", updated.message);
    let roster = league.store().team_members("karasuno").unwrap();
    let bench = roster
        .iter()
        .find(|m| m.character_id == "bench-oh")
        .unwrap();
    assert!(bench.starter);
    assert_eq!(bench.position, Position::WingSpiker);

    let intruder = league.disband_team("karasuno", "karasuno-0");
    assert_eq!(intruder.message, "Only team owner can disband the team");
    assert!(league.disband_team("karasuno", OWNER).success);
    assert_eq!(
        league.disband_team("karasuno", OWNER).message,
        "Team is already disbanded"
    );

    create_team(&league, "nekoma", "Nekoma");
    assert!(add(&league, "nekoma", "karasuno-1", Position::OutsideHitter, true));
}

#[test]
fn team_practice_raises_chemistry_and_refreshes_aggregates() {
    let league = league();
    full_team(&league, "aoba", "Aoba Johsai");
    let before = league.store().team("aoba").unwrap();

    for id in ["aoba-0", "aoba-1", "aoba-2"] {
        let result =
            league.train_character(&TrainingSession::new(id, TrainingType::TeamPractice, 60, 1));
        assert!(result.success, "{}", result.message);
        assert_eq!(result.chemistry_bonus, 5);
    }

    let roster = league.store().team_members("aoba").unwrap();
    let trained: Vec<u32> = roster
        .iter()
        .filter(|m| ["aoba-0", "aoba-1", "aoba-2"].contains(&m.character_id.as_str()))
        .map(|m| m.chemistry)
        .collect();
    assert_eq!(trained, [55, 55, 55]);

    let after = league.store().team("aoba").unwrap();
    assert_eq!(after.aggregate.chemistry, 52);
    assert!(after.aggregate.total_power >= before.aggregate.total_power);
    assert_eq!(after.revision, before.revision + 3);
}

#[test]
fn matches_update_records_and_replay_from_seed() {
    let play = |seed: Option<u64>| {
        let league = league();
        full_team(&league, "home", "Shiratorizawa");
        full_team(&league, "away", "Inarizaki");
        let report = league.play_match("home", "away", seed);
        (league, report)
    };

    let (league, report) = play(Some(42));
    assert!(report.success, "{}", report.message);
    assert_eq!(report.seed, 42);
    let result = report.result.unwrap();
    assert_ne!(result.winner, Winner::Draw);
    assert!(report.reward.is_some());

    let home = league.store().team("home").unwrap();
    let away = league.store().team("away").unwrap();
    assert_eq!(home.wins + away.wins, 1);
    assert_eq!(home.losses + away.losses, 1);
    assert_eq!(home.wins, away.losses);
    let log = league.store().match_log().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].seed, 42);
    assert_eq!(log[0].winner, result.winner);

    let (_, replay) = play(Some(42));
    assert_eq!(replay, report);

    let (league, derived) = play(None);
    assert_eq!(derived.seed, match_seed("home", "away", 0));
    let next = league.play_match("home", "away", None);
    assert_eq!(next.seed, match_seed("home", "away", 1));
}

#[test]
fn matches_need_two_distinct_full_active_teams() {
    let league = league();
    full_team(&league, "full", "Date Tech");
    create_team(&league, "thin", "Fukurodani");
    create_character(&league, "lonely", Position::Setter);
    assert!(add(&league, "thin", "lonely", Position::Setter, true));

    let own = league.play_match("full", "full", Some(1));
    assert_eq!(own.message, "A team cannot play against itself");

    let thin = league.play_match("full", "thin", Some(1));
    assert!(!thin.success);
    assert_eq!(thin.message, "Team Fukurodani needs at least 6 members to play");

    let ghost = league.play_match("full", "ghost", Some(1));
    assert_eq!(ghost.message, "Team not found");

    assert!(league.disband_team("thin", OWNER).success);
    let inactive = league.play_match("thin", "full", Some(1));
    assert_eq!(inactive.message, "Team Fukurodani is not active");
    assert!(league.store().match_log().unwrap().is_empty());
}

#[test]
fn techniques_are_learned_once() {
    let league = league();
    create_character(&league, "mb", Position::MiddleBlocker);

    let eligible: Vec<String> = league
        .eligible_techniques("mb")
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert!(eligible.contains(&"quick-attack".to_string()));

    let learned = league.learn_technique("mb", "quick-attack");
    assert!(learned.success, "{}", learned.message);
    assert_eq!(learned.message, "Successfully learned Quick Attack!");
    assert_eq!(
        league.learn_technique("mb", "quick-attack").message,
        "Technique already learned"
    );
    assert_eq!(
        league.learn_technique("mb", "no-such-move").message,
        "Technique not found"
    );
    assert!(
        !league
            .eligible_techniques("mb")
            .unwrap()
            .iter()
            .any(|t| t.id == "quick-attack")
    );
}

#[test]
fn concurrent_trainings_never_overspend() {
    let league = league();
    create_character(&league, "ace", Position::WingSpiker);
    let shared = &league;

    let successes: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    shared
                        .train_character(&TrainingSession::new(
                            "ace",
                            TrainingType::PowerTraining,
                            60,
                            3,
                        ))
                        .success
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| usize::from(h.join().expect("training thread panicked")))
            .sum()
    });

    assert!((1..=2).contains(&successes), "successes {successes}");
    let ace = league.store().character("ace").unwrap();
    let spent = 50 * i32::try_from(successes).expect("small count");
    assert_eq!(ace.energy, 100 - spent);
    assert_eq!(league.store().training_log().unwrap().len(), successes);
}

#[test]
fn recovery_restores_resources_up_to_the_cap() {
    let league = league();
    create_character(&league, "setter", Position::Setter);
    let trained =
        league.train_character(&TrainingSession::new("setter", TrainingType::PowerTraining, 60, 3));
    assert!(trained.success);
    let picks = league.training_recommendations("setter").unwrap();
    assert_eq!(picks.len(), 4);
    assert!(!picks.contains(&TrainingType::PowerTraining));
    assert_eq!(picks.last(), Some(&TrainingType::TeamPractice));

    let drained =
        league.train_character(&TrainingSession::new("setter", TrainingType::PowerTraining, 60, 3));
    assert!(drained.success);
    assert_eq!(
        league.training_recommendations("setter").unwrap(),
        [TrainingType::Recovery]
    );

    let idle = league.recover_character("setter", 0);
    assert_eq!(idle.message, "No time has passed, nothing to recover");

    let rested = league.recover_character("setter", 3);
    assert!(rested.success);
    let setter = league.store().character("setter").unwrap();
    assert_eq!(setter.energy, 30);
    assert_eq!(setter.motivation, 55);

    assert!(league.recover_character("setter", 100).success);
    let setter = league.store().character("setter").unwrap();
    assert_eq!((setter.energy, setter.motivation), (100, 100));
    assert_eq!(
        league.recover_character("nobody", 1).message,
        "Character not found"
    );
}

#[test]
fn team_search_matches_name_or_tag() {
    let league = league();
    full_team(&league, "strong", "Itachiyama");
    create_team(&league, "weak", "Inarizaki");
    let tagged = league.create_team(NewTeam {
        id: "tagged".into(),
        guild_id: GUILD.into(),
        owner_id: OWNER.into(),
        name: "Johzenji".into(),
        tag: Some("INA".into()),
    });
    assert!(tagged.success);

    let found: Vec<String> = league
        .search_teams(GUILD, "ina", 10)
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(found, ["weak", "tagged"]);

    let strongest: Vec<String> = league
        .search_teams(GUILD, "", 1)
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(strongest, ["strong"]);
    assert!(league.search_teams("elsewhere", "", 10).unwrap().is_empty());
}

#[test]
fn joining_while_training_commits_conflicts_instead_of_staling() {
    let balance = Arc::new(BalanceConfig::load_from_static());
    let shared = store();
    let setup = League::new(Arc::clone(&balance), Interleaved::plain(&shared));
    create_team(&setup, "karasuno", "Karasuno");
    create_character(&setup, "hinata", Position::MiddleBlocker);

    let trainer = League::new(
        Arc::clone(&balance),
        Interleaved::new(&shared, || {
            let other = League::new(Arc::clone(&balance), Interleaved::plain(&shared));
            assert!(add(&other, "karasuno", "hinata", Position::MiddleBlocker, true));
        }),
    );
    let raced = trainer.train_character(&power_session("hinata"));
    assert!(!raced.success);
    assert_eq!(raced.message, "Character was modified concurrently, please retry");
    assert_aggregate_current(&shared, "karasuno");

    let retried = trainer.train_character(&power_session("hinata"));
    assert!(retried.success, "{}", retried.message);
    assert_aggregate_current(&shared, "karasuno");
    let team = shared.team("karasuno").unwrap();
    let hinata = shared.character("hinata").unwrap();
    assert_eq!(team.aggregate.total_power, hinata.stats.core_total());
}

#[test]
fn training_while_joining_commits_conflicts_instead_of_staling() {
    let balance = Arc::new(BalanceConfig::load_from_static());
    let shared = store();
    let setup = League::new(Arc::clone(&balance), Interleaved::plain(&shared));
    create_team(&setup, "karasuno", "Karasuno");
    create_character(&setup, "kageyama", Position::Setter);

    let coach = League::new(
        Arc::clone(&balance),
        Interleaved::new(&shared, || {
            let gym = League::new(Arc::clone(&balance), Interleaved::plain(&shared));
            assert!(gym.train_character(&power_session("kageyama")).success);
        }),
    );
    assert!(!add(&coach, "karasuno", "kageyama", Position::Setter, true));
    assert!(shared.team_members("karasuno").unwrap().is_empty());

    assert!(add(&coach, "karasuno", "kageyama", Position::Setter, true));
    assert_aggregate_current(&shared, "karasuno");
}

#[test]
fn interleaved_creates_cannot_duplicate_a_team_name() {
    let balance = Arc::new(BalanceConfig::load_from_static());
    let shared = store();
    let founder = League::new(
        Arc::clone(&balance),
        Interleaved::new(&shared, || {
            let rival = League::new(Arc::clone(&balance), Interleaved::plain(&shared));
            create_team(&rival, "first", "Karasuno");
        }),
    );
    let second = founder.create_team(NewTeam {
        id: "second".into(),
        guild_id: GUILD.into(),
        owner_id: OWNER.into(),
        name: "karasuno".into(),
        tag: None,
    });
    assert!(!second.success);
    assert_eq!(second.message, "Team name already exists in this guild");
    let names: Vec<String> = shared
        .guild_teams(GUILD)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, ["Karasuno"]);
}

#[test]
fn guild_teams_page_by_power_then_wins() {
    let league = league();
    full_team(&league, "strong", "Itachiyama");
    full_team(&league, "rival", "Inarizaki");
    for name in ["Johzenji", "Kakugawa", "Tsubakihara"] {
        create_team(&league, &name.to_lowercase(), name);
    }
    create_team(&league, "gone", "Tokonami");
    assert!(league.disband_team("gone", OWNER).success);
    let played = league.play_match("strong", "rival", Some(7));
    assert!(played.success, "{}", played.message);

    let first = league.guild_teams(GUILD, 1, 2).unwrap();
    assert_eq!(first.total, 5);
    assert_eq!(first.total_pages, 3);
    assert_eq!(first.teams.len(), 2);
    assert!(first.teams[0].aggregate.total_power >= first.teams[1].aggregate.total_power);

    let last = league.guild_teams(GUILD, 3, 2).unwrap();
    assert_eq!(last.teams.len(), 1);
    assert!(league.guild_teams(GUILD, 4, 2).unwrap().teams.is_empty());
    assert_eq!(league.guild_teams(GUILD, 0, 0).unwrap().page, 1);

    let everyone = league.guild_teams(GUILD, 1, DEFAULT_PAGE_SIZE).unwrap();
    let ids: Vec<&str> = everyone.teams.iter().map(|t| t.id.as_str()).collect();
    assert!(!ids.contains(&"gone"));
    // Full rosters share starting stats, so the match winner ranks first.
    assert_eq!((everyone.teams[0].wins, everyone.teams[1].wins), (1, 0));
    assert_eq!(&ids[2..], ["johzenji", "kakugawa", "tsubakihara"]);
}

#[test]
fn match_history_lists_both_sides_newest_first() {
    let league = league();
    full_team(&league, "a", "Aoba Johsai");
    full_team(&league, "b", "Date Tech");
    full_team(&league, "c", "Wakutani");
    for (home, away, seed) in [("a", "b", 1), ("c", "b", 2), ("b", "a", 3), ("c", "a", 4)] {
        assert!(league.play_match(home, away, Some(seed)).success);
    }

    let seeds: Vec<u64> = league
        .team_match_history("a", DEFAULT_HISTORY_LIMIT)
        .unwrap()
        .iter()
        .map(|m| m.seed)
        .collect();
    assert_eq!(seeds, [4, 3, 1]);
    assert_eq!(league.team_match_history("b", 2).unwrap().len(), 2);
    assert_eq!(
        league.team_match_history("ghost", 5).unwrap_err().to_string(),
        "Team not found"
    );
}

#[test]
fn character_details_show_latest_ten_trainings() {
    let league = league();
    full_team(&league, "nekoma", "Nekoma");
    assert!(league.learn_technique("nekoma-2", "quick-attack").success);
    for _ in 0..6 {
        for _ in 0..2 {
            let session = TrainingSession::new("nekoma-2", TrainingType::MentalTraining, 30, 1);
            assert!(league.train_character(&session).success);
        }
        assert!(league.recover_character("nekoma-2", 10).success);
    }

    let details = league.character_details("nekoma-2").unwrap();
    assert_eq!(details.character.id, "nekoma-2");
    assert_eq!(details.team.map(|t| t.id), Some("nekoma".to_string()));
    assert_eq!(details.techniques.len(), 1);
    assert_eq!(details.recent_training.len(), 10);
    assert!(
        details
            .recent_training
            .iter()
            .all(|r| r.training_type == TrainingType::MentalTraining)
    );
    assert_eq!(league.store().training_log().unwrap().len(), 12);
    assert!(league.character_details("nobody").is_err());
}
