//! Deterministic QA scenarios run against the pure game engines.
//!
//! Every scenario gets a fresh in-memory league per iteration and derives all
//! randomness from the iteration seed, so a failing seed replays exactly.
use anyhow::{Result, bail, ensure};
use courtside_game::{
    BalanceConfig, Character, League, LeagueStore, MatchSimulator, MemoryStore, NewCharacter,
    NewMember, NewTeam, Position, StatName, TeamStrength, TrainingEngine, TrainingSession,
    TrainingType, Winner, exp_required_for_level, level_from_experience, stat_gain,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;

/// Shared inputs for a scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioCtx {
    pub balance: Arc<BalanceConfig>,
    pub verbose: bool,
}

impl ScenarioCtx {
    #[must_use]
    pub const fn new(balance: Arc<BalanceConfig>, verbose: bool) -> Self {
        Self { balance, verbose }
    }

    fn league(&self) -> League<MemoryStore> {
        League::new(Arc::clone(&self.balance), MemoryStore::new())
    }
}

type ScenarioFn = fn(&ScenarioCtx, u64) -> Result<()>;

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub key: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

impl Scenario {
    /// # Errors
    ///
    /// Returns the first violated expectation of the scenario.
    pub fn run(&self, ctx: &ScenarioCtx, seed: u64) -> Result<()> {
        (self.run)(ctx, seed)
    }
}

const SCENARIOS: [Scenario; 6] = [
    Scenario {
        key: "smoke",
        description: "Create two teams, train everyone once and play a match",
        run: smoke,
    },
    Scenario {
        key: "progression-curve",
        description: "Experience thresholds grow and map back to their level",
        run: progression_curve,
    },
    Scenario {
        key: "training-golden",
        description: "Power training at intensity 3 matches the reference trace",
        run: training_golden,
    },
    Scenario {
        key: "match-balance",
        description: "Evenly matched teams split wins and scores stay best-of-five",
        run: match_balance,
    },
    Scenario {
        key: "roster-rules",
        description: "Roster limits, starter positions and captaincy are enforced",
        run: roster_rules,
    },
    Scenario {
        key: "resource-cycle",
        description: "Random training and rest never push resources out of bounds",
        run: resource_cycle,
    },
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.key, s.description)).collect()
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<Scenario> {
    SCENARIOS.iter().copied().find(|s| s.key == key)
}

#[must_use]
pub fn all_scenario_keys() -> Vec<String> {
    SCENARIOS.iter().map(|s| s.key.to_string()).collect()
}

const LINEUP: [Position; 6] = [
    Position::Setter,
    Position::OutsideHitter,
    Position::MiddleBlocker,
    Position::WingSpiker,
    Position::Libero,
    Position::Libero,
];

fn create_character(league: &League<MemoryStore>, id: &str, position: Position) -> Result<()> {
    let created = league.create_character(NewCharacter {
        id: id.to_string(),
        owner_id: format!("owner-{id}"),
        name: format!("Player {id}"),
        primary_position: position,
        secondary_position: None,
    });
    ensure!(created.success, "create {id}: {}", created.message);
    Ok(())
}

fn build_team(league: &League<MemoryStore>, team_id: &str) -> Result<Vec<String>> {
    let created = league.create_team(NewTeam {
        id: team_id.to_string(),
        guild_id: "qa".to_string(),
        owner_id: "qa-owner".to_string(),
        name: format!("Team {team_id}"),
        tag: None,
    });
    ensure!(created.success, "create team {team_id}: {}", created.message);

    let mut ids = Vec::with_capacity(LINEUP.len());
    for (i, position) in LINEUP.into_iter().enumerate() {
        let id = format!("{team_id}-{i}");
        create_character(league, &id, position)?;
        let added = league.add_member(&NewMember {
            team_id: team_id.to_string(),
            character_id: id.clone(),
            position,
            starter: true,
        });
        ensure!(added.success, "add {id}: {}", added.message);
        ids.push(id);
    }
    Ok(ids)
}

fn smoke(ctx: &ScenarioCtx, seed: u64) -> Result<()> {
    let league = ctx.league();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut roster = build_team(&league, "home")?;
    roster.extend(build_team(&league, "away")?);

    for id in &roster {
        let kind = TrainingType::ALL[rng.gen_range(0..TrainingType::ALL.len())];
        let intensity = rng.gen_range(1..=3);
        let result = league.train_character(&TrainingSession::new(id, kind, 60, intensity));
        ensure!(result.success, "train {id} with {kind}: {}", result.message);
    }

    let report = league.play_match("home", "away", Some(seed));
    ensure!(report.success, "match failed: {}", report.message);
    let Some(result) = report.result else {
        bail!("successful match without a result");
    };
    if ctx.verbose {
        println!("     ↳ seed {seed}: {}", report.message);
    }
    let home = league.store().team("home")?;
    let away = league.store().team("away")?;
    ensure!(
        home.wins + home.losses == 1 && away.wins + away.losses == 1,
        "records not updated after {result}"
    );
    Ok(())
}

fn progression_curve(ctx: &ScenarioCtx, _seed: u64) -> Result<()> {
    let cfg = &ctx.balance.progression;
    let top = cfg.max_level.min(60);
    let mut previous = 0;
    let mut total = 0u64;
    for level in cfg.min_level..=top {
        let needed = exp_required_for_level(cfg, level);
        ensure!(
            level == cfg.min_level || needed > previous,
            "step into level {level} does not grow ({needed} <= {previous})"
        );
        total += needed;
        let reached = level_from_experience(cfg, total);
        ensure!(
            reached == level,
            "{total} total exp maps to level {reached}, expected {level}"
        );
        if level > cfg.min_level {
            ensure!(
                level_from_experience(cfg, total - 1) == level - 1,
                "one exp short of level {level} already reaches it"
            );
        }
        previous = needed;
    }
    for intensity in cfg.min_intensity..=cfg.max_intensity {
        ensure!(
            stat_gain(cfg, cfg.stat_gain_base, intensity, cfg.max_level) >= 1,
            "intensity {intensity} yields no gain at max level"
        );
    }
    Ok(())
}

fn training_golden(ctx: &ScenarioCtx, _seed: u64) -> Result<()> {
    let engine = TrainingEngine::new(Arc::clone(&ctx.balance));
    let character = Character::new("golden", "qa", "Golden", Position::WingSpiker);
    let session = TrainingSession::new("golden", TrainingType::PowerTraining, 60, 3);
    let report = engine.train(&character, &session)?;

    ensure!(
        (report.cost.energy, report.cost.motivation) == (50, 30),
        "cost {:?}",
        report.cost
    );
    ensure!(
        report.gain_for(StatName::Power) == 3 && report.gain_for(StatName::Attack) == 1,
        "gains {:?}",
        report.gains
    );
    ensure!(report.experience == 18, "experience {}", report.experience);
    ensure!(report.level_up().is_none(), "unexpected level up");
    Ok(())
}

const MATCH_SAMPLE: u32 = 1_000;
const MATCH_TOLERANCE: f64 = 0.06;

fn match_balance(ctx: &ScenarioCtx, seed: u64) -> Result<()> {
    let sim = MatchSimulator::new(Arc::clone(&ctx.balance));
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let power = rng.gen_range(150.0..600.0);
    let chemistry = rng.gen_range(20.0..80.0);
    let side = TeamStrength::new(power, chemistry);

    let mut home_wins = 0u32;
    for _ in 0..MATCH_SAMPLE {
        let result = sim.simulate(side, side, &mut rng);
        let (winner_sets, loser_sets) = match result.winner {
            Winner::Home => {
                home_wins += 1;
                (result.home_score, result.away_score)
            }
            Winner::Away => (result.away_score, result.home_score),
            Winner::Draw => bail!("draw {result}"),
        };
        ensure!(
            winner_sets == 3 && loser_sets <= 2,
            "invalid score {result}"
        );
    }
    let rate = f64::from(home_wins) / f64::from(MATCH_SAMPLE);
    ensure!(
        (rate - 0.5).abs() < MATCH_TOLERANCE,
        "home win rate {rate:.3} for power {power:.0} chemistry {chemistry:.0}"
    );
    Ok(())
}

fn roster_rules(ctx: &ScenarioCtx, seed: u64) -> Result<()> {
    let league = ctx.league();
    let starters = build_team(&league, "rules")?;
    let max = ctx.balance.team.max_members;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let extra = "rules-bench-setter";
    create_character(&league, extra, Position::Setter)?;
    let taken = league.add_member(&NewMember {
        team_id: "rules".to_string(),
        character_id: extra.to_string(),
        position: Position::Setter,
        starter: true,
    });
    ensure!(!taken.success, "second starting setter was accepted");

    let mut members = starters.len();
    let mut bench = 0usize;
    while members < max {
        let id = format!("rules-bench-{bench}");
        let position = Position::ALL[rng.gen_range(0..Position::ALL.len())];
        create_character(&league, &id, position)?;
        let added = league.add_member(&NewMember {
            team_id: "rules".to_string(),
            character_id: id.clone(),
            position,
            starter: false,
        });
        ensure!(added.success, "bench {id}: {}", added.message);
        members += 1;
        bench += 1;
    }
    let overflow = league.add_member(&NewMember {
        team_id: "rules".to_string(),
        character_id: extra.to_string(),
        position: Position::Setter,
        starter: false,
    });
    ensure!(!overflow.success, "team grew past {max} members");

    let captain = &starters[rng.gen_range(0..starters.len())];
    ensure!(league.set_captain("rules", captain).success, "set captain");
    ensure!(
        !league.remove_member("rules", captain).success,
        "captain {captain} was removed"
    );
    let roster = league.store().team_members("rules")?;
    ensure!(roster.len() == max, "roster has {} members", roster.len());
    ensure!(
        roster.iter().filter(|m| m.starter).count() == ctx.balance.team.starting_lineup,
        "starter count drifted"
    );
    Ok(())
}

const RESOURCE_STEPS: usize = 200;

fn resource_cycle(ctx: &ScenarioCtx, seed: u64) -> Result<()> {
    let league = ctx.league();
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let position = Position::ALL[rng.gen_range(0..Position::ALL.len())];
    create_character(&league, "grinder", position)?;
    let limits = &ctx.balance.resources;

    for step in 0..RESOURCE_STEPS {
        if rng.gen_bool(0.2) {
            league.recover_character("grinder", rng.gen_range(0..6));
        } else {
            let kind = TrainingType::ALL[rng.gen_range(0..TrainingType::ALL.len())];
            let minutes = rng.gen_range(15..=240);
            let intensity = rng.gen_range(1..=5);
            league.train_character(&TrainingSession::new("grinder", kind, minutes, intensity));
        }
        let grinder = league.store().character("grinder")?;
        ensure!(
            (0..=limits.max_energy).contains(&grinder.energy)
                && (0..=limits.max_motivation).contains(&grinder.motivation),
            "step {step}: energy {} motivation {}",
            grinder.energy,
            grinder.motivation
        );
        ensure!(
            StatName::ALL
                .iter()
                .all(|s| ctx.balance.stats.clamp(grinder.stats.get(*s)) == grinder.stats.get(*s)),
            "step {step}: stat out of bounds"
        );
        ensure!(
            grinder.level == level_from_experience(&ctx.balance.progression, grinder.experience),
            "step {step}: level {} disagrees with {} exp",
            grinder.level,
            grinder.experience
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ScenarioCtx {
        ScenarioCtx::new(Arc::new(BalanceConfig::load_from_static()), false)
    }

    #[test]
    fn every_scenario_passes_on_default_balance() {
        let ctx = ctx();
        for key in all_scenario_keys() {
            let scenario = get_scenario(&key).unwrap();
            for seed in [1, 1337] {
                scenario
                    .run(&ctx, seed)
                    .unwrap_or_else(|err| panic!("{key} seed {seed}: {err:#}"));
            }
        }
    }

    #[test]
    fn unknown_scenario_is_none() {
        assert!(get_scenario("weather").is_none());
        assert_eq!(list_scenarios().len(), SCENARIOS.len());
    }

    #[test]
    fn golden_trace_detects_rebalanced_costs() {
        let mut balance = BalanceConfig::load_from_static();
        if let Some(power) = balance.training.get_mut(&TrainingType::PowerTraining) {
            power.energy_cost = 30;
        }
        let ctx = ScenarioCtx::new(Arc::new(balance), false);
        assert!(get_scenario("training-golden").unwrap().run(&ctx, 1).is_err());
    }
}
