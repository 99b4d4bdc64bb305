use courtside_game::{
    BalanceConfig, MatchResult, MatchSimulator, TeamStrength, Winner, stream_rng,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::Arc;

const SAMPLE_SIZE: u32 = 5_000;
const TOLERANCE: f64 = 0.03;

fn simulator() -> MatchSimulator {
    MatchSimulator::new(Arc::new(BalanceConfig::load_from_static()))
}

fn rate(hits: u32) -> f64 {
    f64::from(hits) / f64::from(SAMPLE_SIZE)
}

fn assert_best_of_five(result: &MatchResult) {
    let (winner_sets, loser_sets) = match result.winner {
        Winner::Home => (result.home_score, result.away_score),
        Winner::Away => (result.away_score, result.home_score),
        Winner::Draw => panic!("unexpected draw: {result}"),
    };
    assert_eq!(winner_sets, 3, "{result}");
    assert!(loser_sets <= 2, "{result}");
}

#[test]
fn equal_teams_split_wins_evenly() {
    let sim = simulator();
    let mut rng = SmallRng::seed_from_u64(0x00C0_FFEE);
    let side = TeamStrength::new(320.0, 50.0);
    let mut home_wins = 0;
    let mut five_setters = 0;
    for _ in 0..SAMPLE_SIZE {
        let result = sim.simulate(side, side, &mut rng);
        assert_best_of_five(&result);
        if result.winner == Winner::Home {
            home_wins += 1;
        }
        if result.home_score + result.away_score == 5 {
            five_setters += 1;
        }
    }
    let home_rate = rate(home_wins);
    assert!(
        (home_rate - 0.5).abs() < TOLERANCE,
        "home win rate {home_rate:.3} drifted from 0.5"
    );
    assert!(
        rate(five_setters) > 0.3,
        "evenly matched sides should often go the distance"
    );
}

#[test]
fn chemistry_decides_matches_between_equal_rosters() {
    let sim = simulator();
    let mut rng = SmallRng::seed_from_u64(7);
    let gelled = TeamStrength::new(300.0, 70.0);
    let strangers = TeamStrength::new(300.0, 30.0);
    let mut gelled_wins = 0;
    for _ in 0..SAMPLE_SIZE {
        if sim.simulate(gelled, strangers, &mut rng).winner == Winner::Home {
            gelled_wins += 1;
        }
    }
    assert!(rate(gelled_wins) > 0.95, "rate {:.3}", rate(gelled_wins));
}

#[test]
fn blowouts_are_mostly_straight_sets() {
    let sim = simulator();
    let mut rng = SmallRng::seed_from_u64(11);
    let strong = TeamStrength::new(600.0, 50.0);
    let weak = TeamStrength::new(200.0, 50.0);
    let mut shutouts = 0;
    for _ in 0..SAMPLE_SIZE {
        let result = sim.simulate(weak, strong, &mut rng);
        assert_eq!(result.winner, Winner::Away);
        assert!(result.home_score <= 1, "{result}");
        if result.home_score == 0 {
            shutouts += 1;
        }
    }
    let shutout_rate = rate(shutouts);
    assert!(
        (shutout_rate - 0.7).abs() < TOLERANCE,
        "shutout rate {shutout_rate:.3}"
    );
}

#[test]
fn seeded_streams_replay_identically() {
    let sim = simulator();
    let home = TeamStrength::new(310.0, 55.0);
    let away = TeamStrength::new(295.0, 48.0);
    for seed in [0_u64, 1, 42, 0xDEAD_BEEF] {
        let mut first = stream_rng(seed, b"match");
        let mut second = stream_rng(seed, b"match");
        let a: Vec<MatchResult> = (0..50)
            .map(|_| sim.simulate(home, away, &mut first))
            .collect();
        let b: Vec<MatchResult> = (0..50)
            .map(|_| sim.simulate(home, away, &mut second))
            .collect();
        assert_eq!(a, b, "seed {seed} diverged");
    }
}
