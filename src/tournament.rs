//! Batch harness: head-to-head matches and round-robin tournaments
//!
//! Matches are independent and fully determined by their seed, so the
//! tournament fans them out across a rayon pool and folds the results in
//! a fixed order afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;

use anyhow::{Context, Result, anyhow};
use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::SPAWN_SPEED;
use crate::settings::ArenaConfig;
use crate::sim::{Archetype, BallBattle, Team};

pub const TEAM_ONE: Team = 1;
pub const TEAM_TWO: Team = 2;
/// Distance of each starting ball from its side wall
pub const SPAWN_INSET: f64 = 50.0;
pub const DEFAULT_MATCHES: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Team1,
    Team2,
    Draw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub a: Archetype,
    pub b: Archetype,
    pub seed: u64,
    pub outcome: Outcome,
    pub ticks: u64,
}

/// Set up the standard two-ball arena: `a` on the left facing right, `b`
/// on the right facing left, both launched in random directions.
pub fn setup_match(a: Archetype, b: Archetype, seed: u64, config: &ArenaConfig) -> BallBattle {
    let mut battle = BallBattle::new(config.clone(), seed);
    let y = config.height / 2.0;

    let vel = battle.random_velocity(SPAWN_SPEED);
    battle.add_body(a.build(TEAM_ONE, DVec2::new(SPAWN_INSET, y), vel, 0.0));
    let vel = battle.random_velocity(SPAWN_SPEED);
    battle.add_body(b.build(TEAM_TWO, DVec2::new(config.width - SPAWN_INSET, y), vel, PI));
    battle
}

/// Play one match to completion or the tick limit
pub fn run_match(a: Archetype, b: Archetype, seed: u64, config: &ArenaConfig) -> MatchResult {
    let mut battle = setup_match(a, b, seed, config);

    let mut outcome = Outcome::Draw;
    while battle.time_ticks() < config.max_ticks {
        battle.update();
        let one = battle.team_alive(TEAM_ONE) > 0;
        let two = battle.team_alive(TEAM_TWO) > 0;
        match (one, two) {
            (true, true) => continue,
            (true, false) => outcome = Outcome::Team1,
            (false, true) => outcome = Outcome::Team2,
            (false, false) => outcome = Outcome::Draw,
        }
        break;
    }

    log::info!(
        "{} vs {} (seed {}): {:?} after {} ticks",
        a,
        b,
        seed,
        outcome,
        battle.time_ticks()
    );
    MatchResult {
        a,
        b,
        seed,
        outcome,
        ticks: battle.time_ticks(),
    }
}

#[derive(Debug, Clone)]
pub struct TournamentConfig {
    pub archetypes: Vec<Archetype>,
    /// Matches per pairing
    pub matches: u32,
    pub base_seed: u64,
    /// Worker threads; `None` uses rayon's global pool
    pub jobs: Option<usize>,
    pub arena: ArenaConfig,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            archetypes: Archetype::ALL.to_vec(),
            matches: DEFAULT_MATCHES,
            base_seed: 0,
            jobs: None,
            arena: ArenaConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl Tally {
    pub fn score(&self) -> i64 {
        self.wins as i64 - self.losses as i64
    }

    fn record(&mut self, outcome: Outcome, first: bool) {
        match (outcome, first) {
            (Outcome::Draw, _) => self.draws += 1,
            (Outcome::Team1, true) | (Outcome::Team2, false) => self.wins += 1,
            _ => self.losses += 1,
        }
    }
}

/// Results of one pairing, from `a`'s point of view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pairing {
    pub a: Archetype,
    pub b: Archetype,
    pub tally: Tally,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ranking {
    pub rank: usize,
    pub archetype: Archetype,
    pub tally: Tally,
    pub score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentReport {
    pub matches_per_pairing: u32,
    pub base_seed: u64,
    pub pairings: Vec<Pairing>,
    pub rankings: Vec<Ranking>,
}

/// Seed of the `k`th match of pairing number `pair`
pub fn match_seed(base_seed: u64, pair: usize, k: u32) -> u64 {
    base_seed
        .wrapping_add((pair as u64) << 32)
        .wrapping_add(k as u64)
}

/// Every unordered pairing of distinct archetypes, `matches` times each
pub fn run_tournament(config: &TournamentConfig) -> Result<TournamentReport> {
    // Repeats would pair an archetype with itself; keep first occurrences
    let mut seen = BTreeSet::new();
    let archetypes: Vec<Archetype> = config
        .archetypes
        .iter()
        .copied()
        .filter(|&a| seen.insert(a))
        .collect();
    if archetypes.len() < 2 {
        return Err(anyhow!("tournament requires at least two archetypes"));
    }
    if config.matches == 0 {
        return Err(anyhow!("tournament requires at least one match per pairing"));
    }
    config
        .arena
        .validate()
        .context("invalid arena configuration")?;

    let mut pairs = Vec::new();
    for (i, &a) in archetypes.iter().enumerate() {
        for &b in &archetypes[i + 1..] {
            pairs.push((a, b));
        }
    }
    log::info!(
        "Running {} pairings x {} matches",
        pairs.len(),
        config.matches
    );

    let jobs: Vec<(usize, u32)> = (0..pairs.len())
        .flat_map(|p| (0..config.matches).map(move |k| (p, k)))
        .collect();
    let run_one = |&(p, k): &(usize, u32)| {
        let (a, b) = pairs[p];
        (p, run_match(a, b, match_seed(config.base_seed, p, k), &config.arena))
    };

    let results: Vec<(usize, MatchResult)> = if let Some(jobs_n) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs_n)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| jobs.par_iter().map(run_one).collect())
    } else {
        jobs.par_iter().map(run_one).collect()
    };

    let mut pairings: Vec<Pairing> = pairs
        .iter()
        .map(|&(a, b)| Pairing {
            a,
            b,
            tally: Tally::default(),
        })
        .collect();
    let mut per_archetype: BTreeMap<Archetype, Tally> = archetypes
        .iter()
        .map(|&a| (a, Tally::default()))
        .collect();

    for (p, result) in &results {
        pairings[*p].tally.record(result.outcome, true);
        per_archetype
            .entry(result.a)
            .or_default()
            .record(result.outcome, true);
        per_archetype
            .entry(result.b)
            .or_default()
            .record(result.outcome, false);
    }

    for pairing in &pairings {
        let t = pairing.tally;
        log::info!("{} vs {}: {}-{}-{}", pairing.a, pairing.b, t.wins, t.losses, t.draws);
    }

    let mut ranked: Vec<(Archetype, Tally)> = per_archetype.into_iter().collect();
    // Stable sort keeps catalog order among equal scores
    ranked.sort_by_key(|(_, t)| std::cmp::Reverse(t.score()));
    let rankings = ranked
        .into_iter()
        .enumerate()
        .map(|(i, (archetype, tally))| Ranking {
            rank: i + 1,
            archetype,
            tally,
            score: tally.score(),
        })
        .collect();

    Ok(TournamentReport {
        matches_per_pairing: config.matches,
        base_seed: config.base_seed,
        pairings,
        rankings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_arena() -> ArenaConfig {
        ArenaConfig {
            max_ticks: 300,
            ..ArenaConfig::default()
        }
    }

    #[test]
    fn test_setup_positions() {
        let config = ArenaConfig::default();
        let battle = setup_match(Archetype::Dagger, Archetype::Sword, 1, &config);
        let bodies = battle.bodies();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].pos, DVec2::new(50.0, 200.0));
        assert_eq!(bodies[1].pos, DVec2::new(350.0, 200.0));
        assert_eq!(bodies[0].team, TEAM_ONE);
        assert_eq!(bodies[1].team, TEAM_TWO);
        assert!((bodies[1].weapons[0].theta.abs() - PI).abs() < 1e-12);
        assert!((bodies[0].vel.length() - SPAWN_SPEED).abs() < 1e-9);
    }

    #[test]
    fn test_match_is_deterministic() {
        let config = short_arena();
        let a = run_match(Archetype::Hammer, Archetype::Lance, 42, &config);
        let b = run_match(Archetype::Hammer, Archetype::Lance, 42, &config);
        assert_eq!(a.outcome, b.outcome);
        assert_eq!(a.ticks, b.ticks);
        assert!(a.ticks <= config.max_ticks);
    }

    #[test]
    fn test_timeout_is_draw() {
        let config = ArenaConfig {
            max_ticks: 1,
            ..ArenaConfig::default()
        };
        let result = run_match(Archetype::Duplicator, Archetype::Duplicator, 7, &config);
        assert_eq!(result.outcome, Outcome::Draw);
        assert_eq!(result.ticks, 1);
    }

    #[test]
    fn test_tally_record() {
        let mut t = Tally::default();
        t.record(Outcome::Team1, true);
        t.record(Outcome::Team1, false);
        t.record(Outcome::Draw, false);
        assert_eq!((t.wins, t.losses, t.draws), (1, 1, 1));
        assert_eq!(t.score(), 0);
    }

    #[test]
    fn test_match_seeds_distinct() {
        assert_ne!(match_seed(0, 0, 1), match_seed(0, 1, 0));
        assert_eq!(match_seed(5, 0, 0), 5);
    }

    #[test]
    fn test_tournament_tallies_balance() {
        let config = TournamentConfig {
            archetypes: vec![Archetype::Dagger, Archetype::Sword, Archetype::Hammer],
            matches: 2,
            base_seed: 9,
            jobs: Some(2),
            arena: short_arena(),
        };
        let report = run_tournament(&config).unwrap();
        assert_eq!(report.pairings.len(), 3);
        assert_eq!(report.rankings.len(), 3);

        let wins: u32 = report.rankings.iter().map(|r| r.tally.wins).sum();
        let losses: u32 = report.rankings.iter().map(|r| r.tally.losses).sum();
        assert_eq!(wins, losses);
        for r in &report.rankings {
            let t = r.tally;
            assert_eq!(t.wins + t.losses + t.draws, 4);
        }
        assert!(report.rankings.windows(2).all(|w| w[0].score >= w[1].score));

        // Same seeds, same report
        let again = run_tournament(&config).unwrap();
        assert_eq!(
            serde_json::to_string(&report.rankings).unwrap(),
            serde_json::to_string(&again.rankings).unwrap()
        );
    }

    #[test]
    fn test_tournament_ignores_repeated_archetypes() {
        let config = TournamentConfig {
            archetypes: vec![Archetype::Dagger, Archetype::Sword, Archetype::Dagger],
            matches: 1,
            base_seed: 3,
            jobs: Some(1),
            arena: short_arena(),
        };
        let report = run_tournament(&config).unwrap();
        assert_eq!(report.pairings.len(), 1);
        assert_eq!((report.pairings[0].a, report.pairings[0].b), (Archetype::Dagger, Archetype::Sword));
        assert_eq!(report.rankings.len(), 2);
        for r in &report.rankings {
            let t = r.tally;
            assert_eq!(t.wins + t.losses + t.draws, 1);
        }

        let twice = TournamentConfig {
            archetypes: vec![Archetype::Dagger, Archetype::Dagger],
            ..config
        };
        assert!(run_tournament(&twice).is_err());
    }

    #[test]
    fn test_tournament_rejects_single_archetype() {
        let config = TournamentConfig {
            archetypes: vec![Archetype::Dagger],
            ..TournamentConfig::default()
        };
        assert!(run_tournament(&config).is_err());
    }
}
