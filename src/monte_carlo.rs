use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

use crate::config::SimulationConfig;
use crate::error::BracketError;
use crate::league::LeagueBaseline;
use crate::team::TeamPool;
use crate::tournament::{
    play_bracket, run_tournament, validate_bracket, BracketGame, BracketState, Decision,
};

/// Win counts per unordered pairing, accumulated over many tournaments.
///
/// Pairings are stored with the names sorted so `(a, b)` and `(b, a)` share
/// one entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchupWinTally {
    counts: HashMap<(String, String), [u64; 2]>,
}

impl MatchupWinTally {
    pub fn new() -> Self {
        MatchupWinTally::default()
    }

    /// Count one win for `winner` in the pairing of `team_a` and `team_b`.
    /// A winner outside the pairing is ignored.
    pub fn record(&mut self, team_a: &str, team_b: &str, winner: &str) {
        self.add(team_a, team_b, winner, 1);
    }

    pub fn add(&mut self, team_a: &str, team_b: &str, winner: &str, count: u64) {
        let (key, slot) = match slot_of(team_a, team_b, winner) {
            Some(found) => found,
            None => return,
        };
        self.counts.entry(key).or_insert([0, 0])[slot] += count;
    }

    /// Count every game of a bracket run.
    pub fn record_bracket(&mut self, state: &BracketState) {
        for game in state.all_games() {
            self.record(&game.team_a, &game.team_b, &game.winner);
        }
    }

    pub fn wins(&self, team_a: &str, team_b: &str, team: &str) -> u64 {
        match slot_of(team_a, team_b, team) {
            Some((key, slot)) => self.counts.get(&key).map_or(0, |c| c[slot]),
            None => 0,
        }
    }

    pub fn games(&self, team_a: &str, team_b: &str) -> u64 {
        self.counts
            .get(&pair_key(team_a, team_b))
            .map_or(0, |c| c[0] + c[1])
    }

    /// Fraction of the pairing's games won by `team`; `None` if never played.
    pub fn win_share(&self, team_a: &str, team_b: &str, team: &str) -> Option<f64> {
        let games = self.games(team_a, team_b);
        if games == 0 {
            return None;
        }
        Some(self.wins(team_a, team_b, team) as f64 / games as f64)
    }

    /// The team with more wins in the pairing. Ties and unobserved
    /// pairings go to `team_a`.
    pub fn majority<'a>(&self, team_a: &'a str, team_b: &'a str) -> &'a str {
        if self.wins(team_a, team_b, team_b) > self.wins(team_a, team_b, team_a) {
            team_b
        } else {
            team_a
        }
    }

    pub fn merge(&mut self, other: MatchupWinTally) {
        for (key, counts) in other.counts {
            let entry = self.counts.entry(key).or_insert([0, 0]);
            entry[0] += counts[0];
            entry[1] += counts[1];
        }
    }

    /// Every observed pairing, names in sorted order.
    pub fn pairings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.counts.keys().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

fn pair_key(team_a: &str, team_b: &str) -> (String, String) {
    if team_a <= team_b {
        (team_a.to_string(), team_b.to_string())
    } else {
        (team_b.to_string(), team_a.to_string())
    }
}

fn slot_of(team_a: &str, team_b: &str, team: &str) -> Option<((String, String), usize)> {
    let key = pair_key(team_a, team_b);
    let slot = if team == key.0 {
        0
    } else if team == key.1 {
        1
    } else {
        return None;
    };
    Some((key, slot))
}

/// Run `trials` independent tournaments in parallel and tally every
/// pairing's winners.
pub fn run_monte_carlo<R: Rng>(
    bracket: &[(String, String)],
    pool: &TeamPool,
    league: &LeagueBaseline,
    config: &SimulationConfig,
    trials: usize,
    rng: &mut R,
) -> Result<MatchupWinTally, BracketError> {
    validate_bracket(bracket)?;
    info!(trials, teams = bracket.len() * 2, "starting monte carlo run");

    let seeds: Vec<u64> = (0..trials).map(|_| rng.gen()).collect();
    let tally = seeds
        .par_iter()
        .map(|&seed| -> Result<MatchupWinTally, BracketError> {
            let mut trial_rng = ChaCha8Rng::seed_from_u64(seed);
            let state = run_tournament(bracket, pool, league, config, &mut trial_rng)?;
            let mut tally = MatchupWinTally::new();
            tally.record_bracket(&state);
            Ok(tally)
        })
        .try_reduce(MatchupWinTally::new, |mut acc, tally| {
            acc.merge(tally);
            Ok(acc)
        })?;

    info!(trials, pairings = tally.len(), "monte carlo run complete");
    Ok(tally)
}

/// Replay the bracket picking each pairing's majority winner from `tally`.
pub fn most_probable_bracket(
    bracket: &[(String, String)],
    tally: &MatchupWinTally,
) -> Result<BracketState, BracketError> {
    let state = play_bracket(bracket, |pairings| {
        pairings
            .iter()
            .map(|(team_a, team_b)| BracketGame {
                team_a: team_a.clone(),
                team_b: team_b.clone(),
                winner: tally.majority(team_a, team_b).to_string(),
                win_prob: tally.win_share(team_a, team_b, team_a),
                decision: Decision::Majority,
            })
            .collect()
    })?;

    info!(champion = state.champion().unwrap_or_default(), "most probable bracket");
    Ok(state)
}
