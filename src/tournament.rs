use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SimulationConfig;
use crate::error::{BracketError, DataError, DegenerateMatchupError};
use crate::league::LeagueBaseline;
use crate::matchup::{simulate_prepared, PreparedSide};
use crate::monte_carlo::{self, MatchupWinTally};
use crate::team::TeamPool;

/// How a bracket game's winner was decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Both sides simulated.
    Simulated,
    /// One side had unusable data; the other advances.
    Walkover,
    /// Neither side had usable data; the configured policy picked.
    Policy,
    /// Picked by majority vote over a Monte Carlo tally.
    Majority,
}

/// One game of a bracket run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BracketGame {
    pub team_a: String,
    pub team_b: String,
    pub winner: String,
    /// Probability that team A wins, when one was computed
    pub win_prob: Option<f64>,
    pub decision: Decision,
}

impl BracketGame {
    fn walkover(team_a: &str, team_b: &str, winner: &str) -> Self {
        BracketGame {
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            winner: winner.to_string(),
            win_prob: None,
            decision: Decision::Walkover,
        }
    }
}

/// A bracket run: the entrants, then every round's games and winners.
///
/// `rounds[i]` holds the winners of `games[i]`, in bracket order. The last
/// round of a finished bracket has exactly one winner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BracketState {
    pub entrants: Vec<String>,
    pub rounds: Vec<Vec<String>>,
    pub games: Vec<Vec<BracketGame>>,
}

impl BracketState {
    pub fn champion(&self) -> Option<&str> {
        match self.rounds.last() {
            Some(winners) if winners.len() == 1 => Some(&winners[0]),
            _ => None,
        }
    }

    pub fn num_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// All games in play order.
    pub fn all_games(&self) -> impl Iterator<Item = &BracketGame> {
        self.games.iter().flatten()
    }
}

/// Check that `bracket` halves cleanly down to one winner.
pub(crate) fn validate_bracket(bracket: &[(String, String)]) -> Result<(), BracketError> {
    if bracket.is_empty() {
        return Err(BracketError::Empty);
    }
    let teams = bracket.len() * 2;
    if !teams.is_power_of_two() {
        return Err(BracketError::NotPowerOfTwo(teams));
    }
    Ok(())
}

/// Advance a bracket round by round, letting `play_round` decide each
/// round's games. Winners are re-paired positionally (0 with 1, 2 with 3).
pub(crate) fn play_bracket<F>(
    bracket: &[(String, String)],
    mut play_round: F,
) -> Result<BracketState, BracketError>
where
    F: FnMut(&[(String, String)]) -> Vec<BracketGame>,
{
    validate_bracket(bracket)?;

    let mut state = BracketState {
        entrants: bracket
            .iter()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect(),
        ..BracketState::default()
    };

    let mut pairings = bracket.to_vec();
    loop {
        let games = play_round(&pairings);
        let winners: Vec<String> = games.iter().map(|game| game.winner.clone()).collect();
        debug!(
            round = state.rounds.len() + 1,
            games = games.len(),
            "bracket round complete"
        );
        state.games.push(games);
        state.rounds.push(winners.clone());

        if winners.len() <= 1 {
            break;
        }
        pairings = winners
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
    }

    Ok(state)
}

/// Decide one pairing.
///
/// If exactly one side has unusable data the other advances as a walkover
/// and the fallback is logged. If neither side is usable, or the matchup
/// yields no valid win probability, the pairing is degenerate and the
/// caller applies a policy.
pub fn resolve_pairing<R: Rng>(
    team_a: &str,
    team_b: &str,
    pool: &TeamPool,
    league: &LeagueBaseline,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<BracketGame, DegenerateMatchupError> {
    let (profile_a, profile_b) = match (pool.get(team_a), pool.get(team_b)) {
        (Ok(a), Ok(b)) => (a, b),
        (Ok(_), Err(err)) => return Ok(walkover(team_a, team_b, team_a, &err)),
        (Err(err), Ok(_)) => return Ok(walkover(team_a, team_b, team_b, &err)),
        (Err(err_a), Err(err_b)) => return Err(degenerate(team_a, team_b, &err_a, &err_b)),
    };

    let model = config.opponent_model;
    let side_a = PreparedSide::new(profile_a, profile_b, league, model);
    let side_b = PreparedSide::new(profile_b, profile_a, league, model);
    match (side_a, side_b) {
        (Ok(side_a), Ok(side_b)) => {
            let outcome = simulate_prepared(
                profile_a, profile_b, &side_a, &side_b, league, config, rng,
            )
            .map_err(|err| unresolvable(team_a, team_b, &err))?;
            Ok(BracketGame {
                team_a: team_a.to_string(),
                team_b: team_b.to_string(),
                winner: outcome.winner,
                win_prob: Some(outcome.win_prob),
                decision: Decision::Simulated,
            })
        }
        (Ok(_), Err(err)) => Ok(walkover(team_a, team_b, team_a, &err)),
        (Err(err), Ok(_)) => Ok(walkover(team_a, team_b, team_b, &err)),
        (Err(err_a), Err(err_b)) => Err(degenerate(team_a, team_b, &err_a, &err_b)),
    }
}

fn walkover(team_a: &str, team_b: &str, winner: &str, err: &DataError) -> BracketGame {
    let loser = if winner == team_a { team_b } else { team_a };
    warn!(
        winner,
        loser,
        error = %err,
        "advancing team by default, opponent data unusable"
    );
    BracketGame::walkover(team_a, team_b, winner)
}

fn degenerate(
    team_a: &str,
    team_b: &str,
    err_a: &DataError,
    err_b: &DataError,
) -> DegenerateMatchupError {
    warn!(
        team_a,
        team_b,
        error_a = %err_a,
        error_b = %err_b,
        "no usable data for either team"
    );
    DegenerateMatchupError {
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
    }
}

fn unresolvable(team_a: &str, team_b: &str, err: &DataError) -> DegenerateMatchupError {
    warn!(
        team_a,
        team_b,
        error = %err,
        "matchup produced no valid win probability"
    );
    DegenerateMatchupError {
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
    }
}

fn resolve_or_apply_policy<R: Rng>(
    team_a: &str,
    team_b: &str,
    pool: &TeamPool,
    league: &LeagueBaseline,
    config: &SimulationConfig,
    rng: &mut R,
) -> BracketGame {
    match resolve_pairing(team_a, team_b, pool, league, config, rng) {
        Ok(game) => game,
        Err(err) => {
            let winner = config.degenerate_policy.pick(team_a, team_b);
            warn!(
                error = %err,
                winner,
                policy = ?config.degenerate_policy,
                "degenerate matchup resolved by policy"
            );
            BracketGame {
                team_a: team_a.to_string(),
                team_b: team_b.to_string(),
                winner: winner.to_string(),
                win_prob: None,
                decision: Decision::Policy,
            }
        }
    }
}

/// Play a single-elimination bracket from its first-round pairings.
///
/// Matchups within a round run in parallel, each on its own generator
/// seeded from `rng`, so a fixed seed reproduces the whole bracket. Team
/// data failures never abort the run; see [`resolve_pairing`].
pub fn run_tournament<R: Rng>(
    bracket: &[(String, String)],
    pool: &TeamPool,
    league: &LeagueBaseline,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<BracketState, BracketError> {
    play_bracket(bracket, |pairings| {
        let seeds: Vec<u64> = pairings.iter().map(|_| rng.gen()).collect();
        pairings
            .par_iter()
            .zip(seeds.par_iter())
            .map(|((team_a, team_b), &seed)| {
                let mut matchup_rng = ChaCha8Rng::seed_from_u64(seed);
                resolve_or_apply_policy(team_a, team_b, pool, league, config, &mut matchup_rng)
            })
            .collect()
    })
}

/// A bracket together with everything needed to simulate it.
#[derive(Clone, Debug)]
pub struct TournamentState {
    pub bracket: Vec<(String, String)>,
    pub pool: TeamPool,
    pub league: LeagueBaseline,
    pub config: SimulationConfig,
}

impl TournamentState {
    pub fn new(
        bracket: Vec<(String, String)>,
        pool: TeamPool,
        league: LeagueBaseline,
        config: SimulationConfig,
    ) -> Self {
        TournamentState {
            bracket,
            pool,
            league,
            config,
        }
    }

    /// Simulate the tournament once. `None` seeds from entropy.
    pub fn simulate(&self, seed: Option<u64>) -> Result<BracketState, BracketError> {
        let mut rng = seeded_rng(seed);
        run_tournament(&self.bracket, &self.pool, &self.league, &self.config, &mut rng)
    }

    /// Run `trials` independent tournaments and tally every pairing.
    pub fn run_simulations(
        &self,
        trials: usize,
        seed: Option<u64>,
    ) -> Result<MatchupWinTally, BracketError> {
        let mut rng = seeded_rng(seed);
        monte_carlo::run_monte_carlo(
            &self.bracket,
            &self.pool,
            &self.league,
            &self.config,
            trials,
            &mut rng,
        )
    }

    pub fn most_probable_bracket(
        &self,
        tally: &MatchupWinTally,
    ) -> Result<BracketState, BracketError> {
        monte_carlo::most_probable_bracket(&self.bracket, tally)
    }

    /// Every entrant in bracket order, without duplicates.
    pub fn bracket_teams(&self) -> Vec<String> {
        let mut teams: Vec<String> = Vec::with_capacity(self.bracket.len() * 2);
        for (team_a, team_b) in &self.bracket {
            for team in [team_a, team_b] {
                if !teams.contains(team) {
                    teams.push(team.clone());
                }
            }
        }
        teams
    }
}

fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}
