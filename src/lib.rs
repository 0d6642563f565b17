//! Bracket Core - possession-chain matchup simulation for NCAA tournaments.
//!
//! Team season totals become opponent-adjusted event probabilities, which
//! drive a per-team possession Markov chain. Simulated games are blended
//! with closed-form estimators to pick winners, and whole brackets are run
//! once or many times to find the most probable outcome.
//!
//! Python bindings are available behind the `python` feature.

#[cfg(feature = "python")]
use pyo3::exceptions::PyValueError;
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use rand::SeedableRng;
#[cfg(feature = "python")]
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "python")]
use std::collections::HashMap;

pub mod adjust;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod league;
pub mod matchup;
pub mod monte_carlo;
pub mod possession;
pub mod sampling;
pub mod team;
pub mod tournament;
pub mod win_prob;

#[cfg(test)]
pub(crate) mod test_support;

pub use adjust::{adjust_for_opponent, log5, AdjustedProbabilities};
pub use chain::{PossessionState, TransitionMatrix};
pub use config::{BlendWeights, DegeneratePolicy, OpponentModel, SimulationConfig};
pub use error::{BracketError, ConfigError, DataError, DegenerateMatchupError};
pub use league::{league_baseline, LeagueBaseline};
pub use matchup::{simulate_matchup, MatchupOutcome};
pub use monte_carlo::{most_probable_bracket, run_monte_carlo, MatchupWinTally};
pub use possession::{simulate_game, GameResult};
pub use team::{prepare, RawTeamStats, StatRecord, TeamPool, TeamProfile, TeamRatings};
pub use tournament::{run_tournament, BracketGame, BracketState, Decision, TournamentState};
pub use win_prob::{
    barthag_win_prob, fit_pythagorean_exponent, pythagorean_expectation, pythagorean_win_prob,
};

#[cfg(feature = "python")]
fn value_error<E: std::fmt::Display>(err: E) -> PyErr {
    PyValueError::new_err(err.to_string())
}

#[cfg(feature = "python")]
fn parse_config(config_json: Option<&str>) -> PyResult<SimulationConfig> {
    match config_json {
        Some(json) => SimulationConfig::from_json(json).map_err(value_error),
        None => Ok(SimulationConfig::default()),
    }
}

#[cfg(feature = "python")]
fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[cfg(feature = "python")]
type PyTally = HashMap<(String, String), HashMap<String, u64>>;

#[cfg(feature = "python")]
fn tally_to_py(tally: &MatchupWinTally) -> PyTally {
    tally
        .pairings()
        .map(|(a, b)| {
            let wins = [a, b]
                .into_iter()
                .map(|team| (team.to_string(), tally.wins(a, b, team)))
                .collect();
            ((a.to_string(), b.to_string()), wins)
        })
        .collect()
}

#[cfg(feature = "python")]
fn tally_from_py(counts: &PyTally) -> MatchupWinTally {
    let mut tally = MatchupWinTally::new();
    for ((a, b), wins) in counts {
        for (team, &count) in wins {
            tally.add(a, b, team, count);
        }
    }
    tally
}

/// Build a team profile from a raw-totals row and a ratings row.
#[cfg(feature = "python")]
#[pyfunction]
fn py_prepare(raw: StatRecord, ratings: StatRecord) -> PyResult<TeamProfile> {
    let raw = RawTeamStats::from_record(&raw).map_err(value_error)?;
    let ratings = TeamRatings::from_record(&ratings).map_err(value_error)?;
    prepare(&raw, &ratings).map_err(value_error)
}

#[cfg(feature = "python")]
#[pyfunction]
fn py_league_baseline(rows: Vec<StatRecord>) -> PyResult<LeagueBaseline> {
    league_baseline(&rows).map_err(value_error)
}

/// Simulate one matchup. `config_json` overrides the default config.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (team_a, team_b, baseline, config_json = None, seed = None))]
fn py_simulate_matchup(
    team_a: &TeamProfile,
    team_b: &TeamProfile,
    baseline: &LeagueBaseline,
    config_json: Option<&str>,
    seed: Option<u64>,
) -> PyResult<MatchupOutcome> {
    let config = parse_config(config_json)?;
    let mut rng = seeded_rng(seed);
    simulate_matchup(team_a, team_b, baseline, &config, &mut rng).map_err(value_error)
}

/// Play the bracket once, returning each round's winners.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (bracket, profiles, baseline, config_json = None, seed = None))]
fn py_run_tournament(
    bracket: Vec<(String, String)>,
    profiles: Vec<TeamProfile>,
    baseline: &LeagueBaseline,
    config_json: Option<&str>,
    seed: Option<u64>,
) -> PyResult<Vec<Vec<String>>> {
    let config = parse_config(config_json)?;
    let pool = TeamPool::from_profiles(profiles);
    let mut rng = seeded_rng(seed);
    run_tournament(&bracket, &pool, baseline, &config, &mut rng)
        .map(|state| state.rounds)
        .map_err(value_error)
}

/// Run many tournaments, returning win counts keyed by pairing.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (bracket, profiles, baseline, trials, config_json = None, seed = None))]
fn py_run_monte_carlo(
    bracket: Vec<(String, String)>,
    profiles: Vec<TeamProfile>,
    baseline: &LeagueBaseline,
    trials: usize,
    config_json: Option<&str>,
    seed: Option<u64>,
) -> PyResult<PyTally> {
    let config = parse_config(config_json)?;
    let pool = TeamPool::from_profiles(profiles);
    let mut rng = seeded_rng(seed);
    run_monte_carlo(&bracket, &pool, baseline, &config, trials, &mut rng)
        .map(|tally| tally_to_py(&tally))
        .map_err(value_error)
}

#[cfg(feature = "python")]
#[pyfunction]
fn py_most_probable_bracket(
    bracket: Vec<(String, String)>,
    tally: PyTally,
) -> PyResult<Vec<Vec<String>>> {
    most_probable_bracket(&bracket, &tally_from_py(&tally))
        .map(|state| state.rounds)
        .map_err(value_error)
}

/// Python module definition
#[cfg(feature = "python")]
#[pymodule]
fn bracket_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Classes
    m.add_class::<TeamProfile>()?;
    m.add_class::<LeagueBaseline>()?;
    m.add_class::<MatchupOutcome>()?;

    // Functions
    m.add_function(wrap_pyfunction!(py_prepare, m)?)?;
    m.add_function(wrap_pyfunction!(py_league_baseline, m)?)?;
    m.add_function(wrap_pyfunction!(py_simulate_matchup, m)?)?;
    m.add_function(wrap_pyfunction!(py_run_tournament, m)?)?;
    m.add_function(wrap_pyfunction!(py_run_monte_carlo, m)?)?;
    m.add_function(wrap_pyfunction!(py_most_probable_bracket, m)?)?;

    // Constants
    m.add("DEFAULT_PYTHAG_EXPONENT", constants::DEFAULT_PYTHAG_EXPONENT)?;
    m.add("DEFAULT_PYTHAG_WEIGHT", constants::DEFAULT_PYTHAG_WEIGHT)?;
    m.add("DEFAULT_BARTHAG_WEIGHT", constants::DEFAULT_BARTHAG_WEIGHT)?;
    m.add("DEFAULT_NUM_SIMULATIONS", constants::DEFAULT_NUM_SIMULATIONS)?;
    m.add("MAX_STEPS_PER_POSSESSION", constants::MAX_STEPS_PER_POSSESSION)?;

    Ok(())
}
