#[cfg(feature = "python")]
use pyo3::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adjust::{adjust_for_opponent, AdjustedProbabilities};
use crate::chain::TransitionMatrix;
use crate::config::{OpponentModel, SimulationConfig};
use crate::error::DataError;
use crate::league::LeagueBaseline;
use crate::possession::{simulate_game, GameResult};
use crate::team::TeamProfile;
use crate::win_prob::{barthag_win_prob, normal_win_prob, pythagorean_win_prob};

/// One team's model for a specific opponent, built once and shared by every
/// simulated game of the matchup.
#[derive(Clone, Debug)]
pub struct PreparedSide {
    pub probabilities: AdjustedProbabilities,
    pub matrix: TransitionMatrix,
}

impl PreparedSide {
    pub fn new(
        team: &TeamProfile,
        opponent: &TeamProfile,
        league: &LeagueBaseline,
        model: OpponentModel,
    ) -> Result<Self, DataError> {
        let probabilities = adjust_for_opponent(team, opponent, league, model);
        let matrix = TransitionMatrix::build(&team.name, &probabilities)?;
        Ok(PreparedSide {
            probabilities,
            matrix,
        })
    }
}

/// Result of simulating one matchup. Probabilities are for team A.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchupOutcome {
    pub team_a: String,
    pub team_b: String,
    pub winner: String,

    /// Blend of the empirical, Pythagorean and BARTHAG estimates
    pub win_prob: f64,
    pub empirical_win_prob: f64,
    pub pythag_win_prob: f64,
    pub barthag_win_prob: f64,
    /// Normal approximation of the simulated differential (not blended)
    pub normal_win_prob: f64,

    pub mean_score_a: f64,
    pub mean_score_b: f64,
    pub std_score_a: f64,
    pub std_score_b: f64,
    /// Mean of team A's score minus team B's
    pub spread: f64,
    /// Predicted combined score
    pub total: f64,

    pub games: usize,
    pub possessions: f64,
}

impl MatchupOutcome {
    pub fn loser(&self) -> &str {
        if self.winner == self.team_a {
            &self.team_b
        } else {
            &self.team_a
        }
    }

    /// Blended probability that the predicted winner wins.
    pub fn winner_prob(&self) -> f64 {
        if self.winner == self.team_a {
            self.win_prob
        } else {
            1.0 - self.win_prob
        }
    }
}

/// Possessions per side in a game between the two teams (mean tempo).
pub fn game_possessions(team_a: &TeamProfile, team_b: &TeamProfile) -> f64 {
    (team_a.poss_per_g + team_b.poss_per_g) / 2.0
}

/// Simulate `config.num_simulations` games between two teams and blend the
/// result with the closed-form estimators.
///
/// Team A wins iff the blended probability exceeds 0.5.
pub fn simulate_matchup<R: Rng>(
    team_a: &TeamProfile,
    team_b: &TeamProfile,
    league: &LeagueBaseline,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<MatchupOutcome, DataError> {
    let side_a = PreparedSide::new(team_a, team_b, league, config.opponent_model)?;
    let side_b = PreparedSide::new(team_b, team_a, league, config.opponent_model)?;
    simulate_prepared(team_a, team_b, &side_a, &side_b, league, config, rng)
}

/// Same as [`simulate_matchup`] for sides that are already prepared.
///
/// Each game runs on its own generator seeded from `rng`, so the outcome
/// depends only on `rng`'s state and not on thread scheduling. With zero
/// games the empirical estimate is 0.5. A blended probability that is not
/// finite (e.g. from a league baseline with zero scoring) is a
/// [`DataError::InvalidProbability`] naming team A.
pub fn simulate_prepared<R: Rng>(
    team_a: &TeamProfile,
    team_b: &TeamProfile,
    side_a: &PreparedSide,
    side_b: &PreparedSide,
    league: &LeagueBaseline,
    config: &SimulationConfig,
    rng: &mut R,
) -> Result<MatchupOutcome, DataError> {
    let possessions = game_possessions(team_a, team_b);
    let seeds: Vec<u64> = (0..config.num_simulations).map(|_| rng.gen()).collect();

    let results: Vec<GameResult> = seeds
        .par_iter()
        .map(|&seed| {
            let mut game_rng = ChaCha8Rng::seed_from_u64(seed);
            simulate_game(
                &side_a.matrix,
                &side_b.matrix,
                possessions,
                config.max_steps_per_possession,
                &mut game_rng,
            )
        })
        .collect();

    let scores_a = Moments::of(results.iter().map(|r| f64::from(r.points_a)));
    let scores_b = Moments::of(results.iter().map(|r| f64::from(r.points_b)));
    let spread = Moments::of(results.iter().map(|r| r.differential() as f64));

    let empirical_win_prob = if results.is_empty() {
        0.5
    } else {
        let wins = results.iter().filter(|r| r.points_a > r.points_b).count();
        wins as f64 / results.len() as f64
    };
    let pythag_win_prob = pythagorean_win_prob(team_a, team_b, league, config.pythag_exponent);
    let barthag_win_prob = barthag_win_prob(team_a, team_b);
    let win_prob = config
        .weights
        .blend(empirical_win_prob, pythag_win_prob, barthag_win_prob);
    if !win_prob.is_finite() {
        return Err(DataError::InvalidProbability {
            team: team_a.name.clone(),
            name: "win_prob",
            value: win_prob,
        });
    }

    let diff_stddev = (scores_a.stddev.powi(2) + scores_b.stddev.powi(2)).sqrt();
    let normal_win_prob = normal_win_prob(spread.mean, diff_stddev);

    let winner = if win_prob > 0.5 { team_a } else { team_b };

    debug!(
        team_a = %team_a.name,
        team_b = %team_b.name,
        winner = %winner.name,
        win_prob,
        empirical_win_prob,
        pythag_win_prob,
        barthag_win_prob,
        mean_score_a = scores_a.mean,
        mean_score_b = scores_b.mean,
        "matchup simulated"
    );

    Ok(MatchupOutcome {
        team_a: team_a.name.clone(),
        team_b: team_b.name.clone(),
        winner: winner.name.clone(),
        win_prob,
        empirical_win_prob,
        pythag_win_prob,
        barthag_win_prob,
        normal_win_prob,
        mean_score_a: scores_a.mean,
        mean_score_b: scores_b.mean,
        std_score_a: scores_a.stddev,
        std_score_b: scores_b.stddev,
        spread: spread.mean,
        total: scores_a.mean + scores_b.mean,
        games: results.len(),
        possessions,
    })
}

/// Mean and population standard deviation.
struct Moments {
    mean: f64,
    stddev: f64,
}

impl Moments {
    fn of<I: Iterator<Item = f64> + Clone>(values: I) -> Self {
        let n = values.clone().count();
        if n == 0 {
            return Moments {
                mean: 0.0,
                stddev: 0.0,
            };
        }
        let n = n as f64;
        let mean = values.clone().sum::<f64>() / n;
        let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Moments {
            mean,
            stddev: variance.sqrt(),
        }
    }
}
