use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::adjust::log5;
use crate::error::{ConfigError, DataError};
use crate::league::LeagueBaseline;
use crate::team::{TeamProfile, TeamRatings};

/// Pythagorean expectation: `for^k / (for^k + against^k)`.
///
/// Returns 0.5 when both sides are zero.
pub fn pythagorean_expectation(pts_for: f64, pts_against: f64, exponent: f64) -> f64 {
    let scored = pts_for.powf(exponent);
    let allowed = pts_against.powf(exponent);
    let total = scored + allowed;
    if total == 0.0 {
        return 0.5;
    }
    scored / total
}

/// Expected points per 100 possessions for `team` against `opponent`.
pub fn expected_efficiency(
    team: &TeamProfile,
    opponent: &TeamProfile,
    league: &LeagueBaseline,
) -> f64 {
    team.adjoe * opponent.adjde / league.ppg
}

/// Probability of `team1` beating `team2` from adjusted efficiencies.
pub fn pythagorean_win_prob(
    team1: &TeamProfile,
    team2: &TeamProfile,
    league: &LeagueBaseline,
    exponent: f64,
) -> f64 {
    let team1_expected = expected_efficiency(team1, team2, league);
    let team2_expected = expected_efficiency(team2, team1, league);
    pythagorean_expectation(team1_expected, team2_expected, exponent)
}

/// Probability of `team1` beating `team2` from BARTHAG power ratings.
pub fn barthag_win_prob(team1: &TeamProfile, team2: &TeamProfile) -> f64 {
    log5(team1.barthag, team2.barthag)
}

/// `P(diff > 0)` for a normally distributed score differential.
///
/// A zero spread collapses to the sign of the mean.
pub fn normal_win_prob(mean_diff: f64, stddev: f64) -> f64 {
    match Normal::new(mean_diff, stddev) {
        Ok(normal) if stddev > 0.0 => 1.0 - normal.cdf(0.0),
        _ if mean_diff > 0.0 => 1.0,
        _ if mean_diff < 0.0 => 0.0,
        _ => 0.5,
    }
}

/// Evenly spaced candidate exponents, inclusive of both ends.
///
/// Deserialization goes through [`ExponentGrid::new`], so a decoded grid is
/// always valid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridBounds")]
pub struct ExponentGrid {
    start: f64,
    end: f64,
    step: f64,
}

#[derive(Deserialize)]
struct GridBounds {
    start: f64,
    end: f64,
    step: f64,
}

impl TryFrom<GridBounds> for ExponentGrid {
    type Error = ConfigError;

    fn try_from(bounds: GridBounds) -> Result<Self, Self::Error> {
        ExponentGrid::new(bounds.start, bounds.end, bounds.step)
    }
}

impl Default for ExponentGrid {
    fn default() -> Self {
        ExponentGrid {
            start: 0.001,
            end: 20.0,
            step: 0.001,
        }
    }
}

impl ExponentGrid {
    pub fn new(start: f64, end: f64, step: f64) -> Result<Self, ConfigError> {
        if !start.is_finite() || start <= 0.0 {
            return Err(ConfigError::InvalidExponent(start));
        }
        if !end.is_finite() || end < start {
            return Err(ConfigError::InvalidExponent(end));
        }
        if !step.is_finite() || step <= 0.0 {
            return Err(ConfigError::InvalidExponent(step));
        }
        Ok(ExponentGrid { start, end, step })
    }

    pub fn len(&self) -> usize {
        ((self.end - self.start) / self.step + 1e-6).floor() as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, i: usize) -> f64 {
        self.start + i as f64 * self.step
    }
}

/// Best exponent found by [`fit_pythagorean_exponent`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExponentFit {
    pub exponent: f64,
    pub mean_abs_error: f64,
    pub teams: usize,
}

/// Find the exponent whose Pythagorean expectation best matches actual
/// season win percentages (mean absolute error).
///
/// Season points are `ADJOE * 100 / ADJ_T` and `ADJDE * 100 / ADJ_T`. Teams
/// without games and wins, or with zero tempo, are skipped.
pub fn fit_pythagorean_exponent(
    ratings: &[TeamRatings],
    grid: &ExponentGrid,
) -> Result<ExponentFit, DataError> {
    let teams: Vec<(f64, f64, f64)> = ratings
        .iter()
        .filter_map(|team| {
            let actual = team.win_pct()?;
            if !(team.adj_t > 0.0) {
                return None;
            }
            let pts_for = team.adjoe * 100.0 / team.adj_t;
            let pts_against = team.adjde * 100.0 / team.adj_t;
            Some((pts_for, pts_against, actual))
        })
        .collect();

    if teams.is_empty() {
        return Err(DataError::EmptyLeague);
    }

    let n = teams.len() as f64;
    let (exponent, mean_abs_error) = (0..grid.len())
        .into_par_iter()
        .map(|i| {
            let exponent = grid.get(i);
            let total_error: f64 = teams
                .iter()
                .map(|&(pts_for, pts_against, actual)| {
                    (pythagorean_expectation(pts_for, pts_against, exponent) - actual).abs()
                })
                .sum();
            (exponent, total_error / n)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((grid.get(0), f64::INFINITY));

    Ok(ExponentFit {
        exponent,
        mean_abs_error,
        teams: teams.len(),
    })
}
