//! Possession outcome state machine and its per-team transition matrix.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::adjust::AdjustedProbabilities;
use crate::error::DataError;
use crate::sampling::Categorical;

pub const STATE_COUNT: usize = 16;

/// A state a possession can pass through. Entering a state awards
/// [`PossessionState::points`] to the team with the ball.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PossessionState {
    Start,
    Make2,
    Make3,
    MissedShot,
    Turnover,
    OffensiveRebound,
    ShootingFoul2,
    ShootingFoul3,
    Ft1Of2,
    Ft2Of2,
    Ft1Of3,
    Ft2Of3,
    Ft3Of3,
    AndOne,
    AndOneFt,
    End,
}

impl PossessionState {
    /// All states in matrix order.
    pub const ALL: [PossessionState; STATE_COUNT] = [
        PossessionState::Start,
        PossessionState::Make2,
        PossessionState::Make3,
        PossessionState::MissedShot,
        PossessionState::Turnover,
        PossessionState::OffensiveRebound,
        PossessionState::ShootingFoul2,
        PossessionState::ShootingFoul3,
        PossessionState::Ft1Of2,
        PossessionState::Ft2Of2,
        PossessionState::Ft1Of3,
        PossessionState::Ft2Of3,
        PossessionState::Ft3Of3,
        PossessionState::AndOne,
        PossessionState::AndOneFt,
        PossessionState::End,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            PossessionState::Start => "Start",
            PossessionState::Make2 => "Make 2",
            PossessionState::Make3 => "Make 3",
            PossessionState::MissedShot => "Missed Shot",
            PossessionState::Turnover => "Turnover",
            PossessionState::OffensiveRebound => "Offensive Rebound",
            PossessionState::ShootingFoul2 => "Shooting Foul 2-Shots",
            PossessionState::ShootingFoul3 => "Shooting Foul 3-Shots",
            PossessionState::Ft1Of2 => "FT 1-of-2",
            PossessionState::Ft2Of2 => "FT 2-of-2",
            PossessionState::Ft1Of3 => "FT 1-of-3",
            PossessionState::Ft2Of3 => "FT 2-of-3",
            PossessionState::Ft3Of3 => "FT 3-of-3",
            PossessionState::AndOne => "Make 2 + Foul (And-One)",
            PossessionState::AndOneFt => "And-One FT",
            PossessionState::End => "End",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.name() == name)
    }

    /// Points awarded on entering this state.
    ///
    /// `AndOne` is the made basket of an and-one and always scores 2, even
    /// when the foul came on a three point attempt; the bonus free throw is
    /// scored separately by `AndOneFt`.
    pub fn points(self) -> u32 {
        match self {
            PossessionState::Make2 | PossessionState::AndOne => 2,
            PossessionState::Make3 => 3,
            PossessionState::Ft2Of2
            | PossessionState::Ft2Of3
            | PossessionState::Ft3Of3
            | PossessionState::AndOneFt => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for PossessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Row-stochastic transition table over [`PossessionState::ALL`].
///
/// Immutable once built; `End` is absorbing.
#[derive(Clone, Debug)]
pub struct TransitionMatrix {
    rows: [[f64; STATE_COUNT]; STATE_COUNT],
    samplers: Vec<Categorical>,
}

impl TransitionMatrix {
    /// Build the matrix for `team` from its opponent-adjusted probabilities.
    pub fn build(team: &str, probs: &AdjustedProbabilities) -> Result<Self, DataError> {
        for (name, value) in probs.fields() {
            if !value.is_finite() {
                return Err(DataError::InvalidProbability {
                    team: team.to_string(),
                    name,
                    value,
                });
            }
        }

        use PossessionState::*;

        let p = |value: f64| value.max(0.0);
        let make_2 = p(probs.p_make_2).min(1.0);
        let make_3 = p(probs.p_make_3).min(1.0);
        let ft_make = p(probs.p_ft_make).min(1.0);
        let orb = p(probs.p_offensive_rebound).min(1.0);
        // A missed final free throw can be rebounded like a missed shot
        let ft_rebound = (1.0 - ft_make) * orb;

        let mut rows = [[0.0; STATE_COUNT]; STATE_COUNT];
        let mut set = |from: PossessionState, to: PossessionState, value: f64| {
            rows[from.index()][to.index()] += value;
        };

        set(Start, Make2, p(probs.p_fga_2) * make_2);
        set(Start, MissedShot, p(probs.p_fga_2) * (1.0 - make_2));
        set(Start, Make3, p(probs.p_fga_3) * make_3);
        set(Start, MissedShot, p(probs.p_fga_3) * (1.0 - make_3));
        set(Start, Turnover, p(probs.p_turnover));
        set(Start, ShootingFoul2, p(probs.p_foul_on_2));
        set(Start, ShootingFoul3, p(probs.p_foul_on_3));
        set(Start, AndOne, p(probs.p_and_one));

        set(Make2, End, 1.0);
        set(Make3, End, 1.0);
        set(Turnover, End, 1.0);

        set(MissedShot, OffensiveRebound, orb);
        set(MissedShot, End, 1.0 - orb);
        set(OffensiveRebound, Start, 1.0);

        set(ShootingFoul2, Ft1Of2, 1.0);
        set(Ft1Of2, Ft2Of2, 1.0);
        set(ShootingFoul3, Ft1Of3, 1.0);
        set(Ft1Of3, Ft2Of3, 1.0);
        set(Ft2Of3, Ft3Of3, 1.0);
        set(AndOne, AndOneFt, 1.0);
        for last_free_throw in [Ft2Of2, Ft3Of3, AndOneFt] {
            set(last_free_throw, OffensiveRebound, ft_rebound);
            set(last_free_throw, End, 1.0 - ft_rebound);
        }

        set(End, End, 1.0);

        for row in rows.iter_mut() {
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|value| *value /= total);
            } else {
                *row = [0.0; STATE_COUNT];
                row[End.index()] = 1.0;
            }
        }

        let samplers = rows
            .iter()
            .map(|row| Categorical::new(row))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| DataError::InvalidProbability {
                team: team.to_string(),
                name: "transition row",
                value: f64::NAN,
            })?;

        Ok(TransitionMatrix { rows, samplers })
    }

    pub fn probability(&self, from: PossessionState, to: PossessionState) -> f64 {
        self.rows[from.index()][to.index()]
    }

    pub fn row(&self, from: PossessionState) -> &[f64; STATE_COUNT] {
        &self.rows[from.index()]
    }

    /// Sample the state that follows `from`.
    pub fn next_state<R: Rng>(&self, from: PossessionState, rng: &mut R) -> PossessionState {
        PossessionState::ALL[self.samplers[from.index()].sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjust::adjust_for_opponent;
    use crate::config::OpponentModel;
    use crate::test_support::{graded_profile, league, profile};
    use proptest::prelude::*;

    fn sample_probs() -> AdjustedProbabilities {
        adjust_for_opponent(
            &profile("florida"),
            &profile("auburn"),
            &league(),
            OpponentModel::Prevention,
        )
    }

    fn assert_row_stochastic(matrix: &TransitionMatrix) {
        for state in PossessionState::ALL {
            let sum: f64 = matrix.row(state).iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{} row sums to {}", state, sum);
        }
    }

    #[test]
    fn test_state_table() {
        assert_eq!(PossessionState::ALL.len(), STATE_COUNT);
        for (i, state) in PossessionState::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
            assert_eq!(PossessionState::from_name(state.name()), Some(*state));
        }
        assert_eq!(PossessionState::Make3.points(), 3);
        assert_eq!(PossessionState::Ft1Of2.points(), 0);
        assert_eq!(PossessionState::Ft2Of2.points(), 1);
        assert_eq!(PossessionState::AndOne.points(), 2);
        assert_eq!(PossessionState::AndOneFt.points(), 1);
        assert_eq!(PossessionState::from_name("Dunk"), None);
    }

    #[test]
    fn test_rows_sum_to_one_and_end_absorbs() {
        let matrix = TransitionMatrix::build("florida", &sample_probs()).unwrap();
        assert_row_stochastic(&matrix);
        assert_eq!(
            matrix.probability(PossessionState::End, PossessionState::End),
            1.0
        );
    }

    #[test]
    fn test_start_row_matches_probabilities() {
        let probs = sample_probs();
        let matrix = TransitionMatrix::build("florida", &probs).unwrap();

        let start = PossessionState::Start;
        let expected_make_2 = probs.p_fga_2 * probs.p_make_2;
        assert!((matrix.probability(start, PossessionState::Make2) - expected_make_2).abs() < 1e-12);
        let expected_miss =
            probs.p_fga_2 * (1.0 - probs.p_make_2) + probs.p_fga_3 * (1.0 - probs.p_make_3);
        assert!(
            (matrix.probability(start, PossessionState::MissedShot) - expected_miss).abs() < 1e-12
        );
        assert!(
            (matrix.probability(start, PossessionState::Turnover) - probs.p_turnover).abs() < 1e-12
        );
        assert_eq!(
            matrix.probability(PossessionState::OffensiveRebound, start),
            1.0
        );
        assert_eq!(
            matrix.probability(PossessionState::Turnover, PossessionState::End),
            1.0
        );
    }

    #[test]
    fn test_free_throw_chain() {
        let probs = sample_probs();
        let matrix = TransitionMatrix::build("florida", &probs).unwrap();

        assert_eq!(
            matrix.probability(PossessionState::ShootingFoul3, PossessionState::Ft1Of3),
            1.0
        );
        assert_eq!(
            matrix.probability(PossessionState::Ft2Of3, PossessionState::Ft3Of3),
            1.0
        );
        let rebound = (1.0 - probs.p_ft_make) * probs.p_offensive_rebound;
        for last in [
            PossessionState::Ft2Of2,
            PossessionState::Ft3Of3,
            PossessionState::AndOneFt,
        ] {
            assert!(
                (matrix.probability(last, PossessionState::OffensiveRebound) - rebound).abs()
                    < 1e-12
            );
            assert!((matrix.probability(last, PossessionState::End) - (1.0 - rebound)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_start_row_goes_to_end() {
        let mut probs = sample_probs();
        probs.p_fga_2 = 0.0;
        probs.p_fga_3 = 0.0;
        probs.p_turnover = 0.0;
        probs.p_foul_on_2 = 0.0;
        probs.p_foul_on_3 = 0.0;
        probs.p_and_one = 0.0;
        let matrix = TransitionMatrix::build("idle", &probs).unwrap();

        assert_eq!(
            matrix.probability(PossessionState::Start, PossessionState::End),
            1.0
        );
        assert_row_stochastic(&matrix);
    }

    #[test]
    fn test_non_finite_probability_rejected() {
        let mut probs = sample_probs();
        probs.p_make_3 = f64::NAN;
        let err = TransitionMatrix::build("broken", &probs).unwrap_err();
        assert!(matches!(
            err,
            DataError::InvalidProbability {
                name: "p_make_3",
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn prop_rows_stochastic(a in 0.0f64..=1.0, b in 0.0f64..=1.0, orb in 0.0f64..=1.0, ft in 0.0f64..=1.0) {
            let mut team = graded_profile("a", a);
            team.orb_pct = orb;
            team.ft_pct = ft;
            let probs = adjust_for_opponent(&team, &graded_profile("b", b), &league(), OpponentModel::Prevention);
            let matrix = TransitionMatrix::build("a", &probs).unwrap();
            for state in PossessionState::ALL {
                let sum: f64 = matrix.row(state).iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-9);
                prop_assert!(matrix.row(state).iter().all(|v| *v >= 0.0));
            }
            prop_assert_eq!(matrix.probability(PossessionState::End, PossessionState::End), 1.0);
        }
    }
}
