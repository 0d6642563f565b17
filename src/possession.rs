use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chain::{PossessionState, TransitionMatrix, STATE_COUNT};

/// Points for both sides of one simulated game and how often each state
/// was entered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub points_a: u32,
    pub points_b: u32,
    visits: [u64; STATE_COUNT],
}

impl GameResult {
    pub fn visits(&self, state: PossessionState) -> u64 {
        self.visits[state.index()]
    }

    /// Visit counts keyed by state name.
    pub fn histogram(&self) -> BTreeMap<&'static str, u64> {
        PossessionState::ALL
            .into_iter()
            .map(|state| (state.name(), self.visits(state)))
            .collect()
    }

    /// Team A's points minus team B's.
    pub fn differential(&self) -> i64 {
        i64::from(self.points_a) - i64::from(self.points_b)
    }
}

/// Walk one possession from `Start`, returning the points scored.
///
/// Stops at `End` or after `max_steps` transitions; an unfinished walk is
/// still recorded as ending.
pub fn simulate_possession<R: Rng>(
    matrix: &TransitionMatrix,
    max_steps: usize,
    visits: &mut [u64; STATE_COUNT],
    rng: &mut R,
) -> u32 {
    let mut state = PossessionState::Start;
    let mut points = state.points();
    visits[state.index()] += 1;

    let mut steps = 0;
    while state != PossessionState::End && steps < max_steps {
        state = matrix.next_state(state, rng);
        points += state.points();
        visits[state.index()] += 1;
        steps += 1;
    }

    if state != PossessionState::End {
        visits[PossessionState::End.index()] += 1;
    }
    points
}

/// Simulate a game of `possessions` possessions per side, alternating the
/// ball between team A and team B starting with A.
pub fn simulate_game<R: Rng>(
    team_a: &TransitionMatrix,
    team_b: &TransitionMatrix,
    possessions: f64,
    max_steps: usize,
    rng: &mut R,
) -> GameResult {
    let half_possessions = (possessions.max(0.0) * 2.0).floor() as usize;
    let mut visits = [0u64; STATE_COUNT];
    let mut points = [0u32; 2];

    for half in 0..half_possessions {
        let side = half % 2;
        let matrix = if side == 0 { team_a } else { team_b };
        points[side] += simulate_possession(matrix, max_steps, &mut visits, rng);
    }

    GameResult {
        points_a: points[0],
        points_b: points[1],
        visits,
    }
}
