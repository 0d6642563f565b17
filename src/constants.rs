/// Share of free-throw attempts that end a possession (possession estimator)
pub const FT_TRIP_FACTOR: f64 = 0.44;

/// Share of shooting fouls that are and-ones (made basket plus one free throw)
pub const AND_ONE_SHARE: f64 = 0.03;

/// Upper bound on any opponent-adjusted field goal percentage
pub const MAKE_PCT_CAP: f64 = 0.95;

/// Weight of a three-point make in effective field goal percentage
pub const EFG_THREE_WEIGHT: f64 = 1.5;

/// Pythagorean exponent backtested on the 2025 season
pub const DEFAULT_PYTHAG_EXPONENT: f64 = 4.386;

/// Default blend weight of the Pythagorean estimator
pub const DEFAULT_PYTHAG_WEIGHT: f64 = 0.10;

/// Default blend weight of the BARTHAG estimator
pub const DEFAULT_BARTHAG_WEIGHT: f64 = 0.0;

/// Simulated games per matchup
pub const DEFAULT_NUM_SIMULATIONS: usize = 500;

/// Maximum state transitions walked in a single possession
pub const MAX_STEPS_PER_POSSESSION: usize = 15;
