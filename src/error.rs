use thiserror::Error;

/// Malformed, missing or degenerate input data.
///
/// Never retried: the caller skips the team or substitutes a default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("{team}: missing field {field}")]
    MissingField { team: String, field: String },

    #[error("{team}: field {field} is not numeric ({value:?})")]
    InvalidField {
        team: String,
        field: String,
        value: String,
    },

    #[error("{team}: field {field} must be finite and non-negative, got {value}")]
    OutOfRange {
        team: String,
        field: String,
        value: f64,
    },

    #[error("{team}: estimated possessions is zero")]
    ZeroPossessions { team: String },

    #[error("{team}: estimated opponent possessions is zero")]
    ZeroOpponentPossessions { team: String },

    #[error("{team}: total event rate is zero")]
    ZeroEventRate { team: String },

    #[error("raw stats for {raw} paired with ratings for {ratings}")]
    TeamMismatch { raw: String, ratings: String },

    #[error("no valid teams to average")]
    EmptyLeague,

    #[error("{team}: probability {name} is not finite ({value})")]
    InvalidProbability {
        team: String,
        name: &'static str,
        value: f64,
    },

    #[error("no profile for team {0}")]
    UnknownTeam(String),
}

/// Neither team in a pairing has usable data, so no winner can be simulated.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("neither {team_a} nor {team_b} has usable data")]
pub struct DegenerateMatchupError {
    pub team_a: String,
    pub team_b: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pythagorean exponent must be finite and positive, got {0}")]
    InvalidExponent(f64),

    #[error("blend weight {name} must lie in [0, 1], got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("blend weights sum to {0}, more than 1")]
    WeightsExceedOne(f64),

    #[error("num_simulations must be at least 1")]
    ZeroSimulations,

    #[error("max_steps_per_possession must be at least 1")]
    ZeroStepCap,

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BracketError {
    #[error("bracket has no pairings")]
    Empty,

    #[error("bracket has {0} teams, expected a power of two")]
    NotPowerOfTwo(usize),
}
