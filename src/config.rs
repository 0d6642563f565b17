use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::{
    DEFAULT_BARTHAG_WEIGHT, DEFAULT_NUM_SIMULATIONS, DEFAULT_PYTHAG_EXPONENT,
    DEFAULT_PYTHAG_WEIGHT, MAX_STEPS_PER_POSSESSION,
};
use crate::error::ConfigError;

/// Weights of the two closed-form estimators in the final win probability.
///
/// The simulated (empirical) estimator receives whatever weight is left.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendWeights {
    pub pythag: f64,
    pub barthag: f64,
}

impl Default for BlendWeights {
    fn default() -> Self {
        BlendWeights {
            pythag: DEFAULT_PYTHAG_WEIGHT,
            barthag: DEFAULT_BARTHAG_WEIGHT,
        }
    }
}

impl BlendWeights {
    pub fn new(pythag: f64, barthag: f64) -> Result<Self, ConfigError> {
        let weights = BlendWeights { pythag, barthag };
        weights.validate()?;
        Ok(weights)
    }

    /// Weight left over for the simulated win probability.
    pub fn empirical(&self) -> f64 {
        1.0 - self.pythag - self.barthag
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("pythag", self.pythag), ("barthag", self.barthag)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        let total = self.pythag + self.barthag;
        if total > 1.0 + 1e-12 {
            return Err(ConfigError::WeightsExceedOne(total));
        }
        Ok(())
    }

    /// Blend the three estimators into one probability.
    pub fn blend(&self, empirical: f64, pythag: f64, barthag: f64) -> f64 {
        empirical * self.empirical() + pythag * self.pythag + barthag * self.barthag
    }
}

/// How a team's rates are compared against the opponent's allowed rates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentModel {
    /// `log5(team_rate, 1 - opponent_allowed_rate)` for every rate.
    #[default]
    Prevention,
    /// Prevention, then re-centred on the league rate where one exists
    /// (turnover, offensive rebound, eFG).
    LeagueAnchored,
}

/// Winner picked when neither team in a pairing has usable data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    #[default]
    SecondListed,
    FirstListed,
    Alphabetical,
}

impl DegeneratePolicy {
    pub fn pick<'a>(&self, team_a: &'a str, team_b: &'a str) -> &'a str {
        match self {
            DegeneratePolicy::SecondListed => team_b,
            DegeneratePolicy::FirstListed => team_a,
            DegeneratePolicy::Alphabetical => team_a.min(team_b),
        }
    }
}

/// Tunables for matchup and tournament simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub pythag_exponent: f64,
    pub weights: BlendWeights,
    pub num_simulations: usize,
    pub max_steps_per_possession: usize,
    pub opponent_model: OpponentModel,
    pub degenerate_policy: DegeneratePolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            pythag_exponent: DEFAULT_PYTHAG_EXPONENT,
            weights: BlendWeights::default(),
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            max_steps_per_possession: MAX_STEPS_PER_POSSESSION,
            opponent_model: OpponentModel::default(),
            degenerate_policy: DegeneratePolicy::default(),
        }
    }
}

impl SimulationConfig {
    /// Parse a JSON config. Omitted fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pythag_exponent.is_finite() || self.pythag_exponent <= 0.0 {
            return Err(ConfigError::InvalidExponent(self.pythag_exponent));
        }
        self.weights.validate()?;
        if self.num_simulations == 0 {
            return Err(ConfigError::ZeroSimulations);
        }
        if self.max_steps_per_possession == 0 {
            return Err(ConfigError::ZeroStepCap);
        }
        Ok(())
    }

    pub fn with_weights(mut self, weights: BlendWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_num_simulations(mut self, num_simulations: usize) -> Self {
        self.num_simulations = num_simulations;
        self
    }
}
