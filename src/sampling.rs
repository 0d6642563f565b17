use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Draws an index from a fixed categorical distribution.
#[derive(Clone, Debug)]
pub struct Categorical {
    index: WeightedIndex<f64>,
}

impl Categorical {
    /// Build from non-negative weights; `None` if no weight is positive or
    /// any weight is negative or not finite.
    pub fn new(weights: &[f64]) -> Option<Self> {
        WeightedIndex::new(weights)
            .ok()
            .map(|index| Categorical { index })
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        self.index.sample(rng)
    }
}
