//! Train/test partitioning of the user population.
//!
//! `Ordered` keeps the population order and cuts at the training fraction,
//! which inherits any bias in how users were enumerated. `Shuffled` permutes
//! the population with a seeded stream first and is the default.

use crate::{
    error::{RiskError, RiskResult},
    rng::{StreamRng, StreamSlot},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SplitStrategy {
    Ordered,
    Shuffled { seed: u64 },
}

impl Default for SplitStrategy {
    fn default() -> Self {
        SplitStrategy::Shuffled { seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSplit<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// Number of training members for a population of `n`: floor(fraction × n).
pub fn train_count(n: usize, train_fraction: f64) -> usize {
    ((train_fraction * n as f64).floor() as usize).min(n)
}

impl SplitStrategy {
    pub fn partition<T>(&self, population: Vec<T>, train_fraction: f64) -> RiskResult<UserSplit<T>> {
        self.partition_on(population, train_fraction, StreamSlot::Split)
    }

    /// Like `partition`, shuffling from `slot`'s stream so nested splits
    /// of one run do not reuse the same permutation.
    pub fn partition_on<T>(
        &self,
        mut population: Vec<T>,
        train_fraction: f64,
        slot: StreamSlot,
    ) -> RiskResult<UserSplit<T>> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(RiskError::InvalidConfig {
                reason: format!("train fraction {train_fraction} must be in (0, 1)"),
            });
        }

        let n = population.len();
        let cut = train_count(n, train_fraction);
        if n - cut == 0 {
            return Err(RiskError::DegenerateSplit { population: n, train: cut, test: 0 });
        }

        if let SplitStrategy::Shuffled { seed } = self {
            StreamRng::for_slot(*seed, slot).shuffle(&mut population);
        }

        let test = population.split_off(cut);
        Ok(UserSplit { train: population, test })
    }
}
