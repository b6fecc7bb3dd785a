//! Calibration distributions: deterministic, re-seedable sequences of data models.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::model::DataModel;

/// Number of models a distribution yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelCount {
    /// Exactly this many models.
    Finite(usize),
    /// An endless stream of models; progress cannot be estimated.
    Unbounded,
}

impl ModelCount {
    /// The finite count, if any.
    #[must_use]
    pub fn finite(self) -> Option<usize> {
        match self {
            Self::Finite(n) => Some(n),
            Self::Unbounded => None,
        }
    }
}

impl From<usize> for ModelCount {
    fn from(n: usize) -> Self {
        Self::Finite(n)
    }
}

/// Anything iterable, sized, immutably configured and serializable can act
/// as a calibration distribution.
///
/// Iterating twice must yield the same number of behaviourally equivalent
/// models in the same order; the enumerator and the result codec rely on it.
pub trait CalibrationDistribution: Serialize + Send + Sync {
    /// Data model type yielded by this distribution.
    type Model: DataModel;

    /// Iterate over the data models, in a reproducible order.
    fn models(&self) -> impl Iterator<Item = Self::Model> + '_;

    /// Number of models yielded by `models`.
    fn size(&self) -> ModelCount;
}

/// Draws one data model from the distribution's parameters.
pub trait ModelFactory: Serialize + Send + Sync {
    /// Data model type built by this factory.
    type Model: DataModel;

    /// Draw the model at position `index`. `rng` is the distribution's
    /// stream, already advanced past all earlier models.
    fn draw(&self, rng: &mut ChaCha8Rng, index: usize) -> Self::Model;
}

/// Reference distribution: a seeded stream of models drawn by a factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeededDistribution<F> {
    /// Number of data models.
    pub n: ModelCount,
    /// Seed of the stream models are drawn from.
    pub seed: u64,
    /// Calibration parameters.
    pub factory: F,
}

impl<F: ModelFactory> SeededDistribution<F> {
    /// Create a distribution yielding `n` models.
    #[must_use]
    pub fn new(n: ModelCount, seed: u64, factory: F) -> Self {
        Self {
            n,
            seed,
            factory,
        }
    }

    /// Return a copy which yields `n` models instead.
    #[must_use]
    pub fn generate(&self, n: ModelCount) -> Self
    where
        F: Clone,
    {
        Self {
            n,
            ..self.clone()
        }
    }
}

impl<F: ModelFactory> CalibrationDistribution for SeededDistribution<F> {
    type Model = F::Model;

    fn models(&self) -> impl Iterator<Item = Self::Model> + '_ {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let limit = self.n.finite().unwrap_or(usize::MAX);
        (0..limit).map(move |index| self.factory.draw(&mut rng, index))
    }

    fn size(&self) -> ModelCount {
        self.n
    }
}
