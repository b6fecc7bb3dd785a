//! Data models, risk functions, quantile functions and experiment keys.
//!
//! A calibration experiment pairs a data-generating model (the "true"
//! world) with two candidate models, each represented by a risk function
//! and a synthetic PPF of its risk.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A seeded random data generator producing `size` i.i.d. observations.
///
/// Models are cloned into workers, so they must not hold live handles.
/// `generate` may be called concurrently on clones of the same model.
pub trait DataModel: Clone + Send + Sync + 'static {
    /// Dataset produced by this model.
    type Dataset: Send + 'static;

    /// Generate a dataset with `size` observations.
    fn generate(&self, size: usize) -> Result<Self::Dataset>;
}

/// Maps a dataset to one risk value per observation.
pub trait RiskFunction<D>: Send + Sync {
    /// Evaluate the per-sample risk of `data`.
    fn evaluate(&self, data: &D) -> Result<Vec<f64>>;
}

impl<D, F> RiskFunction<D> for F
where
    F: Fn(&D) -> Vec<f64> + Send + Sync,
{
    fn evaluate(&self, data: &D) -> Result<Vec<f64>> {
        Ok(self(data))
    }
}

/// A monotone quantile function (inverse CDF) over risk values.
pub trait QuantileFunction: Send + Sync {
    /// Risk value at quantile `q` in `[0, 1]`.
    fn ppf(&self, q: f64) -> f64;
}

impl<F> QuantileFunction for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn ppf(&self, q: f64) -> f64 {
        self(q)
    }
}

/// Position of a data model in its distribution's enumeration order.
///
/// Enumeration is deterministic, so the position identifies the model
/// across repeated iterations of the same distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelIndex(pub usize);

impl fmt::Display for ModelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A sensitivity parameter `c`, compared and hashed bitwise so it can key
/// result maps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CValue(pub f64);

impl CValue {
    /// The wrapped value.
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for CValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for CValue {}

impl Hash for CValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl From<f64> for CValue {
    fn from(c: f64) -> Self {
        Self(c)
    }
}

impl fmt::Display for CValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Risk functions and synthetic PPFs of the two candidate models.
pub struct CandidatePair<D> {
    pub risk_a: Arc<dyn RiskFunction<D>>,
    pub risk_b: Arc<dyn RiskFunction<D>>,
    pub synth_ppf_a: Arc<dyn QuantileFunction>,
    pub synth_ppf_b: Arc<dyn QuantileFunction>,
}

impl<D> Clone for CandidatePair<D> {
    fn clone(&self) -> Self {
        Self {
            risk_a: Arc::clone(&self.risk_a),
            risk_b: Arc::clone(&self.risk_b),
            synth_ppf_a: Arc::clone(&self.synth_ppf_a),
            synth_ppf_b: Arc::clone(&self.synth_ppf_b),
        }
    }
}

/// One point of a calibration curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Estimated probability that candidate A has lower risk than B.
    pub bemd: f64,
    /// Ground-truth preference for A, from a quasi-infinite dataset.
    pub bconf: bool,
}
