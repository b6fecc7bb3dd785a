//! Expected-risk sampling primitives.
//!
//! The estimators only depend on [`EmdSampler`]; [`QuantilePathSampler`] is
//! a reference implementation so that experiments can run without an
//! external numerical backend.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::constants::{
    CLIPPED_PATH_WARN_FRACTION, DEFAULT_PATH_RESOLUTION, DEFAULT_R_SAMPLES, DEFAULT_SAMPLER_SEED,
};
use crate::diagnostics::SAMPLING;
use crate::error::{CalibrationError, Result};
use crate::model::QuantileFunction;

/// Numerical primitives consumed by `compute_bemd`.
pub trait EmdSampler: Send + Sync {
    /// Build the empirical quantile function of observed risk values.
    fn make_empirical_risk_ppf(&self, risks: Vec<f64>) -> Result<Box<dyn QuantileFunction>> {
        Ok(Box::new(EmpiricalPpf::new(risks)?))
    }

    /// Draw expected-risk samples for one candidate model.
    ///
    /// `c` scales how far sampled quantile paths may stray from the mixed
    /// PPF, in units of its discrepancy with the synthetic PPF.
    fn draw_r_samples(
        &self,
        mixed_ppf: &dyn QuantileFunction,
        synth_ppf: &dyn QuantileFunction,
        c: f64,
    ) -> Result<Vec<f64>>;
}

/// Piecewise-linear quantile function of a finite sample.
#[derive(Debug, Clone)]
pub struct EmpiricalPpf {
    sorted: Vec<f64>,
}

impl EmpiricalPpf {
    /// Build from unsorted samples. Samples must be finite and non-empty.
    pub fn new(mut samples: Vec<f64>) -> Result<Self> {
        if samples.is_empty() {
            return Err(CalibrationError::Sampling(
                "cannot build an empirical PPF from zero samples".into(),
            ));
        }
        if samples.iter().any(|x| !x.is_finite()) {
            return Err(CalibrationError::Sampling(
                "risk samples must be finite".into(),
            ));
        }
        samples.sort_by(f64::total_cmp);
        Ok(Self { sorted: samples })
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Always false: construction rejects empty samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

impl QuantileFunction for EmpiricalPpf {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn ppf(&self, q: f64) -> f64 {
        let last = self.sorted.len() - 1;
        if last == 0 {
            return self.sorted[0];
        }
        let pos = q.clamp(0.0, 1.0) * last as f64;
        let lo = (pos.floor() as usize).min(last);
        let hi = (lo + 1).min(last);
        let frac = pos - lo as f64;
        self.sorted[lo] + frac * (self.sorted[hi] - self.sorted[lo])
    }
}

/// Reference sampler drawing perturbed quantile paths.
///
/// Each path follows the mixed PPF plus a Brownian bridge whose amplitude at
/// quantile `Φ` is `c · |mixed(Φ) − synth(Φ)|`. Paths are made monotone by
/// clipping, then integrated over `Φ` to give one expected-risk sample.
#[derive(Debug, Clone)]
pub struct QuantilePathSampler {
    /// Number of R samples per call.
    pub n_samples: usize,
    /// Number of grid points along `Φ`.
    pub resolution: usize,
    /// Base seed; mixed with `c` and the PPF so calls are reproducible.
    pub seed: u64,
}

impl Default for QuantilePathSampler {
    fn default() -> Self {
        Self {
            n_samples: DEFAULT_R_SAMPLES,
            resolution: DEFAULT_PATH_RESOLUTION,
            seed: DEFAULT_SAMPLER_SEED,
        }
    }
}

impl QuantilePathSampler {
    /// Create a sampler with the default settings and the given seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Seed for one `(mixed, synth, c)` stream. Both medians take part so
    /// that candidates sharing a mixed PPF still draw independent paths.
    fn stream_seed(&self, c: f64, mixed_median: f64, synth_median: f64) -> u64 {
        self.seed
            ^ c.to_bits()
            ^ mixed_median.to_bits().rotate_left(17)
            ^ synth_median.to_bits().rotate_left(41)
    }
}

impl EmdSampler for QuantilePathSampler {
    #[allow(clippy::cast_precision_loss)]
    fn draw_r_samples(
        &self,
        mixed_ppf: &dyn QuantileFunction,
        synth_ppf: &dyn QuantileFunction,
        c: f64,
    ) -> Result<Vec<f64>> {
        if !c.is_finite() || c < 0.0 {
            return Err(CalibrationError::Sampling(format!(
                "c must be finite and non-negative, got {c}"
            )));
        }
        if self.resolution < 2 {
            return Err(CalibrationError::Config(
                "path resolution must be at least 2".into(),
            ));
        }

        let steps = self.resolution - 1;
        let dphi = 1.0 / steps as f64;
        let grid: Vec<f64> = (0..self.resolution).map(|k| k as f64 * dphi).collect();
        let center: Vec<f64> = grid.iter().map(|&phi| mixed_ppf.ppf(phi)).collect();
        let spread: Vec<f64> = grid
            .iter()
            .zip(&center)
            .map(|(&phi, &m)| c * (m - synth_ppf.ppf(phi)).abs())
            .collect();
        if center.iter().chain(&spread).any(|x| !x.is_finite()) {
            return Err(CalibrationError::Sampling(
                "quantile functions returned non-finite values".into(),
            ));
        }

        let median = grid[steps / 2];
        let mut rng = ChaCha8Rng::seed_from_u64(self.stream_seed(
            c,
            center[steps / 2],
            synth_ppf.ppf(median),
        ));
        let sqrt_dphi = dphi.sqrt();
        let mut walk = vec![0.0; self.resolution];
        let mut path = vec![0.0; self.resolution];
        let mut clipped = 0usize;
        let mut samples = Vec::with_capacity(self.n_samples);

        for _ in 0..self.n_samples {
            for k in 1..self.resolution {
                let z: f64 = rng.sample(StandardNormal);
                walk[k] = walk[k - 1] + z * sqrt_dphi;
            }
            let end = walk[steps];
            let mut was_clipped = false;
            for k in 0..self.resolution {
                let bridge = walk[k] - grid[k] * end;
                let value = center[k] + spread[k] * bridge;
                path[k] = if k > 0 && value < path[k - 1] {
                    was_clipped = true;
                    path[k - 1]
                } else {
                    value
                };
            }
            if was_clipped {
                clipped += 1;
            }
            let integral: f64 = path.windows(2).map(|w| 0.5 * (w[0] + w[1]) * dphi).sum();
            samples.push(integral);
        }

        if self.n_samples > 0 {
            let fraction = clipped as f64 / self.n_samples as f64;
            if fraction > CLIPPED_PATH_WARN_FRACTION {
                SAMPLING.warn(&format!(
                    "{clipped} of {} sampled paths were non-monotone and were clipped (c = {c}); \
                     the expected-risk estimate may be biased",
                    self.n_samples
                ));
            }
        }

        Ok(samples)
    }
}
