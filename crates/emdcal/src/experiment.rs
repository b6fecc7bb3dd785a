//! Built-in Gaussian experiment and its JSON configuration.
//!
//! Data models are Gaussians whose mean is drawn around zero. The two
//! candidates are fixed Gaussians scored by their negative log-likelihood.

use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use emdcal_core::{
    CValue, CalibrationError, CandidatePair, DataModel, EmpiricalPpf, ModelCount, ModelFactory,
    QuantilePathSampler, Result, SeededDistribution,
};
use emdcal_orchestration::CalibrationTask;

/// A Gaussian observation model with its own data seed.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianModel {
    pub mean: f64,
    pub sd: f64,
    pub seed: u64,
}

impl DataModel for GaussianModel {
    type Dataset = Vec<f64>;

    fn generate(&self, size: usize) -> Result<Vec<f64>> {
        let normal = Normal::new(self.mean, self.sd)
            .map_err(|e| CalibrationError::DataModel(format!("invalid Gaussian: {e}")))?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ size as u64);
        Ok(normal.sample_iter(&mut rng).take(size).collect())
    }
}

/// Draws Gaussian data models with means uniform in `[-mean_spread, mean_spread]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianFactory {
    pub mean_spread: f64,
    pub sd: f64,
}

impl ModelFactory for GaussianFactory {
    type Model = GaussianModel;

    fn draw(&self, rng: &mut ChaCha8Rng, _index: usize) -> GaussianModel {
        let mean = if self.mean_spread > 0.0 {
            rng.gen_range(-self.mean_spread..=self.mean_spread)
        } else {
            0.0
        };
        GaussianModel {
            mean,
            sd: self.sd,
            seed: rng.gen(),
        }
    }
}

/// A candidate model: a fixed Gaussian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub mean: f64,
    pub sd: f64,
}

impl Candidate {
    /// Negative log-likelihood of each observation.
    pub fn risk(self) -> impl Fn(&Vec<f64>) -> Vec<f64> + Send + Sync + 'static {
        let norm = 0.5 * (2.0 * PI * self.sd * self.sd).ln();
        let scale = 1.0 / (2.0 * self.sd * self.sd);
        move |data: &Vec<f64>| {
            data.iter()
                .map(|x| norm + scale * (x - self.mean).powi(2))
                .collect::<Vec<f64>>()
        }
    }

    /// Quantile function of this candidate's risk under its own data.
    pub fn synthetic_ppf(self, samples: usize, seed: u64) -> Result<EmpiricalPpf> {
        let own = GaussianModel {
            mean: self.mean,
            sd: self.sd,
            seed,
        };
        let data = own.generate(samples)?;
        EmpiricalPpf::new(self.risk()(&data))
    }
}

/// Experiment file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of data models; `null` streams models without end.
    pub n_models: Option<usize>,
    pub seed: u64,
    pub c_list: Vec<f64>,
    /// Dataset size for `Bemd`.
    pub ldata: usize,
    /// Dataset size for `Bconf`.
    pub linf: usize,
    pub data: GaussianFactory,
    pub candidate_a: Candidate,
    pub candidate_b: Candidate,
    /// Samples used to build each synthetic PPF.
    pub synth_samples: usize,
    pub r_samples: usize,
    pub path_resolution: usize,
    pub sampler_seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        let sampler = QuantilePathSampler::default();
        Self {
            n_models: Some(12),
            seed: 0,
            c_list: vec![0.1, 0.5, 1.0, 2.0],
            ldata: 512,
            linf: 16_384,
            data: GaussianFactory {
                mean_spread: 1.0,
                sd: 1.0,
            },
            candidate_a: Candidate { mean: 0.0, sd: 1.0 },
            candidate_b: Candidate { mean: 0.5, sd: 1.0 },
            synth_samples: 4096,
            r_samples: sampler.n_samples,
            path_resolution: sampler.resolution,
            sampler_seed: sampler.seed,
        }
    }
}

impl ExperimentConfig {
    /// Load an experiment file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CalibrationError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            CalibrationError::Config(format!("invalid experiment file {}: {e}", path.display()))
        })
    }

    /// Check values a run cannot recover from.
    pub fn validate(&self) -> Result<()> {
        if self.c_list.is_empty() {
            return Err(CalibrationError::Config("c_list must not be empty".into()));
        }
        if self.synth_samples == 0 || self.r_samples == 0 {
            return Err(CalibrationError::Config(
                "synth_samples and r_samples must be positive".into(),
            ));
        }
        for (name, sd) in [
            ("data", self.data.sd),
            ("candidate_a", self.candidate_a.sd),
            ("candidate_b", self.candidate_b.sd),
        ] {
            if !(sd.is_finite() && sd > 0.0) {
                return Err(CalibrationError::Config(format!(
                    "{name}.sd must be positive, got {sd}"
                )));
            }
        }
        if !(self.data.mean_spread.is_finite() && self.data.mean_spread >= 0.0) {
            return Err(CalibrationError::Config(
                "data.mean_spread must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }

    /// Build the calibration task described by this file.
    pub fn build_task(&self) -> Result<CalibrationTask<SeededDistribution<GaussianFactory>>> {
        self.validate()?;
        let n = self.n_models.map_or(ModelCount::Unbounded, ModelCount::Finite);
        let synth_a = self.candidate_a.synthetic_ppf(self.synth_samples, self.seed ^ 0xA)?;
        let synth_b = self.candidate_b.synthetic_ppf(self.synth_samples, self.seed ^ 0xB)?;
        let task = CalibrationTask {
            c_list: self.c_list.iter().copied().map(CValue).collect(),
            data_models: SeededDistribution::new(n, self.seed, self.data.clone()),
            candidates: CandidatePair {
                risk_a: Arc::new(self.candidate_a.risk()),
                risk_b: Arc::new(self.candidate_b.risk()),
                synth_ppf_a: Arc::new(synth_a),
                synth_ppf_b: Arc::new(synth_b),
            },
            sampler: Arc::new(QuantilePathSampler {
                n_samples: self.r_samples,
                resolution: self.path_resolution,
                seed: self.sampler_seed,
            }),
            ldata: self.ldata,
            linf: self.linf,
        };
        task.validate()?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use emdcal_core::{CalibrationDistribution, QuantileFunction};

    use super::*;

    #[test]
    fn gaussian_model_is_reproducible() {
        let model = GaussianModel {
            mean: 1.0,
            sd: 2.0,
            seed: 9,
        };
        assert_eq!(model.generate(50).unwrap(), model.generate(50).unwrap());
        let data = model.generate(20_000).unwrap();
        let mean = data.iter().sum::<f64>() / data.len() as f64;
        assert!((mean - 1.0).abs() < 0.1);
    }

    #[test]
    fn invalid_gaussian_is_a_data_model_error() {
        let model = GaussianModel {
            mean: 0.0,
            sd: f64::NAN,
            seed: 0,
        };
        assert!(matches!(
            model.generate(3),
            Err(CalibrationError::DataModel(_))
        ));
    }

    #[test]
    fn risk_is_lowest_at_candidate_mean() {
        let risk = Candidate { mean: 0.5, sd: 1.0 }.risk();
        let values = risk(&vec![0.5, 1.5, -0.5]);
        assert!(values[0] < values[1]);
        assert!((values[1] - values[2]).abs() < 1e-12);
        assert!((values[0] - 0.5 * (2.0 * PI).ln()).abs() < 1e-12);
    }

    #[test]
    fn synthetic_ppf_is_monotone() {
        let ppf = Candidate { mean: 0.0, sd: 1.0 }.synthetic_ppf(500, 1).unwrap();
        assert!(ppf.ppf(0.1) <= ppf.ppf(0.5));
        assert!(ppf.ppf(0.5) <= ppf.ppf(0.9));
    }

    #[test]
    fn defaults_build_a_task() {
        let config = ExperimentConfig::default();
        let task = config.build_task().unwrap();
        assert_eq!(task.c_list.len(), 4);
        assert_eq!(task.data_models.size(), ModelCount::Finite(12));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"n_models": 3, "c_list": [0.5]}"#).unwrap();
        assert_eq!(config.n_models, Some(3));
        assert_eq!(config.ldata, ExperimentConfig::default().ldata);
    }

    #[test]
    fn null_model_count_is_unbounded() {
        let config: ExperimentConfig = serde_json::from_str(r#"{"n_models": null}"#).unwrap();
        let task = config.build_task().unwrap();
        assert_eq!(task.data_models.size(), ModelCount::Unbounded);
    }

    #[test]
    fn validation_errors() {
        let config = ExperimentConfig {
            c_list: vec![],
            ..ExperimentConfig::default()
        };
        assert!(matches!(config.validate(), Err(CalibrationError::Config(_))));

        let mut config = ExperimentConfig::default();
        config.candidate_b.sd = 0.0;
        assert!(matches!(config.validate(), Err(CalibrationError::Config(_))));

        let config = ExperimentConfig {
            ldata: 0,
            ..ExperimentConfig::default()
        };
        assert!(matches!(config.build_task(), Err(CalibrationError::Config(_))));

        let config = ExperimentConfig {
            c_list: vec![0.5, 1.0, 0.5],
            ..ExperimentConfig::default()
        };
        assert!(matches!(config.build_task(), Err(CalibrationError::Config(_))));
    }

    #[test]
    fn load_reports_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exp.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            ExperimentConfig::load(&path),
            Err(CalibrationError::Config(_))
        ));
        assert!(matches!(
            ExperimentConfig::load(&dir.path().join("missing.json")),
            Err(CalibrationError::Config(_))
        ));
    }
}
