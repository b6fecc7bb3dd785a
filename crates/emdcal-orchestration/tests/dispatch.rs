//! Integration tests for the calibration dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use emdcal_core::{
    CValue, CalibrationError, CandidatePair, DataModel, EmpiricalPpf, ModelCount, ModelFactory,
    ModelIndex, QuantilePathSampler, Result, SeededDistribution,
};
use emdcal_orchestration::{
    CalibrationResults, CalibrationTask, EngineConfig, NullProgressReporter, ProgressReporter,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::Serialize;

#[derive(Debug, Clone)]
struct Gaussian {
    mean: f64,
    seed: u64,
}

impl DataModel for Gaussian {
    type Dataset = Vec<f64>;

    fn generate(&self, size: usize) -> Result<Vec<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ size as u64);
        Ok((0..size)
            .map(|_| self.mean + rng.sample::<f64, _>(StandardNormal))
            .collect())
    }
}

#[derive(Debug, Clone, Serialize)]
struct NearZero {
    spread: f64,
}

impl ModelFactory for NearZero {
    type Model = Gaussian;

    fn draw(&self, rng: &mut ChaCha8Rng, _index: usize) -> Gaussian {
        Gaussian {
            mean: rng.gen_range(-self.spread..=self.spread),
            seed: rng.gen(),
        }
    }
}

/// Fails when asked for data of model 2, by panicking or by returning an
/// error.
#[derive(Debug, Clone)]
struct Fragile {
    index: usize,
    panics: bool,
}

impl DataModel for Fragile {
    type Dataset = Vec<f64>;

    fn generate(&self, size: usize) -> Result<Vec<f64>> {
        if self.index == 2 {
            assert!(!self.panics, "model 2 cannot generate data");
            return Err(CalibrationError::DataModel("model 2 has no data".into()));
        }
        Ok(vec![0.1 * self.index as f64; size])
    }
}

#[derive(Debug, Clone, Serialize)]
struct FragileFactory {
    panics: bool,
}

impl ModelFactory for FragileFactory {
    type Model = Fragile;

    fn draw(&self, _rng: &mut ChaCha8Rng, index: usize) -> Fragile {
        Fragile {
            index,
            panics: self.panics,
        }
    }
}

#[derive(Default)]
struct CountingReporter {
    total: AtomicU64,
    ticks: AtomicU64,
    completed: AtomicU64,
}

impl ProgressReporter for CountingReporter {
    fn start(&self, total: Option<u64>) {
        self.total.store(total.unwrap_or(u64::MAX), Ordering::SeqCst);
    }
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
    fn complete(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

fn squared_error(center: f64) -> impl Fn(&Vec<f64>) -> Vec<f64> + Send + Sync {
    move |data: &Vec<f64>| data.iter().map(|x| (x - center).powi(2)).collect::<Vec<f64>>()
}

/// Synthetic PPF of a candidate's risk, from data the candidate itself
/// would generate.
fn synthetic_ppf(center: f64, seed: u64) -> Arc<EmpiricalPpf> {
    let own = Gaussian { mean: center, seed };
    let data = own.generate(2000).unwrap();
    Arc::new(EmpiricalPpf::new(squared_error(center)(&data)).unwrap())
}

fn candidates<D: 'static>(
    a: impl Fn(&D) -> Vec<f64> + Send + Sync + 'static,
    b: impl Fn(&D) -> Vec<f64> + Send + Sync + 'static,
) -> CandidatePair<D> {
    CandidatePair {
        risk_a: Arc::new(a),
        risk_b: Arc::new(b),
        synth_ppf_a: synthetic_ppf(0.0, 1),
        synth_ppf_b: synthetic_ppf(3.0, 2),
    }
}

fn gaussian_task(n: ModelCount, c_list: &[f64]) -> CalibrationTask<SeededDistribution<NearZero>> {
    CalibrationTask {
        c_list: c_list.iter().copied().map(CValue).collect(),
        data_models: SeededDistribution::new(n, 2024, NearZero { spread: 0.1 }),
        candidates: candidates(squared_error(0.0), squared_error(3.0)),
        sampler: Arc::new(QuantilePathSampler::with_seed(5)),
        ldata: 200,
        linf: 4000,
    }
}

#[test]
fn end_to_end_small_experiment() {
    let task = gaussian_task(ModelCount::Finite(3), &[0.1, 0.5]);
    let output = task
        .run(&EngineConfig::with_max_cores(4), &NullProgressReporter)
        .unwrap();
    assert_eq!(output.bconf, vec![true, true, true]);
    assert_eq!(output.bemd.len(), 6);
    assert!(output.bemd.iter().all(|&b| b > 0.99), "{:?}", output.bemd);

    let curves = task.unpack_curves(&output).unwrap();
    assert_eq!(curves.len(), 2);
    for curve in curves.iter() {
        assert_eq!(curve.points.len(), 3);
        assert!(curve.points.iter().all(|p| p.bconf && p.bemd > 0.99));
    }
}

#[test]
fn sequential_and_parallel_agree() {
    let task = gaussian_task(ModelCount::Finite(5), &[0.2, 1.0, 3.0]);
    let sequential = task
        .run(&EngineConfig::with_max_cores(1), &NullProgressReporter)
        .unwrap();
    let parallel = task
        .run(&EngineConfig::with_max_cores(4), &NullProgressReporter)
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn repeated_runs_are_identical() {
    let task = gaussian_task(ModelCount::Finite(4), &[0.5]);
    let config = EngineConfig::with_max_cores(2);
    let first = task.run(&config, &NullProgressReporter).unwrap();
    let second = task.run(&config, &NullProgressReporter).unwrap();
    assert_eq!(first, second);
}

#[test]
fn results_follow_enumeration_order() {
    let task = gaussian_task(ModelCount::Finite(6), &[0.1, 0.5]);
    let results = task
        .run_with_known(
            CalibrationResults::default(),
            &EngineConfig::with_max_cores(3),
            &NullProgressReporter,
        )
        .unwrap();
    let keys: Vec<(usize, f64)> = results.bemd.keys().map(|(m, c)| (m.0, c.get())).collect();
    let expected: Vec<(usize, f64)> = (0..6)
        .flat_map(|m| [(m, 0.1), (m, 0.5)])
        .collect();
    assert_eq!(keys, expected);
    let models: Vec<usize> = results.bconf.keys().map(|m| m.0).collect();
    assert_eq!(models, (0..6).collect::<Vec<_>>());
}

#[test]
fn resume_only_computes_missing_pairs() {
    let task = gaussian_task(ModelCount::Finite(3), &[0.1, 0.5]);
    let config = EngineConfig::with_max_cores(2);
    let full = task
        .run_with_known(CalibrationResults::default(), &config, &NullProgressReporter)
        .unwrap();

    let mut partial = CalibrationResults::default();
    for (&key, &value) in full.bemd.iter().take(3) {
        partial.bemd.insert(key, value);
    }
    partial.bconf.insert(ModelIndex(0), *full.bconf.get(&ModelIndex(0)).unwrap());
    partial.bconf.insert(ModelIndex(1), *full.bconf.get(&ModelIndex(1)).unwrap());

    let reporter = CountingReporter::default();
    let resumed = task.run_with_known(partial, &config, &reporter).unwrap();
    assert_eq!(reporter.ticks.load(Ordering::SeqCst), 3);
    assert_eq!(reporter.total.load(Ordering::SeqCst), 6);
    assert_eq!(reporter.completed.load(Ordering::SeqCst), 1);
    assert_eq!(task.pack(&resumed).unwrap(), task.pack(&full).unwrap());
}

#[test]
fn progress_ticks_once_per_pair() {
    let task = gaussian_task(ModelCount::Finite(4), &[0.1, 0.5, 1.0]);
    let reporter = CountingReporter::default();
    task.run(&EngineConfig::with_max_cores(2), &reporter).unwrap();
    assert_eq!(reporter.ticks.load(Ordering::SeqCst), 12);
    assert_eq!(reporter.total.load(Ordering::SeqCst), 12);
}

#[test]
fn desynchronized_results_abort_run() {
    let task = gaussian_task(ModelCount::Finite(3), &[0.1, 0.5]);
    let mut corrupted = CalibrationResults::default();
    corrupted.bemd.insert((ModelIndex(1), CValue(0.5)), 0.7);
    for max_cores in [1, 4] {
        let err = task
            .run_with_known(
                corrupted.clone(),
                &EngineConfig::with_max_cores(max_cores),
                &NullProgressReporter,
            )
            .unwrap_err();
        assert_eq!(
            err,
            CalibrationError::Desynchronized {
                model: ModelIndex(1)
            }
        );
    }
}

#[test]
fn worker_panic_becomes_error() {
    // Inline execution does not catch panics
    if emdcal_orchestration::config::physical_cores() < 2 {
        return;
    }
    let task = CalibrationTask {
        c_list: vec![CValue(0.5)],
        data_models: SeededDistribution::new(
            ModelCount::Finite(6),
            0,
            FragileFactory { panics: true },
        ),
        candidates: candidates(squared_error(0.0), squared_error(3.0)),
        sampler: Arc::new(QuantilePathSampler::default()),
        ldata: 20,
        linf: 20,
    };
    let err = task
        .run(&EngineConfig::with_max_cores(4), &NullProgressReporter)
        .unwrap_err();
    assert!(matches!(err, CalibrationError::Worker(msg) if msg.contains("model 2")));
}

#[test]
fn unpack_rejects_other_configuration() {
    let task = gaussian_task(ModelCount::Finite(2), &[0.5]);
    let output = task
        .run(&EngineConfig::with_max_cores(1), &NullProgressReporter)
        .unwrap();
    let other = gaussian_task(ModelCount::Finite(2), &[0.25]);
    assert!(matches!(
        other.unpack(&output),
        Err(CalibrationError::FingerprintMismatch { .. })
    ));
}

#[test]
fn invalid_parameters_are_rejected() {
    let mut task = gaussian_task(ModelCount::Finite(2), &[0.5]);
    task.ldata = 0;
    assert!(matches!(
        task.run(&EngineConfig::default(), &NullProgressReporter),
        Err(CalibrationError::Config(_))
    ));
    let task = gaussian_task(ModelCount::Finite(2), &[-1.0]);
    assert!(matches!(
        task.run(&EngineConfig::default(), &NullProgressReporter),
        Err(CalibrationError::Config(_))
    ));
}

#[test]
fn duplicate_c_values_are_rejected_before_any_work() {
    let task = gaussian_task(ModelCount::Finite(3), &[0.5, 1.0, 0.5]);
    assert!(matches!(task.validate(), Err(CalibrationError::Config(_))));
    let reporter = CountingReporter::default();
    assert!(matches!(
        task.run(&EngineConfig::with_max_cores(2), &reporter),
        Err(CalibrationError::Config(_))
    ));
    assert_eq!(reporter.ticks.load(Ordering::SeqCst), 0);
}

#[test]
fn unbounded_distribution_stops_at_first_error() {
    let task = CalibrationTask {
        c_list: vec![CValue(0.5), CValue(1.0)],
        data_models: SeededDistribution::new(
            ModelCount::Unbounded,
            0,
            FragileFactory { panics: false },
        ),
        candidates: candidates(squared_error(0.0), squared_error(3.0)),
        sampler: Arc::new(QuantilePathSampler::default()),
        ldata: 20,
        linf: 20,
    };
    for max_cores in [1, 3] {
        let reporter = CountingReporter::default();
        let err = task
            .run(&EngineConfig::with_max_cores(max_cores), &reporter)
            .unwrap_err();
        assert_eq!(err, CalibrationError::DataModel("model 2 has no data".into()));
        assert_eq!(reporter.total.load(Ordering::SeqCst), u64::MAX);
        assert_eq!(reporter.ticks.load(Ordering::SeqCst), 4);
    }
}
