//! # emdcal-core
//!
//! Core library for calibration experiments of the EMD model-falsification
//! criterion: data-model and distribution traits, the `Bemd` and `Bconf`
//! estimators, and the expected-risk sampling interface.

pub mod constants;
pub mod diagnostics;
pub mod distribution;
pub mod error;
pub mod estimators;
pub mod model;
pub mod sampler;

// Re-exports
pub use constants::{exit_codes, CHUNKS_PER_WORKER};
pub use distribution::{CalibrationDistribution, ModelCount, ModelFactory, SeededDistribution};
pub use error::{CalibrationError, Result};
pub use estimators::{compute_bconf, compute_bemd, prob_less};
pub use model::{
    CValue, CalibrationPoint, CandidatePair, DataModel, ModelIndex, QuantileFunction,
    RiskFunction,
};
pub use sampler::{EmdSampler, EmpiricalPpf, QuantilePathSampler};
