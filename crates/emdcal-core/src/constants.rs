//! Constants for calibration experiments.

/// Over-partitioning factor used when sizing dispatch chunks.
pub const CHUNKS_PER_WORKER: usize = 6;

/// Default number of expected-risk samples drawn per candidate model.
pub const DEFAULT_R_SAMPLES: usize = 400;

/// Default number of quantile grid points used to discretize a sampled path.
pub const DEFAULT_PATH_RESOLUTION: usize = 128;

/// Fraction of clipped (non-monotone) paths above which the sampler warns.
pub const CLIPPED_PATH_WARN_FRACTION: f64 = 0.05;

/// Default seed of the reference path sampler.
pub const DEFAULT_SAMPLER_SEED: u64 = 0x5EED_0F_E3D;

/// Exit codes of the `emdcal` binary.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// Stored results do not match the configuration.
    pub const ERROR_MISMATCH: i32 = 3;
    /// Invalid configuration.
    pub const ERROR_CONFIG: i32 = 4;
}
