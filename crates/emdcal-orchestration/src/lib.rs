//! # emdcal-orchestration
//!
//! Experiment enumeration, parallel dispatch, result accumulation and the
//! compact result encoding.

pub mod codec;
pub mod config;
pub mod enumerator;
pub mod interfaces;
pub mod pool;
pub mod results;
pub mod task;

pub use codec::{fingerprint, CalibrateOutput};
pub use config::EngineConfig;
pub use enumerator::{model_c_gen, KnownResults, WorkItem};
pub use interfaces::{NullProgressReporter, ProgressReporter};
pub use pool::{chunk_size, worker_count, OrderedPool};
pub use results::{CalibrateResult, CalibrationCurve, CalibrationResults, OrderedResults};
pub use task::CalibrationTask;
