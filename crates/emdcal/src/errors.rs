//! Error handling and exit codes.

use emdcal_core::{exit_codes, CalibrationError};

/// Exit code for a calibration error.
pub fn handle_error(err: &CalibrationError) -> i32 {
    match err {
        CalibrationError::FingerprintMismatch { .. } => exit_codes::ERROR_MISMATCH,
        CalibrationError::Config(_) => exit_codes::ERROR_CONFIG,
        CalibrationError::DataModel(_)
        | CalibrationError::Risk(_)
        | CalibrationError::Sampling(_)
        | CalibrationError::EmptySamples
        | CalibrationError::Desynchronized { .. }
        | CalibrationError::Worker(_)
        | CalibrationError::Codec(_) => exit_codes::ERROR_GENERIC,
    }
}

/// Exit code for any application error.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<CalibrationError>())
        .map_or(exit_codes::ERROR_GENERIC, handle_error)
}
