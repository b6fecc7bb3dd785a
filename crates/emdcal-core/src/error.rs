//! Error type shared by the estimators, the dispatcher and the codec.

use crate::model::ModelIndex;

/// Error type for calibration experiments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    /// A data model failed to generate a dataset.
    #[error("data model error: {0}")]
    DataModel(String),

    /// A risk function failed or returned unusable values.
    #[error("risk evaluation error: {0}")]
    Risk(String),

    /// Empirical PPF construction or R sampling failed.
    #[error("sampling error: {0}")]
    Sampling(String),

    /// The sampler returned no expected-risk samples.
    #[error("sampler returned no R samples")]
    EmptySamples,

    /// A Bemd result is known for a model whose Bconf is not.
    #[error("Bemd result known for model {model} without a matching Bconf result")]
    Desynchronized { model: ModelIndex },

    /// A worker panicked or the pool could not be built.
    #[error("worker failure: {0}")]
    Worker(String),

    /// Packed values do not line up with the enumeration.
    #[error("codec error: {0}")]
    Codec(String),

    /// The packed output was produced under a different configuration.
    #[error("configuration fingerprint mismatch (expected {expected}, found {found})")]
    FingerprintMismatch { expected: String, found: String },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the workspace.
pub type Result<T, E = CalibrationError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CalibrationError::Risk("empty".into());
        assert_eq!(err.to_string(), "risk evaluation error: empty");

        let err = CalibrationError::Desynchronized {
            model: ModelIndex(3),
        };
        assert_eq!(
            err.to_string(),
            "Bemd result known for model #3 without a matching Bconf result"
        );
    }

    #[test]
    fn fingerprint_mismatch_display() {
        let err = CalibrationError::FingerprintMismatch {
            expected: "ab".into(),
            found: "cd".into(),
        };
        assert!(err.to_string().contains("expected ab"));
        assert!(err.to_string().contains("found cd"));
    }
}
