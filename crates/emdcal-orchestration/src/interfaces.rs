//! Orchestration interfaces.

/// Receives progress of a calibration run, one tick per completed
/// `(data model, c)` pair.
pub trait ProgressReporter: Send + Sync {
    /// A run is starting. `total` is unknown for unbounded distributions.
    fn start(&self, total: Option<u64>);

    /// One more pair has been recorded.
    fn tick(&self);

    /// Report completion.
    fn complete(&self);
}

/// Null progress reporter (does nothing).
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn start(&self, _total: Option<u64>) {}
    fn tick(&self) {}
    fn complete(&self) {}
}
