//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Execution settings for a calibration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on worker threads. Zero means "use every logical core".
    pub max_cores: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cores: logical_cores(),
        }
    }
}

impl EngineConfig {
    /// Engine configuration limited to `max_cores` workers.
    #[must_use]
    pub fn with_max_cores(max_cores: usize) -> Self {
        Self { max_cores }.normalize()
    }

    /// Replace a zero core limit by the machine's logical core count.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.max_cores == 0 {
            self.max_cores = logical_cores();
        }
        self
    }
}

/// Logical cores available to this process.
#[must_use]
pub fn logical_cores() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Physical cores of the machine, or the logical count when unknown.
#[must_use]
pub fn physical_cores() -> usize {
    sysinfo::System::new()
        .physical_core_count()
        .filter(|&n| n > 0)
        .unwrap_or_else(logical_cores)
}
