//! Diagnostic channels with scoped, reference-counted suppression.
//!
//! The path sampler reports numerical warnings on [`SAMPLING`]. Calibration
//! deliberately evaluates models far from the data, where these warnings are
//! expected, so the estimators silence the channel while sampling. Several
//! estimators may run concurrently: suppression is counted rather than
//! stored, and the configured threshold is never overwritten by a guard.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Severity {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Warn,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A named diagnostic channel with an adjustable threshold.
pub struct DiagnosticChannel {
    name: &'static str,
    threshold: AtomicU8,
    suppressors: AtomicUsize,
    emitted: AtomicU64,
    dropped: AtomicU64,
}

/// Channel used by path samplers for numerical warnings.
pub static SAMPLING: DiagnosticChannel = DiagnosticChannel::new("emdcal::sampling", Severity::Warn);

impl DiagnosticChannel {
    /// Create a channel passing messages at or above `threshold`.
    #[must_use]
    pub const fn new(name: &'static str, threshold: Severity) -> Self {
        Self {
            name,
            threshold: AtomicU8::new(threshold as u8),
            suppressors: AtomicUsize::new(0),
            emitted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Channel name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Configured threshold, ignoring active suppression.
    #[must_use]
    pub fn threshold(&self) -> Severity {
        Severity::from_u8(self.threshold.load(Ordering::Acquire))
    }

    /// Change the configured threshold.
    pub fn set_threshold(&self, threshold: Severity) {
        self.threshold.store(threshold as u8, Ordering::Release);
    }

    /// Threshold currently in force.
    #[must_use]
    pub fn effective_threshold(&self) -> Severity {
        let base = self.threshold();
        if self.suppressors.load(Ordering::Acquire) > 0 {
            base.max(Severity::Error)
        } else {
            base
        }
    }

    /// Whether a message of `severity` would be emitted.
    #[must_use]
    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.effective_threshold()
    }

    /// Raise the threshold to `Error` until the returned guard is dropped.
    ///
    /// The guard restores the previous state on every exit path, including
    /// early returns and unwinding.
    #[must_use = "suppression ends when the guard is dropped"]
    pub fn suppress(&self) -> SuppressionGuard<'_> {
        self.suppressors.fetch_add(1, Ordering::AcqRel);
        SuppressionGuard { channel: self }
    }

    /// Emit a warning if the channel lets it through.
    pub fn warn(&self, message: &str) {
        if self.enabled(Severity::Warn) {
            self.emitted.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(target: "emdcal::diagnostics", channel = self.name, "{message}");
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Emit an error. Errors are never suppressed.
    pub fn error(&self, message: &str) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
        tracing::error!(target: "emdcal::diagnostics", channel = self.name, "{message}");
    }

    /// Number of messages emitted so far.
    #[must_use]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Number of messages dropped by the threshold so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Scoped suppression of a [`DiagnosticChannel`].
pub struct SuppressionGuard<'a> {
    channel: &'a DiagnosticChannel,
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        self.channel.suppressors.fetch_sub(1, Ordering::AcqRel);
    }
}
