//! Terminal progress bar for calibration runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parking_lot::Mutex;

use emdcal_orchestration::ProgressReporter;

const BAR_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) eta {eta} {msg}";
const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner} {pos} experiments {msg}";

/// Progress reporter drawing an `indicatif` bar on stderr.
///
/// Unbounded runs get a spinner since no total is known.
pub struct CliProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl CliProgressReporter {
    /// Create a reporter; `hidden` suppresses all drawing.
    #[must_use]
    pub fn new(hidden: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            hidden,
        }
    }

    /// Position of the current bar, if a run has started.
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        self.bar.lock().as_ref().map(ProgressBar::position)
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

impl ProgressReporter for CliProgressReporter {
    fn start(&self, total: Option<u64>) {
        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(bar_style(BAR_TEMPLATE));
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(bar_style(SPINNER_TEMPLATE));
                bar
            }
        };
        if self.hidden {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_message("Bemd");
        *self.bar.lock() = Some(bar);
    }

    fn tick(&self) {
        if let Some(bar) = self.bar.lock().as_ref() {
            bar.inc(1);
        }
    }

    fn complete(&self) {
        if let Some(bar) = self.bar.lock().as_ref() {
            bar.finish_with_message("done");
        }
    }
}
