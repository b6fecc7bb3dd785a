//! Calibration curve presenter.

use std::time::Duration;

use emdcal_orchestration::{CalibrateResult, CalibrationCurve};

use crate::output::format_duration;
use crate::ui::print_header;

/// Summary statistics of one calibration curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSummary {
    /// Number of data models on the curve.
    pub points: usize,
    /// Mean `Bemd` over the curve.
    pub mean_bemd: f64,
    /// Fraction of models where `Bemd > 0.5` agrees with `Bconf`.
    pub agreement: f64,
}

impl CurveSummary {
    /// Summarize a curve. Empty curves summarize to zeros.
    #[must_use]
    pub fn of(curve: &CalibrationCurve) -> Self {
        let points = curve.points.len();
        if points == 0 {
            return Self {
                points,
                mean_bemd: 0.0,
                agreement: 0.0,
            };
        }
        let mean_bemd = curve.points.iter().map(|p| p.bemd).sum::<f64>() / points as f64;
        let agreeing = curve
            .points
            .iter()
            .filter(|p| (p.bemd > 0.5) == p.bconf)
            .count();
        Self {
            points,
            mean_bemd,
            agreement: agreeing as f64 / points as f64,
        }
    }
}

/// Prints calibration curves to stdout.
pub struct CurvePresenter {
    verbose: bool,
    quiet: bool,
}

impl CurvePresenter {
    #[must_use]
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Print one summary line per curve, plus every point when verbose.
    pub fn present_curves(&self, curves: &CalibrateResult, duration: Option<Duration>) {
        if self.quiet {
            return;
        }
        print_header("Calibration curves");
        println!("  {:>10} {:>8} {:>10} {:>10}", "c", "models", "mean Bemd", "agreement");
        for curve in curves.iter() {
            let summary = CurveSummary::of(curve);
            println!(
                "  {:>10} {:>8} {:>10.4} {:>9.1}%",
                curve.c.get(),
                summary.points,
                summary.mean_bemd,
                summary.agreement * 100.0
            );
            if self.verbose {
                for (i, point) in curve.points.iter().enumerate() {
                    println!("      #{i:<6} Bemd {:.4}  Bconf {}", point.bemd, point.bconf);
                }
            }
        }
        if let Some(duration) = duration {
            println!("Duration: {}", format_duration(duration));
        }
    }
}
