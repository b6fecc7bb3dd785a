//! The `Bemd` and `Bconf` estimators.
//!
//! `compute_bemd` is the expensive one and runs on workers; `compute_bconf`
//! is evaluated once per data model on the controller.

use std::time::Instant;

use tracing::debug;

use crate::diagnostics::SAMPLING;
use crate::error::{CalibrationError, Result};
use crate::model::{CandidatePair, DataModel, RiskFunction};
use crate::sampler::EmdSampler;

/// Estimate `P(R_A < R_B)` for one `(data model, c)` pair.
///
/// Draws a dataset of `ldata` points, builds the mixed PPF of each
/// candidate's risk, samples expected risks for both candidates and returns
/// the fraction of sample pairs with `R_A < R_B`. Sampler warnings are
/// silenced for the duration of the sampling step.
pub fn compute_bemd<M: DataModel>(
    data_model: &M,
    c: f64,
    candidates: &CandidatePair<M::Dataset>,
    sampler: &dyn EmdSampler,
    ldata: usize,
) -> Result<f64> {
    debug!(ldata, "Compute Bemd - generating data points");
    let t1 = Instant::now();
    let data = data_model.generate(ldata)?;
    debug!(
        ldata,
        elapsed = format!("{:.2} s", t1.elapsed().as_secs_f64()),
        "Compute Bemd - done generating data points"
    );

    let mixed_ppf_a = sampler.make_empirical_risk_ppf(candidates.risk_a.evaluate(&data)?)?;
    let mixed_ppf_b = sampler.make_empirical_risk_ppf(candidates.risk_b.evaluate(&data)?)?;

    debug!(c, "Compute Bemd - generating R samples");
    let t1 = Instant::now();
    let (r_a, r_b) = {
        let _quiet = SAMPLING.suppress();
        let r_a = sampler.draw_r_samples(mixed_ppf_a.as_ref(), candidates.synth_ppf_a.as_ref(), c)?;
        let r_b = sampler.draw_r_samples(mixed_ppf_b.as_ref(), candidates.synth_ppf_b.as_ref(), c)?;
        (r_a, r_b)
    };
    debug!(
        c,
        samples_a = r_a.len(),
        samples_b = r_b.len(),
        elapsed = format!("{:.2} s", t1.elapsed().as_secs_f64()),
        "Compute Bemd - done generating R samples"
    );

    prob_less(&r_a, &r_b)
}

/// Ground-truth preference: whether candidate A has lower mean risk than B on
/// a quasi-infinite dataset of `linf` points.
pub fn compute_bconf<M: DataModel>(
    data_model: &M,
    risk_a: &dyn RiskFunction<M::Dataset>,
    risk_b: &dyn RiskFunction<M::Dataset>,
    linf: usize,
) -> Result<bool> {
    debug!(linf, "Compute Bconf - generating 'infinite' dataset");
    let t1 = Instant::now();
    let data = data_model.generate(linf)?;
    debug!(
        linf,
        elapsed = format!("{:.2} s", t1.elapsed().as_secs_f64()),
        "Compute Bconf - done generating 'infinite' dataset"
    );

    debug!("Compute Bconf - evaluating expected risk on 'infinite' dataset");
    let t1 = Instant::now();
    let mean_a = mean_risk(&risk_a.evaluate(&data)?, "A")?;
    let mean_b = mean_risk(&risk_b.evaluate(&data)?, "B")?;
    debug!(
        mean_a,
        mean_b,
        elapsed = format!("{:.2} s", t1.elapsed().as_secs_f64()),
        "Compute Bconf - done evaluating risk"
    );

    Ok(mean_a < mean_b)
}

/// Fraction of pairs `(a, b)` in `r_a × r_b` with `a < b` strictly.
///
/// Equivalent to averaging the full outer comparison matrix, computed with
/// one sort and a binary search per element of `r_a`.
///
/// A NaN in either sample set is a [`CalibrationError::Sampling`] error,
/// where a plain outer comparison would silently count those pairs as
/// "not less".
pub fn prob_less(r_a: &[f64], r_b: &[f64]) -> Result<f64> {
    if r_a.is_empty() || r_b.is_empty() {
        return Err(CalibrationError::EmptySamples);
    }
    if r_a.iter().chain(r_b).any(|x| x.is_nan()) {
        return Err(CalibrationError::Sampling("R samples contain NaN".into()));
    }
    let mut sorted_b = r_b.to_vec();
    sorted_b.sort_by(f64::total_cmp);

    let mut count: u64 = 0;
    for &a in r_a {
        // Elements of r_b strictly greater than a
        let not_greater = sorted_b.partition_point(|&b| b <= a);
        count += (sorted_b.len() - not_greater) as u64;
    }
    let pairs = r_a.len() as f64 * r_b.len() as f64;
    Ok(count as f64 / pairs)
}

fn mean_risk(risks: &[f64], candidate: &str) -> Result<f64> {
    if risks.is_empty() {
        return Err(CalibrationError::Risk(format!(
            "risk function {candidate} returned no values"
        )));
    }
    let mean = risks.iter().sum::<f64>() / risks.len() as f64;
    if !mean.is_finite() {
        return Err(CalibrationError::Risk(format!(
            "risk function {candidate} has non-finite mean"
        )));
    }
    Ok(mean)
}
