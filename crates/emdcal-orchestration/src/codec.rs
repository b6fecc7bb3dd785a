//! Compact encoding of calibration results.
//!
//! Results are packed into two flat arrays: one `Bconf` per model and
//! `|c_list|` `Bemd` values per model, both ordered by model position and
//! then by `c_list`. Model identities are not stored; unpacking re-runs the
//! distribution's deterministic enumeration to reattach them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use emdcal_core::{CValue, CalibrationDistribution, CalibrationError, ModelIndex, Result};

use crate::enumerator::{model_c_gen, KnownResults};
use crate::results::CalibrationResults;

/// Packed output of a calibration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrateOutput {
    /// `Bemd` values, model-major then `c_list` order.
    pub bemd: Vec<f64>,
    /// One `Bconf` value per model.
    pub bconf: Vec<bool>,
    /// Digest of the distribution and `c_list` the output was computed with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// SHA-256 of the serialized `(distribution, c_list)` pair, hex encoded.
pub fn fingerprint<D: Serialize>(data_models: &D, c_list: &[CValue]) -> Result<String> {
    let bytes = serde_json::to_vec(&(data_models, c_list))
        .map_err(|e| CalibrationError::Codec(format!("cannot serialize configuration: {e}")))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Pack complete results for models `0..n` into flat arrays.
///
/// Fails if any `(model, c)` pair of the grid is missing or if results exist
/// outside it.
pub fn pack(c_list: &[CValue], results: &CalibrationResults) -> Result<CalibrateOutput> {
    let n_models = results.bconf.len();
    let mut bconf = Vec::with_capacity(n_models);
    let mut bemd = Vec::with_capacity(n_models * c_list.len());

    for i in 0..n_models {
        let model = ModelIndex(i);
        let &value = results.bconf.get(&model).ok_or_else(|| {
            CalibrationError::Codec(format!("no Bconf result for model {model}"))
        })?;
        bconf.push(value);
        for &c in c_list {
            let &value = results.bemd.get(&(model, c)).ok_or_else(|| {
                CalibrationError::Codec(format!("no Bemd result for model {model} at c = {c}"))
            })?;
            bemd.push(value);
        }
    }

    if bemd.len() != results.bemd.len() {
        return Err(CalibrationError::Codec(format!(
            "{} Bemd results do not fit a {n_models} x {} grid",
            results.bemd.len(),
            c_list.len()
        )));
    }

    Ok(CalibrateOutput {
        bemd,
        bconf,
        fingerprint: None,
    })
}

/// Rebuild keyed results from packed arrays.
///
/// Finite distributions must account for every value exactly; unbounded ones
/// stop at the first model without a stored `Bconf`.
pub fn unpack_results<D: CalibrationDistribution>(
    output: &CalibrateOutput,
    data_models: &D,
    c_list: &[CValue],
) -> Result<CalibrationResults> {
    let mut results = CalibrationResults::default();
    if c_list.is_empty() {
        return if output.bemd.is_empty() && output.bconf.is_empty() {
            Ok(results)
        } else {
            Err(CalibrationError::Codec(
                "values stored for an empty c list".into(),
            ))
        };
    }

    let mut bemd = output.bemd.iter().copied();
    let mut bconf = output.bconf.iter().copied();
    let known = KnownResults::default();
    let mut current: Option<ModelIndex> = None;
    let mut exhausted = false;

    for item in model_c_gen(data_models, c_list, &known) {
        let item = item?;
        if current != Some(item.index) {
            let Some(value) = bconf.next() else {
                exhausted = true;
                break;
            };
            results.bconf.insert(item.index, value);
            current = Some(item.index);
        }
        let value = bemd.next().ok_or_else(|| {
            CalibrationError::Codec(format!(
                "ran out of Bemd values at model {} and c = {}",
                item.index, item.c
            ))
        })?;
        results.bemd.insert((item.index, item.c), value);
    }

    if bemd.next().is_some() || bconf.next().is_some() {
        return Err(CalibrationError::Codec(
            "more values stored than the distribution enumerates".into(),
        ));
    }
    if exhausted {
        if let Some(n) = data_models.size().finite() {
            return Err(CalibrationError::Codec(format!(
                "{} models stored but the distribution has {n}",
                results.bconf.len()
            )));
        }
    }

    Ok(results)
}

/// Fail unless `output` carries no fingerprint or the expected one.
pub fn verify_fingerprint(output: &CalibrateOutput, expected: &str) -> Result<()> {
    match &output.fingerprint {
        Some(found) if found != expected => Err(CalibrationError::FingerprintMismatch {
            expected: expected.to_string(),
            found: found.clone(),
        }),
        _ => Ok(()),
    }
}
