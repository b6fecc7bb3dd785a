//! Work enumeration: the `(data model, c)` pairs a run still has to compute.

use std::collections::HashSet;

use emdcal_core::{CValue, CalibrationDistribution, CalibrationError, ModelIndex, Result};

/// One unit of work: a data model and the `c` to estimate `Bemd` at.
#[derive(Debug, Clone)]
pub struct WorkItem<M> {
    /// Position of the model in the distribution's enumeration.
    pub index: ModelIndex,
    pub model: M,
    pub c: CValue,
}

/// Keys already present in the result accumulators when a run starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownResults {
    bemd: HashSet<(ModelIndex, CValue)>,
    bconf: HashSet<ModelIndex>,
}

impl KnownResults {
    /// Snapshot built from the keys of both accumulators.
    pub fn from_keys(
        bemd: impl IntoIterator<Item = (ModelIndex, CValue)>,
        bconf: impl IntoIterator<Item = ModelIndex>,
    ) -> Self {
        Self {
            bemd: bemd.into_iter().collect(),
            bconf: bconf.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn has_bemd(&self, model: ModelIndex, c: CValue) -> bool {
        self.bemd.contains(&(model, c))
    }

    #[must_use]
    pub fn has_bconf(&self, model: ModelIndex) -> bool {
        self.bconf.contains(&model)
    }

    /// Number of known `Bemd` results.
    #[must_use]
    pub fn bemd_len(&self) -> usize {
        self.bemd.len()
    }
}

/// Enumerate `(model, c)` pairs in model-major, `c_list`-minor order,
/// skipping pairs whose `Bemd` is already known.
///
/// A known `Bemd` whose model has no known `Bconf` means the accumulators
/// were corrupted; the iterator yields [`CalibrationError::Desynchronized`]
/// for that pair and ends. Two enumerations over the same distribution,
/// `c_list` and snapshot yield identical sequences.
pub fn model_c_gen<'a, D: CalibrationDistribution>(
    data_models: &'a D,
    c_list: &'a [CValue],
    known: &'a KnownResults,
) -> impl Iterator<Item = Result<WorkItem<D::Model>>> + 'a {
    data_models
        .models()
        .enumerate()
        .flat_map(move |(i, model)| {
            let index = ModelIndex(i);
            c_list.iter().filter_map(move |&c| {
                if !known.has_bemd(index, c) {
                    Some(Ok(WorkItem {
                        index,
                        model: model.clone(),
                        c,
                    }))
                } else if !known.has_bconf(index) {
                    Some(Err(CalibrationError::Desynchronized { model: index }))
                } else {
                    None
                }
            })
        })
        .scan(false, |failed, item| {
            if *failed {
                return None;
            }
            *failed = item.is_err();
            Some(item)
        })
}
