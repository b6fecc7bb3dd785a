//! Result accumulators and per-`c` calibration curves.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use emdcal_core::{CValue, CalibrationError, CalibrationPoint, ModelIndex, Result};

use crate::enumerator::KnownResults;

/// A map which remembers insertion order.
///
/// Replacing the value of an existing key keeps its original position.
#[derive(Debug, Clone)]
pub struct OrderedResults<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

// `index` is derived from `entries`.
impl<K: Eq + Hash, V: PartialEq> PartialEq for OrderedResults<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K, V> Default for OrderedResults<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash, V> OrderedResults<K, V> {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&pos) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[pos].1, value));
        }
        self.index.insert(key, self.entries.len());
        self.entries.push((key, value));
        None
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

/// `Bemd` results keyed by `(model, c)`.
pub type BemdResults = OrderedResults<(ModelIndex, CValue), f64>;

/// `Bconf` results keyed by model.
pub type BconfResults = OrderedResults<ModelIndex, bool>;

/// Everything computed by a calibration run so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationResults {
    pub bemd: BemdResults,
    pub bconf: BconfResults,
}

impl CalibrationResults {
    /// Snapshot of the keys already computed, used to skip work on resume.
    #[must_use]
    pub fn known(&self) -> KnownResults {
        KnownResults::from_keys(self.bemd.keys().copied(), self.bconf.keys().copied())
    }

    /// Group results into one curve per `c`, in `c_list` order.
    ///
    /// Points within a curve follow the order in which models were first
    /// recorded. Every recorded `c` must appear in `c_list`, and every model
    /// with a `Bemd` result needs a `Bconf` result.
    pub fn curves(&self, c_list: &[CValue]) -> Result<CalibrateResult> {
        let mut curves: Vec<CalibrationCurve> = c_list
            .iter()
            .map(|&c| CalibrationCurve {
                c,
                points: Vec::new(),
            })
            .collect();
        let position: HashMap<CValue, usize> =
            c_list.iter().enumerate().map(|(i, &c)| (c, i)).collect();

        for (&(model, c), &bemd) in self.bemd.iter() {
            let &pos = position.get(&c).ok_or_else(|| {
                CalibrationError::Codec(format!("result for c = {c} which is not in the c list"))
            })?;
            let &bconf = self.bconf.get(&model).ok_or(CalibrationError::Desynchronized { model })?;
            curves[pos].points.push(CalibrationPoint { bemd, bconf });
        }

        Ok(CalibrateResult { curves })
    }
}

/// Calibration points for one value of `c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub c: CValue,
    pub points: Vec<CalibrationPoint>,
}

/// One calibration curve per value of `c`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrateResult {
    curves: Vec<CalibrationCurve>,
}

impl CalibrateResult {
    /// Curve for `c`, if it was part of the experiment.
    #[must_use]
    pub fn get(&self, c: CValue) -> Option<&CalibrationCurve> {
        self.curves.iter().find(|curve| curve.c == c)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalibrationCurve> {
        self.curves.iter()
    }
}

impl IntoIterator for CalibrateResult {
    type Item = CalibrationCurve;
    type IntoIter = std::vec::IntoIter<CalibrationCurve>;

    fn into_iter(self) -> Self::IntoIter {
        self.curves.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(v: f64) -> CValue {
        CValue(v)
    }

    #[test]
    fn ordered_results_keep_insertion_order() {
        let mut map = OrderedResults::new();
        map.insert(3, "c");
        map.insert(1, "a");
        map.insert(2, "b");
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![3, 1, 2]);
        assert_eq!(map.insert(1, "z"), Some("a"));
        assert_eq!(map.values().copied().collect::<Vec<_>>(), vec!["c", "z", "b"]);
        assert_eq!(map.len(), 3);
        assert!(map.contains(&2));
        assert_eq!(map.get(&4), None);
    }

    #[test]
    fn equality_follows_entries_and_order() {
        let mut a = OrderedResults::new();
        a.insert(1, 0.5);
        a.insert(2, 0.7);
        let mut b = OrderedResults::new();
        b.insert(1, 0.5);
        b.insert(2, 0.7);
        assert_eq!(a, b);

        let mut swapped = OrderedResults::new();
        swapped.insert(2, 0.7);
        swapped.insert(1, 0.5);
        assert_ne!(a, swapped);

        let mut left = CalibrationResults::default();
        left.bemd.insert((ModelIndex(0), c(1.0)), 0.5);
        left.bconf.insert(ModelIndex(0), true);
        let mut right = left.clone();
        assert_eq!(left, right);
        right.bconf.insert(ModelIndex(0), false);
        assert_ne!(left, right);
    }

    #[test]
    fn curves_group_by_c_in_list_order() {
        let mut results = CalibrationResults::default();
        results.bemd.insert((ModelIndex(0), c(0.5)), 0.9);
        results.bemd.insert((ModelIndex(0), c(0.1)), 0.8);
        results.bconf.insert(ModelIndex(0), true);
        results.bemd.insert((ModelIndex(1), c(0.5)), 0.2);
        results.bemd.insert((ModelIndex(1), c(0.1)), 0.3);
        results.bconf.insert(ModelIndex(1), false);

        let curves = results.curves(&[c(0.1), c(0.5)]).unwrap();
        assert_eq!(curves.len(), 2);
        let first: Vec<_> = curves.iter().map(|curve| curve.c).collect();
        assert_eq!(first, vec![c(0.1), c(0.5)]);

        let low = curves.get(c(0.1)).unwrap();
        assert_eq!(
            low.points,
            vec![
                CalibrationPoint { bemd: 0.8, bconf: true },
                CalibrationPoint { bemd: 0.3, bconf: false },
            ]
        );
        assert!(curves.get(c(0.7)).is_none());
    }

    #[test]
    fn curves_reject_unlisted_c() {
        let mut results = CalibrationResults::default();
        results.bemd.insert((ModelIndex(0), c(2.0)), 0.5);
        results.bconf.insert(ModelIndex(0), true);
        assert!(matches!(
            results.curves(&[c(1.0)]),
            Err(CalibrationError::Codec(_))
        ));
    }

    #[test]
    fn curves_require_bconf() {
        let mut results = CalibrationResults::default();
        results.bemd.insert((ModelIndex(4), c(1.0)), 0.5);
        assert_eq!(
            results.curves(&[c(1.0)]),
            Err(CalibrationError::Desynchronized {
                model: ModelIndex(4)
            })
        );
    }

    #[test]
    fn known_snapshot_lists_keys() {
        let mut results = CalibrationResults::default();
        results.bemd.insert((ModelIndex(0), c(1.0)), 0.5);
        results.bconf.insert(ModelIndex(0), true);
        let known = results.known();
        assert!(known.has_bemd(ModelIndex(0), c(1.0)));
        assert!(!known.has_bemd(ModelIndex(0), c(2.0)));
        assert!(known.has_bconf(ModelIndex(0)));
        assert_eq!(known.bemd_len(), 1);
    }
}
