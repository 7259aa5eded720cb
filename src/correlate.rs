//! Correlation between chart marks, table rows, and the detail popup.
//!
//! The dataset index is the only correlation key. Flow/head values are
//! not guaranteed unique across records and floating-point equality is
//! not a reliable lookup, so a chart mark carries the index it was
//! built from and correlation always goes through that index.

use crate::dataset::CurveDataset;
use std::collections::BTreeMap;

/// The record the operator currently has picked out, denormalized for
/// display. A transient view into the dataset by index: it must be
/// cleared whenever the dataset is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedRecord {
    pub index: usize,
    pub flow: f64,
    pub head: f64,
    pub efficiency: f64,
    pub impeller_dia: Option<f64>,
    pub raw: BTreeMap<String, serde_json::Value>,
}

/// The only component allowed to construct or drop `HighlightedRecord`.
#[derive(Debug, Default)]
pub struct PointCorrelator {
    highlighted: Option<HighlightedRecord>,
}

impl PointCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highlighted(&self) -> Option<&HighlightedRecord> {
        self.highlighted.as_ref()
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        self.highlighted.as_ref().map(|h| h.index)
    }

    /// Highlight the record at `index`. Silently a no-op when the
    /// index is out of bounds or there is no dataset: a click can race
    /// a dataset replacement and deliver an index from the old one.
    pub fn select_by_index(&mut self, dataset: Option<&CurveDataset>, index: usize) -> bool {
        let Some(dataset) = dataset else {
            return false;
        };
        let Some(record) = dataset.get(index) else {
            return false;
        };
        self.highlighted = Some(HighlightedRecord {
            index,
            flow: record.flow,
            head: record.head,
            efficiency: record.efficiency,
            impeller_dia: record.impeller_dia,
            raw: record.raw.clone(),
        });
        true
    }

    /// Highlight from a clicked chart mark. The mark's coordinates are
    /// display-only; the paired index it was constructed with is the
    /// correlation key.
    pub fn select_from_mark(
        &mut self,
        dataset: Option<&CurveDataset>,
        _mark_coords: (f64, f64),
        paired_index: usize,
    ) -> bool {
        self.select_by_index(dataset, paired_index)
    }

    pub fn clear(&mut self) {
        self.highlighted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CurvePoint, CurveResponse};

    fn dataset() -> CurveDataset {
        let points = vec![
            CurvePoint {
                flow: 10.0,
                head: 50.0,
                efficiency: 55.0,
                power: 8.0,
                impeller_dia: Some(250.0),
                all_data: BTreeMap::from([(
                    "TestNo".to_string(),
                    serde_json::json!(7),
                )]),
            },
            CurvePoint {
                // Same coordinates as a third record would be legal;
                // index disambiguates
                flow: 12.0,
                head: 48.0,
                efficiency: 61.0,
                power: 9.0,
                impeller_dia: None,
                all_data: BTreeMap::new(),
            },
        ];
        CurveDataset::from_response(CurveResponse {
            pump_type: "P1".to_string(),
            stage: "S1".to_string(),
            test_type: "T1".to_string(),
            rated_speed: 2950.0,
            data_points: points,
        })
    }

    #[test]
    fn select_by_index_round_trips_exact_values() {
        let dataset = dataset();
        let mut correlator = PointCorrelator::new();
        assert!(correlator.select_by_index(Some(&dataset), 1));
        let highlighted = correlator.highlighted().unwrap();
        let record = dataset.get(1).unwrap();
        assert_eq!(highlighted.flow, record.flow);
        assert_eq!(highlighted.head, record.head);
        assert_eq!(highlighted.efficiency, record.efficiency);
        assert_eq!(highlighted.impeller_dia, record.impeller_dia);
        assert_eq!(highlighted.raw, record.raw);
    }

    #[test]
    fn out_of_bounds_never_mutates() {
        let dataset = dataset();
        let mut correlator = PointCorrelator::new();
        correlator.select_by_index(Some(&dataset), 0);
        let before = correlator.highlighted().cloned();

        assert!(!correlator.select_by_index(Some(&dataset), 2));
        assert!(!correlator.select_by_index(Some(&dataset), usize::MAX));
        assert_eq!(correlator.highlighted().cloned(), before);
    }

    #[test]
    fn no_dataset_is_a_noop() {
        let mut correlator = PointCorrelator::new();
        assert!(!correlator.select_by_index(None, 0));
        assert!(correlator.highlighted().is_none());
    }

    #[test]
    fn mark_selection_uses_paired_index_not_coordinates() {
        let dataset = dataset();
        let mut correlator = PointCorrelator::new();
        // Coordinates deliberately disagree with the paired index;
        // the index must win
        assert!(correlator.select_from_mark(Some(&dataset), (10.0, 50.0), 1));
        assert_eq!(correlator.highlighted_index(), Some(1));
        assert_eq!(correlator.highlighted().unwrap().flow, 12.0);
    }

    #[test]
    fn clear_resets() {
        let dataset = dataset();
        let mut correlator = PointCorrelator::new();
        correlator.select_by_index(Some(&dataset), 0);
        correlator.clear();
        assert!(correlator.highlighted().is_none());
    }
}
