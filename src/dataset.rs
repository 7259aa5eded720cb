//! Normalized curve dataset: the ordered record collection one curve
//! fetch produces. Record identity is positional; indices die with the
//! dataset and are never reused across a replacement.

use crate::catalog::{CurvePoint, CurveResponse};
use std::collections::BTreeMap;

/// One row of the active curve: the summary metrics every view shows
/// plus the untouched source attribute map for the detail popup.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub flow: f64,
    pub head: f64,
    pub efficiency: f64,
    pub power: f64,
    pub impeller_dia: Option<f64>,
    pub raw: BTreeMap<String, serde_json::Value>,
}

impl From<CurvePoint> for PerformanceRecord {
    fn from(point: CurvePoint) -> Self {
        Self {
            flow: point.flow,
            head: point.head,
            efficiency: point.efficiency,
            power: point.power,
            impeller_dia: point.impeller_dia,
            raw: point.all_data,
        }
    }
}

/// The records for one resolved selection tuple, in server-provided
/// order. Replacement is wholesale: consumers observe either the old
/// dataset in full or the new one in full.
#[derive(Debug, Clone)]
pub struct CurveDataset {
    pub pump: String,
    pub stage: String,
    pub test_type: String,
    pub rated_speed: f64,
    records: Vec<PerformanceRecord>,
}

impl CurveDataset {
    pub fn from_response(response: CurveResponse) -> Self {
        Self {
            pump: response.pump_type,
            stage: response.stage,
            test_type: response.test_type,
            rated_speed: response.rated_speed,
            records: response
                .data_points
                .into_iter()
                .map(PerformanceRecord::from)
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PerformanceRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    /// Header line for the chart area, e.g. "HSC-100 • 2 • FAT • 2950 RPM".
    pub fn title(&self) -> String {
        format!(
            "{} • {} • {} • {} RPM",
            self.pump, self.stage, self.test_type, self.rated_speed
        )
    }

    /// Min/max of flow and head across all records, for axis bounds.
    /// None when the dataset is empty.
    pub fn bounds(&self) -> Option<([f64; 2], [f64; 2])> {
        if self.records.is_empty() {
            return None;
        }
        let mut x = [f64::INFINITY, f64::NEG_INFINITY];
        let mut y = [f64::INFINITY, f64::NEG_INFINITY];
        for record in &self.records {
            x[0] = x[0].min(record.flow);
            x[1] = x[1].max(record.flow);
            y[0] = y[0].min(record.head);
            y[1] = y[1].max(record.head);
        }
        Some((x, y))
    }

    /// Min/max efficiency across all records, for color banding.
    pub fn efficiency_range(&self) -> Option<[f64; 2]> {
        if self.records.is_empty() {
            return None;
        }
        let mut range = [f64::INFINITY, f64::NEG_INFINITY];
        for record in &self.records {
            range[0] = range[0].min(record.efficiency);
            range[1] = range[1].max(record.efficiency);
        }
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CurvePoint;

    fn point(flow: f64, head: f64, efficiency: f64) -> CurvePoint {
        CurvePoint {
            flow,
            head,
            efficiency,
            power: 0.0,
            impeller_dia: None,
            all_data: BTreeMap::new(),
        }
    }

    fn response(points: Vec<CurvePoint>) -> CurveResponse {
        CurveResponse {
            pump_type: "P1".to_string(),
            stage: "S1".to_string(),
            test_type: "T1".to_string(),
            rated_speed: 2950.0,
            data_points: points,
        }
    }

    #[test]
    fn preserves_server_order() {
        // Deliberately not sorted by flow: server order is authoritative
        let dataset = CurveDataset::from_response(response(vec![
            point(20.0, 40.0, 60.0),
            point(10.0, 50.0, 55.0),
            point(15.0, 45.0, 62.0),
        ]));
        let flows: Vec<f64> = dataset.records().iter().map(|r| r.flow).collect();
        assert_eq!(flows, vec![20.0, 10.0, 15.0]);
    }

    #[test]
    fn get_is_bounds_checked() {
        let dataset = CurveDataset::from_response(response(vec![point(1.0, 2.0, 3.0)]));
        assert!(dataset.get(0).is_some());
        assert!(dataset.get(1).is_none());
    }

    #[test]
    fn bounds_and_efficiency_range() {
        let dataset = CurveDataset::from_response(response(vec![
            point(10.0, 50.0, 55.0),
            point(20.0, 40.0, 65.0),
        ]));
        let (x, y) = dataset.bounds().unwrap();
        assert_eq!(x, [10.0, 20.0]);
        assert_eq!(y, [40.0, 50.0]);
        assert_eq!(dataset.efficiency_range().unwrap(), [55.0, 65.0]);

        let empty = CurveDataset::from_response(response(vec![]));
        assert!(empty.bounds().is_none());
        assert!(empty.efficiency_range().is_none());
    }

    #[test]
    fn title_shows_resolved_tuple() {
        let dataset = CurveDataset::from_response(response(vec![]));
        assert_eq!(dataset.title(), "P1 • S1 • T1 • 2950 RPM");
    }
}
