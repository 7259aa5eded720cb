//! Shared test fixtures: an in-memory catalog and helpers for driving
//! the app's event loop to quiescence.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use pumptui::catalog::{CurvePoint, CurveResponse, PumpCatalog, SpeedStats};
use pumptui::{App, AppConfig, AppEvent, SessionOptions};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

/// In-memory catalog with a small fixed hierarchy:
/// P1 → stages 1, 2; P2 → stage 1; every stage has FAT and Witness.
pub struct MockCatalog {
    pub fail_stages: AtomicBool,
    pub fail_curve: AtomicBool,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            fail_stages: AtomicBool::new(false),
            fail_curve: AtomicBool::new(false),
        }
    }
}

impl PumpCatalog for MockCatalog {
    fn list_pumps(&self) -> Result<Vec<String>> {
        Ok(vec!["P1".to_string(), "P2".to_string()])
    }

    fn list_stages(&self, pump: &str) -> Result<Vec<String>> {
        if self.fail_stages.load(Ordering::SeqCst) {
            return Err(eyre!("stages lookup failed"));
        }
        match pump {
            "P1" => Ok(vec!["1".to_string(), "2".to_string()]),
            "P2" => Ok(vec!["1".to_string()]),
            other => Err(eyre!("unknown pump {}", other)),
        }
    }

    fn list_test_types(&self, _pump: &str, _stage: &str) -> Result<Vec<String>> {
        Ok(vec!["FAT".to_string(), "Witness".to_string()])
    }

    fn rated_speed_stats(&self, _pump: &str, stage: &str) -> Result<SpeedStats> {
        let avg = if stage == "2" { 1470.0 } else { 2950.0 };
        Ok(SpeedStats {
            avg_speed: avg,
            min_speed: avg - 50.0,
            max_speed: avg + 50.0,
            common_speeds: vec![1450.0, 1470.0, 2900.0, 2950.0, 3000.0],
        })
    }

    fn curve(
        &self,
        pump: &str,
        stage: &str,
        test_type: &str,
        rated_speed: f64,
    ) -> Result<CurveResponse> {
        if self.fail_curve.load(Ordering::SeqCst) {
            return Err(eyre!("curve fetch failed"));
        }
        Ok(curve_fixture(pump, stage, test_type, rated_speed))
    }
}

/// Deterministic fixture: 5 points whose flows encode the pump so tests
/// can tell which tuple a dataset came from.
pub fn curve_fixture(pump: &str, stage: &str, test_type: &str, rated_speed: f64) -> CurveResponse {
    let base = if pump == "P1" { 10.0 } else { 100.0 };
    let data_points = (0..5)
        .map(|i| CurvePoint {
            flow: base + i as f64 * 2.0,
            head: 60.0 - i as f64 * 3.0,
            efficiency: 50.0 + i as f64 * 4.0,
            power: 8.0 + i as f64,
            impeller_dia: Some(250.0),
            all_data: BTreeMap::from([
                ("TestNo".to_string(), serde_json::json!(i + 1)),
                ("Speed".to_string(), serde_json::json!(rated_speed)),
                ("Flow".to_string(), serde_json::json!(base + i as f64 * 2.0)),
            ]),
        })
        .collect();
    CurveResponse {
        pump_type: pump.to_string(),
        stage: stage.to_string(),
        test_type: test_type.to_string(),
        rated_speed,
        data_points,
    }
}

pub fn new_app(catalog: Arc<dyn PumpCatalog>) -> (App, Sender<AppEvent>, Receiver<AppEvent>) {
    let (tx, rx) = std::sync::mpsc::channel();
    let config = AppConfig::default();
    let options = SessionOptions {
        url: String::new(),
        fallback_speed: 3000.0,
        timeout_secs: 5,
        debug: false,
    };
    let app = App::new(tx.clone(), catalog, &config, &options).unwrap();
    (app, tx, rx)
}

/// Pump events from the channel into the app until it has been quiet
/// for a while. Worker replies arrive asynchronously, so quiescence is
/// a bounded wait rather than a single drain.
pub fn settle(app: &mut App, tx: &Sender<AppEvent>, rx: &Receiver<AppEvent>) {
    while let Ok(event) = rx.recv_timeout(Duration::from_millis(500)) {
        if let Some(next) = app.event(&event) {
            tx.send(next).unwrap();
        }
    }
}
