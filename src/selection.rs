//! The four-level selection hierarchy (pump → stage → test type → rated
//! speed) and its invalidation rules.
//!
//! A descendant level is only meaningful relative to its ancestors:
//! changing a pump discards the stage and test type along with their
//! option lists, changing a stage discards the test type. Every
//! mutation goes through a setter so those rules cannot be bypassed.

use crate::catalog::SpeedStats;

/// The complete four-tuple a curve fetch is keyed on.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveKey {
    pub pump: String,
    pub stage: String,
    pub test_type: String,
    pub rated_speed: f64,
}

#[derive(Debug)]
pub struct SelectionState {
    pumps: Vec<String>,
    stages: Vec<String>,
    test_types: Vec<String>,
    pump: Option<String>,
    stage: Option<String>,
    test_type: Option<String>,
    rated_speed: f64,
    /// Serial incremented on every explicit user speed edit. Speed
    /// stats only auto-populate the speed when the serial still equals
    /// the value captured when the stats request was issued.
    speed_edits: u64,
    speed_stats: Option<SpeedStats>,
}

impl SelectionState {
    pub fn new(fallback_speed: f64) -> Self {
        Self {
            pumps: Vec::new(),
            stages: Vec::new(),
            test_types: Vec::new(),
            pump: None,
            stage: None,
            test_type: None,
            rated_speed: fallback_speed,
            speed_edits: 0,
            speed_stats: None,
        }
    }

    pub fn pumps(&self) -> &[String] {
        &self.pumps
    }

    pub fn stages(&self) -> &[String] {
        &self.stages
    }

    pub fn test_types(&self) -> &[String] {
        &self.test_types
    }

    pub fn pump(&self) -> Option<&str> {
        self.pump.as_deref()
    }

    pub fn stage(&self) -> Option<&str> {
        self.stage.as_deref()
    }

    pub fn test_type(&self) -> Option<&str> {
        self.test_type.as_deref()
    }

    pub fn rated_speed(&self) -> f64 {
        self.rated_speed
    }

    pub fn speed_edits(&self) -> u64 {
        self.speed_edits
    }

    pub fn speed_stats(&self) -> Option<&SpeedStats> {
        self.speed_stats.as_ref()
    }

    /// The full fetch tuple, present only when all three ancestor
    /// levels are selected.
    pub fn curve_key(&self) -> Option<CurveKey> {
        Some(CurveKey {
            pump: self.pump.clone()?,
            stage: self.stage.clone()?,
            test_type: self.test_type.clone()?,
            rated_speed: self.rated_speed,
        })
    }

    /// Install a fresh pumps enumeration. Clears any selection that is
    /// no longer listed (which cascades through descendants).
    pub fn set_pump_options(&mut self, pumps: Vec<String>) {
        self.pumps = pumps;
        if let Some(current) = &self.pump {
            if !self.pumps.contains(current) {
                self.clear_pump();
            }
        }
    }

    pub fn set_stage_options(&mut self, stages: Vec<String>) {
        self.stages = stages;
        if let Some(current) = &self.stage {
            if !self.stages.contains(current) {
                self.clear_stage();
            }
        }
    }

    pub fn set_test_type_options(&mut self, test_types: Vec<String>) {
        self.test_types = test_types;
        if let Some(current) = &self.test_type {
            if !self.test_types.contains(current) {
                self.test_type = None;
            }
        }
    }

    /// Select a pump. Returns false (and changes nothing) when the
    /// value is not in the known enumeration or is already selected.
    /// On success the stage and test-type levels are invalidated.
    pub fn set_pump(&mut self, pump: &str) -> bool {
        if self.pump.as_deref() == Some(pump) || !self.pumps.iter().any(|p| p == pump) {
            return false;
        }
        self.pump = Some(pump.to_string());
        self.stages.clear();
        self.clear_stage();
        true
    }

    /// Select a stage under the current pump. Requires a pump to be
    /// selected and the stage to be enumerated. Invalidates the
    /// test-type level and the speed stats.
    pub fn set_stage(&mut self, stage: &str) -> bool {
        if self.pump.is_none()
            || self.stage.as_deref() == Some(stage)
            || !self.stages.iter().any(|s| s == stage)
        {
            return false;
        }
        self.stage = Some(stage.to_string());
        self.test_types.clear();
        self.test_type = None;
        self.speed_stats = None;
        true
    }

    /// Select a test type under the current `(pump, stage)`.
    pub fn set_test_type(&mut self, test_type: &str) -> bool {
        if self.stage.is_none()
            || self.test_type.as_deref() == Some(test_type)
            || !self.test_types.iter().any(|t| t == test_type)
        {
            return false;
        }
        self.test_type = Some(test_type.to_string());
        true
    }

    /// Explicit user speed edit. Free-form numeric, no validation
    /// against an enumeration; bumps the edit serial so in-flight
    /// stats cannot overwrite it.
    pub fn set_rated_speed(&mut self, speed: f64) -> bool {
        if !speed.is_finite() || speed <= 0.0 || speed == self.rated_speed {
            return false;
        }
        self.rated_speed = speed;
        self.speed_edits += 1;
        true
    }

    /// Apply arrived speed stats. The suggested average only replaces
    /// the rated speed when no user edit happened after the stats
    /// request was issued (last writer wins per level). Returns true
    /// when the speed actually changed.
    pub fn apply_speed_stats(&mut self, stats: SpeedStats, issued_serial: u64) -> bool {
        let adopt = self.speed_edits == issued_serial && stats.avg_speed.is_finite();
        let avg = stats.avg_speed;
        self.speed_stats = Some(stats);
        if adopt && avg != self.rated_speed {
            self.rated_speed = avg;
            return true;
        }
        false
    }

    fn clear_pump(&mut self) {
        self.pump = None;
        self.stages.clear();
        self.clear_stage();
    }

    fn clear_stage(&mut self) {
        self.stage = None;
        self.test_types.clear();
        self.test_type = None;
        self.speed_stats = None;
    }
}
