//! The cascade: turning selection changes into the minimal set of
//! catalog requests, and deciding what an arriving reply is still
//! allowed to touch.
//!
//! Requests are never cancelled. A reply carries the selection scope
//! it was issued for; `apply_reply` compares that scope against the
//! live selection and silently drops anything stale, so out-of-order
//! network completion cannot resurrect an abandoned selection.

use crate::catalog::{CatalogPayload, CatalogReply, CatalogRequest, CurveResponse};
use crate::selection::SelectionState;

/// Which resolution level a failure is attributed to. Failures never
/// propagate across levels: a failed stages fetch leaves the pumps
/// enumeration (and everything else) alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    Pumps,
    Stages,
    TestTypes,
    SpeedStats,
    Curve,
}

impl ErrorScope {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorScope::Pumps => "pump types",
            ErrorScope::Stages => "stages",
            ErrorScope::TestTypes => "test types",
            ErrorScope::SpeedStats => "rated speeds",
            ErrorScope::Curve => "curve data",
        }
    }
}

/// A user-visible, level-scoped failure message.
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub scope: ErrorScope,
    pub message: String,
}

impl Advisory {
    fn new(scope: ErrorScope, detail: &str) -> Self {
        Self {
            scope,
            message: format!("Failed to load {}: {}", scope.label(), detail),
        }
    }
}

/// What a selection change requires of the session.
#[derive(Debug, Default, PartialEq)]
pub struct Plan {
    pub requests: Vec<CatalogRequest>,
    /// True when the change invalidates the active dataset outright
    /// (ancestor change), as opposed to merely superseding it.
    pub clear_dataset: bool,
}

impl Plan {
    fn none() -> Self {
        Self::default()
    }
}

/// What an arriving reply requires of the session.
#[derive(Debug, PartialEq)]
pub enum ReplyAction {
    /// Replace the dataset with this response (already verified current).
    ReplaceDataset(CurveResponse),
    /// Dispatch these follow-up requests.
    Dispatch(Vec<CatalogRequest>),
    /// Surface this scoped failure.
    Surface(Advisory),
    /// Stale reply or state-only update; nothing further to do.
    Settled,
}

/// Diff a pump selection into the requests it requires. A no-op change
/// (same pump, unknown pump) plans nothing.
pub fn select_pump(selection: &mut SelectionState, pump: &str) -> Plan {
    if !selection.set_pump(pump) {
        return Plan::none();
    }
    Plan {
        requests: vec![CatalogRequest::Stages {
            pump: pump.to_string(),
        }],
        clear_dataset: true,
    }
}

/// Diff a stage selection. Fans out the test-type enumeration and the
/// rated-speed stats concurrently; both are scoped to `(pump, stage)`.
pub fn select_stage(selection: &mut SelectionState, stage: &str) -> Plan {
    if !selection.set_stage(stage) {
        return Plan::none();
    }
    let pump = selection.pump().unwrap_or_default().to_string();
    Plan {
        requests: vec![
            CatalogRequest::TestTypes {
                pump: pump.clone(),
                stage: stage.to_string(),
            },
            CatalogRequest::SpeedStats {
                pump,
                stage: stage.to_string(),
                speed_edits: selection.speed_edits(),
            },
        ],
        clear_dataset: true,
    }
}

/// Diff a test-type selection. Completes the tuple, so it triggers the
/// curve fetch; the old dataset is superseded, not cleared.
pub fn select_test_type(selection: &mut SelectionState, test_type: &str) -> Plan {
    if !selection.set_test_type(test_type) {
        return Plan::none();
    }
    Plan {
        requests: curve_request(selection),
        clear_dataset: false,
    }
}

/// Diff a user speed edit. Only refetches when the triple is already
/// complete; otherwise the new speed simply waits for it to become so.
pub fn set_rated_speed(selection: &mut SelectionState, speed: f64) -> Plan {
    if !selection.set_rated_speed(speed) {
        return Plan::none();
    }
    Plan {
        requests: curve_request(selection),
        clear_dataset: false,
    }
}

fn curve_request(selection: &SelectionState) -> Vec<CatalogRequest> {
    match selection.curve_key() {
        Some(key) => vec![CatalogRequest::Curve {
            pump: key.pump,
            stage: key.stage,
            test_type: key.test_type,
            rated_speed: key.rated_speed,
        }],
        None => Vec::new(),
    }
}

/// True when a reply's issue-time scope still matches the live
/// selection. Anything else is a stale response and must be dropped
/// without touching state.
pub fn is_current(request: &CatalogRequest, selection: &SelectionState) -> bool {
    match request {
        // The pumps enumeration is session-scoped, never stale
        CatalogRequest::Pumps => true,
        CatalogRequest::Stages { pump } => selection.pump() == Some(pump.as_str()),
        CatalogRequest::TestTypes { pump, stage }
        | CatalogRequest::SpeedStats { pump, stage, .. } => {
            selection.pump() == Some(pump.as_str()) && selection.stage() == Some(stage.as_str())
        }
        CatalogRequest::Curve {
            pump,
            stage,
            test_type,
            rated_speed,
        } => selection.curve_key().is_some_and(|key| {
            key.pump == *pump
                && key.stage == *stage
                && key.test_type == *test_type
                && key.rated_speed == *rated_speed
        }),
    }
}

/// Apply an arrived reply to the selection, returning what the session
/// must do next. Stale replies (success or failure) settle silently.
pub fn apply_reply(selection: &mut SelectionState, reply: CatalogReply) -> ReplyAction {
    if !is_current(&reply.request, selection) {
        return ReplyAction::Settled;
    }

    match (reply.request, reply.result) {
        (CatalogRequest::Pumps, Ok(CatalogPayload::Pumps(pumps))) => {
            selection.set_pump_options(pumps);
            // Deterministic default: auto-select the first pump so the
            // session never sits in an empty, unusable state
            let first = selection.pumps().first().cloned();
            match first {
                Some(pump) if selection.pump().is_none() => {
                    ReplyAction::Dispatch(select_pump(selection, &pump).requests)
                }
                _ => ReplyAction::Settled,
            }
        }
        (CatalogRequest::Pumps, Err(e)) => ReplyAction::Surface(Advisory::new(ErrorScope::Pumps, &e)),

        (CatalogRequest::Stages { .. }, Ok(CatalogPayload::Stages(stages))) => {
            selection.set_stage_options(stages);
            ReplyAction::Settled
        }
        (CatalogRequest::Stages { .. }, Err(e)) => {
            ReplyAction::Surface(Advisory::new(ErrorScope::Stages, &e))
        }

        (CatalogRequest::TestTypes { .. }, Ok(CatalogPayload::TestTypes(test_types))) => {
            selection.set_test_type_options(test_types);
            ReplyAction::Settled
        }
        (CatalogRequest::TestTypes { .. }, Err(e)) => {
            ReplyAction::Surface(Advisory::new(ErrorScope::TestTypes, &e))
        }

        (
            CatalogRequest::SpeedStats { speed_edits, .. },
            Ok(CatalogPayload::SpeedStats(stats)),
        ) => {
            // If adopting the average changed the speed and the triple
            // is already complete, the visible curve is for the old
            // speed and must be refetched
            if selection.apply_speed_stats(stats, speed_edits) {
                ReplyAction::Dispatch(curve_request(selection))
            } else {
                ReplyAction::Settled
            }
        }
        // Non-fatal: rated speed keeps its last value
        (CatalogRequest::SpeedStats { .. }, Err(e)) => {
            ReplyAction::Surface(Advisory::new(ErrorScope::SpeedStats, &e))
        }

        (CatalogRequest::Curve { .. }, Ok(CatalogPayload::Curve(response))) => {
            ReplyAction::ReplaceDataset(response)
        }
        (CatalogRequest::Curve { .. }, Err(e)) => {
            ReplyAction::Surface(Advisory::new(ErrorScope::Curve, &e))
        }

        // Request/payload kind mismatch: treat as a malformed reply
        (request, Ok(_)) => ReplyAction::Surface(Advisory {
            scope: scope_of(&request),
            message: format!("Unexpected payload for {:?}", request),
        }),
    }
}

fn scope_of(request: &CatalogRequest) -> ErrorScope {
    match request {
        CatalogRequest::Pumps => ErrorScope::Pumps,
        CatalogRequest::Stages { .. } => ErrorScope::Stages,
        CatalogRequest::TestTypes { .. } => ErrorScope::TestTypes,
        CatalogRequest::SpeedStats { .. } => ErrorScope::SpeedStats,
        CatalogRequest::Curve { .. } => ErrorScope::Curve,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SpeedStats;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn reply(request: CatalogRequest, payload: CatalogPayload) -> CatalogReply {
        CatalogReply {
            request,
            result: Ok(payload),
        }
    }

    fn failed(request: CatalogRequest) -> CatalogReply {
        CatalogReply {
            request,
            result: Err("connection refused".to_string()),
        }
    }

    fn resolved_selection() -> SelectionState {
        let mut sel = SelectionState::new(3000.0);
        sel.set_pump_options(ids(&["P1", "P2"]));
        sel.set_pump("P1");
        sel.set_stage_options(ids(&["S1"]));
        sel.set_stage("S1");
        sel.set_test_type_options(ids(&["T1"]));
        sel.set_test_type("T1");
        sel
    }

    fn curve_response(n: usize) -> CurveResponse {
        CurveResponse {
            pump_type: "P1".to_string(),
            stage: "S1".to_string(),
            test_type: "T1".to_string(),
            rated_speed: 3000.0,
            data_points: (0..n)
                .map(|i| crate::catalog::CurvePoint {
                    flow: i as f64,
                    head: 50.0 - i as f64,
                    efficiency: 50.0 + i as f64,
                    power: 0.0,
                    impeller_dia: None,
                    all_data: Default::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn pumps_arrival_auto_selects_first_and_plans_stages() {
        let mut sel = SelectionState::new(3000.0);
        let action = apply_reply(
            &mut sel,
            reply(CatalogRequest::Pumps, CatalogPayload::Pumps(ids(&["P1", "P2"]))),
        );
        assert_eq!(sel.pump(), Some("P1"));
        assert_eq!(
            action,
            ReplyAction::Dispatch(vec![CatalogRequest::Stages {
                pump: "P1".to_string()
            }])
        );
    }

    #[test]
    fn empty_pumps_enumeration_selects_nothing() {
        let mut sel = SelectionState::new(3000.0);
        let action = apply_reply(
            &mut sel,
            reply(CatalogRequest::Pumps, CatalogPayload::Pumps(vec![])),
        );
        assert_eq!(sel.pump(), None);
        assert_eq!(action, ReplyAction::Settled);
    }

    #[test]
    fn stage_selection_fans_out_two_requests() {
        let mut sel = SelectionState::new(3000.0);
        sel.set_pump_options(ids(&["P1"]));
        sel.set_pump("P1");
        sel.set_stage_options(ids(&["S1"]));
        let plan = select_stage(&mut sel, "S1");
        assert!(plan.clear_dataset);
        assert_eq!(plan.requests.len(), 2);
        assert!(matches!(plan.requests[0], CatalogRequest::TestTypes { .. }));
        assert!(matches!(plan.requests[1], CatalogRequest::SpeedStats { .. }));
    }

    #[test]
    fn noop_changes_plan_nothing() {
        let mut sel = resolved_selection();
        assert_eq!(select_pump(&mut sel, "P1"), Plan::none());
        assert_eq!(select_pump(&mut sel, "P99"), Plan::none());
        assert_eq!(set_rated_speed(&mut sel, 3000.0), Plan::none());
    }

    #[test]
    fn completing_the_triple_requests_the_curve() {
        let mut sel = SelectionState::new(3000.0);
        sel.set_pump_options(ids(&["P1"]));
        sel.set_pump("P1");
        sel.set_stage_options(ids(&["S1"]));
        sel.set_stage("S1");
        sel.set_test_type_options(ids(&["T1"]));
        let plan = select_test_type(&mut sel, "T1");
        assert!(!plan.clear_dataset);
        assert_eq!(
            plan.requests,
            vec![CatalogRequest::Curve {
                pump: "P1".to_string(),
                stage: "S1".to_string(),
                test_type: "T1".to_string(),
                rated_speed: 3000.0,
            }]
        );
    }

    #[test]
    fn speed_change_without_complete_triple_requests_nothing() {
        let mut sel = SelectionState::new(3000.0);
        sel.set_pump_options(ids(&["P1"]));
        sel.set_pump("P1");
        let plan = set_rated_speed(&mut sel, 2900.0);
        assert!(plan.requests.is_empty());
        assert_eq!(sel.rated_speed(), 2900.0);
    }

    #[test]
    fn stale_stages_reply_is_dropped() {
        let mut sel = resolved_selection();
        // Reply scoped to a pump that is no longer selected
        let action = apply_reply(
            &mut sel,
            reply(
                CatalogRequest::Stages {
                    pump: "P2".to_string(),
                },
                CatalogPayload::Stages(ids(&["S9"])),
            ),
        );
        assert_eq!(action, ReplyAction::Settled);
        assert_eq!(sel.stages(), ids(&["S1"]).as_slice());
    }

    #[test]
    fn out_of_order_curve_replies_only_current_applies() {
        let mut sel = resolved_selection();
        let stale = CatalogRequest::Curve {
            pump: "P1".to_string(),
            stage: "S1".to_string(),
            test_type: "T1".to_string(),
            rated_speed: 2900.0, // selection has since moved to 3000
        };
        let current = CatalogRequest::Curve {
            pump: "P1".to_string(),
            stage: "S1".to_string(),
            test_type: "T1".to_string(),
            rated_speed: 3000.0,
        };

        // Later-issued response arrives first and is applied
        let action = apply_reply(&mut sel, reply(current, CatalogPayload::Curve(curve_response(3))));
        assert!(matches!(action, ReplyAction::ReplaceDataset(_)));

        // Earlier-issued response arrives second and is discarded
        let action = apply_reply(&mut sel, reply(stale, CatalogPayload::Curve(curve_response(9))));
        assert_eq!(action, ReplyAction::Settled);
    }

    #[test]
    fn stale_failure_is_silent() {
        let mut sel = resolved_selection();
        let action = apply_reply(
            &mut sel,
            failed(CatalogRequest::Stages {
                pump: "P2".to_string(),
            }),
        );
        assert_eq!(action, ReplyAction::Settled);
    }

    #[test]
    fn current_failure_surfaces_scoped_advisory_only() {
        let mut sel = resolved_selection();
        let action = apply_reply(
            &mut sel,
            failed(CatalogRequest::Stages {
                pump: "P1".to_string(),
            }),
        );
        match action {
            ReplyAction::Surface(advisory) => assert_eq!(advisory.scope, ErrorScope::Stages),
            other => panic!("expected advisory, got {:?}", other),
        }
        // Unrelated levels untouched
        assert_eq!(sel.pumps().len(), 2);
        assert_eq!(sel.pump(), Some("P1"));
    }

    #[test]
    fn stats_adoption_refetches_completed_curve() {
        let mut sel = resolved_selection();
        let serial = sel.speed_edits();
        let action = apply_reply(
            &mut sel,
            reply(
                CatalogRequest::SpeedStats {
                    pump: "P1".to_string(),
                    stage: "S1".to_string(),
                    speed_edits: serial,
                },
                CatalogPayload::SpeedStats(SpeedStats {
                    avg_speed: 2950.0,
                    min_speed: 2900.0,
                    max_speed: 3000.0,
                    common_speeds: vec![2900.0, 2950.0, 3000.0],
                }),
            ),
        );
        assert_eq!(sel.rated_speed(), 2950.0);
        match action {
            ReplyAction::Dispatch(requests) => {
                assert!(matches!(
                    requests.as_slice(),
                    [CatalogRequest::Curve { rated_speed, .. }] if *rated_speed == 2950.0
                ));
            }
            other => panic!("expected curve refetch, got {:?}", other),
        }
    }

    #[test]
    fn stats_after_user_edit_leave_speed_alone() {
        let mut sel = resolved_selection();
        let serial = sel.speed_edits();
        sel.set_rated_speed(3200.0);
        let action = apply_reply(
            &mut sel,
            reply(
                CatalogRequest::SpeedStats {
                    pump: "P1".to_string(),
                    stage: "S1".to_string(),
                    speed_edits: serial,
                },
                CatalogPayload::SpeedStats(SpeedStats {
                    avg_speed: 2950.0,
                    min_speed: 0.0,
                    max_speed: 0.0,
                    common_speeds: vec![],
                }),
            ),
        );
        assert_eq!(sel.rated_speed(), 3200.0);
        assert_eq!(action, ReplyAction::Settled);
    }
}
