#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::rc::Rc;

use plantnav_core::errors::NavError;
use plantnav_core::logging_facility::test_capture::init_test_capture;
use plantnav_core::{log_op_end, log_op_error, log_op_start};
use plantnav_core::{CloseReason, PanelManager, RecordingEventBus, RuleTable};
use plantnav_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture().unwrap();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, mode = "monitoring");

    let start_events = capture.matching(op_name, EVENT_START);

    assert_eq!(start_events.len(), 1);
    assert_eq!(start_events[0].field("mode"), Some("monitoring"));
}

#[test]
fn test_log_op_end_macro() {
    let capture = init_test_capture().unwrap();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42);

    let end_events = capture.matching(op_name, EVENT_END);
    assert_eq!(end_events.len(), 1, "Should have exactly one end event");
    assert_eq!(end_events[0].field("duration_ms"), Some("42"));
    assert!(end_events[0].field("component").is_some());
}

#[test]
fn test_log_op_error_includes_code() {
    let capture = init_test_capture().unwrap();
    let op_name = "test_log_op_error_unique_3";

    let err = NavError::UnknownMode {
        mode: "nowhere".to_string(),
    };
    log_op_error!(op_name, err, duration_ms = 10);

    let error_events = capture.matching(op_name, EVENT_END_ERROR);
    assert_eq!(error_events.len(), 1, "Should have exactly one error event");
    assert_eq!(error_events[0].field("err.code"), Some("ERR_UNKNOWN_MODE"));
    assert_eq!(error_events[0].level, tracing::Level::ERROR);
}

#[test]
fn test_panel_reconciliation_logs_boundaries() {
    let capture = init_test_capture().unwrap();
    let rules = Rc::new(RuleTable::builtin().unwrap());
    let manager = PanelManager::new(rules, Rc::new(RecordingEventBus::new()));

    manager.handle_mode_change("analysis", Some("trend-view"));

    capture.assert_event_exists("panel_mode_change", EVENT_START);
    capture.assert_event_exists("panel_mode_change", EVENT_END);
}

#[test]
fn test_undeclared_panel_logs_error_with_unknown_panel() {
    let capture = init_test_capture().unwrap();
    let rules = Rc::new(RuleTable::builtin().unwrap());
    let manager = PanelManager::new(rules, Rc::new(RecordingEventBus::new()));

    assert!(!manager.register_open("ghost-panel-open"));
    assert!(!manager.close("ghost-panel-close", CloseReason::User));

    for panel in ["ghost-panel-open", "ghost-panel-close"] {
        let events: Vec<_> = capture
            .events()
            .into_iter()
            .filter(|e| e.field("panel") == Some(panel))
            .collect();
        assert_eq!(events.len(), 1, "one event for {}", panel);
        assert_eq!(events[0].level, tracing::Level::ERROR);
        assert_eq!(
            events[0].field("error"),
            Some(format!("Unknown panel: {}", panel).as_str())
        );
    }
}

#[test]
fn test_refused_panel_logs_not_allowed_reason() {
    let capture = init_test_capture().unwrap();
    let rules = Rc::new(RuleTable::builtin().unwrap());
    let manager = PanelManager::new(rules, Rc::new(RecordingEventBus::new()));
    manager.handle_mode_change("analysis", Some("trend-view"));

    assert!(!manager.register_open("equipment-edit-modal"));

    let refused: Vec<_> = capture
        .events()
        .into_iter()
        .filter(|e| {
            e.field("error")
                == Some("Panel equipment-edit-modal is not allowed in mode analysis")
        })
        .collect();
    assert_eq!(refused.len(), 1);
    assert_eq!(refused[0].level, tracing::Level::DEBUG);
}
