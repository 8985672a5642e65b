#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::Cell;
use std::rc::Rc;

use plantnav_core::{
    CloseReason, ExError, MemoryDom, NavEvent, PanelManager, RecordingEventBus, RuleTable,
};

struct Fixture {
    manager: PanelManager,
    bus: Rc<RecordingEventBus>,
    edit_modal_closes: Rc<Cell<u32>>,
}

fn fixture() -> Fixture {
    let rules = Rc::new(RuleTable::builtin().unwrap());
    let bus = Rc::new(RecordingEventBus::new());
    let dom = Rc::new(MemoryDom::with_elements([
        "#equipment-info-panel",
        "#layout-property-panel",
        "#debug-panel",
    ]));
    let manager = PanelManager::new(rules, bus.clone()).with_dom(dom);

    let edit_modal_closes = Rc::new(Cell::new(0));
    let closes = edit_modal_closes.clone();
    manager.register_instance(
        "equipment-edit-modal",
        Rc::new(move || -> Result<(), ExError> {
            closes.set(closes.get() + 1);
            Ok(())
        }),
    );

    Fixture {
        manager,
        bus,
        edit_modal_closes,
    }
}

#[test]
fn test_edit_modal_closed_when_entering_analysis() {
    let f = fixture();
    f.manager.handle_mode_change("monitoring", Some("3d-view"));
    assert!(f.manager.register_open("equipment-edit-modal"));
    f.bus.clear();

    let report = f.manager.handle_mode_change("analysis", Some("trend-view"));

    assert_eq!(report.closed, vec!["equipment-edit-modal".to_string()]);
    assert!(report.failed.is_empty());
    assert_eq!(report.from_mode.as_deref(), Some("monitoring"));
    assert_eq!(f.edit_modal_closes.get(), 1);
    assert!(!f.manager.is_open("equipment-edit-modal"));

    assert_eq!(
        f.bus.topics(),
        vec![
            "panel:closed",
            "panel:equipment-edit-modal:closed",
            "panel:mode-change-processed",
        ]
    );
    let events = f.bus.events();
    assert!(matches!(
        &events[0],
        NavEvent::PanelClosed { reason: CloseReason::ModeChange, .. }
    ));
    match &events[2] {
        NavEvent::ModeChangeProcessed {
            from_mode,
            to_mode,
            closed,
            ..
        } => {
            assert_eq!(from_mode.as_deref(), Some("monitoring"));
            assert_eq!(to_mode, "analysis");
            assert_eq!(closed, &vec!["equipment-edit-modal".to_string()]);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_sticky_panels_survive_every_mode_change() {
    let f = fixture();
    f.manager.handle_mode_change("main_viewer", Some("3d-view"));
    assert!(f.manager.register_open("debug-panel"));
    assert!(f.manager.register_open("equipment-info-panel"));

    let report = f.manager.handle_mode_change("settings", Some("general"));

    assert_eq!(report.closed, vec!["equipment-info-panel".to_string()]);
    assert!(f.manager.is_open("debug-panel"));
    assert_eq!(f.manager.open_panels(), vec!["debug-panel".to_string()]);
}

#[test]
fn test_legal_panel_stays_open_across_submode_change() {
    let f = fixture();
    f.manager.handle_mode_change("monitoring", Some("3d-view"));
    f.manager.register_open("equipment-edit-modal");

    let report = f.manager.handle_mode_change("monitoring", Some("ranking-view"));

    assert!(report.closed.is_empty());
    assert!(f.manager.is_open("equipment-edit-modal"));
}

#[test]
fn test_failed_close_is_reported_and_panel_kept() {
    let f = fixture();
    f.manager.handle_mode_change("monitoring", Some("3d-view"));
    f.manager.register_open("equipment-edit-modal");
    f.manager.unregister_instance("equipment-edit-modal");

    let report = f.manager.handle_mode_change("analysis", None);

    assert!(report.closed.is_empty());
    assert_eq!(report.failed, vec!["equipment-edit-modal".to_string()]);
    assert!(f.manager.is_open("equipment-edit-modal"));
}

#[test]
fn test_register_open_fails_outside_allowed_modes() {
    let f = fixture();
    let rules = RuleTable::builtin().unwrap();
    for panel in rules.panels().iter().filter(|p| !p.allows_any_mode()) {
        for mode in rules.modes() {
            if panel.allowed_modes.contains(&mode.key) {
                continue;
            }
            f.manager.track(mode.key.clone(), None);
            assert!(
                !f.manager.register_open(&panel.key),
                "{} opened in {}",
                panel.key,
                mode.key
            );
            assert!(!f.manager.is_open(&panel.key));
        }
    }
}
