//! Panel lifecycle manager
//!
//! Each panel is either closed or open. The open set changes only through
//! `register_open`, `close` and their batch forms, plus a single best-effort
//! DOM scan at start-up. If the host mutates panel elements behind the
//! manager's back the set goes stale; that is accepted and not corrected.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tracing::{debug, error, info, warn};

use crate::bus::EventBus;
use crate::dom::DomEnvironment;
use crate::errors::{ExError, NavError};
use crate::events::{CloseReason, NavEvent};
use crate::rules::{DomCloseAction, PanelCloseMethod, PanelRule, RuleTable};
use crate::{log_op_end, log_op_start};

use super::{PanelHandle, PanelInstanceLocator};

/// Outcome of reconciling the open set against a new mode/submode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeChangeReport {
    pub from_mode: Option<String>,
    pub from_submode: Option<String>,
    pub to_mode: String,
    pub to_submode: Option<String>,
    /// Panels closed by the reconciliation
    pub closed: Vec<String>,
    /// Panels that should have closed but whose close dispatch failed
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Tracked {
    mode: Option<String>,
    submode: Option<String>,
}

pub struct PanelManager {
    rules: Rc<RuleTable>,
    bus: Rc<dyn EventBus>,
    dom: Option<Rc<dyn DomEnvironment>>,
    open: RefCell<BTreeSet<String>>,
    tracked: RefCell<Tracked>,
    instances: RefCell<HashMap<String, Rc<dyn PanelHandle>>>,
    locator: RefCell<Option<Rc<dyn PanelInstanceLocator>>>,
    scanned: Cell<bool>,
}

impl PanelManager {
    pub fn new(rules: Rc<RuleTable>, bus: Rc<dyn EventBus>) -> Self {
        Self {
            rules,
            bus,
            dom: None,
            open: RefCell::new(BTreeSet::new()),
            tracked: RefCell::new(Tracked::default()),
            instances: RefCell::new(HashMap::new()),
            locator: RefCell::new(None),
            scanned: Cell::new(false),
        }
    }

    /// Attach the DOM used for `dom` close methods and the start-up scan
    pub fn with_dom(mut self, dom: Rc<dyn DomEnvironment>) -> Self {
        self.dom = Some(dom);
        self
    }

    /// Register the live instance closed for panels with `method: instance`
    pub fn register_instance(&self, target: impl Into<String>, handle: Rc<dyn PanelHandle>) {
        self.instances.borrow_mut().insert(target.into(), handle);
    }

    pub fn unregister_instance(&self, target: &str) -> bool {
        self.instances.borrow_mut().remove(target).is_some()
    }

    /// Consulted when no instance was registered for a target
    pub fn set_instance_locator(&self, locator: Rc<dyn PanelInstanceLocator>) {
        *self.locator.borrow_mut() = Some(locator);
    }

    /// Record the active mode/submode without reconciling
    pub fn track(&self, mode: impl Into<String>, submode: Option<String>) {
        *self.tracked.borrow_mut() = Tracked {
            mode: Some(mode.into()),
            submode,
        };
    }

    pub fn tracked_mode(&self) -> Option<String> {
        self.tracked.borrow().mode.clone()
    }

    pub fn tracked_submode(&self) -> Option<String> {
        self.tracked.borrow().submode.clone()
    }

    pub fn is_open(&self, panel: &str) -> bool {
        self.open.borrow().contains(panel)
    }

    pub fn open_panels(&self) -> Vec<String> {
        self.open.borrow().iter().cloned().collect()
    }

    /// Whether `panel` may be open in `mode`/`submode`; unknown panels never are
    pub fn is_allowed(&self, panel: &str, mode: Option<&str>, submode: Option<&str>) -> bool {
        self.rules
            .panel(panel)
            .is_some_and(|rule| rule.is_allowed(mode, submode))
    }

    /// Open auto-close panels that would be illegal in `mode`/`submode`
    pub fn panels_to_close(&self, mode: &str, submode: Option<&str>) -> Vec<String> {
        self.open
            .borrow()
            .iter()
            .filter(|key| {
                self.rules.panel(key).is_some_and(|rule| {
                    rule.auto_close_on_mode_change && !rule.is_allowed(Some(mode), submode)
                })
            })
            .cloned()
            .collect()
    }

    /// Seed the open set from the DOM; only the first call does anything
    ///
    /// Returns the panels found open.
    pub fn scan_dom(&self) -> Vec<String> {
        if self.scanned.replace(true) {
            debug!("panel scan already performed");
            return Vec::new();
        }
        let Some(dom) = self.dom.as_ref() else {
            debug!("no DOM attached, skipping panel scan");
            return Vec::new();
        };

        let found: Vec<String> = self
            .rules
            .panels()
            .iter()
            .filter(|rule| appears_open(dom.as_ref(), rule))
            .map(|rule| rule.key.clone())
            .collect();

        self.open.borrow_mut().extend(found.iter().cloned());
        info!(found = found.len(), "panel scan complete");
        found
    }

    /// Mark `panel` open if it is legal under the tracked mode/submode
    pub fn register_open(&self, panel: &str) -> bool {
        let Some(rule) = self.rules.panel(panel) else {
            let err = unknown_panel(panel);
            error!(panel, error = %err, "cannot open undeclared panel");
            return false;
        };

        let refused = {
            let tracked = self.tracked.borrow();
            (!rule.is_allowed(tracked.mode.as_deref(), tracked.submode.as_deref())).then(|| {
                NavError::PanelNotAllowed {
                    panel: panel.to_string(),
                    mode: tracked.mode.clone().unwrap_or_default(),
                }
            })
        };
        if let Some(err) = refused {
            debug!(panel, error = %err, "panel not allowed in tracked mode");
            return false;
        }

        if !self.open.borrow_mut().insert(panel.to_string()) {
            return true;
        }
        debug!(panel, "panel opened");
        self.bus.publish(NavEvent::PanelOpened {
            panel: panel.to_string(),
        });
        true
    }

    /// Close `panel`; already-closed panels succeed without side effects
    ///
    /// The panel is only marked closed when its close method succeeds.
    pub fn close(&self, panel: &str, reason: CloseReason) -> bool {
        let Some(rule) = self.rules.panel(panel) else {
            let err = unknown_panel(panel);
            error!(panel, error = %err, "cannot close undeclared panel");
            return false;
        };
        if !self.is_open(panel) {
            return true;
        }

        if let Err(err) = self.dispatch_close(rule) {
            warn!(
                panel,
                method = rule.close.as_str(),
                error = %err,
                "panel close failed, keeping it open"
            );
            return false;
        }

        self.open.borrow_mut().remove(panel);
        debug!(panel, reason = reason.as_str(), "panel closed");
        self.bus.publish(NavEvent::PanelClosed {
            panel: panel.to_string(),
            reason,
        });
        if let Some(event) = &rule.close_event {
            self.bus.publish(NavEvent::PanelCloseNotification {
                event: event.clone(),
                panel: panel.to_string(),
                reason,
            });
        }
        true
    }

    /// Close every open panel; returns the ones actually closed
    pub fn close_all(&self, reason: CloseReason) -> Vec<String> {
        let closed: Vec<String> = self
            .open_panels()
            .into_iter()
            .filter(|panel| self.close(panel, reason))
            .collect();
        self.bus.publish(NavEvent::AllPanelsClosed {
            reason,
            closed: closed.clone(),
        });
        closed
    }

    /// Track the new mode/submode and close auto-close panels it forbids
    ///
    /// Call exactly once per accepted transition.
    pub fn handle_mode_change(&self, mode: &str, submode: Option<&str>) -> ModeChangeReport {
        log_op_start!("panel_mode_change", mode = mode);
        let start = std::time::Instant::now();

        let from = self.tracked.replace(Tracked {
            mode: Some(mode.to_string()),
            submode: submode.map(str::to_string),
        });

        let mut report = ModeChangeReport {
            from_mode: from.mode,
            from_submode: from.submode,
            to_mode: mode.to_string(),
            to_submode: submode.map(str::to_string),
            ..ModeChangeReport::default()
        };

        for panel in self.panels_to_close(mode, submode) {
            if self.close(&panel, CloseReason::ModeChange) {
                report.closed.push(panel);
            } else {
                report.failed.push(panel);
            }
        }

        self.bus.publish(NavEvent::ModeChangeProcessed {
            from_mode: report.from_mode.clone(),
            from_submode: report.from_submode.clone(),
            to_mode: report.to_mode.clone(),
            to_submode: report.to_submode.clone(),
            closed: report.closed.clone(),
        });

        log_op_end!(
            "panel_mode_change",
            duration_ms = start.elapsed().as_millis() as u64,
            closed = report.closed.len(),
            failed = report.failed.len()
        );
        report
    }

    fn instance_for(&self, target: &str) -> Option<Rc<dyn PanelHandle>> {
        let registered = self.instances.borrow().get(target).cloned();
        registered.or_else(|| {
            let locator = self.locator.borrow().clone();
            locator.and_then(|l| l.locate(target))
        })
    }

    fn dispatch_close(&self, rule: &PanelRule) -> Result<(), ExError> {
        match &rule.close {
            PanelCloseMethod::Instance { target } => {
                let handle = self.instance_for(target).ok_or_else(|| -> ExError {
                    NavError::PanelInstanceMissing {
                        panel: rule.key.clone(),
                        target: target.clone(),
                    }
                    .into()
                })?;
                handle.close()
            }
            PanelCloseMethod::Dom {
                selector,
                action,
                class,
            } => {
                let dom = self.dom.as_ref().ok_or_else(|| -> ExError {
                    NavError::CollaboratorMissing {
                        collaborator: "dom".to_string(),
                    }
                    .into()
                })?;
                let element = dom.lookup(selector).ok_or_else(|| -> ExError {
                    NavError::ElementNotFound {
                        locator: selector.clone(),
                    }
                    .into()
                })?;
                match action {
                    DomCloseAction::Hide => dom.set_style(&element, "display", "none"),
                    DomCloseAction::AddClass | DomCloseAction::RemoveClass => {
                        let class = class.as_deref().ok_or_else(|| -> ExError {
                            NavError::InvalidRules {
                                reason: format!("panel {} close action needs a class", rule.key),
                            }
                            .into()
                        })?;
                        if *action == DomCloseAction::AddClass {
                            dom.add_class(&element, class)
                        } else {
                            dom.remove_class(&element, class)
                        }
                    }
                }
            }
        }
    }
}

/// Best guess at whether a panel is showing, judged from its element
fn unknown_panel(panel: &str) -> NavError {
    NavError::UnknownPanel {
        panel: panel.to_string(),
    }
}

fn appears_open(dom: &dyn DomEnvironment, rule: &PanelRule) -> bool {
    let Some(selector) = rule.probe_selector() else {
        return false;
    };
    let Some(element) = dom.lookup(selector) else {
        return false;
    };
    let displayed = dom.style(&element, "display").as_deref() != Some("none");
    match &rule.close {
        PanelCloseMethod::Dom {
            action: DomCloseAction::AddClass,
            class: Some(class),
            ..
        } => displayed && !dom.has_class(&element, class),
        PanelCloseMethod::Dom {
            action: DomCloseAction::RemoveClass,
            class: Some(class),
            ..
        } => displayed && dom.has_class(&element, class),
        _ => displayed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::RecordingEventBus;
    use crate::dom::MemoryDom;

    fn manager() -> (PanelManager, Rc<RecordingEventBus>, Rc<MemoryDom>) {
        let rules = Rc::new(RuleTable::builtin().unwrap());
        let bus = Rc::new(RecordingEventBus::new());
        let dom = Rc::new(MemoryDom::with_elements([
            "#equipment-info-panel",
            "#layout-property-panel",
            "#debug-panel",
        ]));
        let manager = PanelManager::new(rules, bus.clone()).with_dom(dom.clone());
        (manager, bus, dom)
    }

    #[test]
    fn test_register_open_respects_allowed_modes() {
        let (manager, bus, _) = manager();
        manager.track("analysis", Some("trend-view".to_string()));

        assert!(!manager.register_open("equipment-info-panel"));
        assert!(!manager.is_open("equipment-info-panel"));
        assert!(manager.register_open("debug-panel"));
        assert_eq!(bus.topics(), vec!["panel:opened"]);
    }

    #[test]
    fn test_untracked_only_admits_wildcard_panels() {
        let (manager, _, _) = manager();
        assert!(!manager.register_open("equipment-info-panel"));
        assert!(manager.register_open("connection-modal"));
    }

    #[test]
    fn test_register_open_is_idempotent() {
        let (manager, bus, _) = manager();
        manager.track("main_viewer", Some("3d-view".to_string()));
        assert!(manager.register_open("equipment-info-panel"));
        assert!(manager.register_open("equipment-info-panel"));
        assert_eq!(bus.count("panel:opened"), 1);
    }

    #[test]
    fn test_unknown_panel_rejected() {
        let (manager, _, _) = manager();
        assert!(!manager.register_open("no-such-panel"));
        assert!(!manager.close("no-such-panel", CloseReason::User));
    }

    #[test]
    fn test_dom_close_hides_element() {
        let (manager, bus, dom) = manager();
        manager.track("main_viewer", Some("3d-view".to_string()));
        manager.register_open("equipment-info-panel");

        assert!(manager.close("equipment-info-panel", CloseReason::User));
        assert_eq!(
            dom.style_of("#equipment-info-panel", "display").as_deref(),
            Some("none")
        );
        assert!(!manager.is_open("equipment-info-panel"));
        assert_eq!(bus.count("panel:closed"), 1);

        // already closed
        assert!(manager.close("equipment-info-panel", CloseReason::User));
        assert_eq!(bus.count("panel:closed"), 1);
    }

    #[test]
    fn test_failed_dispatch_keeps_panel_open() {
        let (manager, bus, _) = manager();
        manager.track("monitoring", Some("3d-view".to_string()));
        manager.register_open("equipment-edit-modal");

        // no instance registered, no locator
        assert!(!manager.close("equipment-edit-modal", CloseReason::User));
        assert!(manager.is_open("equipment-edit-modal"));
        assert_eq!(bus.count("panel:closed"), 0);
    }

    #[test]
    fn test_registered_instance_preferred_over_locator() {
        struct Locator(Rc<Cell<u32>>);
        impl PanelInstanceLocator for Locator {
            fn locate(&self, _target: &str) -> Option<Rc<dyn PanelHandle>> {
                let hits = self.0.clone();
                Some(Rc::new(move || -> Result<(), ExError> {
                    hits.set(hits.get() + 1);
                    Ok(())
                }))
            }
        }

        let (manager, _, _) = manager();
        let located = Rc::new(Cell::new(0));
        let registered = Rc::new(Cell::new(0));
        manager.set_instance_locator(Rc::new(Locator(located.clone())));
        let r = registered.clone();
        manager.register_instance(
            "connection-modal",
            Rc::new(move || -> Result<(), ExError> {
                r.set(r.get() + 1);
                Ok(())
            }),
        );

        manager.register_open("connection-modal");
        assert!(manager.close("connection-modal", CloseReason::User));
        assert_eq!((registered.get(), located.get()), (1, 0));

        manager.unregister_instance("connection-modal");
        manager.register_open("connection-modal");
        assert!(manager.close("connection-modal", CloseReason::User));
        assert_eq!((registered.get(), located.get()), (1, 1));
    }

    #[test]
    fn test_panels_to_close_skips_sticky_panels() {
        let (manager, _, _) = manager();
        manager.track("main_viewer", Some("3d-view".to_string()));
        manager.register_open("equipment-info-panel");
        manager.register_open("debug-panel");

        assert_eq!(
            manager.panels_to_close("analysis", Some("trend-view")),
            vec!["equipment-info-panel".to_string()]
        );
    }

    #[test]
    fn test_submode_only_checked_when_present() {
        let (manager, _, _) = manager();
        manager.track("layout", Some("editor".to_string()));
        manager.register_open("layout-property-panel");
        assert!(manager.panels_to_close("layout", None).is_empty());
        assert_eq!(manager.panels_to_close("layout", Some("3d-view")).len(), 1);
    }

    #[test]
    fn test_scan_dom_runs_once() {
        let (manager, bus, dom) = manager();
        let debug = dom.lookup("#debug-panel").unwrap();
        dom.add_class(&debug, "hidden").unwrap();
        let layout = dom.lookup("#layout-property-panel").unwrap();
        dom.add_class(&layout, "open").unwrap();

        let found = manager.scan_dom();
        assert_eq!(
            found,
            vec![
                "equipment-info-panel".to_string(),
                "layout-property-panel".to_string()
            ]
        );
        assert!(manager.is_open("layout-property-panel"));
        assert!(!manager.is_open("debug-panel"));
        assert!(bus.events().is_empty());

        manager.close("equipment-info-panel", CloseReason::User);
        assert!(manager.scan_dom().is_empty());
        assert!(!manager.is_open("equipment-info-panel"));
    }

    #[test]
    fn test_close_all_lists_closed_panels() {
        let (manager, bus, _) = manager();
        manager.track("main_viewer", Some("3d-view".to_string()));
        manager.register_open("equipment-info-panel");
        manager.register_open("connection-modal");

        let closed = manager.close_all(CloseReason::Programmatic);
        // connection-modal has no instance to close
        assert_eq!(closed, vec!["equipment-info-panel".to_string()]);
        assert_eq!(manager.open_panels(), vec!["connection-modal".to_string()]);

        match bus.events().last().unwrap() {
            NavEvent::AllPanelsClosed { reason, closed } => {
                assert_eq!(*reason, CloseReason::Programmatic);
                assert_eq!(closed, &vec!["equipment-info-panel".to_string()]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
