//! Navigation state machine
//!
//! `Navigator::navigate` is the single transition entry point; the other
//! navigation operations are sugar over it. It never returns an error:
//! callers get a boolean (or a `NavigationOutcome` from `navigate_with`)
//! and failures are logged and published on the bus.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use plantnav_core::core_types::schema::REASON_CONNECTION_REQUIRED;
use plantnav_core::core_types::TransitionId;
use plantnav_core::errors::{NavError, Result};
use plantnav_core::{
    compose_layers, log_op_end, log_op_error, log_op_start, DomEnvironment, EventBus, ExError,
    LayerApplier, LayerHandler, ModeRule, NavEvent, NavigationHistory, NavigationState,
    PanelManager, RuleTable, SubmodeRule,
};
use tracing::{debug, error, info_span, warn, Instrument};

use crate::collaborators::{ConnectionProbe, ModeAuthority, ViewSubsystem};
use crate::config::NavigatorConfig;
use crate::executor::{TransitionExecutor, TransitionPlan, TransitionReport};
use crate::options::NavigateOptions;

/// Result of one navigation request
#[derive(Debug, Clone)]
pub enum NavigationOutcome {
    /// The pipeline ran and the new state was committed
    Completed(TransitionReport),
    /// Already at the target; nothing was touched
    Unchanged,
    /// Refused before anything ran
    Rejected(ExError),
    /// The connection gate refused the target
    Blocked { reason: String, error: ExError },
    /// The pipeline aborted; state was not committed
    Failed {
        error: ExError,
        report: TransitionReport,
    },
}

impl NavigationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            NavigationOutcome::Completed(_) | NavigationOutcome::Unchanged
        )
    }

    pub fn report(&self) -> Option<&TransitionReport> {
        match self {
            NavigationOutcome::Completed(report) | NavigationOutcome::Failed { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ExError> {
        match self {
            NavigationOutcome::Rejected(error)
            | NavigationOutcome::Blocked { error, .. }
            | NavigationOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Which submode a request targets
#[derive(Debug, Clone, Copy)]
enum SubmodeSelector<'a> {
    /// The mode's default submode, if it has one
    Default,
    /// Exactly this submode, or none at all
    Exact(Option<&'a str>),
}

/// Counts transitions in flight; released on drop whatever the exit path
struct InFlightGuard<'a> {
    counter: &'a Cell<usize>,
}

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a Cell<usize>) -> Self {
        counter.set(counter.get() + 1);
        Self { counter }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.set(self.counter.get().saturating_sub(1));
    }
}

pub struct Navigator {
    rules: Rc<RuleTable>,
    config: NavigatorConfig,
    bus: Rc<dyn EventBus>,
    authority: Rc<dyn ModeAuthority>,
    probe: Option<Rc<dyn ConnectionProbe>>,
    executor: TransitionExecutor,
    panels: Rc<PanelManager>,
    history: RefCell<NavigationHistory>,
    in_flight: Cell<usize>,
    started: Cell<bool>,
    /// Set when a pipeline aborted after teardown; cleared by the next commit
    desynced: Cell<bool>,
    last_report: RefCell<Option<TransitionReport>>,
}

impl Navigator {
    pub fn builder(rules: Rc<RuleTable>) -> NavigatorBuilder {
        NavigatorBuilder::new(rules)
    }

    /// Seed panels from the DOM and apply the home state
    ///
    /// Runs the full pipeline, forced and without a history entry.
    pub async fn start(&self) -> bool {
        self.panels.scan_dom();
        let home = self.config.home_mode.clone();
        let options = NavigateOptions::new().forced().without_history();
        self.navigate_to(&home, SubmodeSelector::Default, options)
            .await
            .is_success()
    }

    /// Navigate to `mode`, and `submode` or the mode's default submode
    pub async fn navigate(
        &self,
        mode: &str,
        submode: Option<&str>,
        options: NavigateOptions,
    ) -> bool {
        self.navigate_with(mode, submode, options).await.is_success()
    }

    /// Like `navigate`, returning the full outcome
    pub async fn navigate_with(
        &self,
        mode: &str,
        submode: Option<&str>,
        options: NavigateOptions,
    ) -> NavigationOutcome {
        let selector = match submode {
            Some(key) => SubmodeSelector::Exact(Some(key)),
            None => SubmodeSelector::Default,
        };
        self.navigate_to(mode, selector, options).await
    }

    /// Navigate to `mode` and its default submode
    pub async fn navigate_mode(&self, mode: &str, options: NavigateOptions) -> bool {
        self.navigate(mode, None, options).await
    }

    /// Navigate to `submode` under the mode that owns it
    ///
    /// The current mode wins if it owns the submode; otherwise the first
    /// declaring mode is used.
    pub async fn navigate_submode(&self, submode: &str, options: NavigateOptions) -> bool {
        let current = self.current_mode();
        let Some(owner) = self.rules.owner_of(submode, Some(&current)) else {
            let err = NavError::OrphanSubmode {
                submode: submode.to_string(),
            };
            error!(submode, error = %err, "cannot resolve submode owner");
            return false;
        };
        self.navigate_to(&owner.key, SubmodeSelector::Exact(Some(submode)), options)
            .await
            .is_success()
    }

    /// Go home if already at the target, else navigate to it
    pub async fn toggle(&self, mode: &str, submode: Option<&str>, options: NavigateOptions) -> bool {
        let target_submode = match submode {
            Some(key) => Some(key.to_string()),
            None => self
                .rules
                .mode(mode)
                .and_then(|m| m.default_submode.clone()),
        };
        let at_target = self
            .history
            .borrow()
            .current()
            .is_at(mode, target_submode.as_deref());
        if at_target {
            self.go_home(options).await
        } else {
            self.navigate(mode, submode, options).await
        }
    }

    /// Return to the previous state, or home if there is none
    pub async fn go_back(&self, options: NavigateOptions) -> bool {
        let previous = self.history.borrow().previous().cloned();
        match previous {
            Some(state) => self
                .navigate_to(
                    &state.mode,
                    SubmodeSelector::Exact(state.submode.as_deref()),
                    options,
                )
                .await
                .is_success(),
            None => self.go_home(options).await,
        }
    }

    /// Navigate to the configured home mode and its default submode
    pub async fn go_home(&self, options: NavigateOptions) -> bool {
        let home = self.config.home_mode.clone();
        self.navigate_to(&home, SubmodeSelector::Default, options)
            .await
            .is_success()
    }

    /// Re-navigate to history entry `index` (0 is the oldest)
    pub async fn go_to_history(&self, index: usize, options: NavigateOptions) -> bool {
        let (entry, len) = {
            let history = self.history.borrow();
            (history.get(index).cloned(), history.len())
        };
        let Some(state) = entry else {
            let err = NavError::HistoryIndexOutOfRange { index, len };
            warn!(index, len, error = %err, "history jump rejected");
            return false;
        };
        self.navigate_to(
            &state.mode,
            SubmodeSelector::Exact(state.submode.as_deref()),
            options,
        )
        .await
        .is_success()
    }

    /// Last committed state
    ///
    /// After an aborted transition this is still the state being left, even
    /// though its teardown already ran; see `needs_resync`.
    pub fn current_state(&self) -> NavigationState {
        self.history.borrow().current().clone()
    }

    /// Mode of the last committed state
    pub fn current_mode(&self) -> String {
        self.history.borrow().current().mode.clone()
    }

    pub fn previous_state(&self) -> Option<NavigationState> {
        self.history.borrow().previous().cloned()
    }

    /// History entries, oldest first
    pub fn history(&self) -> Vec<NavigationState> {
        self.history.borrow().entries().cloned().collect()
    }

    /// True while a transition pipeline is running
    pub fn is_transitioning(&self) -> bool {
        self.in_flight.get() > 0
    }

    /// True when the last pipeline aborted and the committed state no longer
    /// matches what is on screen
    ///
    /// While set, navigating to the committed state runs the full pipeline
    /// instead of returning `Unchanged`.
    pub fn needs_resync(&self) -> bool {
        self.desynced.get()
    }

    /// Report of the most recent pipeline run
    pub fn last_report(&self) -> Option<TransitionReport> {
        self.last_report.borrow().clone()
    }

    pub fn rules(&self) -> &Rc<RuleTable> {
        &self.rules
    }

    /// Configuration the navigator was built with
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Panel manager reconciled after every committed transition
    pub fn panels(&self) -> &Rc<PanelManager> {
        &self.panels
    }

    /// Forget cached layer elements; use after the host rebuilds its DOM
    pub fn refresh_element_cache(&self) {
        self.executor.layer_applier().refresh_cache();
    }

    fn connection_available(&self) -> bool {
        self.config.developer_mode
            || self
                .probe
                .as_ref()
                .is_some_and(|p| p.developer_override() || p.is_connected())
            || self.authority.is_backend_online() == Some(true)
    }

    async fn navigate_to(
        &self,
        mode: &str,
        selector: SubmodeSelector<'_>,
        options: NavigateOptions,
    ) -> NavigationOutcome {
        if self.in_flight.get() > 0 && !options.force {
            debug!(mode, "transition in progress, navigation rejected");
            return NavigationOutcome::Rejected(
                NavError::TransitionInProgress {
                    mode: mode.to_string(),
                }
                .into(),
            );
        }
        let _guard = InFlightGuard::enter(&self.in_flight);

        let Some(mode_rule) = self.rules.mode(mode) else {
            error!(mode, "navigation to undeclared mode");
            return NavigationOutcome::Rejected(
                NavError::UnknownMode {
                    mode: mode.to_string(),
                }
                .into(),
            );
        };

        let submode_rule = match selector {
            SubmodeSelector::Default => mode_rule.default_submode_rule(),
            SubmodeSelector::Exact(None) => None,
            SubmodeSelector::Exact(Some(key)) => match mode_rule.submode(key) {
                Some(rule) => Some(rule),
                None => {
                    let err = NavError::UnknownSubmode {
                        mode: mode.to_string(),
                        submode: key.to_string(),
                    };
                    error!(mode, submode = key, error = %err, "submode is not a child of mode");
                    return NavigationOutcome::Rejected(err.into());
                }
            },
        };
        let submode = submode_rule.map(|s| s.key.as_str());

        let at_target = self.history.borrow().current().is_at(mode, submode);
        if at_target && !options.force && !self.desynced.get() {
            debug!(mode, submode, "already at target");
            return NavigationOutcome::Unchanged;
        }

        if mode_rule.requires_connection && !self.connection_available() {
            let err = NavError::ConnectionRequired {
                mode: mode.to_string(),
            };
            warn!(mode, error = %err, "connection required, navigation blocked");
            if !options.silent {
                self.bus.publish(NavEvent::NavigationBlocked {
                    mode: mode.to_string(),
                    submode: submode.map(str::to_string),
                    reason: REASON_CONNECTION_REQUIRED.to_string(),
                });
            }
            return NavigationOutcome::Blocked {
                reason: REASON_CONNECTION_REQUIRED.to_string(),
                error: err.into(),
            };
        }

        let transition_id = TransitionId::new();
        let span = info_span!("transition", transition_id = %transition_id, mode, submode);
        self.run_transition(transition_id, mode_rule, submode_rule, options)
            .instrument(span)
            .await
    }

    async fn run_transition(
        &self,
        transition_id: TransitionId,
        mode_rule: &ModeRule,
        submode_rule: Option<&SubmodeRule>,
        options: NavigateOptions,
    ) -> NavigationOutcome {
        let mode = mode_rule.key.as_str();
        let submode = submode_rule.map(|s| s.key.clone());
        log_op_start!("navigate", mode = mode);
        let start = Instant::now();

        let from = self.current_state();
        if !options.silent {
            self.bus.publish(NavEvent::NavigationStart {
                transition_id: transition_id.clone(),
                from: from.label(),
                mode: mode.to_string(),
                submode: submode.clone(),
                data: options.data.clone(),
            });
        }

        let plan = TransitionPlan {
            transition_id: transition_id.clone(),
            from: self.started.get().then_some(from),
            mode: mode_rule,
            submode: submode_rule,
            layers: compose_layers(&self.rules, mode, submode.as_deref()),
            skip_animation: options.skip_animation,
            data: options.data.clone(),
        };
        let report = self.executor.execute(&plan).await;
        *self.last_report.borrow_mut() = Some(report.clone());

        if report.is_aborted() {
            let error = report
                .abort_error()
                .cloned()
                .unwrap_or_else(|| {
                    NavError::Internal {
                        message: "pipeline aborted without a step error".to_string(),
                    }
                    .into()
                })
                .with_transition_id(transition_id.clone());
            log_op_error!(
                "navigate",
                error.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            if !options.silent {
                self.bus.publish(NavEvent::NavigationError {
                    transition_id: Some(transition_id),
                    mode: mode.to_string(),
                    submode,
                    code: error.code().to_string(),
                    message: error.to_string(),
                });
            }
            self.desynced.set(true);
            return NavigationOutcome::Failed { error, report };
        }

        let view = submode_rule.and_then(|s| s.view.clone());
        let state = NavigationState::new(mode, submode.clone(), plan.layers, view);
        let previous = {
            let mut history = self.history.borrow_mut();
            history.commit(state.clone(), !options.skip_history);
            history.previous().cloned()
        };
        self.started.set(true);
        self.desynced.set(false);

        self.panels.handle_mode_change(mode, submode.as_deref());

        if !options.silent {
            self.bus.publish(NavEvent::NavigationComplete {
                transition_id,
                state,
                previous,
                data: options.data,
            });
        }

        log_op_end!(
            "navigate",
            duration_ms = start.elapsed().as_millis() as u64,
            degraded = report.is_degraded()
        );
        NavigationOutcome::Completed(report)
    }
}

/// Assembles a `Navigator` from its collaborators
pub struct NavigatorBuilder {
    rules: Rc<RuleTable>,
    config: NavigatorConfig,
    bus: Option<Rc<dyn EventBus>>,
    authority: Option<Rc<dyn ModeAuthority>>,
    views: Option<Rc<dyn ViewSubsystem>>,
    probe: Option<Rc<dyn ConnectionProbe>>,
    dom: Option<Rc<dyn DomEnvironment>>,
    panels: Option<Rc<PanelManager>>,
    handlers: Vec<(String, Rc<dyn LayerHandler>)>,
}

impl NavigatorBuilder {
    pub fn new(rules: Rc<RuleTable>) -> Self {
        Self {
            rules,
            config: NavigatorConfig::default(),
            bus: None,
            authority: None,
            views: None,
            probe: None,
            dom: None,
            panels: None,
            handlers: Vec::new(),
        }
    }

    pub fn config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn bus(mut self, bus: Rc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn authority(mut self, authority: Rc<dyn ModeAuthority>) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn views(mut self, views: Rc<dyn ViewSubsystem>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn probe(mut self, probe: Rc<dyn ConnectionProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn dom(mut self, dom: Rc<dyn DomEnvironment>) -> Self {
        self.dom = Some(dom);
        self
    }

    /// Share an existing panel manager instead of creating one
    pub fn panels(mut self, panels: Rc<PanelManager>) -> Self {
        self.panels = Some(panels);
        self
    }

    /// Register the handler for `kind: custom` layers named `name`
    pub fn layer_handler(mut self, name: impl Into<String>, handler: Rc<dyn LayerHandler>) -> Self {
        self.handlers.push((name.into(), handler));
        self
    }

    /// # Errors
    /// Returns `NavError::InvalidConfig` if the configuration does not fit
    /// the rules, or `NavError::CollaboratorMissing` if the bus, authority
    /// or DOM was not supplied.
    pub fn build(self) -> Result<Navigator> {
        self.config.validate(&self.rules)?;
        let bus = self.bus.ok_or_else(|| missing("event_bus"))?;
        let authority = self.authority.ok_or_else(|| missing("mode_authority"))?;
        let dom = self.dom.ok_or_else(|| missing("dom"))?;
        if self.views.is_none() {
            warn!("no view subsystem configured, views will not be activated");
        }

        let home = self
            .rules
            .mode(&self.config.home_mode)
            .ok_or_else(|| NavError::UnknownMode {
                mode: self.config.home_mode.clone(),
            })?;
        let initial = NavigationState::new(
            home.key.clone(),
            home.default_submode.clone(),
            compose_layers(&self.rules, &home.key, home.default_submode.as_deref()),
            None,
        );

        let panels = self.panels.unwrap_or_else(|| {
            Rc::new(PanelManager::new(self.rules.clone(), bus.clone()).with_dom(dom.clone()))
        });
        panels.track(home.key.clone(), home.default_submode.clone());

        let mut layers = LayerApplier::new(self.rules.clone(), dom);
        for (name, handler) in self.handlers {
            layers.register_handler(name, handler);
        }
        let executor = TransitionExecutor::new(
            self.rules.clone(),
            bus.clone(),
            authority.clone(),
            self.views,
            layers,
        );

        Ok(Navigator {
            history: RefCell::new(NavigationHistory::new(initial, self.config.history_capacity)),
            rules: self.rules,
            config: self.config,
            bus,
            authority,
            probe: self.probe,
            executor,
            panels,
            in_flight: Cell::new(0),
            started: Cell::new(false),
            desynced: Cell::new(false),
            last_report: RefCell::new(None),
        })
    }
}

fn missing(collaborator: &str) -> NavError {
    NavError::CollaboratorMissing {
        collaborator: collaborator.to_string(),
    }
}
