//! Transition executor
//!
//! Runs the fixed seven-step pipeline for one accepted transition. Steps are
//! best-effort: a failing step is recorded in the report and the pipeline
//! moves on. The one exception is authority sync, whose failure aborts the
//! remaining steps and puts the authority back where it was. Teardown is not
//! undone; the navigator re-runs the pipeline on the next request instead.

use std::rc::Rc;

use plantnav_core::events::{HookPhase, NavEvent};
use plantnav_core::{
    EventBus, ExError, LayerApplier, LayerMap, ModeRule, NavigationState, RuleTable, SubmodeRule,
};
use plantnav_core_types::TransitionId;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::collaborators::{ModeAuthority, ShowOptions, SwitchOptions, ViewSubsystem};

/// Pipeline steps in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Teardown,
    AuthoritySync,
    ApplyLayers,
    ActivateView,
    ActivateServices,
    ApplyOptions,
    EnterHook,
}

impl PipelineStep {
    pub const ALL: [PipelineStep; 7] = [
        PipelineStep::Teardown,
        PipelineStep::AuthoritySync,
        PipelineStep::ApplyLayers,
        PipelineStep::ActivateView,
        PipelineStep::ActivateServices,
        PipelineStep::ApplyOptions,
        PipelineStep::EnterHook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Teardown => "teardown",
            PipelineStep::AuthoritySync => "authority_sync",
            PipelineStep::ApplyLayers => "apply_layers",
            PipelineStep::ActivateView => "activate_view",
            PipelineStep::ActivateServices => "activate_services",
            PipelineStep::ApplyOptions => "apply_options",
            PipelineStep::EnterHook => "enter_hook",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    /// Nothing to do for this transition
    Skipped,
    /// Ran, but at least one part failed
    Degraded,
    /// Failed and stopped the pipeline
    Aborted,
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub step: PipelineStep,
    pub status: StepStatus,
    pub errors: Vec<ExError>,
    pub detail: Option<String>,
}

impl StepReport {
    fn new(step: PipelineStep) -> Self {
        Self {
            step,
            status: StepStatus::Completed,
            errors: Vec::new(),
            detail: None,
        }
    }

    fn skipped(step: PipelineStep, detail: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Skipped,
            detail: Some(detail.into()),
            ..Self::new(step)
        }
    }

    fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    fn record(&mut self, err: ExError) {
        warn!(step = self.step.as_str(), error = %err, "pipeline step degraded");
        self.errors.push(err);
        if self.status != StepStatus::Aborted {
            self.status = StepStatus::Degraded;
        }
    }

    fn abort(&mut self, err: ExError) {
        warn!(step = self.step.as_str(), error = %err, "pipeline aborted");
        self.errors.push(err);
        self.status = StepStatus::Aborted;
    }
}

/// Per-step outcome of one transition
#[derive(Debug, Clone)]
pub struct TransitionReport {
    pub transition_id: TransitionId,
    pub mode: String,
    pub submode: Option<String>,
    pub steps: Vec<StepReport>,
}

impl TransitionReport {
    pub fn step(&self, step: PipelineStep) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.step == step)
    }

    pub fn is_aborted(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Aborted)
    }

    pub fn is_degraded(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Degraded)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ExError> {
        self.steps.iter().flat_map(|s| s.errors.iter())
    }

    /// Error of the aborting step, if the pipeline was aborted
    ///
    /// A failed authority restore is attached as its source.
    pub fn abort_error(&self) -> Option<&ExError> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Aborted)
            .and_then(|s| s.errors.last())
    }
}

/// Everything the executor needs to know about one transition
#[derive(Debug, Clone)]
pub struct TransitionPlan<'a> {
    pub transition_id: TransitionId,
    /// Committed state being left; `None` before anything was applied
    pub from: Option<NavigationState>,
    pub mode: &'a ModeRule,
    pub submode: Option<&'a SubmodeRule>,
    /// Composed visibility map for the target
    pub layers: LayerMap,
    pub skip_animation: bool,
    pub data: Option<Value>,
}

impl TransitionPlan<'_> {
    fn submode_key(&self) -> Option<String> {
        self.submode.map(|s| s.key.clone())
    }
}

pub struct TransitionExecutor {
    rules: Rc<RuleTable>,
    bus: Rc<dyn EventBus>,
    authority: Rc<dyn ModeAuthority>,
    views: Option<Rc<dyn ViewSubsystem>>,
    layers: LayerApplier,
}

impl TransitionExecutor {
    pub fn new(
        rules: Rc<RuleTable>,
        bus: Rc<dyn EventBus>,
        authority: Rc<dyn ModeAuthority>,
        views: Option<Rc<dyn ViewSubsystem>>,
        layers: LayerApplier,
    ) -> Self {
        Self {
            rules,
            bus,
            authority,
            views,
            layers,
        }
    }

    pub fn layer_applier(&self) -> &LayerApplier {
        &self.layers
    }

    /// Run the pipeline for `plan`
    pub async fn execute(&self, plan: &TransitionPlan<'_>) -> TransitionReport {
        let mut report = TransitionReport {
            transition_id: plan.transition_id.clone(),
            mode: plan.mode.key.clone(),
            submode: plan.submode_key(),
            steps: Vec::with_capacity(PipelineStep::ALL.len()),
        };

        report.steps.push(log_step(self.teardown(plan).await));

        let sync = log_step(self.sync_authority(plan).await);
        let aborted = sync.status == StepStatus::Aborted;
        report.steps.push(sync);
        if aborted {
            return report;
        }

        report.steps.push(log_step(self.apply_layers(plan)));
        report.steps.push(log_step(self.activate_view(plan).await));
        report.steps.push(log_step(self.activate_services(plan)));
        report.steps.push(log_step(self.apply_options(plan)));
        report.steps.push(log_step(self.enter_hook(plan)));
        report
    }

    async fn teardown(&self, plan: &TransitionPlan<'_>) -> StepReport {
        let Some(from) = &plan.from else {
            return StepReport::skipped(PipelineStep::Teardown, "nothing applied yet");
        };
        let mut step = StepReport::new(PipelineStep::Teardown);

        if let Some(view) = &from.active_view {
            match &self.views {
                Some(views) => {
                    if let Err(err) = views.hide(view).await {
                        step.record(err.with_op("hide_view"));
                    }
                }
                None => warn!(view = view.as_str(), "no view subsystem, cannot hide view"),
            }
        }

        let outgoing = self.rules.mode(&from.mode);
        let realtime = outgoing
            .and_then(|m| from.submode.as_deref().and_then(|s| m.submode(s)))
            .is_some_and(|s| s.options.realtime_render);
        if realtime {
            self.bus.publish(NavEvent::RenderLoopStop {
                mode: from.mode.clone(),
                submode: from.submode.clone(),
            });
        }

        if let Some(hook) = outgoing.and_then(|m| m.on_exit.as_ref()) {
            self.bus.publish(NavEvent::Hook {
                name: hook.clone(),
                phase: HookPhase::Exit,
                mode: from.mode.clone(),
                submode: from.submode.clone(),
                data: plan.data.clone(),
            });
        }
        step
    }

    async fn sync_authority(&self, plan: &TransitionPlan<'_>) -> StepReport {
        let mut step = StepReport::new(PipelineStep::AuthoritySync);
        let target = plan.mode.authority_mode.as_str();
        let prior = self.authority.current_mode();

        let switched = if prior.as_deref() == Some(target) {
            step.detail = Some(format!("authority already in {}", target));
            Ok(())
        } else {
            let options = SwitchOptions {
                skip_connection_check: true,
            };
            self.authority
                .switch_mode(target, options)
                .await
                .map_err(|err| err.with_op("switch_mode").with_mode(plan.mode.key.clone()))
        };
        let synced = switched.and_then(|()| match plan.submode {
            Some(sub) => self
                .authority
                .set_submode(&sub.key)
                .map_err(|err| err.with_op("set_submode").with_submode(sub.key.clone())),
            None => Ok(()),
        });

        if let Err(err) = synced {
            let err = match self.restore_authority(plan, prior.as_deref()).await {
                Some(restore_err) => err.with_source(restore_err),
                None => err,
            };
            step.abort(err);
        }
        step
    }

    /// Return the authority to the mode and submode it held before an
    /// aborted sync; yields the first restore failure
    async fn restore_authority(
        &self,
        plan: &TransitionPlan<'_>,
        prior: Option<&str>,
    ) -> Option<ExError> {
        if let Some(prior) = prior {
            if self.authority.current_mode().as_deref() != Some(prior) {
                let options = SwitchOptions {
                    skip_connection_check: true,
                };
                if let Err(err) = self.authority.switch_mode(prior, options).await {
                    warn!(mode = prior, error = %err, "authority restore failed");
                    return Some(err.with_op("restore_mode").with_mode(prior));
                }
            }
        }
        let submode = plan.from.as_ref().and_then(|f| f.submode.as_deref())?;
        match self.authority.set_submode(submode) {
            Ok(()) => None,
            Err(err) => {
                warn!(submode, error = %err, "authority submode restore failed");
                Some(err.with_op("restore_submode").with_submode(submode))
            }
        }
    }

    fn apply_layers(&self, plan: &TransitionPlan<'_>) -> StepReport {
        let mut step = StepReport::new(PipelineStep::ApplyLayers);
        let outcomes = self.layers.apply(&plan.layers);
        let total = outcomes.len();
        let mut applied = 0;
        for outcome in outcomes {
            match outcome.result {
                Ok(()) => applied += 1,
                Err(err) => step.record(err),
            }
        }
        step.detail(format!("{} of {} layers applied", applied, total))
    }

    async fn activate_view(&self, plan: &TransitionPlan<'_>) -> StepReport {
        let Some(view) = plan.submode.and_then(|s| s.view.as_deref()) else {
            return StepReport::skipped(
                PipelineStep::ActivateView,
                "submode manages its own presentation",
            );
        };
        let Some(views) = &self.views else {
            warn!(view, "no view subsystem, skipping view activation");
            return StepReport::skipped(PipelineStep::ActivateView, "no view subsystem");
        };

        let mut step = StepReport::new(PipelineStep::ActivateView).detail(view);
        let options = ShowOptions {
            animate: !plan.skip_animation,
        };
        if let Err(err) = views.show(view, options).await {
            step.record(err.with_op("show_view"));
        }
        step
    }

    fn activate_services(&self, plan: &TransitionPlan<'_>) -> StepReport {
        let services = plan.submode.map(|s| s.services.as_slice()).unwrap_or_default();
        if services.is_empty() {
            return StepReport::skipped(PipelineStep::ActivateServices, "no services");
        }
        for service in services {
            self.bus.publish(NavEvent::ServiceActivation {
                service: service.clone(),
                mode: plan.mode.key.clone(),
                submode: plan.submode_key(),
            });
        }
        StepReport::new(PipelineStep::ActivateServices).detail(services.join(","))
    }

    fn apply_options(&self, plan: &TransitionPlan<'_>) -> StepReport {
        let flags = plan
            .submode
            .map(|s| s.options.active_flags())
            .unwrap_or_default();
        if flags.is_empty() {
            return StepReport::skipped(PipelineStep::ApplyOptions, "no option flags");
        }
        let names: Vec<&str> = flags.iter().map(|f| f.as_str()).collect();
        for flag in &flags {
            self.bus.publish(NavEvent::OptionRequested {
                flag: *flag,
                mode: plan.mode.key.clone(),
                submode: plan.submode_key(),
            });
        }
        StepReport::new(PipelineStep::ApplyOptions).detail(names.join(","))
    }

    fn enter_hook(&self, plan: &TransitionPlan<'_>) -> StepReport {
        let Some(hook) = &plan.mode.on_enter else {
            return StepReport::skipped(PipelineStep::EnterHook, "no enter hook");
        };
        self.bus.publish(NavEvent::Hook {
            name: hook.clone(),
            phase: HookPhase::Enter,
            mode: plan.mode.key.clone(),
            submode: plan.submode_key(),
            data: plan.data.clone(),
        });
        StepReport::new(PipelineStep::EnterHook).detail(hook.clone())
    }
}

fn log_step(step: StepReport) -> StepReport {
    debug!(
        step = step.step.as_str(),
        status = ?step.status,
        errors = step.errors.len(),
        detail = step.detail.as_deref().unwrap_or(""),
        "pipeline step finished"
    );
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{LocalModeAuthority, MemoryViewSubsystem};
    use plantnav_core::{compose_layers, DomEnvironment, ElementRef, MemoryDom, RecordingEventBus};

    struct Harness {
        rules: Rc<RuleTable>,
        bus: Rc<RecordingEventBus>,
        authority: Rc<LocalModeAuthority>,
        views: Rc<MemoryViewSubsystem>,
        executor: TransitionExecutor,
    }

    fn harness() -> Harness {
        let rules = Rc::new(RuleTable::builtin().unwrap());
        let bus = Rc::new(RecordingEventBus::new());
        let authority = Rc::new(LocalModeAuthority::with_mode("MAIN_VIEWER"));
        let views = Rc::new(MemoryViewSubsystem::new());
        let dom = Rc::new(MemoryDom::with_elements([
            "#threejs-container",
            "#view-container",
            "#overlay-ui",
            "#layout-editor-container",
            "#connection-status-banner",
        ]));
        let mut layers = LayerApplier::new(rules.clone(), dom);
        let banner = |_: &dyn DomEnvironment, _: &ElementRef, _: bool| -> Result<(), ExError> {
            Ok(())
        };
        layers.register_handler("status-banner", Rc::new(banner));
        let executor = TransitionExecutor::new(
            rules.clone(),
            bus.clone(),
            authority.clone(),
            Some(views.clone()),
            layers,
        );
        Harness {
            rules,
            bus,
            authority,
            views,
            executor,
        }
    }

    fn plan<'a>(
        rules: &'a RuleTable,
        from: Option<NavigationState>,
        mode: &str,
        submode: Option<&str>,
    ) -> TransitionPlan<'a> {
        let mode_rule = rules.mode(mode).unwrap();
        TransitionPlan {
            transition_id: TransitionId::new(),
            from,
            mode: mode_rule,
            submode: submode.and_then(|s| mode_rule.submode(s)),
            layers: compose_layers(rules, mode, submode),
            skip_animation: false,
            data: None,
        }
    }

    fn main_viewer_state(rules: &RuleTable) -> NavigationState {
        NavigationState::new(
            "main_viewer",
            Some("3d-view".to_string()),
            compose_layers(rules, "main_viewer", Some("3d-view")),
            None,
        )
    }

    #[test]
    fn test_full_pipeline_event_order() {
        let h = harness();
        let from = main_viewer_state(&h.rules);
        let plan = plan(&h.rules, Some(from), "monitoring", Some("ranking-view"));

        let report = tokio_test::block_on(h.executor.execute(&plan));

        assert_eq!(report.steps.len(), 7);
        assert!(!report.is_aborted());
        assert!(!report.is_degraded());
        assert_eq!(
            h.bus.topics(),
            vec![
                "render:loop-stop-requested",
                "mode:main_viewer:exit",
                "service:activate",
                "render:stop-requested",
                "mode:monitoring:enter",
            ]
        );
        assert_eq!(h.authority.switches(), vec!["MONITORING".to_string()]);
        assert_eq!(h.authority.submode().as_deref(), Some("ranking-view"));
        assert_eq!(h.views.calls(), vec!["show~:ranking-view"]);
    }

    #[test]
    fn test_first_transition_skips_teardown() {
        let h = harness();
        let plan = plan(&h.rules, None, "main_viewer", Some("3d-view"));
        let report = tokio_test::block_on(h.executor.execute(&plan));

        let teardown = report.step(PipelineStep::Teardown).unwrap();
        assert_eq!(teardown.status, StepStatus::Skipped);
        // already in MAIN_VIEWER
        assert!(h.authority.switches().is_empty());
    }

    #[test]
    fn test_authority_failure_aborts_remaining_steps() {
        let h = harness();
        h.authority.fail_switches(true);
        let plan = plan(&h.rules, None, "analysis", Some("trend-view"));

        let report = tokio_test::block_on(h.executor.execute(&plan));

        assert!(report.is_aborted());
        assert_eq!(report.steps.len(), 2);
        assert!(report.step(PipelineStep::ApplyLayers).is_none());
        assert_eq!(report.abort_error().unwrap().op(), Some("switch_mode"));
        assert!(h.views.calls().is_empty());
    }

    #[test]
    fn test_submode_refusal_restores_outgoing_authority_mode() {
        let h = harness();
        h.authority.fail_submode("editor");
        let from = main_viewer_state(&h.rules);
        let plan = plan(&h.rules, Some(from), "layout", Some("editor"));

        let report = tokio_test::block_on(h.executor.execute(&plan));

        assert!(report.is_aborted());
        assert!(report.step(PipelineStep::ApplyLayers).is_none());
        let err = report.abort_error().unwrap();
        assert_eq!(err.op(), Some("set_submode"));
        assert_eq!(err.submode(), Some("editor"));
        assert_eq!(h.authority.current_mode().as_deref(), Some("MAIN_VIEWER"));
        assert_eq!(h.authority.switches(), vec!["LAYOUT", "MAIN_VIEWER"]);
        assert_eq!(h.authority.submode().as_deref(), Some("3d-view"));
    }

    #[test]
    fn test_failed_restore_is_chained_onto_abort_error() {
        let h = harness();
        h.authority.fail_submode("editor");
        h.authority.fail_submode("3d-view");
        let from = main_viewer_state(&h.rules);
        let plan = plan(&h.rules, Some(from), "layout", Some("editor"));

        let report = tokio_test::block_on(h.executor.execute(&plan));

        let err = report.abort_error().unwrap();
        assert_eq!(err.op(), Some("set_submode"));
        let cause = err.source_error().unwrap();
        assert_eq!(cause.op(), Some("restore_submode"));
        assert_eq!(cause.submode(), Some("3d-view"));
        assert_eq!(h.authority.current_mode().as_deref(), Some("MAIN_VIEWER"));
    }

    #[test]
    fn test_view_failure_degrades_without_aborting() {
        let h = harness();
        h.views.fail_on("analysis-trend-view");
        let plan = plan(&h.rules, None, "analysis", Some("trend-view"));

        let report = tokio_test::block_on(h.executor.execute(&plan));

        assert!(!report.is_aborted());
        assert_eq!(
            report.step(PipelineStep::ActivateView).unwrap().status,
            StepStatus::Degraded
        );
        assert_eq!(
            report.step(PipelineStep::EnterHook).unwrap().status,
            StepStatus::Completed
        );
    }

    #[test]
    fn test_skip_animation_reaches_view_subsystem() {
        let h = harness();
        let mut plan = plan(&h.rules, None, "settings", Some("general"));
        plan.skip_animation = true;
        tokio_test::block_on(h.executor.execute(&plan));
        assert_eq!(h.views.calls(), vec!["show:settings-general-view"]);
    }

    #[test]
    fn test_outgoing_view_hidden() {
        let h = harness();
        let from = NavigationState::new(
            "monitoring",
            Some("ranking-view".to_string()),
            compose_layers(&h.rules, "monitoring", Some("ranking-view")),
            Some("ranking-view".to_string()),
        );
        let plan = plan(&h.rules, Some(from), "monitoring", Some("mapping"));
        let report = tokio_test::block_on(h.executor.execute(&plan));

        assert_eq!(h.views.calls(), vec!["hide:ranking-view", "show~:mapping-view"]);
        // ranking-view is not a realtime submode
        assert!(!h.bus.topics().contains(&"render:loop-stop-requested".to_string()));
        assert_eq!(
            report.step(PipelineStep::ActivateServices).unwrap().detail.as_deref(),
            Some("MonitoringService,MappingService")
        );
    }
}
