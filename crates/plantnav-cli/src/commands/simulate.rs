//! Navigation replay command
//!
//! Usage: plantnav simulate [--rules <PATH>] [--config <PATH>] [--offline]
//!        [--open <PANEL>]... <STEP>...
//!
//! A step is `<mode>`, `<mode>/<submode>`, `toggle:<mode>[/<submode>]`,
//! `back` or `home`. Every published event is printed as one JSON line.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{bail, Context};
use clap::Args;
use plantnav_core::rules::{DomCloseAction, LayerPresentation, PanelCloseMethod};
use plantnav_core::{
    DomEnvironment, ElementRef, ExError, MemoryDom, NavEvent, RecordingEventBus, RuleTable,
};
use plantnav_engine::{
    LocalModeAuthority, ManualConnectionProbe, MemoryViewSubsystem, NavigateOptions, Navigator,
    NavigatorConfig,
};
use serde_json::json;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Navigation steps, applied in order
    #[arg(required = true)]
    pub steps: Vec<String>,

    /// Rule table YAML (default: built-in rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Navigator TOML configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Simulate a lost backend connection
    #[arg(long)]
    pub offline: bool,

    /// Panel open before start-up
    #[arg(long = "open")]
    pub open: Vec<String>,

    /// Fail if any step does not succeed
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Navigate(String, Option<String>),
    Toggle(String, Option<String>),
    Back,
    Home,
}

impl Step {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        let target = |s: &str| -> anyhow::Result<(String, Option<String>)> {
            match s.split_once('/') {
                Some((mode, sub)) if !mode.is_empty() && !sub.is_empty() => {
                    Ok((mode.to_string(), Some(sub.to_string())))
                }
                Some(_) => bail!("malformed step: {}", raw),
                None if s.is_empty() => bail!("empty step"),
                None => Ok((s.to_string(), None)),
            }
        };
        Ok(match raw {
            "back" => Step::Back,
            "home" => Step::Home,
            _ => match raw.strip_prefix("toggle:") {
                Some(rest) => {
                    let (mode, sub) = target(rest)?;
                    Step::Toggle(mode, sub)
                }
                None => {
                    let (mode, sub) = target(raw)?;
                    Step::Navigate(mode, sub)
                }
            },
        })
    }
}

pub fn execute(args: SimulateArgs) -> anyhow::Result<()> {
    let steps = args
        .steps
        .iter()
        .map(|s| Step::parse(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let rules = Rc::new(super::load_rules(args.rules.as_deref())?);
    let config = match &args.config {
        Some(path) => NavigatorConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NavigatorConfig::default(),
    };
    for panel in &args.open {
        if rules.panel(panel).is_none() {
            bail!("unknown panel: {}", panel);
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(replay(rules, config, &args, &steps))
}

async fn replay(
    rules: Rc<RuleTable>,
    config: NavigatorConfig,
    args: &SimulateArgs,
    steps: &[Step],
) -> anyhow::Result<()> {
    let bus = Rc::new(RecordingEventBus::new());
    let dom = Rc::new(seed_dom(&rules, &args.open)?);
    let home = rules
        .mode(&config.home_mode)
        .map(|m| m.authority_mode.clone())
        .unwrap_or_default();

    let mut builder = Navigator::builder(rules.clone())
        .config(config)
        .bus(bus.clone())
        .authority(Rc::new(LocalModeAuthority::with_mode(home)))
        .views(Rc::new(MemoryViewSubsystem::new()))
        .probe(Rc::new(ManualConnectionProbe::new(!args.offline)))
        .dom(dom.clone());
    for layer in rules.layers() {
        if let LayerPresentation::Custom { handler } = &layer.presentation {
            builder = builder.layer_handler(handler.clone(), Rc::new(visibility_handler));
        }
    }
    let navigator = builder.build()?;

    for rule in rules.panels() {
        if let PanelCloseMethod::Instance { target } = &rule.close {
            navigator
                .panels()
                .register_instance(target.clone(), Rc::new(|| -> Result<(), ExError> { Ok(()) }));
        }
    }

    let mut failed = Vec::new();
    if !navigator.start().await {
        failed.push("start".to_string());
    }
    flush(&bus)?;

    for (raw, step) in args.steps.iter().zip(steps) {
        let options = NavigateOptions::new();
        let ok = match step {
            Step::Navigate(mode, sub) => navigator.navigate(mode, sub.as_deref(), options).await,
            Step::Toggle(mode, sub) => navigator.toggle(mode, sub.as_deref(), options).await,
            Step::Back => navigator.go_back(options).await,
            Step::Home => navigator.go_home(options).await,
        };
        flush(&bus)?;
        if !ok {
            failed.push(raw.clone());
        }
    }

    let state = navigator.current_state();
    eprintln!("final state: {}", state.label());
    if args.strict && !failed.is_empty() {
        bail!("steps did not succeed: {}", failed.join(", "));
    }
    Ok(())
}

/// Document with every layer element and panel element; panels are closed
/// unless listed in `open`
fn seed_dom(rules: &RuleTable, open: &[String]) -> anyhow::Result<MemoryDom> {
    let dom = MemoryDom::with_elements(rules.layers().iter().map(|l| l.element.clone()));
    for rule in rules.panels() {
        let Some(selector) = rule.probe_selector() else {
            continue;
        };
        dom.insert(selector);
        let element = dom
            .lookup(selector)
            .with_context(|| format!("element {} missing after insert", selector))?;
        if open.contains(&rule.key) {
            if let PanelCloseMethod::Dom {
                action: DomCloseAction::RemoveClass,
                class: Some(class),
                ..
            } = &rule.close
            {
                dom.add_class(&element, class)?;
            }
        } else {
            dom.set_style(&element, "display", "none")?;
        }
    }
    Ok(dom)
}

fn visibility_handler(
    dom: &dyn DomEnvironment,
    element: &ElementRef,
    visible: bool,
) -> Result<(), ExError> {
    dom.set_style(element, "visibility", if visible { "visible" } else { "hidden" })
}

fn flush(bus: &RecordingEventBus) -> anyhow::Result<()> {
    for event in bus.events() {
        println!("{}", render(&event)?);
    }
    bus.clear();
    Ok(())
}

fn render(event: &NavEvent) -> anyhow::Result<String> {
    let line = json!({
        "topic": event.topic(),
        "event": serde_json::to_value(event)?,
    });
    Ok(line.to_string())
}
