//! Panel legality command
//!
//! Usage: plantnav panels <MODE> [SUBMODE] [--rules <PATH>]

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::bail;
use clap::Args;
use plantnav_core::{PanelManager, RecordingEventBus};
use serde_json::{json, Map, Value};

use super::load_rules;

#[derive(Debug, Args)]
pub struct PanelsArgs {
    pub mode: String,

    /// Submode; omitted means only the mode list is consulted
    pub submode: Option<String>,

    /// Rule table YAML (default: built-in rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

/// Print, per panel, whether it is legal in the target and whether a mode
/// change into the target closes it when open
pub fn execute(args: PanelsArgs) -> anyhow::Result<()> {
    let rules = Rc::new(load_rules(args.rules.as_deref())?);
    if !rules.contains_mode(&args.mode) {
        bail!("unknown mode: {}", args.mode);
    }
    let submode = args.submode.as_deref();
    if let Some(sub) = submode {
        if rules.submode(&args.mode, sub).is_none() {
            bail!("{} is not a submode of {}", sub, args.mode);
        }
    }

    let manager = PanelManager::new(rules.clone(), Rc::new(RecordingEventBus::new()));

    let mut report = Map::new();
    for rule in rules.panels() {
        let allowed = manager.is_allowed(&rule.key, Some(&args.mode), submode);
        report.insert(
            rule.key.clone(),
            json!({
                "allowed": allowed,
                "auto_close": rule.auto_close_on_mode_change,
                "closes_if_open": rule.auto_close_on_mode_change && !allowed,
            }),
        );
    }
    println!("{}", serde_json::to_string_pretty(&Value::Object(report))?);
    Ok(())
}
