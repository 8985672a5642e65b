//! Layer composition command
//!
//! Usage: plantnav layers <MODE> [SUBMODE] [--rules <PATH>]

use std::path::PathBuf;

use clap::Args;
use plantnav_core::try_compose_layers;

use super::load_rules;

#[derive(Debug, Args)]
pub struct LayersArgs {
    pub mode: String,

    /// Submode (default: the mode's default submode)
    pub submode: Option<String>,

    /// Rule table YAML (default: built-in rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

/// Print the composed map as JSON
pub fn execute(args: LayersArgs) -> anyhow::Result<()> {
    let rules = load_rules(args.rules.as_deref())?;
    let submode = match args.submode {
        Some(submode) => Some(submode),
        None => rules
            .mode(&args.mode)
            .and_then(|m| m.default_submode.clone()),
    };
    let layers = try_compose_layers(&rules, &args.mode, submode.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&layers)?);
    Ok(())
}
