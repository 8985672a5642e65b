//! Rule table commands
//!
//! Usage: plantnav rules check [--rules <PATH>]
//!        plantnav rules list [--rules <PATH>]

use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::load_rules;

#[derive(Debug, Args)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// Load and validate a rule table
    Check(RulesFileArgs),
    /// List modes with their submodes
    List(RulesFileArgs),
}

#[derive(Debug, Args)]
pub struct RulesFileArgs {
    /// Rule table YAML (default: built-in rules)
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

pub fn execute(args: RulesArgs) -> anyhow::Result<()> {
    match args.command {
        RulesCommand::Check(file) => execute_check(file),
        RulesCommand::List(file) => execute_list(file),
    }
}

fn execute_check(args: RulesFileArgs) -> anyhow::Result<()> {
    let rules = load_rules(args.rules.as_deref())?;
    let submodes: usize = rules.modes().iter().map(|m| m.submodes.len()).sum();
    println!("✓ Rules valid");
    println!("  modes: {}", rules.modes().len());
    println!("  submodes: {}", submodes);
    println!("  layers: {}", rules.layers().len());
    println!("  panels: {}", rules.panels().len());
    Ok(())
}

fn execute_list(args: RulesFileArgs) -> anyhow::Result<()> {
    let rules = load_rules(args.rules.as_deref())?;
    for mode in rules.modes() {
        let gate = if mode.requires_connection {
            " (requires connection)"
        } else {
            ""
        };
        println!("{} -> {}{}", mode.key, mode.authority_mode, gate);
        for submode in &mode.submodes {
            let marker = if mode.default_submode.as_deref() == Some(submode.key.as_str()) {
                "*"
            } else {
                " "
            };
            println!("  {} {}", marker, submode.key);
        }
    }
    Ok(())
}
