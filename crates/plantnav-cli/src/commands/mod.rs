pub mod layers;
pub mod panels;
pub mod rules;
pub mod simulate;

use std::path::Path;

use anyhow::Context;
use plantnav_core::RuleTable;

/// Load the rule table at `path`, or the built-in table
pub fn load_rules(path: Option<&Path>) -> anyhow::Result<RuleTable> {
    match path {
        Some(path) => RuleTable::load(path)
            .with_context(|| format!("loading rules from {}", path.display())),
        None => RuleTable::builtin().context("loading built-in rules"),
    }
}
