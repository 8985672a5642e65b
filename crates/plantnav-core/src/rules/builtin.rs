//! Built-in rule table shipped with the client

use crate::errors::Result;

use super::table::RuleTable;

/// Embedded YAML source of the built-in rule table
pub const BUILTIN_RULES_YAML: &str = include_str!("../../rules/default.yaml");

impl RuleTable {
    /// Load the built-in rule table
    ///
    /// # Errors
    /// Only fails if the embedded document does not validate, which the
    /// tests below guard against.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_RULES_YAML)
    }
}
