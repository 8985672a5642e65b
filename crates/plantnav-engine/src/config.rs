//! Navigator configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! home_mode = "main_viewer"
//! history_capacity = 50
//! developer_mode = false
//! ```

use std::fs;
use std::path::Path;

use plantnav_core::errors::{NavError, Result};
use plantnav_core::{RuleTable, DEFAULT_HISTORY_CAPACITY};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigatorConfig {
    /// Mode used by `go_home` and at start-up
    pub home_mode: String,
    pub history_capacity: usize,
    /// Bypass the connection gate
    pub developer_mode: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            home_mode: "main_viewer".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            developer_mode: false,
        }
    }
}

impl NavigatorConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns `NavError::InvalidConfig` on malformed TOML or unknown keys.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NavError::InvalidConfig {
            reason: format!("TOML parse error: {}", e),
        })
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns `NavError::Io` if the file cannot be read, otherwise as
    /// `from_toml_str`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| NavError::Io {
            message: format!("Failed to read config {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the configuration against a rule table
    ///
    /// # Errors
    /// Returns `NavError::InvalidConfig` if the home mode is undeclared or
    /// the history capacity is zero.
    pub fn validate(&self, rules: &RuleTable) -> Result<()> {
        if !rules.contains_mode(&self.home_mode) {
            return Err(NavError::InvalidConfig {
                reason: format!("home mode {} is not declared", self.home_mode),
            });
        }
        if self.history_capacity == 0 {
            return Err(NavError::InvalidConfig {
                reason: "history_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
