//! Immutable rule registry
//!
//! A `RuleTable` is built once from a YAML document, validated, indexed and
//! then only read. There is no mutation API: rules are a deployment-time
//! contract.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{NavError, Result};

use super::model::{LayerDescriptor, ModeRule, SubmodeRule};
use super::panel::PanelRule;
use super::validation::validate_document;

/// Rule file schema version understood by this build
pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Top-level rule file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Schema version (must be 1 for this format)
    pub schema_version: u32,

    /// Layer catalogue
    #[serde(default)]
    pub layers: Vec<LayerDescriptor>,

    /// Modes in declaration order
    pub modes: Vec<ModeRule>,

    /// Panel rules
    #[serde(default)]
    pub panels: Vec<PanelRule>,
}

/// Validated, indexed rule table
#[derive(Debug, Clone)]
pub struct RuleTable {
    layers: Vec<LayerDescriptor>,
    modes: Vec<ModeRule>,
    panels: Vec<PanelRule>,
    layer_index: HashMap<String, usize>,
    mode_index: HashMap<String, usize>,
    panel_index: HashMap<String, usize>,
}

impl RuleTable {
    /// Validate a parsed document and build the table
    ///
    /// # Errors
    /// Returns `NavError::InvalidRules` if the document violates a load-time rule.
    pub fn from_document(doc: RuleDocument) -> Result<Self> {
        validate_document(&doc)?;

        let index = |keys: Vec<&String>| -> HashMap<String, usize> {
            keys.into_iter()
                .enumerate()
                .map(|(i, k)| (k.clone(), i))
                .collect()
        };
        let layer_index = index(doc.layers.iter().map(|l| &l.key).collect());
        let mode_index = index(doc.modes.iter().map(|m| &m.key).collect());
        let panel_index = index(doc.panels.iter().map(|p| &p.key).collect());

        debug!(
            layers = doc.layers.len(),
            modes = doc.modes.len(),
            panels = doc.panels.len(),
            "rule table loaded"
        );

        Ok(Self {
            layers: doc.layers,
            modes: doc.modes,
            panels: doc.panels,
            layer_index,
            mode_index,
            panel_index,
        })
    }

    /// Parse and validate a rule table from YAML
    ///
    /// # Errors
    /// Returns `NavError::Serialization` on malformed YAML and
    /// `NavError::InvalidRules` on validation failure.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let doc: RuleDocument =
            serde_yaml::from_str(content).map_err(|e| NavError::Serialization {
                message: format!("YAML parse error: {}", e),
            })?;
        Self::from_document(doc)
    }

    /// Load a rule table from a YAML file
    ///
    /// # Errors
    /// Returns `NavError::Io` if the file cannot be read, otherwise as `from_yaml_str`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| NavError::Io {
            message: format!("Failed to read rule file {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn layer(&self, key: &str) -> Option<&LayerDescriptor> {
        self.layer_index.get(key).map(|&i| &self.layers[i])
    }

    /// Modes in declaration order
    pub fn modes(&self) -> &[ModeRule] {
        &self.modes
    }

    pub fn mode(&self, key: &str) -> Option<&ModeRule> {
        self.mode_index.get(key).map(|&i| &self.modes[i])
    }

    pub fn contains_mode(&self, key: &str) -> bool {
        self.mode_index.contains_key(key)
    }

    /// Look up a submode under its parent mode
    pub fn submode(&self, mode: &str, submode: &str) -> Option<&SubmodeRule> {
        self.mode(mode).and_then(|m| m.submode(submode))
    }

    pub fn panels(&self) -> &[PanelRule] {
        &self.panels
    }

    pub fn panel(&self, key: &str) -> Option<&PanelRule> {
        self.panel_index.get(key).map(|&i| &self.panels[i])
    }

    /// Resolve the mode owning `submode`
    ///
    /// `preferred` wins when it legally owns the submode; otherwise modes are
    /// searched in declaration order and the first owner is returned.
    pub fn owner_of(&self, submode: &str, preferred: Option<&str>) -> Option<&ModeRule> {
        if let Some(mode) = preferred.and_then(|p| self.mode(p)) {
            if mode.has_submode(submode) {
                return Some(mode);
            }
        }
        self.modes.iter().find(|m| m.has_submode(submode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r##"
schema_version: 1
layers:
  - key: canvas
    element: "#canvas"
    presentation: { kind: style, shown: block, hidden: none }
modes:
  - key: home
    authority_mode: HOME
    default_submode: main
    layers: { canvas: true }
    submodes:
      - key: main
      - key: shared
  - key: other
    authority_mode: OTHER
    layers: { canvas: false }
    submodes:
      - key: shared
"##;

    #[test]
    fn test_from_yaml_str_indexes_everything() {
        let table = RuleTable::from_yaml_str(MINIMAL).unwrap();
        assert!(table.contains_mode("home"));
        assert!(table.layer("canvas").is_some());
        assert_eq!(table.modes().len(), 2);
        assert!(table.submode("home", "main").is_some());
        assert!(table.submode("other", "main").is_none());
        assert!(table.panels().is_empty());
    }

    #[test]
    fn test_owner_of_prefers_current_mode() {
        let table = RuleTable::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(table.owner_of("shared", Some("other")).unwrap().key, "other");
        assert_eq!(table.owner_of("shared", None).unwrap().key, "home");
        assert_eq!(table.owner_of("main", Some("other")).unwrap().key, "home");
        assert!(table.owner_of("missing", None).is_none());
    }

    #[test]
    fn test_malformed_yaml_is_serialization_error() {
        let err = RuleTable::from_yaml_str("modes: [").unwrap_err();
        assert!(matches!(err, NavError::Serialization { .. }));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = RuleTable::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, NavError::Io { .. }));
    }
}
