//! Panel rule types
//!
//! A panel rule states where a transient overlay is legal and how it is
//! closed. The open/closed lifecycle itself is tracked by `panels::PanelManager`.

use serde::{Deserialize, Serialize};

/// Matches every mode or submode in an allowed list
pub const WILDCARD: &str = "*";

/// Informational UI shape of a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelShape {
    Modal,
    SidePanel,
    Overlay,
    Toolbar,
}

/// DOM mutation applied to a panel's element to close it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomCloseAction {
    /// Set inline `display: none`
    Hide,
    /// Add `class`
    AddClass,
    /// Remove `class`
    RemoveClass,
}

/// How a panel is closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PanelCloseMethod {
    /// Invoke `close()` on the live instance registered under `target`
    Instance { target: String },
    /// Mutate the element found at `selector`
    Dom {
        selector: String,
        action: DomCloseAction,
        #[serde(default)]
        class: Option<String>,
    },
}

impl PanelCloseMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelCloseMethod::Instance { .. } => "instance",
            PanelCloseMethod::Dom { .. } => "dom",
        }
    }
}

fn default_auto_close() -> bool {
    true
}

/// Legality and close behaviour of one panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRule {
    pub key: String,
    pub allowed_modes: Vec<String>,
    pub allowed_submodes: Vec<String>,
    #[serde(default = "default_auto_close")]
    pub auto_close_on_mode_change: bool,
    pub ui: PanelShape,
    pub close: PanelCloseMethod,
    /// Extra topic published after a successful close
    #[serde(default)]
    pub close_event: Option<String>,
    /// Element probed by the start-up scan for instance-closed panels
    #[serde(default)]
    pub scan_selector: Option<String>,
}

impl PanelRule {
    pub fn allows_any_mode(&self) -> bool {
        self.allowed_modes.iter().any(|m| m == WILDCARD)
    }

    pub fn allows_any_submode(&self) -> bool {
        self.allowed_submodes.iter().any(|s| s == WILDCARD)
    }

    /// Whether the panel may be open while `mode`/`submode` is active.
    ///
    /// An untracked mode only admits wildcard panels. The submode list is
    /// only consulted when a submode is active.
    pub fn is_allowed(&self, mode: Option<&str>, submode: Option<&str>) -> bool {
        let mode_ok = self.allows_any_mode()
            || mode.is_some_and(|m| self.allowed_modes.iter().any(|a| a == m));
        if !mode_ok {
            return false;
        }
        match submode {
            None => true,
            Some(sub) => {
                self.allows_any_submode() || self.allowed_submodes.iter().any(|a| a == sub)
            }
        }
    }

    /// Element to probe during the start-up scan
    pub fn probe_selector(&self) -> Option<&str> {
        match &self.close {
            PanelCloseMethod::Dom { selector, .. } => Some(selector.as_str()),
            PanelCloseMethod::Instance { .. } => self.scan_selector.as_deref(),
        }
    }
}
