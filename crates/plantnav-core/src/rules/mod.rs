//! Rule table: modes, submodes, layers and panels
//!
//! Rules are loaded once (from YAML or the embedded built-in table),
//! validated at load time and then shared read-only.

pub mod builtin;
pub mod model;
pub mod panel;
pub mod table;
pub mod validation;

pub use model::{
    LayerDescriptor, LayerMap, LayerPresentation, ModeRule, OptionFlag, SubmodeOptions,
    SubmodeRule,
};
pub use panel::{DomCloseAction, PanelCloseMethod, PanelRule, PanelShape, WILDCARD};
pub use table::{RuleDocument, RuleTable, SUPPORTED_SCHEMA_VERSION};
