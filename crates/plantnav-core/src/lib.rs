//! plantnav Core - rule engine and panel lifecycle for the monitoring client
//!
//! This crate provides the synchronous half of navigation:
//! - Mode, submode, layer and panel rules loaded from YAML and validated once
//! - The layer compositor and the DOM-driven layer applier
//! - Navigation state with a bounded history ring
//! - The panel lifecycle manager and its reconciliation on mode change
//! - An in-process event bus and the events published on it
//!
//! The async transition pipeline lives in `plantnav-engine`.

pub use plantnav_core_types as core_types;

pub mod bus;
pub mod dom;
pub mod errors;
pub mod events;
pub mod layers;
pub mod logging_facility;
pub mod panels;
pub mod rules;
pub mod state;

// Re-export commonly used types
pub use bus::{EventBus, LocalEventBus, RecordingEventBus};
pub use dom::{DomEnvironment, ElementRef, MemoryDom};
pub use errors::{ExError, ExErrorKind, NavError, Result};
pub use events::{CloseReason, HookPhase, NavEvent};
pub use layers::{compose_layers, try_compose_layers, LayerApplier, LayerHandler, LayerOutcome};
pub use panels::{ModeChangeReport, PanelHandle, PanelInstanceLocator, PanelManager};
pub use rules::{LayerMap, ModeRule, PanelRule, RuleTable, SubmodeRule};
pub use state::{NavigationHistory, NavigationState, DEFAULT_HISTORY_CAPACITY};
