//! plantnav Engine - transition pipeline and navigation state machine
//!
//! Drives the rule engine in `plantnav-core` against async collaborators:
//! the backend mode authority, the view subsystem and the connection probe.
//! Everything runs on a single thread; no type here is `Send`.

pub mod collaborators;
pub mod config;
pub mod executor;
pub mod navigator;
pub mod options;

pub use collaborators::{
    ConnectionProbe, LocalModeAuthority, ManualConnectionProbe, MemoryViewSubsystem,
    ModeAuthority, ShowOptions, SwitchOptions, ViewSubsystem,
};
pub use config::NavigatorConfig;
pub use executor::{
    PipelineStep, StepReport, StepStatus, TransitionExecutor, TransitionPlan, TransitionReport,
};
pub use navigator::{NavigationOutcome, Navigator, NavigatorBuilder};
pub use options::NavigateOptions;
