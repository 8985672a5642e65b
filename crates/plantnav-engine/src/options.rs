//! Per-call navigation options

use serde_json::Value;

/// Options accepted by `Navigator::navigate`
///
/// `force` bypasses both the "already there" short-circuit and the
/// in-flight guard. A forced navigation started while another transition is
/// suspended runs interleaved with it; the last one to commit wins. Callers
/// that force must accept that race.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigateOptions {
    pub force: bool,
    /// Ask the view subsystem not to animate
    pub skip_animation: bool,
    /// Commit without recording a history entry
    pub skip_history: bool,
    /// Publish no `navigation:*` events
    pub silent: bool,
    /// Forwarded to start, complete and hook events
    pub data: Option<Value>,
}

impl NavigateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    pub fn without_animation(mut self) -> Self {
        self.skip_animation = true;
        self
    }

    pub fn without_history(mut self) -> Self {
        self.skip_history = true;
        self
    }

    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}
