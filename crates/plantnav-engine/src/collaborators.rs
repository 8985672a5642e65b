//! External collaborators of the transition pipeline
//!
//! The engine reaches the backend mode authority, the view subsystem and
//! the connection state only through these traits. Everything runs on one
//! thread, so the async traits are `?Send`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use async_trait::async_trait;
use plantnav_core::errors::{collaborator_failed, ExError};

/// Options for `ModeAuthority::switch_mode`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchOptions {
    /// The navigator already checked connectivity
    pub skip_connection_check: bool,
}

/// Options for `ViewSubsystem::show`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowOptions {
    pub animate: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self { animate: true }
    }
}

/// Backend-facing mode synchronizer
#[async_trait(?Send)]
pub trait ModeAuthority {
    /// Externally tracked mode identifier, if any
    fn current_mode(&self) -> Option<String>;

    /// Switch the external mode
    ///
    /// # Errors
    /// Returns an error if the authority refuses or fails the switch.
    async fn switch_mode(&self, mode: &str, options: SwitchOptions) -> Result<(), ExError>;

    /// Inform the authority of the active submode
    ///
    /// # Errors
    /// Returns an error if the authority rejects the submode.
    fn set_submode(&self, submode: &str) -> Result<(), ExError>;

    /// Backend reachability as seen by the authority; `None` when unknown
    fn is_backend_online(&self) -> Option<bool> {
        None
    }
}

/// Shows and hides bound view components
#[async_trait(?Send)]
pub trait ViewSubsystem {
    /// # Errors
    /// Returns an error if the view cannot be shown.
    async fn show(&self, view: &str, options: ShowOptions) -> Result<(), ExError>;

    /// # Errors
    /// Returns an error if the view cannot be hidden.
    async fn hide(&self, view: &str) -> Result<(), ExError>;
}

/// Connection state consulted by the navigation gate
pub trait ConnectionProbe {
    fn is_connected(&self) -> bool;

    /// Developer bypass of the connection requirement
    fn developer_override(&self) -> bool {
        false
    }
}

/// In-memory mode authority
///
/// Records every switch; `fail_switches` makes the next switches fail and
/// `fail_submode` rejects one submode.
#[derive(Debug, Default)]
pub struct LocalModeAuthority {
    mode: RefCell<Option<String>>,
    submode: RefCell<Option<String>>,
    online: Cell<Option<bool>>,
    switches: RefCell<Vec<String>>,
    fail_switches: Cell<bool>,
    rejected_submodes: RefCell<BTreeSet<String>>,
}

impl LocalModeAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: impl Into<String>) -> Self {
        let authority = Self::default();
        *authority.mode.borrow_mut() = Some(mode.into());
        authority
    }

    pub fn submode(&self) -> Option<String> {
        self.submode.borrow().clone()
    }

    /// Modes switched to, in order
    pub fn switches(&self) -> Vec<String> {
        self.switches.borrow().clone()
    }

    pub fn set_backend_online(&self, online: Option<bool>) {
        self.online.set(online);
    }

    pub fn fail_switches(&self, fail: bool) {
        self.fail_switches.set(fail);
    }

    pub fn fail_submode(&self, submode: impl Into<String>) {
        self.rejected_submodes.borrow_mut().insert(submode.into());
    }
}

#[async_trait(?Send)]
impl ModeAuthority for LocalModeAuthority {
    fn current_mode(&self) -> Option<String> {
        self.mode.borrow().clone()
    }

    async fn switch_mode(&self, mode: &str, _options: SwitchOptions) -> Result<(), ExError> {
        if self.fail_switches.get() {
            return Err(collaborator_failed(
                "mode_authority",
                format!("switch to {} refused", mode),
            ));
        }
        *self.mode.borrow_mut() = Some(mode.to_string());
        self.switches.borrow_mut().push(mode.to_string());
        Ok(())
    }

    fn set_submode(&self, submode: &str) -> Result<(), ExError> {
        if self.rejected_submodes.borrow().contains(submode) {
            return Err(collaborator_failed(
                "mode_authority",
                format!("submode {} refused", submode),
            ));
        }
        *self.submode.borrow_mut() = Some(submode.to_string());
        Ok(())
    }

    fn is_backend_online(&self) -> Option<bool> {
        self.online.get()
    }
}

/// In-memory view subsystem tracking which views are showing
#[derive(Debug, Default)]
pub struct MemoryViewSubsystem {
    visible: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<String>>,
    failing: RefCell<BTreeSet<String>>,
}

impl MemoryViewSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, view: &str) -> bool {
        self.visible.borrow().contains(view)
    }

    /// `show:<view>` / `hide:<view>` in call order; animated shows are `show~:<view>`
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Make every call for `view` fail
    pub fn fail_on(&self, view: impl Into<String>) {
        self.failing.borrow_mut().insert(view.into());
    }

    fn check(&self, view: &str) -> Result<(), ExError> {
        if self.failing.borrow().contains(view) {
            return Err(collaborator_failed("views", format!("view {} unavailable", view)));
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl ViewSubsystem for MemoryViewSubsystem {
    async fn show(&self, view: &str, options: ShowOptions) -> Result<(), ExError> {
        let tag = if options.animate { "show~" } else { "show" };
        self.calls.borrow_mut().push(format!("{}:{}", tag, view));
        self.check(view)?;
        self.visible.borrow_mut().insert(view.to_string());
        Ok(())
    }

    async fn hide(&self, view: &str) -> Result<(), ExError> {
        self.calls.borrow_mut().push(format!("hide:{}", view));
        self.check(view)?;
        self.visible.borrow_mut().remove(view);
        Ok(())
    }
}

/// Connection probe with settable state
#[derive(Debug, Default)]
pub struct ManualConnectionProbe {
    connected: Cell<bool>,
    developer: Cell<bool>,
}

impl ManualConnectionProbe {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Cell::new(connected),
            developer: Cell::new(false),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    pub fn set_developer_override(&self, enabled: bool) {
        self.developer.set(enabled);
    }
}

impl ConnectionProbe for ManualConnectionProbe {
    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn developer_override(&self) -> bool {
        self.developer.get()
    }
}
