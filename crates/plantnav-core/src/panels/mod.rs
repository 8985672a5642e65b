//! Panel lifecycle
//!
//! Tracks which transient overlays are open and closes the ones that
//! become illegal after a navigation.

pub mod manager;

use std::rc::Rc;

use crate::errors::ExError;

pub use manager::{ModeChangeReport, PanelManager};

/// Live panel instance that can close itself
pub trait PanelHandle {
    /// Close the panel's UI
    ///
    /// # Errors
    /// Returns an error if the instance could not close.
    fn close(&self) -> Result<(), ExError>;
}

impl<F> PanelHandle for F
where
    F: Fn() -> Result<(), ExError>,
{
    fn close(&self) -> Result<(), ExError> {
        self()
    }
}

/// Fallback lookup for instances nobody registered explicitly
pub trait PanelInstanceLocator {
    fn locate(&self, target: &str) -> Option<Rc<dyn PanelHandle>>;
}
