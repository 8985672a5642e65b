//! Layer composition and application

pub mod apply;
pub mod compose;

pub use apply::{LayerApplier, LayerHandler, LayerOutcome};
pub use compose::{compose_layers, try_compose_layers};
