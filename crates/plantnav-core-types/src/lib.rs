//! Core types shared across plantnav facilities
//!
//! This crate provides foundational types used by the error, logging and
//! event facilities:
//!
//! - **Correlation types**: TransitionId, SubscriptionId
//! - **Schema constants**: Canonical log field keys, log event names and bus topics

pub mod correlation;
pub mod schema;

pub use correlation::{SubscriptionId, TransitionId};
