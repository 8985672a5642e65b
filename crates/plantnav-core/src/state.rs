//! Navigation state and bounded history
//!
//! `NavigationHistory` owns the current state, the previous state and a
//! FIFO of committed states. Only `commit` mutates it.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rules::LayerMap;

/// Default number of history entries retained
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Snapshot of the active screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    pub mode: String,
    pub submode: Option<String>,
    /// Fully composed visibility map
    pub active_layers: LayerMap,
    pub active_view: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl NavigationState {
    /// Create a state stamped with the current time
    pub fn new(
        mode: impl Into<String>,
        submode: Option<String>,
        active_layers: LayerMap,
        active_view: Option<String>,
    ) -> Self {
        Self {
            mode: mode.into(),
            submode,
            active_layers,
            active_view,
            timestamp: Utc::now(),
        }
    }

    /// Whether this state already shows `mode`/`submode`
    pub fn is_at(&self, mode: &str, submode: Option<&str>) -> bool {
        self.mode == mode && self.submode.as_deref() == submode
    }

    /// `mode/submode`, or just `mode` without a submode
    pub fn label(&self) -> String {
        match &self.submode {
            Some(sub) => format!("{}/{}", self.mode, sub),
            None => self.mode.clone(),
        }
    }
}

/// Current, previous and recent navigation states
#[derive(Debug, Clone)]
pub struct NavigationHistory {
    current: NavigationState,
    previous: Option<NavigationState>,
    entries: VecDeque<NavigationState>,
    capacity: usize,
}

impl NavigationHistory {
    /// Start from `initial`; a zero capacity is raised to one
    pub fn new(initial: NavigationState, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            current: initial,
            previous: None,
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn current(&self) -> &NavigationState {
        &self.current
    }

    pub fn previous(&self) -> Option<&NavigationState> {
        self.previous.as_ref()
    }

    /// History entry by position, 0 being the oldest
    pub fn get(&self, index: usize) -> Option<&NavigationState> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> impl Iterator<Item = &NavigationState> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Make `next` current; the outgoing state becomes previous.
    ///
    /// With `record_history`, `next` is appended and the oldest entries are
    /// evicted beyond capacity.
    pub fn commit(&mut self, next: NavigationState, record_history: bool) {
        if record_history {
            self.entries.push_back(next.clone());
            while self.entries.len() > self.capacity {
                self.entries.pop_front();
            }
        }
        let outgoing = std::mem::replace(&mut self.current, next);
        self.previous = Some(outgoing);
    }
}
