//! In-process event bus
//!
//! The navigator and the panel manager take an `Rc<dyn EventBus>` at
//! construction. `LocalEventBus` dispatches synchronously to topic
//! subscribers; `RecordingEventBus` keeps every event for inspection.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use plantnav_core_types::schema::TOPIC_WILDCARD;
use plantnav_core_types::SubscriptionId;
use tracing::trace;

use crate::events::NavEvent;

/// Publish side of the bus
pub trait EventBus {
    fn publish(&self, event: NavEvent);
}

type Handler = Rc<dyn Fn(&NavEvent)>;

struct Subscription {
    id: SubscriptionId,
    topic: String,
    handler: Handler,
}

/// Synchronous publish/subscribe keyed by topic
///
/// Handlers run in subscription order. A handler may subscribe or
/// unsubscribe while an event is being dispatched; the change applies from
/// the next publish.
#[derive(Default)]
pub struct LocalEventBus {
    subscriptions: RefCell<Vec<Subscription>>,
    next_id: Cell<u64>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `topic`
    pub fn subscribe<F>(&self, topic: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&NavEvent) + 'static,
    {
        let id = SubscriptionId::new(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            topic: topic.into(),
            handler: Rc::new(handler),
        });
        id
    }

    /// Subscribe `handler` to every topic
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&NavEvent) + 'static,
    {
        self.subscribe(TOPIC_WILDCARD, handler)
    }

    /// Remove a subscription; returns false if it was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }
}

impl EventBus for LocalEventBus {
    fn publish(&self, event: NavEvent) {
        let topic = event.topic();
        let handlers: Vec<Handler> = self
            .subscriptions
            .borrow()
            .iter()
            .filter(|s| s.topic == topic || s.topic == TOPIC_WILDCARD)
            .map(|s| Rc::clone(&s.handler))
            .collect();
        trace!(topic, handlers = handlers.len(), "publishing");
        for handler in handlers {
            handler(&event);
        }
    }
}

/// Bus that records every published event
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    events: RefCell<Vec<NavEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavEvent> {
        self.events.borrow().clone()
    }

    /// Topics in publish order
    pub fn topics(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|e| e.topic().to_string())
            .collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.topic() == topic)
            .count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventBus for RecordingEventBus {
    fn publish(&self, event: NavEvent) {
        self.events.borrow_mut().push(event);
    }
}
