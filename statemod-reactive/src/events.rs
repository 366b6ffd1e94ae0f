//! Per-instance event bus
//!
//! A synchronous publish/subscribe channel table scoped to one reactive
//! instance. Subscribers for an event are invoked in subscription order;
//! subscriptions added or removed during an emit do not affect that emit.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Subscriber identifier, unique within one bus
pub type SubscriberId = u64;

/// Callback invoked with the emitted event arguments
pub type EventCallback = Arc<dyn Fn(&[Value]) + Send + Sync>;

struct EventSubscriber {
    id: SubscriberId,
    callback: EventCallback,
}

#[derive(Default)]
struct BusInner {
    channels: HashMap<String, Vec<EventSubscriber>>,
    next_id: SubscriberId,
}

/// Event bus scoped to one reactive instance
///
/// Cheaply clonable handle; all clones share the same channel table.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a callback to an event name
    ///
    /// Returns a disposer that removes exactly this subscription.
    pub fn on(&self, event: &str, callback: EventCallback) -> EventDisposer {
        let mut bus = self.inner.lock();
        let id = bus.next_id;
        bus.next_id += 1;
        bus.channels
            .entry(event.to_string())
            .or_default()
            .push(EventSubscriber { id, callback });

        EventDisposer {
            bus: Arc::downgrade(&self.inner),
            event: event.to_string(),
            id,
        }
    }

    /// Remove one subscription by id
    pub fn off(&self, event: &str, id: SubscriberId) {
        let mut bus = self.inner.lock();
        if let Some(subs) = bus.channels.get_mut(event) {
            subs.retain(|s| s.id != id);
        }
    }

    /// Invoke all current subscribers for an event, in subscription order
    ///
    /// The subscriber list is snapshotted before invocation, so callbacks
    /// may subscribe or unsubscribe without affecting this emit.
    pub fn emit(&self, event: &str, args: &[Value]) {
        let callbacks: Vec<EventCallback> = {
            let bus = self.inner.lock();
            match bus.channels.get(event) {
                Some(subs) => subs.iter().map(|s| s.callback.clone()).collect(),
                None => Vec::new(),
            }
        };

        for callback in callbacks {
            callback(args);
        }
    }

    /// Number of live subscriptions for an event
    pub fn subscriber_count(&self, event: &str) -> usize {
        let bus = self.inner.lock();
        bus.channels.get(event).map_or(0, |subs| subs.len())
    }
}

/// Disposer returned by [`EventBus::on`]
///
/// Invoking it removes exactly the subscription that created it. There is no
/// implicit disposal on drop; callers must dispose explicitly.
pub struct EventDisposer {
    bus: Weak<Mutex<BusInner>>,
    event: String,
    id: SubscriberId,
}

impl EventDisposer {
    pub fn dispose(self) {
        if let Some(bus) = self.bus.upgrade() {
            let mut bus = bus.lock();
            if let Some(subs) = bus.channels.get_mut(&self.event) {
                subs.retain(|s| s.id != self.id);
            }
        }
    }
}
