#![forbid(unsafe_code)]

//! Publish/subscribe bus.
//!
//! Subscriptions are keyed publisher-id → subscriber-id → event-name, so a
//! given subscriber holds at most one handler per publisher event, and the
//! first registration wins. Publishing to an id with no subscribers is a
//! no-op. Delivery order across subscribers is unspecified.

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// A subscriber callback.
pub type BusHandler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Event bus owned by whoever wires publishers to subscribers.
pub struct Bus<E> {
    subscribers: FxHashMap<String, FxHashMap<String, FxHashMap<String, BusHandler<E>>>>,
}

impl<E> Default for Bus<E> {
    fn default() -> Self {
        Self {
            subscribers: FxHashMap::default(),
        }
    }
}

impl<E> Bus<E> {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `subscriber`'s handler to `publisher`'s `event`.
    ///
    /// Returns `false` (and logs) when either id is empty. An existing
    /// handler for the same (publisher, subscriber, event) triple is kept
    /// and the new one discarded.
    pub fn subscribe(
        &mut self,
        publisher: &str,
        event: &str,
        subscriber: &str,
        handler: impl Fn(&E) + Send + Sync + 'static,
    ) -> bool {
        if publisher.is_empty() {
            tracing::error!("subscribe: publisher has no id");
            return false;
        }
        if subscriber.is_empty() {
            tracing::error!("subscribe: subscriber has no id");
            return false;
        }
        let events = self
            .subscribers
            .entry(publisher.to_string())
            .or_default()
            .entry(subscriber.to_string())
            .or_default();
        events
            .entry(event.to_string())
            .or_insert_with(|| Arc::new(handler));
        true
    }

    /// Deliver `args` to every subscriber of `publisher`'s `event`.
    ///
    /// Returns how many handlers ran.
    pub fn publish(&self, publisher: &str, event: &str, args: &E) -> usize {
        let Some(subs) = self.subscribers.get(publisher) else {
            return 0;
        };
        let mut delivered = 0;
        for events in subs.values() {
            if let Some(handler) = events.get(event) {
                handler(args);
                delivered += 1;
            }
        }
        delivered
    }

    /// Drop every subscription held by `subscriber`, across all publishers.
    pub fn remove_subscriber(&mut self, subscriber: &str) {
        for subs in self.subscribers.values_mut() {
            subs.remove(subscriber);
        }
        self.subscribers.retain(|_, subs| !subs.is_empty());
    }
}

impl<E> std::fmt::Debug for Bus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("publishers", &self.subscribers.len())
            .finish()
    }
}
