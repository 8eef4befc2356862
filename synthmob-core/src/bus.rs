//! Event fanout.
//!
//! The bus delivers every published event to every subscriber,
//! synchronously and in publish order. A subscriber that reports failure
//! is removed silently so a broken client can never stall the core.
//! Delivery happens under the core lock, so subscriber handlers must be
//! non-blocking; [`ChannelSubscriber`] is the stock implementation that
//! hands events to a bounded queue and drops on overflow.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};

use synthmob_types::CoreEvent;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// A sink for published events.
///
/// `deliver` must not block. Returning `false` marks the subscriber as
/// broken; the bus removes it after the current publish completes.
pub trait Subscriber: Send {
    fn deliver(&self, event: &CoreEvent) -> bool;
}

/// Subscriber registry with synchronous fanout.
pub struct EventBus {
    subscribers: Vec<(SubscriberId, Box<dyn Subscriber>)>,
    next_id: u64,
    published: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
            published: 0,
        }
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        debug!(target: "bus", "subscriber {:?} added ({} total)", id, self.subscribers.len());
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Total events published since construction.
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Deliver one event to every subscriber, dropping the ones that fail.
    pub fn publish(&mut self, event: &CoreEvent) {
        self.published += 1;
        let mut broken: Vec<SubscriberId> = Vec::new();
        for (id, sub) in &self.subscribers {
            if !sub.deliver(event) {
                broken.push(*id);
            }
        }
        for id in broken {
            warn!(target: "bus", "removing broken subscriber {:?}", id);
            self.unsubscribe(id);
        }
    }

    /// Publish a batch in order. Events produced by one operation go out
    /// back-to-back so a single subscriber sees the operation atomically.
    pub fn publish_all(&mut self, events: &[CoreEvent]) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded-queue subscriber. Events are enqueued with `try_send`; a full
/// queue drops the event (and counts it), a disconnected receiver marks
/// the subscriber broken.
pub struct ChannelSubscriber {
    tx: Sender<CoreEvent>,
}

impl ChannelSubscriber {
    /// Create the subscriber and its receiving half.
    pub fn pair(capacity: usize) -> (Self, Receiver<CoreEvent>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }
}

impl Subscriber for ChannelSubscriber {
    fn deliver(&self, event: &CoreEvent) -> bool {
        match self.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                // Slow consumer: drop this event, keep the subscription.
                debug!(target: "bus", "subscriber queue full, dropping {}", event.name);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        seen: Arc<AtomicUsize>,
        ok: bool,
    }

    impl Subscriber for Counting {
        fn deliver(&self, _event: &CoreEvent) -> bool {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.ok
        }
    }

    fn ev(name: &str) -> CoreEvent {
        CoreEvent::new(name, serde_json::json!({}))
    }

    #[test]
    fn fanout_reaches_all_subscribers() {
        let mut bus = EventBus::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Box::new(Counting { seen: a.clone(), ok: true }));
        bus.subscribe(Box::new(Counting { seen: b.clone(), ok: true }));

        bus.publish(&ev("x"));
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn broken_subscriber_is_removed_silently() {
        let mut bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        bus.subscribe(Box::new(Counting { seen: seen.clone(), ok: false }));
        bus.subscribe(Box::new(Counting { seen: Arc::new(AtomicUsize::new(0)), ok: true }));

        bus.publish(&ev("x"));
        assert_eq!(bus.subscriber_count(), 1);

        // The broken one saw the first event but no more.
        bus.publish(&ev("y"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let id = bus.subscribe(Box::new(Counting { seen: seen.clone(), ok: true }));
        bus.publish(&ev("x"));
        bus.unsubscribe(id);
        bus.publish(&ev("y"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn channel_subscriber_drops_on_full_but_stays() {
        let mut bus = EventBus::new();
        let (sub, rx) = ChannelSubscriber::pair(1);
        bus.subscribe(Box::new(sub));

        bus.publish(&ev("first"));
        bus.publish(&ev("second")); // queue full, dropped
        assert_eq!(bus.subscriber_count(), 1);

        assert_eq!(rx.try_recv().unwrap().name, "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnected_receiver_breaks_subscription() {
        let mut bus = EventBus::new();
        let (sub, rx) = ChannelSubscriber::pair(4);
        bus.subscribe(Box::new(sub));
        drop(rx);
        bus.publish(&ev("x"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn publish_order_is_preserved() {
        let mut bus = EventBus::new();
        let (sub, rx) = ChannelSubscriber::pair(16);
        bus.subscribe(Box::new(sub));
        bus.publish_all(&[ev("a"), ev("b"), ev("c")]);
        let names: Vec<String> = rx.try_iter().map(|e| e.name).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
