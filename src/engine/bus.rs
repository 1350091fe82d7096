//! Inbound event bus with scoped subscriptions.
//!
//! The host publishes UI/input events (roll completed, piece clicked, space
//! clicked) on an `EventBus`. A consumer subscribes to a fixed set of topics
//! and receives a `Subscription`; dropping the subscription removes it from
//! the bus, so a torn-down engine can never be called back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Events carried on the bus name their own topic.
pub trait Topic {
    fn topic(&self) -> &'static str;
}

struct Subscriber<E> {
    topics: Vec<&'static str>,
    tx: UnboundedSender<E>,
}

struct Registry<E> {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber<E>>,
}

fn lock<E>(registry: &Mutex<Registry<E>>) -> MutexGuard<'_, Registry<E>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct EventBus<E> {
    inner: Arc<Mutex<Registry<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Topic + Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Topic + Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: HashMap::new(),
            })),
        }
    }

    pub fn subscribe(&self, topics: &[&'static str]) -> Subscription<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = lock(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(
            id,
            Subscriber {
                topics: topics.to_vec(),
                tx,
            },
        );
        tracing::debug!(subscription = id, ?topics, "subscribed to event bus");
        Subscription {
            id,
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every subscriber of its topic. Returns how many
    /// subscribers received it.
    pub fn publish(&self, event: E) -> usize {
        let topic = event.topic();
        let mut registry = lock(&self.inner);
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, sub) in &registry.subscribers {
            if !sub.topics.contains(&topic) {
                continue;
            }
            if sub.tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in closed {
            registry.subscribers.remove(&id);
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

/// Handle to a bus registration. Dropping it unsubscribes.
pub struct Subscription<E> {
    id: u64,
    rx: UnboundedReceiver<E>,
    bus: Weak<Mutex<Registry<E>>>,
}

impl<E> Subscription<E> {
    /// Next queued event, if any. Never blocks.
    pub fn try_next(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            lock(&bus).subscribers.remove(&self.id);
            tracing::debug!(subscription = self.id, "unsubscribed from event bus");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        A(u8),
        B,
    }

    impl Topic for Ping {
        fn topic(&self) -> &'static str {
            match self {
                Ping::A(_) => "a",
                Ping::B => "b",
            }
        }
    }

    #[test]
    fn test_topic_filtering() {
        let bus = EventBus::<Ping>::new();
        let mut only_a = bus.subscribe(&["a"]);
        let mut both = bus.subscribe(&["a", "b"]);

        assert_eq!(bus.publish(Ping::A(1)), 2);
        assert_eq!(bus.publish(Ping::B), 1);

        assert_eq!(only_a.try_next(), Some(Ping::A(1)));
        assert_eq!(only_a.try_next(), None);
        assert_eq!(both.try_next(), Some(Ping::A(1)));
        assert_eq!(both.try_next(), Some(Ping::B));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = EventBus::<Ping>::new();
        let sub = bus.subscribe(&["a"]);
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(Ping::A(3)), 0);
    }

    #[test]
    fn test_subscription_outlives_bus() {
        let bus = EventBus::<Ping>::new();
        let mut sub = bus.subscribe(&["b"]);
        bus.publish(Ping::B);
        drop(bus);
        assert_eq!(sub.try_next(), Some(Ping::B));
    }
}
