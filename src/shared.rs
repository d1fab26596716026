/// Shared, thread-safe handle to one [`EventBus`].
///
/// The reference design used process-wide module state so that
/// independently-imported producers and consumers shared one queue.
/// Here, sharing is explicit: the composition root constructs a
/// `SharedBus` once at startup and clones the handle into each module.
/// Every clone points at the same bus; all access is serialized through
/// a mutex, so producers and consumers may live on different threads.
///
/// `run_until` holds the lock for the whole drain — handlers must not
/// call back into the same `SharedBus`, or they will deadlock. Handlers
/// needing follow-up publishes should return the work to the caller.

use std::sync::{Arc, Mutex};

use crate::bus::{DispatchReport, EventBus};
use crate::error::BusResult;
use crate::event::{EventSeq, Payload};
use crate::time::LogicalTime;
use crate::topic::{HandlerId, HandlerResult};

/// A cloneable handle to a mutex-guarded [`EventBus`].
#[derive(Clone, Default)]
pub struct SharedBus {
    inner: Arc<Mutex<EventBus>>,
}

impl SharedBus {
    /// Wrap a freshly constructed bus.
    pub fn new(bus: EventBus) -> Self {
        SharedBus {
            inner: Arc::new(Mutex::new(bus)),
        }
    }

    /// Run `f` with exclusive access to the underlying bus.
    ///
    /// The escape hatch for anything the forwarding methods below do
    /// not cover (logging, introspection, `step`).
    pub fn with<R>(&self, f: impl FnOnce(&mut EventBus) -> R) -> R {
        let mut bus = self.inner.lock().expect("event bus mutex poisoned");
        f(&mut bus)
    }

    /// See [`EventBus::subscribe`].
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> HandlerId
    where
        F: FnMut(&[Payload]) -> HandlerResult + Send + 'static,
    {
        self.with(|bus| bus.subscribe(topic, handler))
    }

    /// See [`EventBus::unsubscribe`].
    pub fn unsubscribe(&self, topic: &str, id: HandlerId) -> BusResult<()> {
        self.with(|bus| bus.unsubscribe(topic, id))
    }

    /// See [`EventBus::remove_topic`].
    pub fn remove_topic(&self, topic: &str) -> BusResult<()> {
        self.with(|bus| bus.remove_topic(topic))
    }

    /// See [`EventBus::publish`].
    pub fn publish(&self, topic: &str, at: LogicalTime, args: Vec<Payload>) -> BusResult<EventSeq> {
        self.with(|bus| bus.publish(topic, at, args))
    }

    /// See [`EventBus::run_until`]. The lock is held for the entire
    /// drain, so handler execution is serialized with all other access.
    pub fn run_until(&self, target: LogicalTime) -> BusResult<DispatchReport> {
        self.with(|bus| bus.run_until(target))
    }

    /// See [`EventBus::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.with(|bus| bus.is_empty())
    }

    /// See [`EventBus::pending`].
    pub fn pending(&self) -> usize {
        self.with(|bus| bus.pending())
    }

    /// See [`EventBus::current_time`].
    pub fn current_time(&self) -> LogicalTime {
        self.with(|bus| bus.current_time())
    }
}

impl From<EventBus> for SharedBus {
    fn from(bus: EventBus) -> Self {
        SharedBus::new(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clones_share_one_queue() {
        let bus = SharedBus::new(EventBus::new());
        let producer = bus.clone();
        let consumer = bus.clone();

        consumer.subscribe("t", |_| Ok(()));
        producer
            .publish("t", LogicalTime::new(5), vec![Payload::Empty])
            .unwrap();

        assert_eq!(bus.pending(), 1);
        let report = consumer.run_until(LogicalTime::new(5)).unwrap();
        assert_eq!(report.dispatched, 1);
        assert!(producer.is_empty());
    }

    #[test]
    fn test_concurrent_producers() {
        let bus = SharedBus::new(EventBus::new());
        bus.subscribe("t", |_| Ok(()));

        let handles: Vec<_> = (0..4u64)
            .map(|i| {
                let producer = bus.clone();
                thread::spawn(move || {
                    for j in 0..25u64 {
                        producer
                            .publish("t", LogicalTime::new(i * 25 + j), vec![])
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(bus.pending(), 100);
        let report = bus.run_until(LogicalTime::new(100)).unwrap();
        assert_eq!(report.dispatched, 100);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_with_escape_hatch() {
        let bus = SharedBus::new(EventBus::new());
        bus.with(|b| {
            b.register_topic("audit");
            b.enable_logging();
        });
        bus.publish("audit", LogicalTime::ZERO, vec![]).unwrap();
        bus.run_until(LogicalTime::ZERO).unwrap();
        assert_eq!(bus.with(|b| b.log().unwrap().len()), 1);
    }
}
