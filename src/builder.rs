/// Fluent builder for composing an [`EventBus`].
///
/// Hides the boilerplate of registering topics, attaching handlers and
/// seeding initial events, while keeping every publish check intact
/// (seeding an event on a topic no handler or `topic` call registered
/// still fails with `UnknownTopic`).
///
/// # Example
/// ```rust
/// use kairos::{BusBuilder, DispatchPolicy, LogicalTime, Payload};
///
/// let mut bus = BusBuilder::new()
///     .policy(DispatchPolicy::CollectErrors)
///     .with_logging()
///     .handler("orders", |args| {
///         println!("order: {:?}", args);
///         Ok(())
///     })
///     .seed("orders", LogicalTime::new(5), vec![Payload::int(1)])
///     .build()
///     .unwrap();
///
/// let report = bus.run_until(LogicalTime::new(5)).unwrap();
/// assert_eq!(report.dispatched, 1);
/// ```

use crate::bus::{DispatchPolicy, EventBus};
use crate::error::BusResult;
use crate::event::Payload;
use crate::time::LogicalTime;
use crate::topic::{Handler, HandlerResult};

/// Fluent builder for an [`EventBus`].
#[derive(Default)]
pub struct BusBuilder {
    policy: DispatchPolicy,
    logging: bool,
    topics: Vec<String>,
    handlers: Vec<(String, Handler)>,
    seeds: Vec<(String, LogicalTime, Vec<Payload>)>,
}

impl BusBuilder {
    /// Create a new builder with the default fail-fast policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch policy.
    pub fn policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enable dispatch logging on the built bus.
    pub fn with_logging(mut self) -> Self {
        self.logging = true;
        self
    }

    /// Register a topic with no handlers (yet). Publishes to it succeed
    /// and dispatch to nobody until a handler subscribes.
    pub fn topic(mut self, name: &str) -> Self {
        self.topics.push(name.to_owned());
        self
    }

    /// Attach a handler to `topic`, registering the topic if needed.
    /// Handlers attach in builder-call order.
    pub fn handler<F>(mut self, topic: &str, handler: F) -> Self
    where
        F: FnMut(&[Payload]) -> HandlerResult + Send + 'static,
    {
        self.handlers.push((topic.to_owned(), Box::new(handler)));
        self
    }

    /// Seed an event on `topic` due at `at`. Seeds publish in
    /// builder-call order, after all topics and handlers are in place.
    pub fn seed(mut self, topic: &str, at: LogicalTime, args: Vec<Payload>) -> Self {
        self.seeds.push((topic.to_owned(), at, args));
        self
    }

    /// Build the bus. Fails if a seed names a topic that neither
    /// `topic` nor `handler` registered.
    pub fn build(self) -> BusResult<EventBus> {
        let mut bus = EventBus::with_policy(self.policy);
        if self.logging {
            bus.enable_logging();
        }
        for name in &self.topics {
            bus.register_topic(name);
        }
        for (topic, handler) in self.handlers {
            bus.subscribe_boxed(&topic, handler);
        }
        for (topic, at, args) in self.seeds {
            bus.publish(&topic, at, args)?;
        }
        Ok(bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_build_with_handlers_and_seeds() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&trace);

        let mut bus = BusBuilder::new()
            .handler("orders", move |args| {
                sink.lock().unwrap().push(args.to_vec());
                Ok(())
            })
            .seed("orders", LogicalTime::new(10), vec![Payload::int(1)])
            .seed("orders", LogicalTime::new(5), vec![Payload::int(2)])
            .build()
            .unwrap();

        bus.run_until(LogicalTime::new(10)).unwrap();
        assert_eq!(
            *trace.lock().unwrap(),
            vec![vec![Payload::int(2)], vec![Payload::int(1)]]
        );
    }

    #[test]
    fn test_bare_topic_accepts_publishes() {
        let mut bus = BusBuilder::new().topic("audit").build().unwrap();
        assert!(bus.has_topic("audit"));
        assert_eq!(bus.handler_count("audit"), 0);
        bus.publish("audit", LogicalTime::new(1), vec![]).unwrap();
        let report = bus.run_until(LogicalTime::new(1)).unwrap();
        assert_eq!(report.dispatched, 1);
    }

    #[test]
    fn test_seed_on_unregistered_topic_fails() {
        let err = BusBuilder::new()
            .seed("ghost", LogicalTime::ZERO, vec![])
            .build()
            .unwrap_err();
        assert_eq!(err, BusError::UnknownTopic("ghost".into()));
    }

    #[test]
    fn test_policy_and_logging_carry_over() {
        let bus = BusBuilder::new()
            .policy(DispatchPolicy::CollectErrors)
            .with_logging()
            .build()
            .unwrap();
        assert_eq!(bus.policy(), DispatchPolicy::CollectErrors);
        assert!(bus.log().is_some());
    }
}
