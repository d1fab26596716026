/// Topic registry — the mapping from topic name to subscribed handlers.
///
/// Handlers are plain `FnMut` closures with no identity of their own, so
/// `subscribe` hands back a `HandlerId` token and `unsubscribe` takes the
/// token. Removal is strict: naming a handler (or topic) that is not
/// registered is an error, not a no-op.

use std::collections::HashMap;

use crate::error::{BusError, BusResult};
use crate::event::Payload;

// ── Handler id ────────────────────────────────────────────────────────

/// A unique identifier for a subscribed handler.
///
/// `HandlerId` is intentionally a newtype around `u64` rather than a
/// bare integer to prevent accidental confusion with other u64 values
/// (sequence numbers, timestamps, etc.) at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlerId(u64);

impl HandlerId {
    /// Create a handler ID from a raw integer.
    #[inline]
    pub fn new(id: u64) -> Self {
        HandlerId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "H{}", self.0)
    }
}

// ── Handler types ─────────────────────────────────────────────────────

/// Error type a handler may return. Boxed so handlers can surface any
/// application error without the bus caring about the concrete type.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type every handler returns.
pub type HandlerResult = Result<(), HandlerError>;

/// A subscribed callback. Receives the event's argument values.
pub type Handler = Box<dyn FnMut(&[Payload]) -> HandlerResult + Send>;

// ── Registry ──────────────────────────────────────────────────────────

/// Maps topic names to their handlers, preserving registration order.
///
/// Registration order determines dispatch order. There is no
/// deduplication: subscribing two identical closures yields two entries
/// that both fire per event. A topic whose last handler was removed
/// stays registered (publishes to it still succeed and dispatch to
/// nobody); `remove` deletes the entry wholesale.
#[derive(Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Vec<(HandlerId, Handler)>>,
    next_handler: u64,
}

impl TopicRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        TopicRegistry {
            topics: HashMap::new(),
            next_handler: 0,
        }
    }

    /// Ensure `topic` exists, without attaching a handler. Publishes to
    /// a handler-less topic succeed and dispatch to nobody.
    pub fn register(&mut self, topic: &str) {
        self.topics.entry(topic.to_owned()).or_default();
    }

    /// Register a handler on `topic`, creating the topic entry if absent.
    /// Appends after any existing handlers. Returns the token needed to
    /// unsubscribe later.
    pub fn subscribe(&mut self, topic: &str, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.topics
            .entry(topic.to_owned())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove the handler identified by `id` from `topic`.
    ///
    /// Errors with `HandlerNotFound` if the topic is absent or the id is
    /// not currently registered on it.
    pub fn unsubscribe(&mut self, topic: &str, id: HandlerId) -> BusResult<()> {
        let missing = || BusError::HandlerNotFound {
            topic: topic.to_owned(),
            handler: id,
        };
        let handlers = self.topics.get_mut(topic).ok_or_else(missing)?;
        let pos = handlers
            .iter()
            .position(|(hid, _)| *hid == id)
            .ok_or_else(missing)?;
        handlers.remove(pos);
        Ok(())
    }

    /// Delete a topic entry and all of its handlers.
    ///
    /// Pending events already published to the topic become orphans and
    /// are silently discarded when their delivery time is reached.
    pub fn remove(&mut self, topic: &str) -> BusResult<()> {
        self.topics
            .remove(topic)
            .map(|_| ())
            .ok_or_else(|| BusError::TopicNotFound(topic.to_owned()))
    }

    /// Whether `topic` has ever been subscribed to (and not removed).
    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Mutable access to a topic's handlers, in registration order.
    /// `None` if the topic is not registered.
    pub fn handlers_mut(&mut self, topic: &str) -> Option<&mut Vec<(HandlerId, Handler)>> {
        self.topics.get_mut(topic)
    }

    /// Number of handlers currently registered on `topic` (0 if the
    /// topic is absent).
    pub fn handler_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }

    /// Number of registered topics.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// Iterate over registered topic names (arbitrary order).
    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for TopicRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (topic, handlers) in &self.topics {
            let ids: Vec<HandlerId> = handlers.iter().map(|(id, _)| *id).collect();
            map.entry(topic, &ids);
        }
        map.finish()
    }
}
