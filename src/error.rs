//! Structured error types for the event bus.
//!
//! All fallible public APIs return `Result<T, BusError>`. This lets
//! callers distinguish registration errors (e.g. unknown topic) from
//! dispatch-time handler failures without relying on panics or
//! stringly-typed errors.

use crate::event::EventSeq;
use crate::topic::HandlerId;

/// The top-level error type for the topic scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BusError {
    // ── Registration errors ───────────────────────────────

    /// A publish named a topic that has never been subscribed to.
    UnknownTopic(String),

    /// An unsubscribe named a handler that is not registered on the
    /// topic (or the topic itself is absent). Strict by contract:
    /// callers track their own subscriptions via the `HandlerId`
    /// returned at subscribe time.
    HandlerNotFound { topic: String, handler: HandlerId },

    /// A topic removal named a topic that is not registered.
    TopicNotFound(String),

    // ── Dispatch errors ───────────────────────────────────

    /// A handler returned an error while the bus was draining under
    /// the fail-fast policy. The message is the handler error rendered
    /// with `Display`; the remaining due events stay queued.
    HandlerFailed {
        topic: String,
        handler: HandlerId,
        seq: EventSeq,
        message: String,
    },
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::UnknownTopic(topic) => {
                write!(f, "topic {:?} has no subscribers", topic)
            }
            BusError::HandlerNotFound { topic, handler } => {
                write!(f, "handler {} is not registered on topic {:?}", handler, topic)
            }
            BusError::TopicNotFound(topic) => {
                write!(f, "topic {:?} is not registered", topic)
            }
            BusError::HandlerFailed {
                topic,
                handler,
                seq,
                message,
            } => write!(
                f,
                "handler {} failed on topic {:?} for event {}: {}",
                handler, topic, seq, message
            ),
        }
    }
}

impl std::error::Error for BusError {}

/// Convenience alias for `Result<T, BusError>`.
pub type BusResult<T> = Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unknown_topic() {
        let e = BusError::UnknownTopic("orders".into());
        assert_eq!(e.to_string(), "topic \"orders\" has no subscribers");
    }

    #[test]
    fn test_display_handler_not_found() {
        let e = BusError::HandlerNotFound {
            topic: "orders".into(),
            handler: HandlerId::new(3),
        };
        assert!(e.to_string().contains("H3"));
        assert!(e.to_string().contains("orders"));
    }

    #[test]
    fn test_display_handler_failed() {
        let e = BusError::HandlerFailed {
            topic: "t".into(),
            handler: HandlerId::new(0),
            seq: EventSeq::new(7),
            message: "boom".into(),
        };
        let s = e.to_string();
        assert!(s.contains("E#7"));
        assert!(s.contains("boom"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(BusError::TopicNotFound("x".into()));
        assert!(!e.to_string().is_empty());
    }

    #[test]
    fn test_bus_result_roundtrip() {
        let ok: BusResult<u32> = Ok(42);
        assert_eq!(ok.unwrap(), 42);
        let err: BusResult<u32> = Err(BusError::UnknownTopic("t".into()));
        assert!(err.is_err());
    }
}
