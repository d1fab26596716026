/// Pending events and their deterministic ordering.
///
/// Every `publish` produces an immutable `Event` record that sits on the
/// pending queue until a `run_until` call reaches its delivery time.
/// Events order by `(delivery time, publish sequence)` so that two events
/// scheduled for the same tick dispatch in publish order — the comparison
/// never touches the topic string or the payload.

use crate::time::LogicalTime;
use std::cmp::Ordering;

// ── Event sequence number ─────────────────────────────────────────────

/// A strictly-increasing publish sequence number.
///
/// Minted at publish time, `EventSeq` breaks ties between events that
/// share a delivery time: the earlier publish dispatches first. Because
/// the counter is monotonic, the dispatch order of any event set is fully
/// determined by the publish calls that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventSeq(u64);

impl EventSeq {
    /// Wrap a raw u64 into an `EventSeq`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventSeq(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Sequence generator ────────────────────────────────────────────────

/// Monotonic `EventSeq` generator.
///
/// Each pending queue owns exactly one of these; because all publishes
/// go through the owning bus on one thread (or behind one lock), the
/// counter is trivially deterministic.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SeqGen {
    next: u64,
}

impl SeqGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        SeqGen { next: 0 }
    }

    /// Mint the next sequence number.
    pub fn next_seq(&mut self) -> EventSeq {
        let seq = EventSeq(self.next);
        self.next += 1;
        seq
    }

    /// Peek at the next sequence number without consuming it.
    pub fn peek(&self) -> EventSeq {
        EventSeq(self.next)
    }
}

// ── Payload ───────────────────────────────────────────────────────────

/// An opaque argument value carried by an event.
///
/// Handlers should treat `Data` and `Text` as opaque; the distinction
/// exists purely for ergonomic test authoring (`Text`) vs. binary
/// payload usage (`Data`). Payloads are never compared by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    /// Raw bytes.
    Data(Vec<u8>),
    /// Human-readable text (convenient for examples and tests).
    Text(String),
    /// A machine integer.
    Int(i64),
    /// Empty payload (markers, heartbeats).
    Empty,
}

impl Payload {
    /// Convenience constructor for `Payload::Text`.
    pub fn text(s: impl Into<String>) -> Self {
        Payload::Text(s.into())
    }

    /// Convenience constructor for `Payload::Int`.
    pub fn int(v: i64) -> Self {
        Payload::Int(v)
    }
}

impl std::fmt::Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Data(d) => write!(f, "Data({} bytes)", d.len()),
            Payload::Text(s) => {
                if s.len() > 32 {
                    write!(f, "Text(\"{}…\")", &s[..32])
                } else {
                    write!(f, "Text({:?})", s)
                }
            }
            Payload::Int(v) => write!(f, "Int({})", v),
            Payload::Empty => write!(f, "Empty"),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single pending event.
///
/// Events are the atomic unit of delivery. The pending queue orders them
/// by `(at, seq)` to guarantee deterministic dispatch order regardless of
/// topic name or payload contents.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Publish sequence number (monotonically increasing).
    pub seq: EventSeq,

    /// The logical time at which this event becomes due.
    pub at: LogicalTime,

    /// The topic this event was published to.
    pub topic: String,

    /// The argument values delivered to each handler.
    pub args: Vec<Payload>,
}

impl Event {
    /// Convenience constructor.
    pub fn new(seq: EventSeq, at: LogicalTime, topic: impl Into<String>, args: Vec<Payload>) -> Self {
        Event {
            seq,
            at,
            topic: topic.into(),
            args,
        }
    }
}

/// Ordering: smallest `(at, seq)` first.
///
/// Rust's `BinaryHeap` is a *max*-heap, so we **reverse** the natural
/// ordering here to turn it into a min-heap. Topic and args deliberately
/// play no part in the key.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so that BinaryHeap pops the *smallest* key first.
        (other.at, other.seq).cmp(&(self.at, self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {} {:?}] {} arg(s)", self.seq, self.at, self.topic, self.args.len())
    }
}
