/// Pending-event queue.
///
/// Uses a `BinaryHeap` with reversed `Ord` on `Event` to act as a
/// min-heap keyed by `(at, seq)`. Because sequence numbers are strictly
/// increasing and the heap key never involves the payload, two runs with
/// the same publish calls always produce the same dispatch order.

use std::collections::BinaryHeap;

use crate::event::{Event, EventSeq, Payload, SeqGen};
use crate::time::LogicalTime;

/// Min-heap of events awaiting their delivery time.
///
/// Owns the sequence generator. All publishes go through this struct to
/// ensure monotonic sequence numbers and deterministic ordering.
#[derive(Debug, Default)]
pub struct PendingQueue {
    /// Min-heap (via reversed Ord on Event).
    heap: BinaryHeap<Event>,

    /// Monotonic sequence generator.
    seq_gen: SeqGen,
}

impl PendingQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        PendingQueue {
            heap: BinaryHeap::new(),
            seq_gen: SeqGen::new(),
        }
    }

    /// Enqueue an event for `topic` due at `at`.
    ///
    /// Returns the `EventSeq` assigned to this event. There is no
    /// restriction that `at` be in the future; a past time simply makes
    /// the event due on the next drain.
    pub fn push(&mut self, at: LogicalTime, topic: &str, args: Vec<Payload>) -> EventSeq {
        let seq = self.seq_gen.next_seq();
        self.heap.push(Event::new(seq, at, topic, args));
        seq
    }

    /// Pop the next event iff it is due at or before `target`.
    ///
    /// Returns `None` when the queue is empty or the earliest event is
    /// still in the future.
    pub fn pop_due(&mut self, target: LogicalTime) -> Option<Event> {
        if self.heap.peek()?.at <= target {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Peek at the next event (earliest time, lowest seq) without
    /// removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.heap.peek()
    }

    /// Returns `true` if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns the next sequence number that will be assigned.
    pub fn next_seq(&self) -> EventSeq {
        self.seq_gen.peek()
    }

    /// Copy all pending events out in dispatch order, leaving the queue
    /// intact. Useful for snapshots and testing.
    pub fn snapshot_ordered(&self) -> Vec<Event> {
        let mut heap = self.heap.clone();
        let mut events = Vec::with_capacity(heap.len());
        while let Some(e) = heap.pop() {
            events.push(e);
        }
        events
    }
}
