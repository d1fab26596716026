/// Dispatch recording and replay verification.
///
/// Records every dispatched (or discarded) event into an append-only
/// log with a deterministic hash, and provides a plain-text export for
/// diffing two runs. Two runs with identical subscribe/publish calls
/// must produce identical log hashes.

use std::io::{self, Write};

use crate::event::Event;
use crate::time::LogicalTime;

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Hash a byte slice deterministically (FNV-1a variant).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

// ── Dispatch record ───────────────────────────────────────────────────

/// The outcome of delivering one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchOutcome {
    /// Delivered to `n` handlers (possibly zero, if the topic exists
    /// but currently has no subscribers).
    Delivered { handlers: usize },
    /// The topic was removed after publish; the event was dropped.
    Discarded,
}

/// A record of a single drained event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatchRecord {
    /// The drained event (seq, time, topic, args).
    pub event: Event,
    /// What happened to it.
    pub outcome: DispatchOutcome,
}

// ── Dispatch log ──────────────────────────────────────────────────────

/// Append-only log of drained events.
#[derive(Debug, Clone, Default)]
pub struct DispatchLog {
    records: Vec<DispatchRecord>,
}

impl DispatchLog {
    /// Create an empty log.
    pub fn new() -> Self {
        DispatchLog { records: Vec::new() }
    }

    /// Record a delivered event.
    pub fn record_delivered(&mut self, event: Event, handlers: usize) {
        self.records.push(DispatchRecord {
            event,
            outcome: DispatchOutcome::Delivered { handlers },
        });
    }

    /// Record an event dropped because its topic was removed.
    pub fn record_discarded(&mut self, event: Event) {
        self.records.push(DispatchRecord {
            event,
            outcome: DispatchOutcome::Discarded,
        });
    }

    /// Access the recorded entries, in drain order.
    pub fn records(&self) -> &[DispatchRecord] {
        &self.records
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Logical time of the last drained event, if any.
    pub fn last_time(&self) -> Option<LogicalTime> {
        self.records.last().map(|r| r.event.at)
    }

    /// Compute a deterministic hash of the entire log.
    pub fn log_hash(&self) -> u64 {
        let mut h: u64 = 0;
        for record in &self.records {
            h = hash_combine(h, record.event.seq.raw());
            h = hash_combine(h, record.event.at.ticks());
            h = hash_combine(h, hash_bytes(record.event.topic.as_bytes()));
            h = hash_combine(
                h,
                match record.outcome {
                    DispatchOutcome::Delivered { handlers } => handlers as u64,
                    DispatchOutcome::Discarded => u64::MAX,
                },
            );
        }
        h
    }

    /// Export the log to a writer in a deterministic text format.
    pub fn export<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "# KAIROS DISPATCH LOG v1")?;
        writeln!(w, "# records: {}", self.records.len())?;

        for record in &self.records {
            let tag = match record.outcome {
                DispatchOutcome::Delivered { handlers } => format!("D{}", handlers),
                DispatchOutcome::Discarded => "X".to_owned(),
            };
            writeln!(
                w,
                "{} {} {} {:?} {}",
                tag,
                record.event.seq.raw(),
                record.event.at.ticks(),
                record.event.topic,
                record.event.args.len(),
            )?;
        }

        writeln!(w, "# hash: {:016x}", self.log_hash())?;
        Ok(())
    }

    /// Export to a file path.
    pub fn export_to_file(&self, path: &str) -> io::Result<()> {
        let mut f = std::fs::File::create(path)?;
        self.export(&mut f)
    }
}
