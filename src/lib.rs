//! # Kairos — Deterministic Topic Event Scheduler
//!
//! Delayed, topic-scoped event delivery driven by logical time. No
//! threads, no wall clock, no I/O in the core — producers publish
//! events for a future (or past) tick, and nothing fires until the
//! owner advances the timeline with `run_until`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │        EventBus           │ ← publish / subscribe / run_until
//! │  ┌────────────────────┐  │
//! │  │   TopicRegistry     │  │ ← topic → ordered handler list
//! │  └────────────────────┘  │
//! │  ┌────────────────────┐  │
//! │  │   PendingQueue      │  │ ← min-heap keyed by (time, seq)
//! │  └────────────────────┘  │
//! │  ┌────────────────────┐  │
//! │  │   LogicalTime       │  │ ← caller-driven timeline
//! │  └────────────────────┘  │
//! └──────────────────────────┘
//! ```
//!
//! Dispatch order is fully deterministic: events order by
//! `(delivery time, publish sequence)` and handlers fire in
//! registration order, so two runs with the same calls produce
//! identical traces (verifiable via [`DispatchLog::log_hash`]).

pub mod builder;
pub mod bus;
pub mod error;
pub mod event;
pub mod log;
pub mod queue;
pub mod shared;
pub mod time;
pub mod topic;

// Re-exports for convenience.
pub use builder::BusBuilder;
pub use bus::{DispatchFailure, DispatchPolicy, DispatchReport, EventBus, StepResult};
pub use error::{BusError, BusResult};
pub use event::{Event, EventSeq, Payload, SeqGen};
pub use log::{DispatchLog, DispatchOutcome, DispatchRecord};
pub use queue::PendingQueue;
pub use shared::SharedBus;
pub use time::LogicalTime;
pub use topic::{HandlerError, HandlerId, HandlerResult, TopicRegistry};
