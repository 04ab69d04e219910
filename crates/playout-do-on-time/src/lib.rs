//! Per-device timed dispatch queue: accepts `(executeAt, payload, handler)`
//! and guarantees the handler fires as close to `executeAt` as possible, in
//! non-decreasing time order per send-mode.

mod queue;

pub use queue::{CommandError, DoOnTimeQueue, QueueEntry, SendMode};

pub type Millis = playout_clock::Millis;
pub type QueueToken = u64;
pub type QueueGroup = String;
