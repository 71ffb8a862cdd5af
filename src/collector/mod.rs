//! Event collection boundary for the Synheart Ambient classifier.
//!
//! The real event source (browser or OS hooks) lives outside this crate. It
//! pushes [`SensorEvent`]s through a [`EventSender`] into the collector's
//! queue, which the scheduler drains on its own thread.

pub mod channel;
pub mod types;

// Re-export commonly used types
pub use channel::{Collector, CollectorError, EventSender, DEFAULT_QUEUE_CAPACITY};
pub use types::{is_correction_key, EventKind, InputEvent, SensorEvent, Timestamp};
