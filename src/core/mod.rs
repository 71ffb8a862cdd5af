//! Core classification pipeline for Synheart Ambient.
//!
//! This module contains:
//! - Per-tick accumulation of raw interaction events
//! - Asymmetric attack/decay smoothing
//! - Signal normalization into [0, 1]
//! - Weighted hypothesis scoring
//! - Hysteresis arbitration of the committed state
//! - The tracking session that ties them together, and offline replay

pub mod accumulator;
pub mod arbiter;
pub mod filter;
pub mod replay;
pub mod scorer;
pub mod session;
pub mod signals;

// Re-export commonly used types
pub use accumulator::{TickAccumulator, TickTotals};
pub use arbiter::{ArbiterState, HysteresisArbiter};
pub use filter::{AsymmetricEma, ChannelValues, FilterBank};
pub use replay::{load_events, parse_events, replay, ReplayError};
pub use scorer::{state_label, Hypothesis, Scores, ScoringProfile, Term};
pub use session::{Evaluation, Listener, ListenerId, StateChange, TrackingSession};
pub use signals::{NormalizedSignals, ReferenceScales, Signal};
