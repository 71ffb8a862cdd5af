//! Synheart Ambient - real-time affective-state classifier.
//!
//! Turns a stream of low-level interaction events (pointer movement,
//! scrolling, clicks, keypresses) into a single committed interaction state
//! that a UI can use to adapt its ambient colouring.
//!
//! # Privacy Guarantees
//!
//! - **No key content**: Key events only say whether they were a correction
//! - **No coordinates kept**: Pointer positions are discarded after each delta
//! - **No history**: Only the current committed state is held, in memory
//! - **Transparency**: Processing counts are logged and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Synheart Ambient                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌─────────────┐   every tick                    │
//! │  │ Collector │──▶│ Accumulator │─────────┐                       │
//! │  │  (queue)  │   │ (per tick)  │         ▼                       │
//! │  └───────────┘   └─────────────┘   ┌───────────┐   ┌──────────┐  │
//! │        │                           │ EMA filter│──▶│Normalizer│  │
//! │        ▼                           └───────────┘   └──────────┘  │
//! │  ┌─────────────┐   ┌───────────┐   ┌───────────┐        │        │
//! │  │Transparency │   │ Listeners │◀──│  Arbiter  │◀─ Scorer ◀┘     │
//! │  │    Log      │   └───────────┘   └───────────┘                 │
//! │  └─────────────┘                                                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use synheart_ambient::{Config, SensorEvent, TrackingSession};
//!
//! let config = Config::default();
//! let mut session = TrackingSession::new(&config).expect("valid config");
//! session.subscribe(Box::new(|change| println!("{}", change.describe())));
//! session.start(Utc::now());
//!
//! session.ingest(&SensorEvent::key_down(false, Utc::now()));
//! session.tick(Utc::now());
//! ```

pub mod collector;
pub mod config;
pub mod core;
pub mod scheduler;
pub mod transparency;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use collector::{Collector, CollectorError, EventSender, InputEvent, SensorEvent};
pub use config::{Config, ConfigError, SourceConfig};
pub use core::{
    replay, Hypothesis, ReplayError, ScoringProfile, StateChange, TrackingSession,
};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              SYNHEART AMBIENT - PRIVACY DECLARATION              ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  This classifier estimates how you are interacting right now     ║
║  so the interface can adapt its colours.                         ║
║                                                                  ║
║  ✓ WHAT WE PROCESS:                                              ║
║    • How far the pointer travels and how often it turns back     ║
║    • How far you scroll                                          ║
║    • How often you click and press keys                          ║
║    • Whether a keypress was a correction (Backspace/Delete)      ║
║                                                                  ║
║  ✗ WHAT WE NEVER KEEP:                                           ║
║    • Which keys you press (no passwords, messages, etc.)         ║
║    • Where your cursor is (positions are discarded)              ║
║    • A history of your states                                    ║
║    • Any screen content                                          ║
║                                                                  ║
║  All processing is local. Per-tick totals are discarded after    ║
║  every evaluation.                                               ║
║                                                                  ║
║  You can view processing statistics anytime with:                ║
║    synheart-ambient status                                       ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_declaration_contents() {
        assert!(PRIVACY_DECLARATION.contains("PRIVACY"));
        assert!(PRIVACY_DECLARATION.contains("NEVER KEEP"));
        assert!(PRIVACY_DECLARATION.contains("keys you press"));
    }
}
