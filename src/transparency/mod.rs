//! Transparency module for the Synheart Ambient classifier.
//!
//! Tracks how much input the classifier has processed so users can audit
//! it, without retaining the input itself.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
