//! Privacy-preserving transparency log.
//!
//! Counts what the classifier has processed without keeping any of it:
//! no coordinates, no key identity and no record of which states were
//! committed.

use crate::collector::types::EventKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Transparency statistics for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    pointer_events: AtomicU64,
    scroll_events: AtomicU64,
    click_events: AtomicU64,
    key_events: AtomicU64,
    /// Evaluation passes run by the scheduler
    ticks_evaluated: AtomicU64,
    /// Committed state changes (labels are not recorded)
    state_commits: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    /// Create a new transparency log.
    pub fn new() -> Self {
        Self {
            pointer_events: AtomicU64::new(0),
            scroll_events: AtomicU64::new(0),
            click_events: AtomicU64::new(0),
            key_events: AtomicU64::new(0),
            ticks_evaluated: AtomicU64::new(0),
            state_commits: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a transparency log that loads and saves cumulative counts.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous transparency stats: {e}");
        }

        log
    }

    /// Record one ingested event.
    pub fn record_event(&self, kind: EventKind) {
        let counter = match kind {
            EventKind::PointerMove => &self.pointer_events,
            EventKind::Scroll => &self.scroll_events,
            EventKind::Click => &self.click_events,
            EventKind::KeyDown => &self.key_events,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tick(&self) {
        self.ticks_evaluated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.state_commits.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            pointer_events: self.pointer_events.load(Ordering::Relaxed),
            scroll_events: self.scroll_events.load(Ordering::Relaxed),
            click_events: self.click_events.load(Ordering::Relaxed),
            key_events: self.key_events.load(Ordering::Relaxed),
            ticks_evaluated: self.ticks_evaluated.load(Ordering::Relaxed),
            state_commits: self.state_commits.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Pointer events processed: {}\n\
             - Scroll events processed: {}\n\
             - Click events processed: {}\n\
             - Key events processed: {}\n\
             - Ticks evaluated: {}\n\
             - State changes committed: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No key identity captured\n\
             - Pointer positions discarded after each delta\n\
             - No emotional-state history retained",
            stats.pointer_events,
            stats.scroll_events,
            stats.click_events,
            stats.key_events,
            stats.ticks_evaluated,
            stats.state_commits,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                pointer_events: stats.pointer_events,
                scroll_events: stats.scroll_events,
                click_events: stats.click_events,
                key_events: stats.key_events,
                ticks_evaluated: stats.ticks_evaluated,
                state_commits: stats.state_commits,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.pointer_events
                    .store(persisted.pointer_events, Ordering::Relaxed);
                self.scroll_events
                    .store(persisted.scroll_events, Ordering::Relaxed);
                self.click_events
                    .store(persisted.click_events, Ordering::Relaxed);
                self.key_events.store(persisted.key_events, Ordering::Relaxed);
                self.ticks_evaluated
                    .store(persisted.ticks_evaluated, Ordering::Relaxed);
                self.state_commits
                    .store(persisted.state_commits, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub pointer_events: u64,
    pub scroll_events: u64,
    pub click_events: u64,
    pub key_events: u64,
    pub ticks_evaluated: u64,
    pub state_commits: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

impl TransparencyStats {
    pub fn total_events(&self) -> u64 {
        self.pointer_events + self.scroll_events + self.click_events + self.key_events
    }
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    pointer_events: u64,
    scroll_events: u64,
    click_events: u64,
    key_events: u64,
    ticks_evaluated: u64,
    state_commits: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log.
pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
