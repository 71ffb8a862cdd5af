//! Offline replay of recorded event streams.
//!
//! Replays drive a session with synthetic ticks at `start + n·interval`, so
//! the same recording and configuration always yield the same transitions.

use crate::collector::types::{SensorEvent, Timestamp};
use crate::config::{Config, ConfigError};
use crate::core::session::{StateChange, TrackingSession};
use chrono::Duration;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or replaying a recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Timestamp {0} is too close to the end of the supported time range")]
    OutOfRange(Timestamp),
}

/// Parse JSON Lines events. Blank lines are skipped.
pub fn parse_events<R: BufRead>(reader: R) -> Result<Vec<SensorEvent>, ReplayError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Load a JSON Lines recording from disk.
pub fn load_events(path: &Path) -> Result<Vec<SensorEvent>, ReplayError> {
    let file = std::fs::File::open(path)?;
    parse_events(std::io::BufReader::new(file))
}

/// Replay `events` through a fresh session started at `start`.
///
/// Each tick ingests every event stamped before it. Ticking continues until
/// the recording has gone quiet long enough for the idle state to commit.
/// Quiet stretches where the session has settled are counted rather than
/// evaluated one by one, so sparse recordings replay in bounded time.
pub fn replay(
    config: &Config,
    start: Timestamp,
    events: &[SensorEvent],
) -> Result<Vec<StateChange>, ReplayError> {
    let mut session = TrackingSession::new(config)?;
    let interval = Duration::from_std(config.tick_interval)
        .map_err(|_| ConfigError::InvalidInterval("tick_interval"))?;
    let idle = Duration::from_std(config.idle_threshold)
        .map_err(|_| ConfigError::InvalidInterval("idle_threshold"))?;

    let mut ordered = events.to_vec();
    ordered.sort_by_key(|event| event.timestamp);

    let last_event = ordered.last().map(|e| e.timestamp).unwrap_or(start).max(start);
    let settle_ticks = i32::try_from(config.hysteresis_threshold)
        .ok()
        .and_then(|threshold| threshold.checked_add(1))
        .ok_or(ConfigError::InvalidThreshold)?;
    let end = interval
        .checked_mul(settle_ticks)
        .and_then(|tail| last_event.checked_add_signed(idle)?.checked_add_signed(tail))
        .ok_or(ReplayError::OutOfRange(last_event))?;
    let mut tick_time = start
        .checked_add_signed(interval)
        .ok_or(ReplayError::OutOfRange(start))?;

    session.start(start);
    let mut changes = Vec::new();
    let mut pending = ordered.iter().peekable();

    while tick_time <= end {
        while let Some(event) = pending.next_if(|e| e.timestamp < tick_time) {
            session.ingest(event);
        }
        if let Some(change) = session.tick(tick_time) {
            tracing::debug!(tick = change.tick, "replay commit: {}", change.describe());
            changes.push(change);
        }

        if session.is_settled() {
            let Some(next) = pending.peek() else {
                break;
            };
            if let Some((skipped, last_skipped)) =
                quiet_ticks(tick_time, next.timestamp, config.tick_interval)
            {
                if session.skip_settled_ticks(skipped, last_skipped) {
                    tracing::debug!(ticks = skipped, "replay skipped settled ticks");
                    tick_time = last_skipped;
                }
            }
        }

        tick_time = match tick_time.checked_add_signed(interval) {
            Some(next) => next,
            None => break,
        };
    }

    session.stop();
    Ok(changes)
}

/// Ticks after `from` that fall at or before `until`, with the time of the
/// last one. These ticks would ingest nothing from an event at `until`.
fn quiet_ticks(
    from: Timestamp,
    until: Timestamp,
    interval: std::time::Duration,
) -> Option<(u64, Timestamp)> {
    let gap = (until - from).to_std().ok()?.as_nanos();
    let count = gap / interval.as_nanos().max(1);
    if count == 0 {
        return None;
    }
    let span = interval.as_nanos().checked_mul(count)?;
    let span = std::time::Duration::new(
        u64::try_from(span / 1_000_000_000).ok()?,
        (span % 1_000_000_000) as u32,
    );
    let last = from.checked_add_signed(Duration::from_std(span).ok()?)?;
    Some((u64::try_from(count).ok()?, last))
}
