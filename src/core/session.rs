//! Tracking session: one self-contained classifier instance.
//!
//! A session owns every piece of mutable state the pipeline needs, so
//! several sessions can run side by side (or in tests) without sharing
//! anything. Time is always passed in, which keeps ticks reproducible.
//!
//! ```text
//! events ─▶ TickAccumulator ──tick(now)──▶ FilterBank ─▶ normalize ─▶ score ─▶ arbiter ─▶ listeners
//! ```

use crate::collector::types::{SensorEvent, Timestamp};
use crate::config::{Config, ConfigError};
use crate::core::accumulator::{TickAccumulator, TickTotals};
use crate::core::arbiter::{ArbiterState, HysteresisArbiter};
use crate::core::filter::FilterBank;
use crate::core::scorer::{state_label, Hypothesis, Scores, ScoringProfile};
use crate::core::signals::{
    idle_signal, normalize_signals, raw_channels, NormalizedSignals, ReferenceScales,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Callback invoked whenever the committed state changes.
pub type Listener = Box<dyn FnMut(&StateChange) + Send>;

/// Handle returned by [`TrackingSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A committed state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub session_id: Uuid,
    /// 1-based tick number that produced the commit
    pub tick: u64,
    pub at: Timestamp,
    /// Previous committed state, `None` for the first commit
    pub from: Option<Hypothesis>,
    pub to: Hypothesis,
    /// Scores from the committing tick
    pub scores: Scores,
}

impl StateChange {
    pub fn describe(&self) -> String {
        format!(
            "{} -> {} (tick {}, score {:.3})",
            state_label(self.from),
            self.to,
            self.tick,
            self.scores.get(self.to)
        )
    }
}

/// Everything computed during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub tick: u64,
    pub at: Timestamp,
    /// Raw totals consumed by this tick
    pub totals: TickTotals,
    pub signals: NormalizedSignals,
    pub scores: Scores,
    pub winner: Hypothesis,
    pub arbiter: ArbiterState,
}

/// A single classifier instance with explicit start/stop lifecycle.
pub struct TrackingSession {
    session_id: Uuid,
    running: bool,
    idle_threshold: Duration,
    references: ReferenceScales,
    profile: ScoringProfile,
    accumulator: TickAccumulator,
    filter: FilterBank,
    arbiter: HysteresisArbiter,
    tick_count: u64,
    last_evaluation: Option<Evaluation>,
    settled: bool,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: u64,
}

impl TrackingSession {
    /// Build a session from validated configuration. The session is stopped
    /// until [`start`](Self::start) is called.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            session_id: Uuid::new_v4(),
            running: false,
            idle_threshold: config.idle_threshold,
            references: config.references,
            profile: config.profile.clone(),
            accumulator: TickAccumulator::new(Timestamp::default()),
            filter: FilterBank::new(config.filter),
            arbiter: HysteresisArbiter::new(config.hysteresis_threshold),
            tick_count: 0,
            last_evaluation: None,
            settled: false,
            listeners: Vec::new(),
            next_listener_id: 0,
        })
    }

    /// Begin a fresh tracking session at `now`.
    pub fn start(&mut self, now: Timestamp) {
        self.session_id = Uuid::new_v4();
        self.reset_state(now);
        self.running = true;
    }

    /// End the session: drop all state and every listener.
    pub fn stop(&mut self) {
        self.running = false;
        self.listeners.clear();
        self.reset_state(Timestamp::default());
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Register a listener for committed state changes.
    pub fn subscribe(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Feed a raw event. Ignored while the session is stopped.
    pub fn ingest(&mut self, event: &SensorEvent) {
        if self.running {
            self.accumulator.record(event);
        }
    }

    /// Feed a raw event received at `at`. Live callers pass the receive time
    /// so that client clocks never decide idleness.
    pub fn ingest_at(&mut self, event: &SensorEvent, at: Timestamp) {
        if self.running {
            self.accumulator.record_at(event, at);
        }
    }

    pub fn on_pointer_move(&mut self, x: f64, y: f64, at: Timestamp) {
        if self.running {
            self.accumulator.record_pointer_move(x, y, at);
        }
    }

    pub fn on_scroll(&mut self, offset: f64, at: Timestamp) {
        if self.running {
            self.accumulator.record_scroll(offset, at);
        }
    }

    pub fn on_click(&mut self, at: Timestamp) {
        if self.running {
            self.accumulator.record_click(at);
        }
    }

    pub fn on_key_down(&mut self, correction: bool, at: Timestamp) {
        if self.running {
            self.accumulator.record_key_down(correction, at);
        }
    }

    /// Run one evaluation pass at `now`.
    ///
    /// Drains the accumulators, updates the filters, scores every hypothesis
    /// and lets the arbiter decide. Listeners are notified before the change
    /// is returned.
    pub fn tick(&mut self, now: Timestamp) -> Option<StateChange> {
        if !self.running {
            return None;
        }

        let totals = self.accumulator.take();
        let before = *self.filter.current();
        let smoothed = self.filter.update(&raw_channels(&totals));
        let idle = idle_signal(self.accumulator.idle_millis(now), self.idle_threshold);
        let signals = normalize_signals(&smoothed, &self.references, idle);
        let scores = self.profile.score_all(&signals);
        let winner = scores.winner();

        let previous = self.arbiter.committed();
        let committed = self.arbiter.observe(winner);
        self.tick_count += 1;
        self.settled = totals.is_empty()
            && smoothed == before
            && signals.idle >= 1.0
            && committed.is_none()
            && previous == Some(winner);

        self.last_evaluation = Some(Evaluation {
            tick: self.tick_count,
            at: now,
            totals,
            signals,
            scores,
            winner,
            arbiter: self.arbiter.state(),
        });

        let change = committed.map(|to| StateChange {
            session_id: self.session_id,
            tick: self.tick_count,
            at: now,
            from: previous,
            to,
            scores,
        });

        if let Some(ref change) = change {
            for (_, listener) in self.listeners.iter_mut() {
                listener(change);
            }
        }

        change
    }

    /// True when the last tick saw no input, left the filters unchanged with
    /// idle saturated, and confirmed the committed state. Further ticks
    /// without input repeat that evaluation exactly.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Count `ticks` evaluations ending at `now` without running them.
    ///
    /// Only valid while settled with nothing accumulated, where each of those
    /// ticks would repeat the last evaluation. Returns false and changes
    /// nothing otherwise.
    pub fn skip_settled_ticks(&mut self, ticks: u64, now: Timestamp) -> bool {
        if !self.running || !self.settled || !self.accumulator.totals().is_empty() {
            return false;
        }
        self.tick_count = self.tick_count.saturating_add(ticks);
        self.arbiter.hold(ticks);
        if let Some(eval) = self.last_evaluation.as_mut() {
            eval.tick = self.tick_count;
            eval.at = now;
            eval.arbiter = self.arbiter.state();
        }
        true
    }

    /// Current committed state, `None` until the first commit.
    pub fn committed(&self) -> Option<Hypothesis> {
        self.arbiter.committed()
    }

    pub fn label(&self) -> &'static str {
        state_label(self.committed())
    }

    pub fn last_evaluation(&self) -> Option<&Evaluation> {
        self.last_evaluation.as_ref()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    fn reset_state(&mut self, now: Timestamp) {
        self.accumulator = TickAccumulator::new(now);
        self.filter.reset();
        self.arbiter.reset();
        self.tick_count = 0;
        self.last_evaluation = None;
        self.settled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    fn base() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    fn at_ms(ms: i64) -> Timestamp {
        base() + ChronoDuration::milliseconds(ms)
    }

    fn started(config: &Config) -> TrackingSession {
        let mut session = TrackingSession::new(config).unwrap();
        session.start(base());
        session
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.references.pointer_speed = 0.0;
        assert!(TrackingSession::new(&config).is_err());
    }

    #[test]
    fn test_pointer_attack_then_decay() {
        let session_config = Config::default();
        let mut session = started(&session_config);

        // 1600 px of travel in one tick
        session.on_pointer_move(0.0, 0.0, at_ms(100));
        session.on_pointer_move(1600.0, 0.0, at_ms(200));
        session.tick(at_ms(800));
        let signals = session.last_evaluation().unwrap().signals;
        assert!((signals.pointer_speed - 0.75).abs() < 1e-9);

        session.tick(at_ms(1600));
        let signals = session.last_evaluation().unwrap().signals;
        assert!((signals.pointer_speed - 0.6375).abs() < 1e-9);
    }

    #[test]
    fn test_ingest_at_uses_receive_time_for_idle() {
        let config = Config::default();
        let idle_ms = config.idle_threshold.as_millis() as i64;
        let mut session = started(&config);

        let stale = SensorEvent::key_down(false, base() - ChronoDuration::hours(1));
        session.ingest_at(&stale, at_ms(idle_ms));
        session.tick(at_ms(idle_ms + 800));

        let eval = session.last_evaluation().unwrap();
        assert_eq!(eval.totals.keypresses, 1);
        assert!(eval.signals.idle < 0.1);
    }

    #[test]
    fn test_accumulators_reset_each_tick() {
        let mut session = started(&Config::default());
        session.on_click(at_ms(10));
        session.on_click(at_ms(20));
        session.tick(at_ms(800));
        assert_eq!(session.last_evaluation().unwrap().totals.clicks, 2);

        session.tick(at_ms(1600));
        assert_eq!(session.last_evaluation().unwrap().totals.clicks, 0);
    }

    #[test]
    fn test_idle_session_settles_on_calm() {
        let config = Config::default();
        let mut session = started(&config);
        let idle_ms = config.idle_threshold.as_millis() as i64;

        // Fresh session with no input starts neutral
        for tick in 1..=3 {
            session.tick(at_ms(tick * 800));
        }
        assert_eq!(session.committed(), Some(Hypothesis::Neutral));

        let change = (0..3)
            .filter_map(|i| session.tick(at_ms(idle_ms + i * 800)))
            .last()
            .unwrap();
        assert_eq!(change.from, Some(Hypothesis::Neutral));
        assert_eq!(change.to, Hypothesis::Calm);
        assert_eq!(session.last_evaluation().unwrap().signals.idle, 1.0);
    }

    #[test]
    fn test_skip_matches_ticking_once_settled() {
        let config = Config::default();
        let mut ticked = started(&config);
        let mut skipped = started(&config);
        for session in [&mut ticked, &mut skipped] {
            session.on_key_down(false, at_ms(100));
        }

        // Decays to a fixed point well within a few thousand quiet ticks
        let mut tick = 0;
        while !skipped.is_settled() {
            tick += 1;
            assert!(tick < 20_000, "never settled");
            skipped.tick(at_ms(tick * 800));
            ticked.tick(at_ms(tick * 800));
        }
        assert_eq!(skipped.committed(), Some(Hypothesis::Calm));

        for n in 1..=50 {
            ticked.tick(at_ms((tick + n) * 800));
        }
        assert!(skipped.skip_settled_ticks(50, at_ms((tick + 50) * 800)));
        assert_eq!(skipped.tick_count(), ticked.tick_count());
        assert_eq!(skipped.last_evaluation(), ticked.last_evaluation());

        skipped.on_click(at_ms((tick + 50) * 800 + 10));
        assert!(!skipped.skip_settled_ticks(1, at_ms((tick + 51) * 800)));
    }

    #[test]
    fn test_listeners_notified_and_removed() {
        let mut session = started(&Config::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = session.subscribe(Box::new(move |change| {
            sink.lock().unwrap().push(change.to);
        }));

        for tick in 1..=3 {
            session.tick(at_ms(tick * 800));
        }
        assert_eq!(*seen.lock().unwrap(), vec![Hypothesis::Neutral]);

        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));
        assert_eq!(session.listener_count(), 0);
    }

    #[test]
    fn test_stop_drops_listeners_and_ignores_input() {
        let mut session = started(&Config::default());
        session.subscribe(Box::new(|_| {}));
        session.stop();

        assert_eq!(session.listener_count(), 0);
        session.on_click(at_ms(10));
        assert!(session.tick(at_ms(800)).is_none());
        assert_eq!(session.tick_count(), 0);
        assert_eq!(session.label(), "auto");
    }

    #[test]
    fn test_sessions_do_not_share_state() {
        let config = Config::default();
        let mut busy = started(&config);
        let mut quiet = started(&config);
        assert_ne!(busy.session_id(), quiet.session_id());

        for tick in 1..=3 {
            for key in 0..6 {
                busy.on_key_down(false, at_ms(tick * 800 - 500 + key * 50));
            }
            busy.tick(at_ms(tick * 800));
            quiet.tick(at_ms(tick * 800));
        }

        assert_eq!(busy.committed(), Some(Hypothesis::Focused));
        assert_eq!(quiet.committed(), Some(Hypothesis::Neutral));
    }

    #[test]
    fn test_restart_clears_committed_state() {
        let mut session = started(&Config::default());
        for tick in 1..=3 {
            session.tick(at_ms(tick * 800));
        }
        let first_id = session.session_id();
        assert!(session.committed().is_some());

        session.start(at_ms(10_000));
        assert_eq!(session.committed(), None);
        assert_eq!(session.tick_count(), 0);
        assert_ne!(session.session_id(), first_id);
    }
}
