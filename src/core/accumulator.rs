//! Per-tick accumulation of raw interaction events.
//!
//! Handlers here run for every input event, so they only touch plain fields:
//! no allocation, no logging and no locking. The scheduler drains the totals
//! once per tick with [`TickAccumulator::take`].

use crate::collector::types::{InputEvent, SensorEvent, Timestamp};
use serde::{Deserialize, Serialize};

/// Upper bound for distance accumulators; keeps downstream arithmetic finite.
pub const DISTANCE_CEILING: f64 = 1.0e12;

/// Raw totals gathered between two ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickTotals {
    /// Euclidean pointer travel in pixels
    pub pointer_distance: f64,
    /// Pointer direction changes sharper than 90°
    pub direction_reversals: u32,
    /// Absolute scroll travel in pixels
    pub scroll_distance: f64,
    pub clicks: u32,
    pub keypresses: u32,
    /// Backspace/Delete presses (subset of `keypresses`)
    pub corrections: u32,
}

impl TickTotals {
    /// Share of keypresses that were corrections, 0 when nothing was typed.
    pub fn correction_ratio(&self) -> f64 {
        if self.keypresses == 0 {
            return 0.0;
        }
        (self.corrections as f64 / self.keypresses as f64).clamp(0.0, 1.0)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Accumulates raw events into [`TickTotals`] and tracks the last activity.
#[derive(Debug, Clone)]
pub struct TickAccumulator {
    totals: TickTotals,
    /// Last pointer position, kept only to compute the next delta
    last_position: Option<(f64, f64)>,
    /// Direction of the last non-zero pointer delta
    last_direction: Option<(f64, f64)>,
    last_scroll_offset: Option<f64>,
    last_activity: Timestamp,
}

impl TickAccumulator {
    /// Create an empty accumulator; `started_at` counts as the first activity.
    pub fn new(started_at: Timestamp) -> Self {
        Self {
            totals: TickTotals::default(),
            last_position: None,
            last_direction: None,
            last_scroll_offset: None,
            last_activity: started_at,
        }
    }

    /// Dispatch an event to the matching handler, using its own timestamp
    /// as the activity time.
    pub fn record(&mut self, event: &SensorEvent) {
        self.record_at(event, event.timestamp);
    }

    /// Dispatch an event, recording `at` as the activity time instead of the
    /// timestamp it carries.
    pub fn record_at(&mut self, event: &SensorEvent, at: Timestamp) {
        match event.input {
            InputEvent::PointerMove { x, y } => self.record_pointer_move(x, y, at),
            InputEvent::Scroll { offset } => self.record_scroll(offset, at),
            InputEvent::Click => self.record_click(at),
            InputEvent::KeyDown { correction } => self.record_key_down(correction, at),
        }
    }

    pub fn record_pointer_move(&mut self, x: f64, y: f64, at: Timestamp) {
        self.touch(at);
        if !x.is_finite() || !y.is_finite() {
            return;
        }

        let Some((last_x, last_y)) = self.last_position.replace((x, y)) else {
            return;
        };

        let delta = (x - last_x, y - last_y);
        let distance = delta.0.hypot(delta.1);
        if !distance.is_finite() || distance == 0.0 {
            return;
        }
        self.totals.pointer_distance = (self.totals.pointer_distance + distance).min(DISTANCE_CEILING);

        if let Some((dx, dy)) = self.last_direction {
            if dx * delta.0 + dy * delta.1 < 0.0 {
                self.totals.direction_reversals = self.totals.direction_reversals.saturating_add(1);
            }
        }
        self.last_direction = Some(delta);
    }

    pub fn record_scroll(&mut self, offset: f64, at: Timestamp) {
        self.touch(at);
        if !offset.is_finite() {
            return;
        }

        if let Some(last) = self.last_scroll_offset.replace(offset) {
            let distance = (offset - last).abs();
            if distance.is_finite() {
                self.totals.scroll_distance =
                    (self.totals.scroll_distance + distance).min(DISTANCE_CEILING);
            }
        }
    }

    pub fn record_click(&mut self, at: Timestamp) {
        self.touch(at);
        self.totals.clicks = self.totals.clicks.saturating_add(1);
    }

    pub fn record_key_down(&mut self, correction: bool, at: Timestamp) {
        self.touch(at);
        self.totals.keypresses = self.totals.keypresses.saturating_add(1);
        if correction {
            self.totals.corrections = self.totals.corrections.saturating_add(1);
        }
    }

    /// Move the current totals out and reset them to zero in one step.
    pub fn take(&mut self) -> TickTotals {
        std::mem::take(&mut self.totals)
    }

    /// Totals accumulated since the last [`take`](Self::take).
    pub fn totals(&self) -> &TickTotals {
        &self.totals
    }

    pub fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Milliseconds since the last activity, never negative.
    pub fn idle_millis(&self, now: Timestamp) -> i64 {
        (now - self.last_activity).num_milliseconds().max(0)
    }

    fn touch(&mut self, at: Timestamp) {
        if at > self.last_activity {
            self.last_activity = at;
        }
    }
}
