//! Interaction event types for the Synheart Ambient classifier.
//!
//! Events carry only what the classifier consumes: pointer positions (kept for
//! a single delta, never stored), scroll offsets, click occurrences and a
//! correction flag for key presses. Key identity is never captured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock instant used throughout the pipeline.
pub type Timestamp = DateTime<Utc>;

fn received_now() -> Timestamp {
    Utc::now()
}

/// Returns true for keys that undo previous input (Backspace, Delete).
pub fn is_correction_key(key: &str) -> bool {
    key.eq_ignore_ascii_case("backspace") || key.eq_ignore_ascii_case("delete")
}

/// Input event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PointerMove,
    Scroll,
    Click,
    KeyDown,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PointerMove => "pointer_move",
            EventKind::Scroll => "scroll",
            EventKind::Click => "click",
            EventKind::KeyDown => "key_down",
        }
    }
}

/// Payload of a single raw input event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    /// Pointer moved to `(x, y)` in viewport pixels
    PointerMove { x: f64, y: f64 },
    /// Vertical scroll offset changed to `offset` pixels
    Scroll { offset: f64 },
    /// Pointer button pressed
    Click,
    /// Key pressed; `correction` is set for Backspace/Delete
    KeyDown {
        #[serde(default)]
        correction: bool,
    },
}

/// A timestamped raw input event.
///
/// When deserialized without a `timestamp` the receive time is used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorEvent {
    /// When the event occurred
    #[serde(default = "received_now")]
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub input: InputEvent,
}

impl SensorEvent {
    pub fn new(input: InputEvent, timestamp: Timestamp) -> Self {
        Self { timestamp, input }
    }

    pub fn pointer_move(x: f64, y: f64, timestamp: Timestamp) -> Self {
        Self::new(InputEvent::PointerMove { x, y }, timestamp)
    }

    pub fn scroll(offset: f64, timestamp: Timestamp) -> Self {
        Self::new(InputEvent::Scroll { offset }, timestamp)
    }

    pub fn click(timestamp: Timestamp) -> Self {
        Self::new(InputEvent::Click, timestamp)
    }

    pub fn key_down(correction: bool, timestamp: Timestamp) -> Self {
        Self::new(InputEvent::KeyDown { correction }, timestamp)
    }

    /// Build a key event from a key name, keeping only the correction flag.
    pub fn key_named(key: &str, timestamp: Timestamp) -> Self {
        Self::key_down(is_correction_key(key), timestamp)
    }

    pub fn kind(&self) -> EventKind {
        match self.input {
            InputEvent::PointerMove { .. } => EventKind::PointerMove,
            InputEvent::Scroll { .. } => EventKind::Scroll,
            InputEvent::Click => EventKind::Click,
            InputEvent::KeyDown { .. } => EventKind::KeyDown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_correction_keys() {
        assert!(is_correction_key("Backspace"));
        assert!(is_correction_key("DELETE"));
        assert!(!is_correction_key("a"));
        assert!(!is_correction_key("Enter"));

        let at = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        assert_eq!(
            SensorEvent::key_named("Backspace", at).input,
            InputEvent::KeyDown { correction: true }
        );
    }

    #[test]
    fn test_event_json_shape() {
        let json = r#"{"kind":"pointer_move","x":10.0,"y":20.0,"timestamp":"2024-01-15T14:00:00Z"}"#;
        let event: SensorEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::PointerMove);
        assert_eq!(event.input, InputEvent::PointerMove { x: 10.0, y: 20.0 });
        assert_eq!(
            event.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let before = Utc::now();
        let event: SensorEvent = serde_json::from_str(r#"{"kind":"key_down"}"#).unwrap();
        assert_eq!(event.input, InputEvent::KeyDown { correction: false });
        assert!(event.timestamp >= before);

        let click: SensorEvent = serde_json::from_str(r#"{"kind":"click"}"#).unwrap();
        assert_eq!(click.kind(), EventKind::Click);
    }
}
