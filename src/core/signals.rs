//! Signal normalization.
//!
//! Smoothed channel values live on their own scales (pixels, counts). Each is
//! divided by a per-tick reference and clamped into [0, 1] so the scorer can
//! combine them directly. The idle signal is computed fresh every tick from
//! the clock and is never smoothed.

use crate::config::ConfigError;
use crate::core::accumulator::TickTotals;
use crate::core::filter::ChannelValues;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A normalized input to the hypothesis scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    PointerSpeed,
    DirectionReversals,
    ScrollSpeed,
    Clicks,
    Keypresses,
    CorrectionRatio,
    Idle,
}

impl Signal {
    pub const ALL: [Signal; 7] = [
        Signal::PointerSpeed,
        Signal::DirectionReversals,
        Signal::ScrollSpeed,
        Signal::Clicks,
        Signal::Keypresses,
        Signal::CorrectionRatio,
        Signal::Idle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::PointerSpeed => "pointer_speed",
            Signal::DirectionReversals => "direction_reversals",
            Signal::ScrollSpeed => "scroll_speed",
            Signal::Clicks => "clicks",
            Signal::Keypresses => "keypresses",
            Signal::CorrectionRatio => "correction_ratio",
            Signal::Idle => "idle",
        }
    }
}

/// Per-tick reference scales: the raw amount that maps to a signal of 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceScales {
    /// Pointer travel in pixels
    pub pointer_speed: f64,
    pub direction_reversals: f64,
    /// Scroll travel in pixels
    pub scroll_speed: f64,
    pub clicks: f64,
    pub keypresses: f64,
}

impl Default for ReferenceScales {
    fn default() -> Self {
        Self {
            pointer_speed: 1600.0,
            direction_reversals: 6.0,
            scroll_speed: 2400.0,
            clicks: 4.0,
            keypresses: 10.0,
        }
    }
}

impl ReferenceScales {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scales = [
            ("pointer_speed", self.pointer_speed),
            ("direction_reversals", self.direction_reversals),
            ("scroll_speed", self.scroll_speed),
            ("clicks", self.clicks),
            ("keypresses", self.keypresses),
        ];
        for (channel, value) in scales {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidReference { channel, value });
            }
        }
        Ok(())
    }
}

/// All scorer inputs for one tick, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSignals {
    pub pointer_speed: f64,
    pub direction_reversals: f64,
    pub scroll_speed: f64,
    pub clicks: f64,
    pub keypresses: f64,
    pub correction_ratio: f64,
    pub idle: f64,
}

impl NormalizedSignals {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::PointerSpeed => self.pointer_speed,
            Signal::DirectionReversals => self.direction_reversals,
            Signal::ScrollSpeed => self.scroll_speed,
            Signal::Clicks => self.clicks,
            Signal::Keypresses => self.keypresses,
            Signal::CorrectionRatio => self.correction_ratio,
            Signal::Idle => self.idle,
        }
    }
}

/// Clamp into [0, 1]; NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// `min(value / reference, 1)`, clamped. A non-positive reference yields 0.
pub fn normalize(value: f64, reference: f64) -> f64 {
    if reference.is_nan() || reference <= 0.0 {
        return 0.0;
    }
    clamp_unit(value / reference)
}

/// Fraction of the idle threshold elapsed since the last activity.
pub fn idle_signal(idle_millis: i64, idle_threshold: Duration) -> f64 {
    let threshold_ms = idle_threshold.as_millis() as f64;
    normalize(idle_millis.max(0) as f64, threshold_ms)
}

/// Convert one tick's raw totals into per-channel raw values.
pub fn raw_channels(totals: &TickTotals) -> ChannelValues {
    ChannelValues {
        pointer_speed: totals.pointer_distance,
        direction_reversals: totals.direction_reversals as f64,
        scroll_speed: totals.scroll_distance,
        clicks: totals.clicks as f64,
        keypresses: totals.keypresses as f64,
        correction_ratio: totals.correction_ratio(),
    }
}

/// Normalize smoothed channels and attach the idle signal.
pub fn normalize_signals(
    smoothed: &ChannelValues,
    references: &ReferenceScales,
    idle: f64,
) -> NormalizedSignals {
    NormalizedSignals {
        pointer_speed: normalize(smoothed.pointer_speed, references.pointer_speed),
        direction_reversals: normalize(smoothed.direction_reversals, references.direction_reversals),
        scroll_speed: normalize(smoothed.scroll_speed, references.scroll_speed),
        clicks: normalize(smoothed.clicks, references.clicks),
        keypresses: normalize(smoothed.keypresses, references.keypresses),
        // Already a ratio, no reference divisor
        correction_ratio: clamp_unit(smoothed.correction_ratio),
        idle: clamp_unit(idle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bounds() {
        for value in [0.0, -5.0, 1.0, 800.0, 1600.0, 1e300, f64::INFINITY, f64::NAN] {
            let n = normalize(value, 1600.0);
            assert!((0.0..=1.0).contains(&n), "{value} -> {n}");
        }
        assert_eq!(normalize(800.0, 1600.0), 0.5);
        assert_eq!(normalize(f64::INFINITY, 1600.0), 1.0);
        assert_eq!(normalize(f64::NAN, 1600.0), 0.0);
        assert_eq!(normalize(100.0, 0.0), 0.0);
    }

    #[test]
    fn test_idle_signal() {
        let threshold = Duration::from_millis(10_000);
        assert_eq!(idle_signal(0, threshold), 0.0);
        assert_eq!(idle_signal(2_500, threshold), 0.25);
        assert_eq!(idle_signal(10_000, threshold), 1.0);
        assert_eq!(idle_signal(1_000_000, threshold), 1.0);
        assert_eq!(idle_signal(-50, threshold), 0.0);
    }

    #[test]
    fn test_correction_ratio_not_rescaled() {
        let smoothed = ChannelValues {
            correction_ratio: 0.4,
            keypresses: 5.0,
            ..Default::default()
        };
        let signals = normalize_signals(&smoothed, &ReferenceScales::default(), 0.0);
        assert_eq!(signals.correction_ratio, 0.4);
        assert_eq!(signals.keypresses, 0.5);
    }

    #[test]
    fn test_raw_channels_from_totals() {
        let totals = TickTotals {
            pointer_distance: 120.0,
            direction_reversals: 2,
            scroll_distance: 0.0,
            clicks: 1,
            keypresses: 4,
            corrections: 2,
        };
        let raw = raw_channels(&totals);
        assert_eq!(raw.pointer_speed, 120.0);
        assert_eq!(raw.direction_reversals, 2.0);
        assert_eq!(raw.correction_ratio, 0.5);
    }

    #[test]
    fn test_invalid_references() {
        let mut refs = ReferenceScales::default();
        assert!(refs.validate().is_ok());
        refs.clicks = -1.0;
        assert!(refs.validate().is_err());
        refs.clicks = f64::NAN;
        assert!(refs.validate().is_err());
    }

    #[test]
    fn test_signal_lookup_matches_fields() {
        let signals = NormalizedSignals {
            idle: 0.7,
            scroll_speed: 0.2,
            ..Default::default()
        };
        assert_eq!(signals.get(Signal::Idle), 0.7);
        assert_eq!(signals.get(Signal::ScrollSpeed), 0.2);
        assert_eq!(Signal::ALL.len(), 7);
    }
}
