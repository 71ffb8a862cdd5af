//! Asymmetric exponential smoothing.
//!
//! Rising input is tracked with the fast `attack` coefficient so spikes show
//! up immediately; falling input uses the slow `decay` coefficient so a signal
//! fades over several ticks instead of vanishing on the first quiet one.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Attack/decay EMA coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AsymmetricEma {
    /// Coefficient applied when the raw value exceeds the smoothed value
    pub attack: f64,
    /// Coefficient applied otherwise
    pub decay: f64,
}

impl Default for AsymmetricEma {
    fn default() -> Self {
        Self {
            attack: 0.75,
            decay: 0.15,
        }
    }
}

impl AsymmetricEma {
    pub fn new(attack: f64, decay: f64) -> Result<Self, ConfigError> {
        let filter = Self { attack, decay };
        filter.validate()?;
        Ok(filter)
    }

    /// `smoothed' = α·raw + (1−α)·smoothed` with α chosen by direction.
    pub fn step(&self, smoothed: f64, raw: f64) -> f64 {
        let alpha = if raw > smoothed {
            self.attack
        } else {
            self.decay
        };
        alpha * raw + (1.0 - alpha) * smoothed
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |v: f64| v.is_finite() && v > 0.0 && v <= 1.0;
        if !in_range(self.attack) || !in_range(self.decay) {
            return Err(ConfigError::InvalidCoefficients(format!(
                "attack ({}) and decay ({}) must be in (0, 1]",
                self.attack, self.decay
            )));
        }
        if self.attack <= self.decay {
            return Err(ConfigError::InvalidCoefficients(format!(
                "attack ({}) must exceed decay ({})",
                self.attack, self.decay
            )));
        }
        Ok(())
    }
}

/// One value per accumulating channel, raw or smoothed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelValues {
    pub pointer_speed: f64,
    pub direction_reversals: f64,
    pub scroll_speed: f64,
    pub clicks: f64,
    pub keypresses: f64,
    pub correction_ratio: f64,
}

/// One EMA per channel, sharing a single set of coefficients.
#[derive(Debug, Clone)]
pub struct FilterBank {
    ema: AsymmetricEma,
    smoothed: ChannelValues,
}

impl FilterBank {
    pub fn new(ema: AsymmetricEma) -> Self {
        Self {
            ema,
            smoothed: ChannelValues::default(),
        }
    }

    /// Fold one tick of raw channel values into the smoothed state.
    pub fn update(&mut self, raw: &ChannelValues) -> ChannelValues {
        let s = &mut self.smoothed;
        s.pointer_speed = self.ema.step(s.pointer_speed, sanitize(raw.pointer_speed));
        s.direction_reversals = self
            .ema
            .step(s.direction_reversals, sanitize(raw.direction_reversals));
        s.scroll_speed = self.ema.step(s.scroll_speed, sanitize(raw.scroll_speed));
        s.clicks = self.ema.step(s.clicks, sanitize(raw.clicks));
        s.keypresses = self.ema.step(s.keypresses, sanitize(raw.keypresses));
        s.correction_ratio = self
            .ema
            .step(s.correction_ratio, sanitize(raw.correction_ratio));
        *s
    }

    pub fn current(&self) -> &ChannelValues {
        &self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = ChannelValues::default();
    }
}

/// Raw inputs are non-negative by construction; anything else counts as zero.
fn sanitize(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}
