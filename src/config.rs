//! Configuration for the Synheart Ambient classifier.
//!
//! All tunables are read once at startup and validated before a tracking
//! session can be built. Nothing here is mutated while a session runs.

use crate::collector::types::EventKind;
use crate::core::filter::AsymmetricEma;
use crate::core::scorer::ScoringProfile;
use crate::core::signals::ReferenceScales;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Largest accepted hysteresis threshold, in ticks.
pub const MAX_HYSTERESIS_THRESHOLD: u32 = 10_000;

/// Main configuration for the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interval between evaluation ticks
    #[serde(with = "duration_millis")]
    pub tick_interval: Duration,

    /// Consecutive winning ticks required before a state is committed
    pub hysteresis_threshold: u32,

    /// Inactivity after which the idle signal saturates at 1.0
    #[serde(with = "duration_millis")]
    pub idle_threshold: Duration,

    /// Attack/decay smoothing coefficients
    pub filter: AsymmetricEma,

    /// Per-tick reference scales used for normalization
    pub references: ReferenceScales,

    /// Per-hypothesis weights and gating bands
    pub profile: ScoringProfile,

    /// Which input sources to accept
    pub sources: SourceConfig,

    /// Path for storing transparency logs
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-ambient");

        Self {
            tick_interval: Duration::from_millis(800),
            hysteresis_threshold: 3,
            idle_threshold: Duration::from_secs(10),
            filter: AsymmetricEma::default(),
            references: ReferenceScales::default(),
            profile: ScoringProfile::default(),
            sources: SourceConfig::default(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load and validate configuration from a specific file.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(config_path, content).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-ambient")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidInterval("tick_interval"));
        }
        if self.idle_threshold.is_zero() {
            return Err(ConfigError::InvalidInterval("idle_threshold"));
        }
        if self.hysteresis_threshold == 0 || self.hysteresis_threshold > MAX_HYSTERESIS_THRESHOLD {
            return Err(ConfigError::InvalidThreshold);
        }
        self.filter.validate()?;
        self.references.validate()?;
        self.profile.validate()?;
        Ok(())
    }
}

/// Configuration for which input sources to accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub pointer: bool,
    pub scroll: bool,
    pub click: bool,
    pub keyboard: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            pointer: true,
            scroll: true,
            click: true,
            keyboard: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();
        let has = |name: &str| sources.iter().any(|s| s == name || s == "all");

        Self {
            pointer: has("pointer"),
            scroll: has("scroll"),
            click: has("click"),
            keyboard: has("keyboard"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.pointer || self.scroll || self.click || self.keyboard
    }

    pub fn accepts(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::PointerMove => self.pointer,
            EventKind::Scroll => self.scroll,
            EventKind::Click => self.click,
            EventKind::KeyDown => self.keyboard,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Reference scale for {channel} must be positive and finite, got {value}")]
    InvalidReference { channel: &'static str, value: f64 },

    #[error("Invalid smoothing coefficients: {0}")]
    InvalidCoefficients(String),

    #[error("Hysteresis threshold must be between 1 and {MAX_HYSTERESIS_THRESHOLD}")]
    InvalidThreshold,

    #[error("{0} must be greater than zero")]
    InvalidInterval(&'static str),

    #[error("Invalid scoring profile: {0}")]
    InvalidProfile(String),
}

/// Serde support for Duration as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
