//! Hypothesis scoring.
//!
//! Every candidate state owns a list of weighted terms over the normalized
//! signals. A term either adds the signal, adds its complement, or adds a
//! fixed weight when the signal sits inside a band. Bands express "moderate
//! but not extreme" patterns such as energetic movement that stops counting
//! once the pointer is flailing.
//!
//! Scores are plain sums, so every number in a tick's output can be traced
//! back to a term in the active [`ScoringProfile`].
//!
//! Default profile (p pointer, r reversals, s scroll, c clicks, k keys,
//! x correction ratio, i idle, `[v∈a..b]` a band indicator):
//!
//! ```text
//! neutral   = .25(1-p) + .10(1-r) + .15(1-s) + .10(1-c) + .20(1-k)
//! calm      = .60 i + .20(1-p) + .10(1-k) + .10(1-s)
//! focused   = .40[k∈.25..1] + .30 k + .20(1-x) + .10(1-r)
//! reading   = .45[s∈.05..0.45] + .20(1-p) + .20(1-k) + .15(1-c)
//! energetic = .35[p∈.45..0.9] + .25 c + .20[s∈.4..0.95] + .20 p
//! alert     = .35 r + .25 p + .20 c + .20 x
//! ```
//!
//! Neutral tops out at 0.8 so any clear pattern outranks the baseline.

use crate::config::ConfigError;
use crate::core::signals::{NormalizedSignals, Signal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candidate ambient states.
///
/// Declaration order is the tie-break priority: when scores are equal the
/// earlier variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hypothesis {
    Neutral,
    Calm,
    Focused,
    Reading,
    Energetic,
    Alert,
}

impl Hypothesis {
    /// All hypotheses in priority order.
    pub const ALL: [Hypothesis; 6] = [
        Hypothesis::Neutral,
        Hypothesis::Calm,
        Hypothesis::Focused,
        Hypothesis::Reading,
        Hypothesis::Energetic,
        Hypothesis::Alert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hypothesis::Neutral => "neutral",
            Hypothesis::Calm => "calm",
            Hypothesis::Focused => "focused",
            Hypothesis::Reading => "reading",
            Hypothesis::Energetic => "energetic",
            Hypothesis::Alert => "alert",
        }
    }
}

impl fmt::Display for Hypothesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hypothesis {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Hypothesis::ALL
            .into_iter()
            .find(|h| h.as_str() == value)
            .ok_or_else(|| format!("unknown hypothesis: {value}"))
    }
}

/// Label for a committed state, `"auto"` before the first commit.
pub fn state_label(state: Option<Hypothesis>) -> &'static str {
    state.map(|h| h.as_str()).unwrap_or("auto")
}

/// One weighted contribution to a hypothesis score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "term", rename_all = "snake_case")]
pub enum Term {
    /// `weight · v`
    Direct { signal: Signal, weight: f64 },
    /// `weight · (1 − v)`
    Inverse { signal: Signal, weight: f64 },
    /// `weight` when `low ≤ v ≤ high`, otherwise nothing
    Band {
        signal: Signal,
        weight: f64,
        low: f64,
        high: f64,
    },
}

impl Term {
    pub fn direct(signal: Signal, weight: f64) -> Self {
        Term::Direct { signal, weight }
    }

    pub fn inverse(signal: Signal, weight: f64) -> Self {
        Term::Inverse { signal, weight }
    }

    pub fn band(signal: Signal, weight: f64, low: f64, high: f64) -> Self {
        Term::Band {
            signal,
            weight,
            low,
            high,
        }
    }

    pub fn contribution(&self, signals: &NormalizedSignals) -> f64 {
        match *self {
            Term::Direct { signal, weight } => weight * signals.get(signal),
            Term::Inverse { signal, weight } => weight * (1.0 - signals.get(signal)),
            Term::Band {
                signal,
                weight,
                low,
                high,
            } => {
                if (low..=high).contains(&signals.get(signal)) {
                    weight
                } else {
                    0.0
                }
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        let weight = match *self {
            Term::Direct { weight, .. } | Term::Inverse { weight, .. } => weight,
            Term::Band {
                weight, low, high, ..
            } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(format!("band [{low}, {high}] is empty or not finite"));
                }
                weight
            }
        };
        if !weight.is_finite() || weight < 0.0 {
            return Err(format!("weight {weight} must be finite and non-negative"));
        }
        Ok(())
    }
}

/// Weighted terms for every hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    pub neutral: Vec<Term>,
    pub calm: Vec<Term>,
    pub focused: Vec<Term>,
    pub reading: Vec<Term>,
    pub energetic: Vec<Term>,
    pub alert: Vec<Term>,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        use Signal::*;

        Self {
            neutral: vec![
                Term::inverse(PointerSpeed, 0.25),
                Term::inverse(DirectionReversals, 0.10),
                Term::inverse(ScrollSpeed, 0.15),
                Term::inverse(Clicks, 0.10),
                Term::inverse(Keypresses, 0.20),
            ],
            calm: vec![
                Term::direct(Idle, 0.60),
                Term::inverse(PointerSpeed, 0.20),
                Term::inverse(Keypresses, 0.10),
                Term::inverse(ScrollSpeed, 0.10),
            ],
            focused: vec![
                Term::band(Keypresses, 0.40, 0.25, 1.0),
                Term::direct(Keypresses, 0.30),
                Term::inverse(CorrectionRatio, 0.20),
                Term::inverse(DirectionReversals, 0.10),
            ],
            reading: vec![
                Term::band(ScrollSpeed, 0.45, 0.05, 0.45),
                Term::inverse(PointerSpeed, 0.20),
                Term::inverse(Keypresses, 0.20),
                Term::inverse(Clicks, 0.15),
            ],
            energetic: vec![
                Term::band(PointerSpeed, 0.35, 0.45, 0.9),
                Term::direct(Clicks, 0.25),
                Term::band(ScrollSpeed, 0.20, 0.4, 0.95),
                Term::direct(PointerSpeed, 0.20),
            ],
            alert: vec![
                Term::direct(DirectionReversals, 0.35),
                Term::direct(PointerSpeed, 0.25),
                Term::direct(Clicks, 0.20),
                Term::direct(CorrectionRatio, 0.20),
            ],
        }
    }
}

impl ScoringProfile {
    pub fn terms(&self, hypothesis: Hypothesis) -> &[Term] {
        match hypothesis {
            Hypothesis::Neutral => &self.neutral,
            Hypothesis::Calm => &self.calm,
            Hypothesis::Focused => &self.focused,
            Hypothesis::Reading => &self.reading,
            Hypothesis::Energetic => &self.energetic,
            Hypothesis::Alert => &self.alert,
        }
    }

    /// Score a single hypothesis.
    pub fn score(&self, hypothesis: Hypothesis, signals: &NormalizedSignals) -> f64 {
        self.terms(hypothesis)
            .iter()
            .map(|term| term.contribution(signals))
            .sum()
    }

    /// Score every hypothesis for one tick.
    pub fn score_all(&self, signals: &NormalizedSignals) -> Scores {
        let mut scores = Scores::default();
        for hypothesis in Hypothesis::ALL {
            scores.set(hypothesis, self.score(hypothesis, signals));
        }
        scores
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for hypothesis in Hypothesis::ALL {
            for term in self.terms(hypothesis) {
                term.validate()
                    .map_err(|e| ConfigError::InvalidProfile(format!("{hypothesis}: {e}")))?;
            }
        }
        Ok(())
    }
}

/// Scores for every hypothesis from one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub neutral: f64,
    pub calm: f64,
    pub focused: f64,
    pub reading: f64,
    pub energetic: f64,
    pub alert: f64,
}

impl Scores {
    pub fn get(&self, hypothesis: Hypothesis) -> f64 {
        match hypothesis {
            Hypothesis::Neutral => self.neutral,
            Hypothesis::Calm => self.calm,
            Hypothesis::Focused => self.focused,
            Hypothesis::Reading => self.reading,
            Hypothesis::Energetic => self.energetic,
            Hypothesis::Alert => self.alert,
        }
    }

    pub fn set(&mut self, hypothesis: Hypothesis, score: f64) {
        let slot = match hypothesis {
            Hypothesis::Neutral => &mut self.neutral,
            Hypothesis::Calm => &mut self.calm,
            Hypothesis::Focused => &mut self.focused,
            Hypothesis::Reading => &mut self.reading,
            Hypothesis::Energetic => &mut self.energetic,
            Hypothesis::Alert => &mut self.alert,
        };
        *slot = score;
    }

    /// Highest-scoring hypothesis; ties go to the earliest in priority order.
    pub fn winner(&self) -> Hypothesis {
        let mut best = Hypothesis::ALL[0];
        let mut best_score = f64::NEG_INFINITY;
        for hypothesis in Hypothesis::ALL {
            let score = self.get(hypothesis);
            // NaN never compares greater, so it cannot win
            if score > best_score {
                best = hypothesis;
                best_score = score;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winner_for(signals: NormalizedSignals) -> (Hypothesis, Scores) {
        let scores = ScoringProfile::default().score_all(&signals);
        (scores.winner(), scores)
    }

    #[test]
    fn test_quiet_is_neutral() {
        let (winner, scores) = winner_for(NormalizedSignals::default());
        assert_eq!(winner, Hypothesis::Neutral);
        assert!((scores.neutral - 0.8).abs() < 1e-9);
        assert!((scores.reading - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_full_idle_is_calm() {
        let (winner, scores) = winner_for(NormalizedSignals {
            idle: 1.0,
            ..Default::default()
        });
        assert_eq!(winner, Hypothesis::Calm);
        assert!((scores.calm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_moderate_scroll_is_reading() {
        let (winner, scores) = winner_for(NormalizedSignals {
            scroll_speed: 0.2,
            ..Default::default()
        });
        assert_eq!(winner, Hypothesis::Reading);
        assert!((scores.reading - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_steady_typing_is_focused() {
        let (winner, scores) = winner_for(NormalizedSignals {
            keypresses: 0.6,
            correction_ratio: 0.05,
            ..Default::default()
        });
        assert_eq!(winner, Hypothesis::Focused);
        assert!((scores.focused - 0.87).abs() < 1e-9);
    }

    #[test]
    fn test_medium_high_movement_is_energetic() {
        let (winner, _) = winner_for(NormalizedSignals {
            pointer_speed: 0.7,
            clicks: 0.5,
            direction_reversals: 0.1,
            ..Default::default()
        });
        assert_eq!(winner, Hypothesis::Energetic);
    }

    #[test]
    fn test_erratic_movement_is_alert() {
        let (winner, scores) = winner_for(NormalizedSignals {
            pointer_speed: 0.95,
            direction_reversals: 0.8,
            clicks: 0.6,
            correction_ratio: 0.4,
            ..Default::default()
        });
        assert_eq!(winner, Hypothesis::Alert);
        // Pointer above the energetic band drops that gate
        assert!(scores.energetic < 0.4);
    }

    #[test]
    fn test_band_edges_inclusive() {
        let term = Term::band(Signal::PointerSpeed, 0.35, 0.45, 0.9);
        let at = |p: f64| {
            term.contribution(&NormalizedSignals {
                pointer_speed: p,
                ..Default::default()
            })
        };
        assert_eq!(at(0.45), 0.35);
        assert_eq!(at(0.9), 0.35);
        assert_eq!(at(0.44), 0.0);
        assert_eq!(at(0.91), 0.0);
    }

    #[test]
    fn test_ties_resolve_by_priority() {
        assert_eq!(Scores::default().winner(), Hypothesis::Neutral);

        let scores = Scores {
            calm: 0.5,
            alert: 0.5,
            reading: 0.2,
            ..Default::default()
        };
        assert_eq!(scores.winner(), Hypothesis::Calm);

        let scores = Scores {
            energetic: 0.7,
            alert: 0.7,
            ..Default::default()
        };
        assert_eq!(scores.winner(), Hypothesis::Energetic);
    }

    #[test]
    fn test_nan_score_never_wins() {
        let scores = Scores {
            neutral: f64::NAN,
            alert: 0.1,
            ..Default::default()
        };
        assert_eq!(scores.winner(), Hypothesis::Alert);
    }

    #[test]
    fn test_profile_validation() {
        assert!(ScoringProfile::default().validate().is_ok());

        let mut profile = ScoringProfile::default();
        profile.alert.push(Term::direct(Signal::Clicks, -0.1));
        assert!(profile.validate().is_err());

        let mut profile = ScoringProfile::default();
        profile.energetic[0] = Term::band(Signal::PointerSpeed, 0.3, 0.9, 0.4);
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::InvalidProfile(_))
        ));
    }

    #[test]
    fn test_hypothesis_labels() {
        for hypothesis in Hypothesis::ALL {
            assert_eq!(hypothesis.as_str().parse::<Hypothesis>(), Ok(hypothesis));
        }
        assert_eq!(state_label(None), "auto");
        assert_eq!(state_label(Some(Hypothesis::Calm)), "calm");
    }
}
