//! Hysteresis arbiter.
//!
//! The committed state only moves after the same hypothesis has won
//! `threshold` consecutive ticks. A winner that changes every tick never
//! commits, which caps visible transitions at one per
//! `threshold × tick_interval`.

use crate::core::scorer::Hypothesis;
use serde::{Deserialize, Serialize};

/// Snapshot of the arbiter for auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterState {
    /// Last committed state, `None` before the first commit
    pub committed: Option<Hypothesis>,
    /// Hypothesis currently on a winning streak
    pub candidate: Option<Hypothesis>,
    /// Consecutive ticks the candidate has won
    pub streak: u32,
}

/// Debounces per-tick winners into committed state changes.
#[derive(Debug, Clone)]
pub struct HysteresisArbiter {
    threshold: u32,
    committed: Option<Hypothesis>,
    candidate: Option<Hypothesis>,
    streak: u32,
}

impl HysteresisArbiter {
    /// Create an arbiter; a threshold of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            committed: None,
            candidate: None,
            streak: 0,
        }
    }

    /// Feed one tick's winner. Returns the newly committed state, if any.
    pub fn observe(&mut self, winner: Hypothesis) -> Option<Hypothesis> {
        if self.candidate == Some(winner) {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.candidate = Some(winner);
            self.streak = 1;
        }

        if self.streak >= self.threshold && self.committed != Some(winner) {
            self.committed = Some(winner);
            return Some(winner);
        }
        None
    }

    /// Extend the current streak by `ticks` wins without committing.
    pub fn hold(&mut self, ticks: u64) {
        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.streak = self.streak.saturating_add(ticks);
    }

    pub fn committed(&self) -> Option<Hypothesis> {
        self.committed
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn state(&self) -> ArbiterState {
        ArbiterState {
            committed: self.committed,
            candidate: self.candidate,
            streak: self.streak,
        }
    }

    /// Back to the unset state.
    pub fn reset(&mut self) {
        self.committed = None;
        self.candidate = None;
        self.streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Hypothesis::*;

    #[test]
    fn test_commits_exactly_at_threshold() {
        let mut arbiter = HysteresisArbiter::new(3);
        assert_eq!(arbiter.observe(Calm), None);
        assert_eq!(arbiter.observe(Calm), None);
        assert_eq!(arbiter.observe(Calm), Some(Calm));
        assert_eq!(arbiter.committed(), Some(Calm));

        // Further wins do not re-commit
        assert_eq!(arbiter.observe(Calm), None);
    }

    #[test]
    fn test_commit_after_previous_state() {
        let mut arbiter = HysteresisArbiter::new(3);
        for _ in 0..3 {
            arbiter.observe(Neutral);
        }
        assert_eq!(arbiter.committed(), Some(Neutral));

        assert_eq!(arbiter.observe(Focused), None);
        assert_eq!(arbiter.observe(Focused), None);
        assert_eq!(arbiter.committed(), Some(Neutral));
        assert_eq!(arbiter.observe(Focused), Some(Focused));
    }

    #[test]
    fn test_alternating_winners_never_commit() {
        let mut arbiter = HysteresisArbiter::new(2);
        for i in 0..100 {
            let winner = if i % 2 == 0 { Alert } else { Energetic };
            assert_eq!(arbiter.observe(winner), None);
        }
        assert_eq!(arbiter.committed(), None);
        assert_eq!(arbiter.state().streak, 1);
    }

    #[test]
    fn test_interruption_resets_streak() {
        let mut arbiter = HysteresisArbiter::new(3);
        arbiter.observe(Reading);
        arbiter.observe(Reading);
        arbiter.observe(Neutral);
        assert_eq!(
            arbiter.state(),
            ArbiterState {
                committed: None,
                candidate: Some(Neutral),
                streak: 1
            }
        );
        assert_eq!(arbiter.observe(Reading), None);
    }

    #[test]
    fn test_threshold_one_commits_immediately() {
        let mut arbiter = HysteresisArbiter::new(1);
        assert_eq!(arbiter.observe(Alert), Some(Alert));
        assert_eq!(arbiter.observe(Calm), Some(Calm));
        assert_eq!(HysteresisArbiter::new(0).threshold(), 1);
    }

    #[test]
    fn test_returning_to_committed_does_not_notify() {
        let mut arbiter = HysteresisArbiter::new(2);
        arbiter.observe(Calm);
        arbiter.observe(Calm);
        arbiter.observe(Alert);
        assert_eq!(arbiter.observe(Calm), None);
        assert_eq!(arbiter.observe(Calm), None);
        assert_eq!(arbiter.committed(), Some(Calm));
    }
}
