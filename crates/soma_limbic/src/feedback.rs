//! Outcome-driven calibration.
//!
//! The feedback law from recorded outcomes to future behavior is a
//! pluggable policy. The default implements only the anti-flapping
//! guarantee: repeated `error` outcomes for a kind impose a bounded extra
//! cooldown on top of the configured `hard_cooldown`. Engagement-driven
//! slowdown is left to the `accumulation_scale` hook, which stays neutral
//! here.

use std::time::Duration;

use soma_core::AccumulatorState;

pub trait CalibrationPolicy: Send + Sync {
    /// Extra cooldown imposed on top of the kind's `hard_cooldown`,
    /// derived from recent outcomes. Must be bounded.
    fn extra_cooldown(&self, state: &AccumulatorState) -> Duration;

    /// Multiplier on the time-driven accumulation term. 1.0 = unchanged.
    fn accumulation_scale(&self, _state: &AccumulatorState) -> f64 {
        1.0
    }
}

/// Bounded exponential backoff on consecutive `error` outcomes.
///
/// One error is noise; from the second consecutive error onward the kind
/// is held back for `base`, doubling per additional error, capped at
/// `cap`. Any non-error outcome resets the streak.
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(300),
            cap: Duration::from_secs(3600),
        }
    }
}

impl CalibrationPolicy for Backoff {
    fn extra_cooldown(&self, state: &AccumulatorState) -> Duration {
        if state.consecutive_errors < 2 {
            return Duration::ZERO;
        }
        let doublings = (state.consecutive_errors - 2).min(16);
        let secs = self.base.as_secs_f64() * 2f64.powi(doublings as i32);
        Duration::from_secs_f64(secs.min(self.cap.as_secs_f64()))
    }
}

/// Calibration disabled: no extra cooldown, no accumulation adjustment.
pub struct NoCalibration;

impl CalibrationPolicy for NoCalibration {
    fn extra_cooldown(&self, _state: &AccumulatorState) -> Duration {
        Duration::ZERO
    }
}
