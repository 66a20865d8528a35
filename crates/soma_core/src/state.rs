//! Mutable scheduler state: per-kind accumulators and the quiet window.
//!
//! These types are owned by the scheduler, persisted by the store, and
//! never mutated anywhere else.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::boost::BoostSnapshot;
use crate::signal::Outcome;

/// Per-kind mutable state.
///
/// `current_pressure` is a cache of the last computation — pressure is
/// always recomputed from wall-clock elapsed time and the persisted
/// timestamps, never integrated tick-over-tick, so process downtime
/// neither loses nor double-counts accumulated pressure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorState {
    pub current_pressure: f64,
    /// `None` = never emitted; accumulation then measures from the
    /// document's origin timestamp.
    pub last_emitted_at: Option<DateTime<Utc>>,
    /// Manual override reserve added by `boost_signal`, drained at the
    /// kind's `decay_rate` per second. Reset on emission.
    pub manual_boost: f64,
    pub manual_boost_at: Option<DateTime<Utc>>,
    /// Boost inputs used in the last computation, kept for diagnostics.
    pub last_boost_snapshot: Option<BoostSnapshot>,
    pub emission_count: u64,
    pub last_outcome: Option<Outcome>,
    /// Consecutive `error` outcomes; feeds the calibration backoff.
    pub consecutive_errors: u32,
}

impl AccumulatorState {
    /// Seconds since the last emission, measuring from `origin` for kinds
    /// that have never emitted. Clamped at zero so a backwards clock step
    /// can't produce negative elapsed time.
    pub fn seconds_since_emission(&self, origin: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let since = self.last_emitted_at.unwrap_or(origin);
        ((now - since).num_milliseconds() as f64 / 1000.0).max(0.0)
    }

    /// Record an emission at `now`. `last_emitted_at` only moves forward.
    pub fn mark_emitted(&mut self, now: DateTime<Utc>) {
        let advanced = match self.last_emitted_at {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        self.last_emitted_at = Some(advanced);
        self.current_pressure = 0.0;
        self.manual_boost = 0.0;
        self.manual_boost_at = None;
        self.emission_count += 1;
    }

    /// Record the outcome of acting on this kind's last emission.
    pub fn record_outcome(&mut self, outcome: Outcome) {
        self.last_outcome = Some(outcome);
        if outcome == Outcome::Error {
            self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        } else {
            self.consecutive_errors = 0;
        }
    }
}

/// Process-wide suppression window. Independent of per-kind state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietWindow {
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl QuietWindow {
    /// An expired window reads as inactive without an explicit clear.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match (self.active, self.expires_at) {
            (true, Some(expires)) => now < expires,
            _ => false,
        }
    }

    pub fn set(now: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            active: true,
            expires_at: Some(now + duration),
        }
    }

    pub fn cleared() -> Self {
        Self {
            active: false,
            expires_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn elapsed_measures_from_origin_before_first_emission() {
        let acc = AccumulatorState::default();
        assert_eq!(acc.seconds_since_emission(at(0), at(500)), 500.0);
    }

    #[test]
    fn elapsed_clamps_backwards_clock() {
        let mut acc = AccumulatorState::default();
        acc.last_emitted_at = Some(at(100));
        assert_eq!(acc.seconds_since_emission(at(0), at(50)), 0.0);
    }

    #[test]
    fn mark_emitted_is_monotonic() {
        let mut acc = AccumulatorState::default();
        acc.mark_emitted(at(100));
        acc.mark_emitted(at(50));
        assert_eq!(acc.last_emitted_at, Some(at(100)));
        assert_eq!(acc.emission_count, 2);
    }

    #[test]
    fn mark_emitted_resets_pressure_and_reserve() {
        let mut acc = AccumulatorState {
            current_pressure: 1.4,
            manual_boost: 0.5,
            manual_boost_at: Some(at(0)),
            ..AccumulatorState::default()
        };
        acc.mark_emitted(at(10));
        assert_eq!(acc.current_pressure, 0.0);
        assert_eq!(acc.manual_boost, 0.0);
        assert!(acc.manual_boost_at.is_none());
    }

    #[test]
    fn error_outcomes_count_consecutively() {
        let mut acc = AccumulatorState::default();
        acc.record_outcome(Outcome::Error);
        acc.record_outcome(Outcome::Error);
        assert_eq!(acc.consecutive_errors, 2);
        acc.record_outcome(Outcome::Acknowledged);
        assert_eq!(acc.consecutive_errors, 0);
        assert_eq!(acc.last_outcome, Some(Outcome::Acknowledged));
    }

    #[test]
    fn quiet_window_expires_without_clear() {
        let quiet = QuietWindow::set(at(0), Duration::seconds(600));
        assert!(quiet.is_active(at(599)));
        assert!(!quiet.is_active(at(600)));
        assert!(!quiet.is_active(at(601)));
    }

    #[test]
    fn cleared_window_is_inactive() {
        assert!(!QuietWindow::cleared().is_active(at(0)));
        assert!(!QuietWindow::default().is_active(at(0)));
    }
}
