//! The closed boost record supplied by the external state provider.
//!
//! A fixed record rather than an open key-value map: every accumulator's
//! dependency on external state is statically enumerable and testable in
//! isolation.

use serde::{Deserialize, Serialize};

/// External observations that feed pressure, sampled once per tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoostSnapshot {
    /// Unhandled notifications across platforms.
    pub pending_notifications: u32,
    /// Context window usage, 0.0–1.0.
    pub context_usage_fraction: f64,
    /// Errors observed in the recent window (last hour).
    pub recent_error_count: u32,
    /// Relative deviation of recent output from its baseline.
    pub output_deviation_score: f64,
    /// Anomaly score from pattern-mismatch sensors; feeds Uncanny directly.
    pub anomaly_score: f64,
    /// Time since the agent last verified the facts it relies on.
    pub seconds_since_last_verification: f64,
}

impl BoostSnapshot {
    /// The all-zero vector substituted when the provider is unreachable.
    /// A degraded tick sees no external pressure rather than stale or
    /// invented pressure.
    pub fn neutral() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_is_all_zero() {
        let b = BoostSnapshot::neutral();
        assert_eq!(b.pending_notifications, 0);
        assert_eq!(b.context_usage_fraction, 0.0);
        assert_eq!(b.recent_error_count, 0);
        assert_eq!(b.output_deviation_score, 0.0);
        assert_eq!(b.anomaly_score, 0.0);
        assert_eq!(b.seconds_since_last_verification, 0.0);
    }
}
