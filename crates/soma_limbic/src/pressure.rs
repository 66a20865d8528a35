//! Pressure computation.
//!
//! Pure functions: pressure is always derived from wall-clock elapsed
//! time, the persisted timestamps and the current boost snapshot — never
//! from a counter integrated tick-over-tick. Missed ticks therefore
//! neither lose accumulated pressure nor double-count it, and every
//! function here is an exact function of its inputs.

use chrono::{DateTime, Utc};

use soma_core::{AccumulatorState, BoostSnapshot, Signal, SignalConfig};

/// Kind-specific contribution of external state to pressure. Each mapping
/// is monotonic in its input.
pub fn boost_contribution(kind: Signal, boosts: &BoostSnapshot) -> f64 {
    match kind {
        // Each pending item adds pressure, capped so a flooded inbox
        // doesn't drown every other drive.
        Signal::Social => (f64::from(boosts.pending_notifications) * 0.05).min(0.3),

        // Steps up sharply past 50% usage and again past 70%.
        Signal::Maintenance => {
            let usage = boosts.context_usage_fraction;
            let mut c = 0.0;
            if usage > 0.5 {
                c += (usage - 0.5) * 0.5;
            }
            if usage > 0.7 {
                c += 0.2;
            }
            c
        }

        Signal::Anxiety => (f64::from(boosts.recent_error_count) * 0.1).min(0.4),

        // Only significant deviation registers.
        Signal::Drift => {
            let deviation = boosts.output_deviation_score;
            if deviation > 0.3 {
                deviation * 0.3
            } else {
                0.0
            }
        }

        // Grows once verification is more than two hours old.
        Signal::Stale => {
            let overdue = (boosts.seconds_since_last_verification - 7200.0).max(0.0);
            (overdue / 7200.0 * 0.1).min(0.4)
        }

        // The anomaly score feeds in directly: the startle reflex bypasses
        // slow accumulation.
        Signal::Uncanny => boosts.anomaly_score.max(0.0),

        // Purely time-driven drives.
        Signal::Curiosity | Signal::Boredom => 0.0,
    }
}

/// Residual of the manual override reserve at `now`, drained at the
/// kind's `decay_rate` per second since the boost was applied.
pub fn manual_reserve(config: &SignalConfig, state: &AccumulatorState, now: DateTime<Utc>) -> f64 {
    if state.manual_boost <= 0.0 {
        return 0.0;
    }
    let elapsed = match state.manual_boost_at {
        Some(at) => ((now - at).num_milliseconds() as f64 / 1000.0).max(0.0),
        None => 0.0,
    };
    (state.manual_boost - config.decay_rate * elapsed).max(0.0)
}

/// Current effective pressure for one kind.
///
/// `origin` is the document's first-run timestamp; never-emitted kinds
/// accumulate from there. `accumulation_scale` is the calibration
/// policy's multiplier on the time-driven term (1.0 = no adjustment).
/// Result is clamped to >= 0 with no upper clamp — the threshold
/// comparison, not saturation, governs emission.
pub fn compute_pressure(
    kind: Signal,
    config: &SignalConfig,
    state: &AccumulatorState,
    origin: DateTime<Utc>,
    now: DateTime<Utc>,
    boosts: &BoostSnapshot,
    accumulation_scale: f64,
) -> f64 {
    let elapsed = state.seconds_since_emission(origin, now);
    let past_base = (elapsed - config.base_interval_secs).max(0.0);
    let time_pressure = config.accumulation_rate * accumulation_scale * past_base;

    let pressure = time_pressure + boost_contribution(kind, boosts) + manual_reserve(config, state, now);
    pressure.max(0.0)
}
