//! # Soma Limbic Layer
//!
//! The drive-based scheduler that decides, on each periodic tick, whether
//! and which internal signal should interrupt a dormant agent. Instead of
//! fixed-interval polling, a bank of independent pressure accumulators —
//! one per semantic category of need — builds over elapsed time and
//! external stimuli, decays after being acted on, and is force-fired past
//! a hard ceiling interval.
//!
//! ## Architecture
//!
//! - [`pressure`] — pure pressure computation from elapsed wall-clock
//!   time, boosts and configuration. No side effects; deterministic given
//!   fixed inputs.
//! - [`scheduler`] — the tick: suppression, cooldown, threshold + jitter,
//!   ceiling, priority selection, persist-then-commit.
//! - [`provider`] — the seam to external state (pending notifications,
//!   context usage, errors, anomalies). Time-bounded; failures degrade to
//!   neutral boosts.
//! - [`feedback`] — outcome-driven calibration behind a pluggable policy;
//!   the default only applies a bounded error backoff.
//!
//! ## Guarantees
//!
//! At most one signal per tick. A kind inside its hard cooldown is never
//! selected, whatever its pressure or ceiling status. Pressure is always
//! recomputed from persisted timestamps, so restarts neither lose nor
//! double-count it. A tick either persists all of its mutations or none.

pub mod directive;
pub mod feedback;
pub mod pressure;
pub mod provider;
pub mod scheduler;

pub use feedback::{Backoff, CalibrationPolicy, NoCalibration};
pub use pressure::{boost_contribution, compute_pressure, manual_reserve};
pub use provider::{BoostProvider, NeutralProvider, StaticProvider};
pub use scheduler::{
    LimbicError, LimbicScheduler, SchedulerOptions, SchedulerStatus, SignalStatus, TickOutcome,
    TickReport,
};
