//! Signal kinds and their per-kind tuning.
//!
//! A signal is a named category of internal drive. Each kind carries its
//! own pressure dynamics: how long before pressure starts to build, how
//! fast it builds, what level triggers emission, and the hard limits
//! (ceiling interval, cooldown) that bound its firing rate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AdminError, ConfigError};

/// Drive signals the limbic layer can emit.
///
/// Declaration order is the registry order and serves as the final
/// tie-break between otherwise identical candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Interactions have gone unchecked; pressure builds with pending items.
    Social,
    /// Something might be happening worth knowing about.
    Curiosity,
    /// Context or resources probably need housekeeping.
    Maintenance,
    /// Nothing has demanded attention; maybe create something.
    Boredom,
    /// Something might be wrong; check for problems.
    Anxiety,
    /// Outputs have been deviating from their usual patterns.
    Drift,
    /// Information being relied on may have decayed.
    Stale,
    /// Something doesn't fit the expected distribution — the startle reflex.
    Uncanny,
}

impl Signal {
    /// All kinds, in registry order.
    pub const ALL: [Signal; 8] = [
        Signal::Social,
        Signal::Curiosity,
        Signal::Maintenance,
        Signal::Boredom,
        Signal::Anxiety,
        Signal::Drift,
        Signal::Stale,
        Signal::Uncanny,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Social => "social",
            Signal::Curiosity => "curiosity",
            Signal::Maintenance => "maintenance",
            Signal::Boredom => "boredom",
            Signal::Anxiety => "anxiety",
            Signal::Drift => "drift",
            Signal::Stale => "stale",
            Signal::Uncanny => "uncanny",
        }
    }

    /// Index in registry order, used as the last tie-break.
    pub fn registry_index(&self) -> usize {
        Signal::ALL.iter().position(|s| s == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signal::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| AdminError::UnknownKind(s.to_string()))
    }
}

/// Outcome of acting on an emitted signal, reported back by the decision
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    HighEngagement,
    LowEngagement,
    Acknowledged,
    Error,
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::HighEngagement => "high_engagement",
            Outcome::LowEngagement => "low_engagement",
            Outcome::Acknowledged => "acknowledged",
            Outcome::Error => "error",
            Outcome::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high_engagement" => Ok(Outcome::HighEngagement),
            "low_engagement" => Ok(Outcome::LowEngagement),
            "acknowledged" => Ok(Outcome::Acknowledged),
            "error" => Ok(Outcome::Error),
            "skipped" => Ok(Outcome::Skipped),
            other => Err(AdminError::UnknownOutcome(other.to_string())),
        }
    }
}

/// Per-kind tuning parameters. All durations are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Time since last emission before pressure starts accumulating.
    pub base_interval_secs: f64,
    /// Pressure units per second once past the base interval.
    pub accumulation_rate: f64,
    /// Pressure units per second drained from the manual boost reserve.
    /// Emission itself resets the accumulator outright.
    pub decay_rate: f64,
    /// Pressure level that makes the kind a candidate.
    pub emit_threshold: f64,
    /// Fractional random perturbation of the threshold, redrawn per tick
    /// per kind. 0.0 disables jitter entirely.
    pub jitter_factor: f64,
    /// Tie-break rank; higher wins.
    pub priority: i32,
    /// Hard ceiling: force emission once this much time has passed since
    /// the last emission, regardless of pressure. `None` = no ceiling.
    pub max_interval_secs: Option<f64>,
    /// Minimum time between consecutive emissions of this kind. Never
    /// bypassed, not even by the ceiling.
    pub hard_cooldown_secs: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 3600.0,
            accumulation_rate: 0.0002,
            decay_rate: 0.01,
            emit_threshold: 0.7,
            jitter_factor: 0.15,
            priority: 5,
            max_interval_secs: None,
            hard_cooldown_secs: 0.0,
        }
    }
}

impl SignalConfig {
    /// Validate one kind's parameters. Invalid configuration is fatal at
    /// load time, never silently ignored.
    pub fn validate(&self, kind: Signal) -> Result<(), ConfigError> {
        let fail = |message: String| {
            Err(ConfigError::InvalidSignal {
                kind: kind.to_string(),
                message,
            })
        };

        if !self.base_interval_secs.is_finite() || self.base_interval_secs < 0.0 {
            return fail(format!("base_interval_secs must be >= 0, got {}", self.base_interval_secs));
        }
        if !self.accumulation_rate.is_finite() || self.accumulation_rate < 0.0 {
            return fail(format!("accumulation_rate must be >= 0, got {}", self.accumulation_rate));
        }
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return fail(format!("decay_rate must be >= 0, got {}", self.decay_rate));
        }
        if !self.emit_threshold.is_finite() || self.emit_threshold <= 0.0 {
            return fail(format!("emit_threshold must be > 0, got {}", self.emit_threshold));
        }
        if !self.jitter_factor.is_finite() || !(0.0..=1.0).contains(&self.jitter_factor) {
            return fail(format!("jitter_factor must be within [0, 1], got {}", self.jitter_factor));
        }
        if !self.hard_cooldown_secs.is_finite() || self.hard_cooldown_secs < 0.0 {
            return fail(format!("hard_cooldown_secs must be >= 0, got {}", self.hard_cooldown_secs));
        }
        if let Some(max) = self.max_interval_secs {
            if !max.is_finite() || max <= 0.0 {
                return fail(format!("max_interval_secs must be > 0, got {max}"));
            }
            if self.hard_cooldown_secs > max {
                return fail(format!(
                    "hard_cooldown_secs ({}) exceeds max_interval_secs ({max})",
                    self.hard_cooldown_secs
                ));
            }
        }
        Ok(())
    }
}

/// The immutable registry: every kind mapped to its tuning.
pub type Registry = BTreeMap<Signal, SignalConfig>;

/// Default registry tuning.
///
/// Social pressure ramps fastest and is force-checked every two hours;
/// Uncanny is purely reactive (no ceiling) with the highest priority and a
/// ten-minute cooldown so one anomaly can't ring the bell twice.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry.insert(
        Signal::Social,
        SignalConfig {
            base_interval_secs: 1200.0,
            accumulation_rate: 0.0008,
            decay_rate: 0.02,
            emit_threshold: 0.7,
            jitter_factor: 0.15,
            priority: 7,
            max_interval_secs: Some(7200.0),
            hard_cooldown_secs: 0.0,
        },
    );
    registry.insert(
        Signal::Curiosity,
        SignalConfig {
            base_interval_secs: 3600.0,
            accumulation_rate: 0.0003,
            decay_rate: 0.015,
            emit_threshold: 0.6,
            jitter_factor: 0.15,
            priority: 4,
            max_interval_secs: Some(14400.0),
            hard_cooldown_secs: 0.0,
        },
    );
    registry.insert(
        Signal::Maintenance,
        SignalConfig {
            base_interval_secs: 10800.0,
            accumulation_rate: 0.0001,
            decay_rate: 0.02,
            emit_threshold: 0.75,
            jitter_factor: 0.15,
            priority: 6,
            max_interval_secs: None,
            hard_cooldown_secs: 0.0,
        },
    );
    registry.insert(
        Signal::Boredom,
        SignalConfig {
            base_interval_secs: 14400.0,
            accumulation_rate: 0.0002,
            decay_rate: 0.01,
            emit_threshold: 0.8,
            jitter_factor: 0.15,
            priority: 2,
            max_interval_secs: Some(21600.0),
            hard_cooldown_secs: 1800.0,
        },
    );
    registry.insert(
        Signal::Anxiety,
        SignalConfig {
            base_interval_secs: 21600.0,
            accumulation_rate: 0.0001,
            decay_rate: 0.03,
            emit_threshold: 0.8,
            jitter_factor: 0.15,
            priority: 8,
            max_interval_secs: None,
            hard_cooldown_secs: 180.0,
        },
    );
    registry.insert(
        Signal::Drift,
        SignalConfig {
            base_interval_secs: 21600.0,
            accumulation_rate: 0.0001,
            decay_rate: 0.005,
            emit_threshold: 0.7,
            jitter_factor: 0.15,
            priority: 3,
            max_interval_secs: Some(43200.0),
            hard_cooldown_secs: 0.0,
        },
    );
    registry.insert(
        Signal::Stale,
        SignalConfig {
            base_interval_secs: 7200.0,
            accumulation_rate: 0.0002,
            decay_rate: 0.01,
            emit_threshold: 0.6,
            jitter_factor: 0.15,
            priority: 4,
            max_interval_secs: Some(28800.0),
            hard_cooldown_secs: 0.0,
        },
    );
    registry.insert(
        Signal::Uncanny,
        SignalConfig {
            base_interval_secs: 1800.0,
            accumulation_rate: 0.001,
            decay_rate: 0.05,
            emit_threshold: 0.5,
            jitter_factor: 0.15,
            priority: 9,
            max_interval_secs: None,
            hard_cooldown_secs: 600.0,
        },
    );
    registry
}

/// Validate a full registry. Every kind must be present and valid.
pub fn validate_registry(registry: &Registry) -> Result<(), ConfigError> {
    for kind in Signal::ALL {
        match registry.get(&kind) {
            Some(cfg) => cfg.validate(kind)?,
            None => {
                return Err(ConfigError::MissingSignal {
                    kind: kind.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// A signal emitted by a tick, consumed by the external decision pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedSignal {
    pub id: Uuid,
    pub kind: Signal,
    /// Pressure at the moment of emission, before the reset.
    pub pressure: f64,
    pub at: DateTime<Utc>,
    /// True when the ceiling interval forced the emission.
    pub forced: bool,
    /// Human-readable directive: why this kind fired and what attention
    /// it implies.
    pub directive: String,
}

impl fmt::Display for EmittedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forced = if self.forced { " [forced]" } else { "" };
        write!(f, "{}{} (pressure={:.2})", self.kind, forced, self.pressure)
    }
}
