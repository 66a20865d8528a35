//! TOML configuration for the scheduler and driver.
//!
//! Loads from a TOML file, falls back to defaults for missing fields,
//! applies env var overrides, and validates the resulting registry —
//! invalid signal parameters are fatal to startup.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::signal::{default_registry, validate_registry, Registry, Signal, SignalConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SomaConfig {
    /// Where the state document lives.
    pub state_path: String,
    /// Driver tick period.
    pub tick_interval_secs: u64,
    /// Uniform jitter applied to the tick period by the driver.
    pub tick_jitter_secs: u64,
    /// Bound on the external state provider fetch.
    pub provider_timeout_secs: u64,
    /// Kinds that bypass quiet-mode suppression. Empty by default.
    pub quiet_exempt: Vec<Signal>,
    /// Per-kind tuning overrides, keyed by kind name.
    pub signals: BTreeMap<String, SignalTuning>,
}

impl Default for SomaConfig {
    fn default() -> Self {
        Self {
            state_path: "state/soma.json".to_string(),
            tick_interval_secs: 60,
            tick_jitter_secs: 5,
            provider_timeout_secs: 10,
            quiet_exempt: Vec::new(),
            signals: BTreeMap::new(),
        }
    }
}

/// Partial per-kind override; unset fields keep the registry default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignalTuning {
    pub base_interval_secs: Option<f64>,
    pub accumulation_rate: Option<f64>,
    pub decay_rate: Option<f64>,
    pub emit_threshold: Option<f64>,
    pub jitter_factor: Option<f64>,
    pub priority: Option<i32>,
    /// `Some(0.0)` or a negative value removes the ceiling.
    pub max_interval_secs: Option<f64>,
    pub hard_cooldown_secs: Option<f64>,
}

impl SignalTuning {
    fn apply(&self, cfg: &mut SignalConfig) {
        if let Some(v) = self.base_interval_secs {
            cfg.base_interval_secs = v;
        }
        if let Some(v) = self.accumulation_rate {
            cfg.accumulation_rate = v;
        }
        if let Some(v) = self.decay_rate {
            cfg.decay_rate = v;
        }
        if let Some(v) = self.emit_threshold {
            cfg.emit_threshold = v;
        }
        if let Some(v) = self.jitter_factor {
            cfg.jitter_factor = v;
        }
        if let Some(v) = self.priority {
            cfg.priority = v;
        }
        if let Some(v) = self.max_interval_secs {
            cfg.max_interval_secs = if v > 0.0 { Some(v) } else { None };
        }
        if let Some(v) = self.hard_cooldown_secs {
            cfg.hard_cooldown_secs = v;
        }
    }
}

impl SomaConfig {
    /// Load config from a TOML file, falling back to defaults for missing
    /// fields. Env var overrides are applied after parsing.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: SomaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist, return defaults
    /// with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SOMA_STATE_PATH") {
            self.state_path = v;
        }
        if let Ok(v) = std::env::var("SOMA_TICK_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.tick_interval_secs = n;
            }
        }
        if let Ok(v) = std::env::var("SOMA_PROVIDER_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.provider_timeout_secs = n;
            }
        }
    }

    /// Build the validated registry: defaults with the config's per-kind
    /// overrides applied. Unknown kind names and invalid parameters are
    /// fatal.
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let mut registry = default_registry();
        for (name, tuning) in &self.signals {
            let kind: Signal = name.parse().map_err(|_| ConfigError::InvalidValue {
                key: format!("signals.{name}"),
                message: "unknown signal kind".to_string(),
            })?;
            if let Some(cfg) = registry.get_mut(&kind) {
                tuning.apply(cfg);
            }
        }
        validate_registry(&registry)?;
        Ok(registry)
    }
}
