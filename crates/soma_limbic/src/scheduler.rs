//! The limbic scheduler.
//!
//! One tick: pull the boost snapshot, recompute every accumulator from
//! wall-clock elapsed time, gate by quiet mode and cooldown, select at
//! most one signal by priority, persist, and hand the emission (or the
//! absence of one) back to the driver.
//!
//! The scheduler performs no internal threading. All state lives behind
//! a single `tokio::sync::Mutex`; overlapping ticks queue on it and
//! read-modify-write one at a time. Every mutating operation works on a
//! copy of the document and commits to memory only after the store has
//! accepted it, so a failed save never leaves memory and disk disagreeing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use soma_core::{
    signal::validate_registry, AdminError, BoostSnapshot, EmittedSignal, Outcome, QuietWindow,
    Registry, Signal, SignalConfig, SomaConfig,
};
use soma_store::{StateDocument, StateStore, StoreError};

use crate::directive;
use crate::feedback::{Backoff, CalibrationPolicy};
use crate::pressure;
use crate::provider::BoostProvider;

#[derive(Error, Debug)]
pub enum LimbicError {
    #[error(transparent)]
    Admin(#[from] AdminError),

    /// The tick refused to mutate state it could not also persist.
    /// Transient: retry on the next scheduled tick.
    #[error("state store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    /// True when the provider failed or timed out and neutral boosts were
    /// substituted for this tick.
    pub provider_degraded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Emitted(EmittedSignal),
    /// The normal, expected majority case.
    Idle,
}

/// Per-kind view for operator tooling.
#[derive(Debug, Clone, Serialize)]
pub struct SignalStatus {
    pub pressure: f64,
    pub threshold: f64,
    pub priority: i32,
    pub last_emitted_at: Option<DateTime<Utc>>,
    pub seconds_since_emission: Option<f64>,
    pub emission_count: u64,
    pub last_outcome: Option<Outcome>,
    pub in_cooldown: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub quiet_active: bool,
    pub quiet: QuietWindow,
    pub total_emissions: u64,
    pub signals: BTreeMap<String, SignalStatus>,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Bound on the provider fetch; past it the tick degrades to neutral
    /// boosts instead of blocking.
    pub provider_timeout: StdDuration,
    /// Kinds that bypass quiet-mode suppression.
    pub quiet_exempt: Vec<Signal>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            provider_timeout: StdDuration::from_secs(10),
            quiet_exempt: Vec::new(),
        }
    }
}

struct Candidate {
    kind: Signal,
    pressure: f64,
    priority: i32,
    since_emission: f64,
    forced: bool,
}

/// True when `b` strictly outranks `a`: higher priority, then higher
/// pressure, then longer time since last emission. Candidates are
/// evaluated in registry order, so a full tie keeps the earlier kind —
/// selection is deterministic end to end.
fn outranks(b: &Candidate, a: &Candidate) -> bool {
    if b.priority != a.priority {
        return b.priority > a.priority;
    }
    if b.pressure != a.pressure {
        return b.pressure > a.pressure;
    }
    b.since_emission > a.since_emission
}

fn effective_threshold(cfg: &SignalConfig) -> f64 {
    if cfg.jitter_factor <= 0.0 {
        return cfg.emit_threshold;
    }
    let jitter = rand::thread_rng().gen_range(-cfg.jitter_factor..=cfg.jitter_factor);
    cfg.emit_threshold * (1.0 + jitter)
}

pub struct LimbicScheduler {
    registry: Registry,
    store: StateStore,
    provider: Arc<dyn BoostProvider>,
    policy: Box<dyn CalibrationPolicy>,
    provider_timeout: StdDuration,
    quiet_exempt: Vec<Signal>,
    state: Mutex<StateDocument>,
}

impl LimbicScheduler {
    /// Build from config: validated registry, store at the configured
    /// path, state loaded fresh — no implicit reset on restart.
    pub fn open(
        config: &SomaConfig,
        provider: Arc<dyn BoostProvider>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let registry = config.registry()?;
        let store = StateStore::new(&config.state_path);
        let options = SchedulerOptions {
            provider_timeout: StdDuration::from_secs(config.provider_timeout_secs),
            quiet_exempt: config.quiet_exempt.clone(),
        };
        Self::with_parts(registry, store, provider, options, now)
    }

    pub fn with_parts(
        registry: Registry,
        store: StateStore,
        provider: Arc<dyn BoostProvider>,
        options: SchedulerOptions,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        validate_registry(&registry)?;
        let state = store.load_or_init(now)?;
        Ok(Self {
            registry,
            store,
            provider,
            policy: Box::new(Backoff::default()),
            provider_timeout: options.provider_timeout,
            quiet_exempt: options.quiet_exempt,
            state: Mutex::new(state),
        })
    }

    /// Swap the calibration policy.
    pub fn with_policy(mut self, policy: Box<dyn CalibrationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    async fn fetch_boosts(&self, now: DateTime<Utc>) -> (BoostSnapshot, bool) {
        match tokio::time::timeout(self.provider_timeout, self.provider.boosts(now)).await {
            Ok(Ok(snapshot)) => (snapshot, false),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "boost provider failed, using neutral boosts");
                (BoostSnapshot::neutral(), true)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.provider_timeout.as_millis() as u64,
                    "boost provider timed out, using neutral boosts"
                );
                (BoostSnapshot::neutral(), true)
            }
        }
    }

    /// Run one tick at `now`. Emits at most one signal. "No eligible
    /// signal" is the normal case, not an error; the tick fails only when
    /// the store refuses the updated document, in which case nothing is
    /// mutated and the tick can simply be retried.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, LimbicError> {
        let (boosts, provider_degraded) = self.fetch_boosts(now).await;

        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let origin = next.origin;

        // Recompute every accumulator from elapsed wall-clock time.
        for (kind, cfg) in &self.registry {
            let acc = next.accumulator(*kind);
            let scale = self.policy.accumulation_scale(&acc);
            let p = pressure::compute_pressure(*kind, cfg, &acc, origin, now, &boosts, scale);
            let slot = next.accumulator_mut(*kind);
            slot.current_pressure = p;
            slot.last_boost_snapshot = Some(boosts.clone());
        }

        let quiet_active = next.quiet.is_active(now);

        // Gates (quiet, cooldown) apply before selection: a suppressed
        // kind never counts toward the winner, whatever its priority.
        let mut winner: Option<Candidate> = None;
        for (kind, cfg) in &self.registry {
            let acc = next.accumulator(*kind);
            let p = acc.current_pressure;
            let since = acc.seconds_since_emission(origin, now);

            let pressure_candidate = p >= effective_threshold(cfg);
            let ceiling_candidate = cfg.max_interval_secs.map_or(false, |max| since >= max);
            if !pressure_candidate && !ceiling_candidate {
                continue;
            }

            if quiet_active && !self.quiet_exempt.contains(kind) {
                tracing::debug!(kind = %kind, "quiet window active, suppressing");
                continue;
            }

            // Hard cooldown plus any calibration backoff. Only meaningful
            // once the kind has actually emitted.
            if acc.last_emitted_at.is_some() {
                let cooldown =
                    cfg.hard_cooldown_secs + self.policy.extra_cooldown(&acc).as_secs_f64();
                if since < cooldown {
                    tracing::debug!(
                        kind = %kind,
                        remaining_secs = (cooldown - since) as u64,
                        "in cooldown, not eligible"
                    );
                    continue;
                }
            }

            let candidate = Candidate {
                kind: *kind,
                pressure: p,
                priority: cfg.priority,
                since_emission: since,
                forced: ceiling_candidate && !pressure_candidate,
            };
            winner = match winner {
                Some(best) if !outranks(&candidate, &best) => Some(best),
                _ => Some(candidate),
            };
        }

        let outcome = match winner {
            None => TickOutcome::Idle,
            Some(c) => {
                let emitted = EmittedSignal {
                    id: Uuid::new_v4(),
                    kind: c.kind,
                    pressure: c.pressure,
                    at: now,
                    forced: c.forced,
                    directive: directive::render(c.kind, c.pressure, c.forced),
                };
                next.accumulator_mut(c.kind).mark_emitted(now);
                next.total_emissions += 1;
                next.push_history(emitted.clone());
                TickOutcome::Emitted(emitted)
            }
        };

        // Persist-then-commit.
        self.store.save(&next)?;
        *guard = next;

        match &outcome {
            TickOutcome::Emitted(e) => tracing::info!(signal = %e, "emitting signal"),
            TickOutcome::Idle => tracing::debug!("no signal ready to emit"),
        }

        Ok(TickReport {
            outcome,
            provider_degraded,
        })
    }

    /// Suppress all (non-exempt) emissions for `duration`.
    pub async fn set_quiet(
        &self,
        duration: StdDuration,
        now: DateTime<Utc>,
    ) -> Result<QuietWindow, LimbicError> {
        let span = chrono::Duration::from_std(duration)
            .ok()
            .filter(|d| *d > chrono::Duration::zero())
            .ok_or(AdminError::InvalidQuietDuration)?;

        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        next.quiet = QuietWindow::set(now, span);
        self.store.save(&next)?;
        *guard = next;
        tracing::info!(secs = duration.as_secs(), "quiet mode enabled");
        Ok(guard.quiet.clone())
    }

    pub async fn clear_quiet(&self) -> Result<QuietWindow, LimbicError> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        next.quiet = QuietWindow::cleared();
        self.store.save(&next)?;
        *guard = next;
        tracing::info!("quiet mode disabled");
        Ok(guard.quiet.clone())
    }

    /// Manual override: add to the kind's boost reserve. The reserve
    /// drains at the kind's `decay_rate` per second and is cleared by the
    /// next emission.
    pub async fn boost_signal(
        &self,
        kind: Signal,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<(), LimbicError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(AdminError::InvalidBoost(amount).into());
        }
        let Some(cfg) = self.registry.get(&kind) else {
            return Err(AdminError::UnknownKind(kind.to_string()).into());
        };

        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let acc = next.accumulator_mut(kind);
        let residual = pressure::manual_reserve(cfg, acc, now);
        acc.manual_boost = residual + amount;
        acc.manual_boost_at = Some(now);
        self.store.save(&next)?;
        *guard = next;
        tracing::info!(kind = %kind, amount, "manual boost applied");
        Ok(())
    }

    /// Record the outcome of acting on an emitted signal.
    pub async fn record_outcome(
        &self,
        kind: Signal,
        outcome: Outcome,
    ) -> Result<(), LimbicError> {
        if !self.registry.contains_key(&kind) {
            return Err(AdminError::UnknownKind(kind.to_string()).into());
        }

        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        next.accumulator_mut(kind).record_outcome(outcome);
        self.store.save(&next)?;
        *guard = next;
        tracing::info!(kind = %kind, outcome = %outcome, "outcome recorded");
        Ok(())
    }

    /// Per-kind pressure view at `now`, computed against each kind's last
    /// boost snapshot. Read-only; persists nothing.
    pub async fn status(&self, now: DateTime<Utc>) -> SchedulerStatus {
        let guard = self.state.lock().await;
        let origin = guard.origin;

        let mut signals = BTreeMap::new();
        for (kind, cfg) in &self.registry {
            let acc = guard.accumulator(*kind);
            let boosts = acc.last_boost_snapshot.clone().unwrap_or_default();
            let scale = self.policy.accumulation_scale(&acc);
            let p = pressure::compute_pressure(*kind, cfg, &acc, origin, now, &boosts, scale);
            let since = acc.seconds_since_emission(origin, now);
            let cooldown = cfg.hard_cooldown_secs + self.policy.extra_cooldown(&acc).as_secs_f64();

            signals.insert(
                kind.as_str().to_string(),
                SignalStatus {
                    pressure: p,
                    threshold: cfg.emit_threshold,
                    priority: cfg.priority,
                    last_emitted_at: acc.last_emitted_at,
                    seconds_since_emission: acc.last_emitted_at.map(|_| since),
                    emission_count: acc.emission_count,
                    last_outcome: acc.last_outcome,
                    in_cooldown: acc.last_emitted_at.is_some() && since < cooldown,
                },
            );
        }

        SchedulerStatus {
            quiet_active: guard.quiet.is_active(now),
            quiet: guard.quiet.clone(),
            total_emissions: guard.total_emissions,
            signals,
        }
    }

    /// Past emissions, most recent first, optionally filtered by kind.
    pub async fn history(&self, kind: Option<Signal>, limit: usize) -> Vec<EmittedSignal> {
        let guard = self.state.lock().await;
        guard
            .history
            .iter()
            .rev()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use tempfile::{tempdir, TempDir};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    /// Registry where nothing ever fires on its own: huge thresholds, no
    /// ceilings, no cooldowns, no jitter. Tests carve out the behavior
    /// they need per kind.
    fn inert_registry() -> Registry {
        Signal::ALL
            .iter()
            .map(|kind| {
                (
                    *kind,
                    SignalConfig {
                        base_interval_secs: 0.0,
                        accumulation_rate: 0.0,
                        decay_rate: 0.0,
                        emit_threshold: 1e9,
                        jitter_factor: 0.0,
                        priority: 5,
                        max_interval_secs: None,
                        hard_cooldown_secs: 0.0,
                    },
                )
            })
            .collect()
    }

    fn social_scenario(registry: &mut Registry) {
        registry.insert(
            Signal::Social,
            SignalConfig {
                base_interval_secs: 1200.0,
                accumulation_rate: 0.001,
                decay_rate: 0.0,
                emit_threshold: 1.0,
                jitter_factor: 0.0,
                priority: 7,
                max_interval_secs: None,
                hard_cooldown_secs: 0.0,
            },
        );
    }

    fn scheduler(
        dir: &TempDir,
        registry: Registry,
        provider: Arc<dyn BoostProvider>,
        options: SchedulerOptions,
    ) -> LimbicScheduler {
        let store = StateStore::new(dir.path().join("soma.json"));
        LimbicScheduler::with_parts(registry, store, provider, options, at(0)).unwrap()
    }

    fn emitted_kind(report: &TickReport) -> Option<Signal> {
        match &report.outcome {
            TickOutcome::Emitted(e) => Some(e.kind),
            TickOutcome::Idle => None,
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl BoostProvider for FailingProvider {
        async fn boosts(&self, _now: DateTime<Utc>) -> anyhow::Result<BoostSnapshot> {
            anyhow::bail!("provider unreachable")
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl BoostProvider for SlowProvider {
        async fn boosts(&self, _now: DateTime<Utc>) -> anyhow::Result<BoostSnapshot> {
            tokio::time::sleep(StdDuration::from_secs(60)).await;
            Ok(BoostSnapshot::neutral())
        }
    }

    #[tokio::test]
    async fn tick_is_idle_when_nothing_is_ready() {
        let dir = tempdir().unwrap();
        let s = scheduler(
            &dir,
            inert_registry(),
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );
        let report = s.tick(at(60)).await.unwrap();
        assert_eq!(report.outcome, TickOutcome::Idle);
        assert!(!report.provider_degraded);
    }

    #[tokio::test]
    async fn social_emits_exactly_at_threshold() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        social_scenario(&mut registry);
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        // One second shy of threshold: 0.001 * 999 = 0.999
        assert_eq!(emitted_kind(&s.tick(at(2199)).await.unwrap()), None);

        // base_interval + 1000s: pressure is exactly 1.0
        let report = s.tick(at(2200)).await.unwrap();
        match report.outcome {
            TickOutcome::Emitted(e) => {
                assert_eq!(e.kind, Signal::Social);
                assert!((e.pressure - 1.0).abs() < 1e-9);
                assert!(!e.forced);
                assert!(e.directive.contains("SOCIAL"));
            }
            TickOutcome::Idle => panic!("expected emission at threshold"),
        }
    }

    #[tokio::test]
    async fn uncanny_cooldown_is_never_bypassed() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        registry.insert(
            Signal::Uncanny,
            SignalConfig {
                base_interval_secs: 1800.0,
                accumulation_rate: 0.0,
                decay_rate: 0.0,
                emit_threshold: 0.5,
                jitter_factor: 0.0,
                priority: 9,
                max_interval_secs: None,
                hard_cooldown_secs: 600.0,
            },
        );
        let provider = Arc::new(crate::provider::StaticProvider::new(BoostSnapshot {
            anomaly_score: 0.9,
            ..BoostSnapshot::neutral()
        }));
        let s = scheduler(&dir, registry, provider, SchedulerOptions::default());

        assert_eq!(emitted_kind(&s.tick(at(0)).await.unwrap()), Some(Signal::Uncanny));

        // A second anomaly inside the cooldown clears the threshold but
        // must not fire.
        assert_eq!(emitted_kind(&s.tick(at(300)).await.unwrap()), None);

        // Once the cooldown elapses the still-present anomaly fires again.
        assert_eq!(emitted_kind(&s.tick(at(601)).await.unwrap()), Some(Signal::Uncanny));
    }

    #[tokio::test]
    async fn ceiling_forces_emission_but_not_early() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        registry.insert(
            Signal::Social,
            SignalConfig {
                base_interval_secs: 1200.0,
                accumulation_rate: 0.0,
                decay_rate: 0.0,
                emit_threshold: 1e9,
                jitter_factor: 0.0,
                priority: 7,
                max_interval_secs: Some(7200.0),
                hard_cooldown_secs: 0.0,
            },
        );
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        assert_eq!(emitted_kind(&s.tick(at(7199)).await.unwrap()), None);

        let report = s.tick(at(7200)).await.unwrap();
        match report.outcome {
            TickOutcome::Emitted(e) => {
                assert_eq!(e.kind, Signal::Social);
                assert!(e.forced);
                assert!(e.directive.contains("maximum interval"));
            }
            TickOutcome::Idle => panic!("ceiling must force emission"),
        }
    }

    #[tokio::test]
    async fn quiet_window_suppresses_all_kinds() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        social_scenario(&mut registry);
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        s.set_quiet(StdDuration::from_secs(3600), at(2000)).await.unwrap();

        // Plenty of pressure, but the window is active.
        assert_eq!(emitted_kind(&s.tick(at(3000)).await.unwrap()), None);

        // Expired window reads as inactive without an explicit clear.
        assert_eq!(
            emitted_kind(&s.tick(at(5601)).await.unwrap()),
            Some(Signal::Social)
        );
    }

    #[tokio::test]
    async fn quiet_exempt_kind_fires_through_the_window() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        registry.insert(
            Signal::Uncanny,
            SignalConfig {
                emit_threshold: 0.5,
                jitter_factor: 0.0,
                priority: 9,
                ..SignalConfig::default()
            },
        );
        let provider = Arc::new(crate::provider::StaticProvider::new(BoostSnapshot {
            anomaly_score: 0.9,
            ..BoostSnapshot::neutral()
        }));
        let options = SchedulerOptions {
            quiet_exempt: vec![Signal::Uncanny],
            ..SchedulerOptions::default()
        };
        let s = scheduler(&dir, registry, provider, options);

        s.set_quiet(StdDuration::from_secs(3600), at(0)).await.unwrap();
        assert_eq!(emitted_kind(&s.tick(at(10)).await.unwrap()), Some(Signal::Uncanny));
    }

    #[tokio::test]
    async fn highest_priority_wins() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        for (kind, priority) in [(Signal::Anxiety, 9), (Signal::Boredom, 2)] {
            registry.insert(
                kind,
                SignalConfig {
                    emit_threshold: 0.5,
                    jitter_factor: 0.0,
                    priority,
                    decay_rate: 0.0,
                    base_interval_secs: 0.0,
                    accumulation_rate: 0.0,
                    max_interval_secs: None,
                    hard_cooldown_secs: 0.0,
                },
            );
        }
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        s.boost_signal(Signal::Anxiety, 1.0, at(10)).await.unwrap();
        s.boost_signal(Signal::Boredom, 1.0, at(10)).await.unwrap();

        assert_eq!(emitted_kind(&s.tick(at(10)).await.unwrap()), Some(Signal::Anxiety));
    }

    #[tokio::test]
    async fn exact_ties_resolve_deterministically() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        for kind in [Signal::Curiosity, Signal::Stale] {
            registry.insert(
                kind,
                SignalConfig {
                    emit_threshold: 0.5,
                    jitter_factor: 0.0,
                    priority: 4,
                    decay_rate: 0.0,
                    base_interval_secs: 0.0,
                    accumulation_rate: 0.0,
                    max_interval_secs: None,
                    hard_cooldown_secs: 0.0,
                },
            );
        }
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        // Same priority, same pressure, same (never) emission history:
        // the earlier-registered kind wins.
        s.boost_signal(Signal::Curiosity, 1.0, at(10)).await.unwrap();
        s.boost_signal(Signal::Stale, 1.0, at(10)).await.unwrap();
        assert_eq!(
            emitted_kind(&s.tick(at(10)).await.unwrap()),
            Some(Signal::Curiosity)
        );

        // Curiosity's reserve was cleared by its emission; Stale still
        // holds pressure and takes the next tick.
        assert_eq!(emitted_kind(&s.tick(at(11)).await.unwrap()), Some(Signal::Stale));
    }

    #[tokio::test]
    async fn at_most_one_emission_per_tick() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        for kind in Signal::ALL {
            registry.insert(
                kind,
                SignalConfig {
                    emit_threshold: 0.5,
                    jitter_factor: 0.0,
                    priority: 5,
                    decay_rate: 0.0,
                    base_interval_secs: 0.0,
                    accumulation_rate: 0.0,
                    max_interval_secs: None,
                    hard_cooldown_secs: 0.0,
                },
            );
        }
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        for kind in Signal::ALL {
            s.boost_signal(kind, 5.0, at(10)).await.unwrap();
        }
        let report = s.tick(at(10)).await.unwrap();
        assert!(emitted_kind(&report).is_some());

        let status = s.status(at(10)).await;
        assert_eq!(status.total_emissions, 1);
    }

    #[tokio::test]
    async fn restart_recovers_the_same_pressure() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        social_scenario(&mut registry);

        let s = scheduler(
            &dir,
            registry.clone(),
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );
        assert_eq!(emitted_kind(&s.tick(at(2200)).await.unwrap()), Some(Signal::Social));

        // "Restart": reload from the same store.
        let store = StateStore::new(dir.path().join("soma.json"));
        let reloaded = LimbicScheduler::with_parts(
            registry,
            store,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
            at(3000),
        )
        .unwrap();

        let live = s.status(at(5000)).await.signals["social"].pressure;
        let recovered = reloaded.status(at(5000)).await.signals["social"].pressure;
        assert_eq!(live, recovered);
        // 1600s past base since the emission at t=2200
        assert!((recovered - 0.001 * 1600.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn store_failure_fails_the_tick_without_mutating() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        social_scenario(&mut registry);
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        // Block the temp file the atomic save writes through.
        let tmp = dir.path().join("soma.json.tmp");
        std::fs::create_dir(&tmp).unwrap();

        let err = s.tick(at(2200)).await.unwrap_err();
        assert!(matches!(err, LimbicError::Store(_)));

        // In-memory state untouched: no emission happened.
        let status = s.status(at(2200)).await;
        assert_eq!(status.total_emissions, 0);
        assert_eq!(status.signals["social"].emission_count, 0);

        // Retry succeeds once the store recovers.
        std::fs::remove_dir(&tmp).unwrap();
        assert_eq!(emitted_kind(&s.tick(at(2260)).await.unwrap()), Some(Signal::Social));
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_neutral_boosts() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        social_scenario(&mut registry);
        let s = scheduler(
            &dir,
            registry,
            Arc::new(FailingProvider),
            SchedulerOptions::default(),
        );

        let report = s.tick(at(60)).await.unwrap();
        assert!(report.provider_degraded);
        assert_eq!(report.outcome, TickOutcome::Idle);

        // Time-driven pressure still works without the provider.
        let report = s.tick(at(2200)).await.unwrap();
        assert!(report.provider_degraded);
        assert_eq!(emitted_kind(&report), Some(Signal::Social));
    }

    #[tokio::test]
    async fn provider_fetch_is_time_bounded() {
        let dir = tempdir().unwrap();
        let options = SchedulerOptions {
            provider_timeout: StdDuration::from_millis(50),
            ..SchedulerOptions::default()
        };
        let s = scheduler(&dir, inert_registry(), Arc::new(SlowProvider), options);

        let report = s.tick(at(60)).await.unwrap();
        assert!(report.provider_degraded);
    }

    #[tokio::test]
    async fn repeated_errors_impose_bounded_backoff() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        registry.insert(
            Signal::Social,
            SignalConfig {
                emit_threshold: 0.5,
                jitter_factor: 0.0,
                priority: 7,
                decay_rate: 0.0,
                base_interval_secs: 0.0,
                accumulation_rate: 0.0,
                max_interval_secs: None,
                hard_cooldown_secs: 0.0,
            },
        );
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        s.boost_signal(Signal::Social, 1.0, at(0)).await.unwrap();
        assert_eq!(emitted_kind(&s.tick(at(0)).await.unwrap()), Some(Signal::Social));

        s.record_outcome(Signal::Social, Outcome::Error).await.unwrap();
        s.record_outcome(Signal::Social, Outcome::Error).await.unwrap();

        // Pressure is back, but the calibration backoff (300s) holds even
        // though hard_cooldown is zero.
        s.boost_signal(Signal::Social, 1.0, at(200)).await.unwrap();
        assert_eq!(emitted_kind(&s.tick(at(200)).await.unwrap()), None);

        assert_eq!(emitted_kind(&s.tick(at(400)).await.unwrap()), Some(Signal::Social));
    }

    #[tokio::test]
    async fn invalid_admin_input_is_rejected_without_effect() {
        let dir = tempdir().unwrap();
        let s = scheduler(
            &dir,
            inert_registry(),
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        assert!(matches!(
            s.boost_signal(Signal::Social, -1.0, at(0)).await.unwrap_err(),
            LimbicError::Admin(AdminError::InvalidBoost(_))
        ));
        assert!(matches!(
            s.boost_signal(Signal::Social, f64::NAN, at(0)).await.unwrap_err(),
            LimbicError::Admin(AdminError::InvalidBoost(_))
        ));
        assert!(matches!(
            s.set_quiet(StdDuration::ZERO, at(0)).await.unwrap_err(),
            LimbicError::Admin(AdminError::InvalidQuietDuration)
        ));

        let status = s.status(at(0)).await;
        assert_eq!(status.signals["social"].pressure, 0.0);
        assert!(!status.quiet_active);
    }

    #[tokio::test]
    async fn history_is_most_recent_first_and_filterable() {
        let dir = tempdir().unwrap();
        let mut registry = inert_registry();
        for kind in [Signal::Social, Signal::Anxiety] {
            registry.insert(
                kind,
                SignalConfig {
                    emit_threshold: 0.5,
                    jitter_factor: 0.0,
                    priority: if kind == Signal::Anxiety { 8 } else { 7 },
                    decay_rate: 0.0,
                    base_interval_secs: 0.0,
                    accumulation_rate: 0.0,
                    max_interval_secs: None,
                    hard_cooldown_secs: 0.0,
                },
            );
        }
        let s = scheduler(
            &dir,
            registry,
            Arc::new(crate::provider::NeutralProvider),
            SchedulerOptions::default(),
        );

        s.boost_signal(Signal::Social, 1.0, at(10)).await.unwrap();
        assert_eq!(emitted_kind(&s.tick(at(10)).await.unwrap()), Some(Signal::Social));
        s.boost_signal(Signal::Anxiety, 1.0, at(20)).await.unwrap();
        assert_eq!(emitted_kind(&s.tick(at(20)).await.unwrap()), Some(Signal::Anxiety));

        let all = s.history(None, 10).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, Signal::Anxiety);
        assert_eq!(all[1].kind, Signal::Social);

        let social_only = s.history(Some(Signal::Social), 10).await;
        assert_eq!(social_only.len(), 1);
        assert_eq!(social_only[0].kind, Signal::Social);

        assert_eq!(s.history(None, 1).await.len(), 1);
    }
}
