//! External state provider seam.
//!
//! The limbic layer needs a little external information to weigh its
//! drives, but it never reasons about it — it asks simple questions and
//! gets a closed record back. Real deployments implement [`BoostProvider`]
//! against their platforms; the scheduler bounds every fetch with a
//! timeout and degrades to a neutral snapshot when the provider fails.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use soma_core::BoostSnapshot;

#[async_trait]
pub trait BoostProvider: Send + Sync {
    /// Sample the external state at `now`. May touch the network; the
    /// scheduler wraps the call in a timeout.
    async fn boosts(&self, now: DateTime<Utc>) -> anyhow::Result<BoostSnapshot>;
}

/// Provider that reports no external pressure at all. Useful standalone
/// and as the degraded fallback reference.
pub struct NeutralProvider;

#[async_trait]
impl BoostProvider for NeutralProvider {
    async fn boosts(&self, _now: DateTime<Utc>) -> anyhow::Result<BoostSnapshot> {
        Ok(BoostSnapshot::neutral())
    }
}

/// Provider backed by a settable snapshot. Lets a host process push
/// observations in rather than having the scheduler pull them.
pub struct StaticProvider {
    inner: Mutex<BoostSnapshot>,
}

impl StaticProvider {
    pub fn new(snapshot: BoostSnapshot) -> Self {
        Self {
            inner: Mutex::new(snapshot),
        }
    }

    pub async fn set(&self, snapshot: BoostSnapshot) {
        *self.inner.lock().await = snapshot;
    }
}

#[async_trait]
impl BoostProvider for StaticProvider {
    async fn boosts(&self, _now: DateTime<Utc>) -> anyhow::Result<BoostSnapshot> {
        Ok(self.inner.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn neutral_provider_reports_zero() {
        let p = NeutralProvider;
        let b = p.boosts(Utc::now()).await.unwrap();
        assert_eq!(b, BoostSnapshot::neutral());
    }

    #[tokio::test]
    async fn static_provider_returns_latest_snapshot() {
        let p = StaticProvider::new(BoostSnapshot::neutral());
        p.set(BoostSnapshot {
            pending_notifications: 7,
            ..BoostSnapshot::neutral()
        })
        .await;
        let b = p.boosts(Utc::now()).await.unwrap();
        assert_eq!(b.pending_notifications, 7);
    }
}
