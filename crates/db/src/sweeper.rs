//! Periodic cleanup of idempotency records.
//!
//! IN_PROGRESS records older than the staleness window belong to requests
//! that died mid-flight; they are marked FAILED so the key can be reused.
//! Records past their retention window are deleted.

use sea_orm::DbErr;
use tesoro_core::SharedClock;
use tesoro_core::idempotency::IdempotencyPolicy;
use tracing::info;

use crate::repositories::IdempotencyRepository;

/// What one sweep changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale IN_PROGRESS records marked FAILED.
    pub failed: u64,
    /// Expired records deleted.
    pub purged: u64,
}

/// Idempotency record sweeper.
#[derive(Debug, Clone)]
pub struct IdempotencySweeper {
    store: IdempotencyRepository,
    policy: IdempotencyPolicy,
    clock: SharedClock,
}

impl IdempotencySweeper {
    /// Creates a sweeper.
    #[must_use]
    pub fn new(store: IdempotencyRepository, policy: IdempotencyPolicy, clock: SharedClock) -> Self {
        Self { store, policy, clock }
    }

    /// Runs one sweep.
    pub async fn sweep_once(&self) -> Result<SweepReport, DbErr> {
        let now = self.clock.now();
        let failed = self.store.fail_stale(self.policy.stale_cutoff(now), now).await?;
        let purged = self.store.purge_expired(now).await?;

        if failed > 0 || purged > 0 {
            info!(failed, purged, "Idempotency sweep");
        }
        Ok(SweepReport { failed, purged })
    }
}
