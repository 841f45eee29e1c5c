//! Idempotency gateway.
//!
//! Turns a `(organization, operation, key)` triple plus a request fingerprint
//! into either a claim on the key or the stored response of an earlier run.
//! The decision itself lives in `tesoro_core::idempotency::IdempotencyPolicy`;
//! this module applies it against the records table.

use std::future::Future;

use sea_orm::{ConnectionTrait, DatabaseConnection};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tesoro_core::idempotency::{
    Decision, IdempotencyError, IdempotencyKey, IdempotencyPolicy, OperationType, Outcome,
};
use tesoro_core::{OperationError, SharedClock};
use tesoro_shared::types::OrganizationId;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::storage_error;
use crate::repositories::idempotency::{IdempotencyRepository, NewIdempotencyRecord, snapshot};

/// Read-decide-write rounds before a contended key is reported as in progress.
const MAX_ADMIT_ROUNDS: usize = 4;

/// A key held by this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// The IN_PROGRESS record.
    pub record_id: Uuid,
    /// Operation the key guards.
    pub operation: OperationType,
    /// The key.
    pub key: IdempotencyKey,
}

/// What the gateway decided for a keyed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// The key is ours; run the work.
    Claimed(Claim),
    /// An identical request already completed; this is its response.
    Replay(Value),
}

/// Idempotency gateway over the records table.
#[derive(Debug, Clone)]
pub struct IdempotencyGateway {
    store: IdempotencyRepository,
    policy: IdempotencyPolicy,
    clock: SharedClock,
}

impl IdempotencyGateway {
    /// Creates a gateway.
    #[must_use]
    pub fn new(db: DatabaseConnection, policy: IdempotencyPolicy, clock: SharedClock) -> Self {
        Self {
            store: IdempotencyRepository::new(db),
            policy,
            clock,
        }
    }

    /// The underlying record store.
    #[must_use]
    pub fn store(&self) -> &IdempotencyRepository {
        &self.store
    }

    /// Retention and staleness windows in force.
    #[must_use]
    pub fn policy(&self) -> IdempotencyPolicy {
        self.policy
    }

    /// Claims `key` for this request or returns the stored response.
    ///
    /// # Errors
    ///
    /// - `IdempotencyConflict` when the key completed with another body
    /// - `IdempotencyInProgress` when another request holds the key
    pub async fn admit(
        &self,
        organization_id: OrganizationId,
        operation: OperationType,
        key: &IdempotencyKey,
        fingerprint: &str,
    ) -> Result<Admission, OperationError> {
        for _ in 0..MAX_ADMIT_ROUNDS {
            let now = self.clock.now();
            let existing = self
                .store
                .find(organization_id, operation, key)
                .await
                .map_err(storage_error)?;

            let decision = self
                .policy
                .decide(existing.as_ref().map(snapshot).as_ref(), fingerprint, now);

            match (decision, existing) {
                (Decision::Replay, Some(record)) => {
                    info!(%organization_id, %operation, %key, "Replaying completed request");
                    return Ok(Admission::Replay(record.response_payload.unwrap_or(Value::Null)));
                }
                (Decision::Conflict, _) => {
                    warn!(%organization_id, %operation, %key, "Idempotency key reused with a different request");
                    return Err(IdempotencyError::Conflict {
                        operation,
                        key: key.to_string(),
                    }
                    .into());
                }
                (Decision::InProgress, _) => {
                    return Err(IdempotencyError::InProgress {
                        operation,
                        key: key.to_string(),
                    }
                    .into());
                }
                (Decision::Reclaim, Some(record)) => {
                    let removed = self
                        .store
                        .delete_if_reclaimable(record.id, now, self.policy.stale_cutoff(now))
                        .await
                        .map_err(storage_error)?;
                    debug!(%operation, %key, removed, "Reclaimed idempotency key");
                }
                (Decision::Proceed, _) | (Decision::Replay | Decision::Reclaim, None) => {
                    let inserted = self
                        .store
                        .try_insert(NewIdempotencyRecord {
                            organization_id,
                            operation,
                            key,
                            fingerprint,
                            now,
                            expires_at: self.policy.expires_at(now),
                        })
                        .await
                        .map_err(storage_error)?;

                    if let Some(record) = inserted {
                        return Ok(Admission::Claimed(Claim {
                            record_id: record.id,
                            operation,
                            key: key.clone(),
                        }));
                    }
                    debug!(%operation, %key, "Lost the claim race, re-reading");
                }
            }
        }

        Err(IdempotencyError::InProgress {
            operation,
            key: key.to_string(),
        }
        .into())
    }

    /// Records the response of a claimed request on `conn`.
    ///
    /// Fails with `IdempotencyInProgress` when the claim was lost in the
    /// meantime, so the caller must roll its work back.
    pub async fn complete_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        claim: &Claim,
        payload: Value,
        entity: Option<(&'static str, Uuid)>,
    ) -> Result<(), OperationError> {
        let completed = self
            .store
            .complete_in(conn, claim.record_id, payload, entity, self.clock.now())
            .await
            .map_err(storage_error)?;

        if !completed {
            warn!(operation = %claim.operation, key = %claim.key, "Claim lost before completion");
            return Err(IdempotencyError::InProgress {
                operation: claim.operation,
                key: claim.key.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Gives up a claim after its work failed, freeing the key.
    pub async fn release(&self, claim: &Claim) {
        match self.store.release(claim.record_id).await {
            Ok(_) => debug!(operation = %claim.operation, key = %claim.key, "Released idempotency key"),
            Err(err) => warn!(
                operation = %claim.operation,
                key = %claim.key,
                error = %err,
                "Failed to release idempotency key; the sweeper will expire it"
            ),
        }
    }

    /// Runs `work` at most once per key.
    ///
    /// Without a key the work simply runs. With a key, an identical earlier
    /// request is replayed from its stored response; otherwise the work runs
    /// and its result is stored as soon as it returns. When the result cannot
    /// be stored the key is released rather than left IN_PROGRESS.
    pub async fn execute<T, F, Fut>(
        &self,
        organization_id: OrganizationId,
        operation: OperationType,
        key: Option<IdempotencyKey>,
        fingerprint: &str,
        work: F,
    ) -> Result<Outcome<T>, OperationError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let Some(key) = key else {
            return Ok(Outcome::fresh(work().await?, None));
        };

        let claim = match self.admit(organization_id, operation, &key, fingerprint).await? {
            Admission::Replay(payload) => {
                return Ok(Outcome::replayed(decode(payload)?, key));
            }
            Admission::Claimed(claim) => claim,
        };

        let value = match work().await {
            Ok(value) => value,
            Err(err) => {
                self.release(&claim).await;
                return Err(err);
            }
        };

        let completed = match encode(&value) {
            Ok(payload) => self.complete_in(self.store.connection(), &claim, payload, None).await,
            Err(err) => Err(err),
        };
        if let Err(err) = completed {
            error!(%operation, %key, error = %err, "Work finished but its response could not be stored");
            self.release(&claim).await;
            return Err(err);
        }

        Ok(Outcome::fresh(value, Some(key)))
    }
}

/// Serializes a response for storage.
pub fn encode<T: Serialize>(value: &T) -> Result<Value, OperationError> {
    serde_json::to_value(value).map_err(|e| IdempotencyError::Payload(e.to_string()).into())
}

/// Deserializes a stored response.
pub fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, OperationError> {
    serde_json::from_value(payload).map_err(|e| IdempotencyError::Payload(e.to_string()).into())
}
