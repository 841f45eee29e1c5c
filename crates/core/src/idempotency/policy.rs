//! What an existing record means for an incoming request.

use chrono::{DateTime, Duration, Utc};
use tesoro_shared::config::IdempotencySettings;

use super::types::{IdempotencyStatus, RecordSnapshot};

/// Shortest configurable retention window.
pub const MIN_RETENTION_HOURS: i64 = 24;
/// Longest configurable retention window.
pub const MAX_RETENTION_HOURS: i64 = 72;

/// What the gateway should do with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No record: claim the key and run the work.
    Proceed,
    /// Same request already completed: return the stored response.
    Replay,
    /// Key reused with a different request.
    Conflict,
    /// Same key still running.
    InProgress,
    /// A record exists but no longer blocks the key: replace it and run.
    Reclaim,
}

/// Retention and staleness windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdempotencyPolicy {
    /// How long a record blocks its key.
    pub retention: Duration,
    /// Age after which an IN_PROGRESS record is treated as abandoned.
    pub stale_after: Duration,
}

impl Default for IdempotencyPolicy {
    fn default() -> Self {
        Self {
            retention: Duration::hours(48),
            stale_after: Duration::minutes(5),
        }
    }
}

impl From<&IdempotencySettings> for IdempotencyPolicy {
    fn from(settings: &IdempotencySettings) -> Self {
        Self::new(settings.retention_hours, settings.stale_after_secs)
    }
}

impl IdempotencyPolicy {
    /// Creates a policy; retention is clamped to 24..=72 hours.
    #[must_use]
    pub fn new(retention_hours: i64, stale_after_secs: i64) -> Self {
        Self {
            retention: Duration::hours(retention_hours.clamp(MIN_RETENTION_HOURS, MAX_RETENTION_HOURS)),
            stale_after: Duration::seconds(stale_after_secs.max(1)),
        }
    }

    /// Decides how to handle a request carrying `fingerprint`.
    #[must_use]
    pub fn decide(&self, existing: Option<&RecordSnapshot>, fingerprint: &str, now: DateTime<Utc>) -> Decision {
        let Some(record) = existing else {
            return Decision::Proceed;
        };

        if record.expires_at <= now {
            return Decision::Reclaim;
        }

        match record.status {
            IdempotencyStatus::Failed => Decision::Reclaim,
            IdempotencyStatus::Completed if record.fingerprint == fingerprint => Decision::Replay,
            IdempotencyStatus::Completed => Decision::Conflict,
            IdempotencyStatus::InProgress if record.created_at <= self.stale_cutoff(now) => Decision::Reclaim,
            IdempotencyStatus::InProgress => Decision::InProgress,
        }
    }

    /// Expiry of a record created at `now`.
    #[must_use]
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.retention
    }

    /// IN_PROGRESS records created at or before this instant are stale.
    #[must_use]
    pub fn stale_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.stale_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-07-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn record(status: IdempotencyStatus, age: Duration) -> RecordSnapshot {
        let policy = IdempotencyPolicy::default();
        let created_at = now() - age;
        RecordSnapshot {
            status,
            fingerprint: "fp-1".to_string(),
            created_at,
            expires_at: policy.expires_at(created_at),
        }
    }

    #[rstest]
    #[case(IdempotencyStatus::Completed, "fp-1", Decision::Replay)]
    #[case(IdempotencyStatus::Completed, "fp-2", Decision::Conflict)]
    #[case(IdempotencyStatus::InProgress, "fp-1", Decision::InProgress)]
    #[case(IdempotencyStatus::InProgress, "fp-2", Decision::InProgress)]
    #[case(IdempotencyStatus::Failed, "fp-1", Decision::Reclaim)]
    fn live_records(#[case] status: IdempotencyStatus, #[case] fingerprint: &str, #[case] expected: Decision) {
        let policy = IdempotencyPolicy::default();
        let existing = record(status, Duration::seconds(30));
        assert_eq!(policy.decide(Some(&existing), fingerprint, now()), expected);
    }

    #[test]
    fn no_record_proceeds() {
        assert_eq!(IdempotencyPolicy::default().decide(None, "fp", now()), Decision::Proceed);
    }

    #[test]
    fn expired_records_do_not_block() {
        let policy = IdempotencyPolicy::default();
        let existing = record(IdempotencyStatus::Completed, Duration::hours(48));
        assert_eq!(policy.decide(Some(&existing), "fp-other", now()), Decision::Reclaim);
    }

    #[test]
    fn stale_in_progress_is_reclaimed() {
        let policy = IdempotencyPolicy::default();
        let existing = record(IdempotencyStatus::InProgress, Duration::minutes(5));
        assert_eq!(policy.decide(Some(&existing), "fp-1", now()), Decision::Reclaim);
    }

    #[rstest]
    #[case(1, 24)]
    #[case(48, 48)]
    #[case(500, 72)]
    fn retention_is_clamped(#[case] configured: i64, #[case] effective: i64) {
        let policy = IdempotencyPolicy::new(configured, 300);
        assert_eq!(policy.retention, Duration::hours(effective));
    }
}
