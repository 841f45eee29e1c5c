//! Mapping of driver errors into the core error taxonomy.

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tesoro_core::OperationError;

/// Postgres SQLSTATEs worth one immediate retry: serialization failure,
/// deadlock, lock not available.
const TRANSIENT_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// Wraps a driver error, classifying it as transient or not.
pub fn storage_error(err: DbErr) -> OperationError {
    let transient = is_transient(&err);
    OperationError::Storage {
        message: err.to_string(),
        transient,
    }
}

/// True when `err` is a unique constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// True for deadlocks, serialization failures, lock timeouts and pool exhaustion.
pub fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db| db.code())
            .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&&*code)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_errors_are_not_transient() {
        let err = DbErr::Custom("boom".to_string());
        assert!(!is_transient(&err));
        assert!(!is_unique_violation(&err));

        let mapped = storage_error(err);
        assert_eq!(mapped.http_status_code(), 500);
        assert!(!mapped.is_transient());
    }

    #[test]
    fn record_not_found_is_not_transient() {
        assert!(!is_transient(&DbErr::RecordNotFound("x".to_string())));
    }
}
