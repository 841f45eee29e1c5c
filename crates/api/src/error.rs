//! Error responses.
//!
//! Every failure is rendered as `{ "error", "message", "details" }` with the
//! status the error itself declares. Variants are matched, never messages.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tesoro_core::OperationError;
use tesoro_core::idempotency::IdempotencyError;
use tesoro_shared::{AppError, JwtError};
use tracing::{debug, error};

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// A failed financial operation.
    Operation(OperationError),
    /// A failure outside the operation taxonomy.
    App(AppError),
    /// The bearer token was rejected.
    Token(JwtError),
}

impl ApiError {
    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        let code = match self {
            Self::Operation(e) => e.http_status_code(),
            Self::App(e) => e.status_code(),
            Self::Token(JwtError::Encoding(_)) => 500,
            Self::Token(_) => 401,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Operation(e) => e.error_code(),
            Self::App(e) => e.error_code(),
            Self::Token(e) => e.error_code(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Operation(OperationError::Storage { .. }) | Self::App(AppError::Database(_) | AppError::Internal(_)) => {
                "An internal error occurred".to_string()
            }
            Self::Operation(e) => e.to_string(),
            Self::App(e) => e.to_string(),
            Self::Token(JwtError::Expired) => "Token has expired".to_string(),
            Self::Token(_) => "Invalid or malformed token".to_string(),
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::Operation(e) => e.details().unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        Self::Operation(err)
    }
}

impl From<IdempotencyError> for ApiError {
    fn from(err: IdempotencyError) -> Self {
        Self::Operation(err.into())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        Self::Token(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = ?self, "Request failed");
        } else {
            debug!(code = self.code(), status = status.as_u16(), "Request rejected");
        }

        let body = json!({
            "error": self.code(),
            "message": self.message(),
            "details": self.details(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tesoro_core::idempotency::OperationType;
    use tesoro_core::ledger::LedgerError;

    #[rstest]
    #[case(ApiError::from(OperationError::from(LedgerError::InvalidAmount { amount: dec!(-1) })), 400, "INVALID_AMOUNT")]
    #[case(ApiError::from(IdempotencyError::InProgress { operation: OperationType::ConfirmSale, key: "k".into() }), 409, "IDEMPOTENCY_IN_PROGRESS")]
    #[case(ApiError::from(AppError::Unauthorized("no token".into())), 401, "UNAUTHORIZED")]
    #[case(ApiError::from(JwtError::Expired), 401, "TOKEN_EXPIRED")]
    #[case(ApiError::from(OperationError::Storage { message: "deadlock".into(), transient: true }), 503, "STORAGE_ERROR")]
    fn status_and_code(#[case] err: ApiError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status().as_u16(), status);
        assert_eq!(err.code(), code);
    }

    #[test]
    fn storage_messages_are_not_leaked() {
        let err = ApiError::from(OperationError::Storage {
            message: "relation \"movements\" does not exist".into(),
            transient: false,
        });
        assert_eq!(err.message(), "An internal error occurred");
    }

    #[test]
    fn details_come_from_the_operation_error() {
        let err = ApiError::from(OperationError::from(LedgerError::InvalidAmount { amount: dec!(0) }));
        assert_eq!(err.details(), json!({ "amount": "0" }));
        assert_eq!(ApiError::from(JwtError::Expired).details(), Value::Null);
    }
}
