//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{HeaderName, request::Parts},
};
use tesoro_core::idempotency::{IdempotencyError, IdempotencyKey};

use crate::error::ApiError;

/// Request header carrying the client's idempotency key.
pub static IDEMPOTENCY_KEY: HeaderName = HeaderName::from_static("idempotency-key");

/// Response header telling whether the body was served from a stored record.
pub static IDEMPOTENCY_REPLAYED: HeaderName = HeaderName::from_static("idempotency-replayed");

/// The validated `Idempotency-Key` header; `None` when absent or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyHeader(pub Option<IdempotencyKey>);

impl<S> FromRequestParts<S> for IdempotencyHeader
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = match parts.headers.get(&IDEMPOTENCY_KEY) {
            None => None,
            Some(value) => Some(value.to_str().map_err(|_| IdempotencyError::InvalidKey {
                reason: "not valid visible ASCII".to_string(),
            })?),
        };

        Ok(Self(IdempotencyKey::parse(raw)?))
    }
}
