//! Responses for idempotent operations.

use axum::{
    Json,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tesoro_core::idempotency::Outcome;

use crate::extractors::{IDEMPOTENCY_KEY, IDEMPOTENCY_REPLAYED};

/// Renders an operation outcome with its idempotency headers.
///
/// A replay answers with the same status and body as the original call.
pub fn idempotent<T: Serialize>(status: StatusCode, outcome: Outcome<T>) -> Response {
    let mut response = (status, Json(outcome.value)).into_response();
    let headers = response.headers_mut();

    headers.insert(
        IDEMPOTENCY_REPLAYED.clone(),
        HeaderValue::from_static(if outcome.replayed { "true" } else { "false" }),
    );
    if let Some(value) = outcome
        .idempotency_key
        .and_then(|key| HeaderValue::from_str(key.as_str()).ok())
    {
        headers.insert(IDEMPOTENCY_KEY.clone(), value);
    }

    response
}
