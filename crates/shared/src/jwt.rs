//! Bearer token verification.
//!
//! Tokens are minted by the identity service. Tesoro only verifies them
//! and reads the principal (user + organization) out of the claims.
//! `issue_token` exists for local tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Claims;

/// JWT verification settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: String,
    /// Clock skew tolerated when checking `exp`, in seconds.
    pub leeway_secs: u64,
    /// Lifetime of tokens minted by `issue_token`, in minutes.
    pub issued_token_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            leeway_secs: 30,
            issued_token_minutes: 15,
        }
    }
}

/// Errors that can occur while handling a bearer token.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    Encoding(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token signature or structure is invalid.
    #[error("invalid token: {0}")]
    Invalid(String),
}

impl JwtError {
    /// Machine-readable code rendered by the API.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "TOKEN_ENCODING_FAILED",
            Self::Expired => "TOKEN_EXPIRED",
            Self::Invalid(_) => "INVALID_TOKEN",
        }
    }
}

/// Verifies bearer tokens.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("leeway_secs", &self.config.leeway_secs)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a verifier for the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Mints a token for the given principal.
    pub fn issue_token(&self, user_id: Uuid, org_id: Uuid, role: &str) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::minutes(self.config.issued_token_minutes);
        let claims = Claims::new(user_id, org_id, role, expires_at);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Verifies the signature and expiry of a token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::default();
        validation.leeway = self.config.leeway_secs;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> JwtService {
        JwtService::new(JwtConfig {
            secret: secret.to_string(),
            ..JwtConfig::default()
        })
    }

    #[test]
    fn issued_token_round_trips_principal() {
        let svc = service("treasury-secret");
        let user_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();

        let token = svc.issue_token(user_id, org_id, "treasurer").unwrap();
        let claims = svc.validate_token(&token).unwrap();

        assert_eq!(claims.user_id().into_inner(), user_id);
        assert_eq!(claims.organization_id().into_inner(), org_id);
        assert_eq!(claims.role, "treasurer");
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = service("one")
            .issue_token(Uuid::new_v4(), Uuid::new_v4(), "clerk")
            .unwrap();

        let err = service("two").validate_token(&token).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TOKEN");
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let svc = JwtService::new(JwtConfig {
            secret: "s".to_string(),
            leeway_secs: 0,
            issued_token_minutes: -5,
        });
        let token = svc.issue_token(Uuid::new_v4(), Uuid::new_v4(), "clerk").unwrap();

        assert!(matches!(svc.validate_token(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn garbage_is_invalid() {
        assert!(service("s").validate_token("invalid.token.here").is_err());
    }
}
