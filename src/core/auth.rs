//! Bearer-token issuance and validation.
//!
//! Tokens are HMAC-signed (HS256) claims carrying a subject and an expiry.
//! The validator is an explicitly constructed value — the signing secret is
//! plain configuration passed in at build time, not ambient process state —
//! so tests can run several validators with different secrets side by side.
use axum::http::{HeaderMap, StatusCode, header};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// The signed payload identifying a token's subject and expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject the token was issued to.
    pub sub: String,
    /// Expiration as a unix timestamp (seconds).
    pub exp: i64,
}

/// Authenticated subject attached to the request extensions once the auth
/// stage has admitted a request, for downstream use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSubject(pub String);

/// Authentication failures, each mapping to a fixed HTTP status and a short
/// machine-readable reason sent to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    /// The `Authorization` header was absent.
    #[error("Missing bearer token")]
    MissingToken,

    /// The token could not be parsed as a signed-claims token.
    #[error("Malformed token")]
    Malformed,

    /// The signature did not verify against the current secret.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// The token's expiry is in the past.
    #[error("Token expired")]
    Expired,

    /// Signing a new token failed.
    #[error("Token signing failed: {0}")]
    Signing(String),
}

impl AuthError {
    /// HTTP status this failure terminates the request with.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Short machine-readable reason string for the response body.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::Malformed => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "token_expired",
            AuthError::Signing(_) => "token_signing_failed",
        }
    }
}

/// Issues and verifies signed bearer tokens against a shared secret.
pub struct TokenValidator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: chrono::Duration,
}

impl TokenValidator {
    /// Build a validator from the auth configuration. The configured
    /// `token_ttl` must already have passed validation.
    pub fn new(config: &AuthConfig) -> Self {
        let token_ttl = config
            .token_ttl()
            .ok()
            .and_then(|d| chrono::Duration::from_std(d).ok())
            .unwrap_or_else(|| chrono::Duration::hours(24));

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            token_ttl,
        }
    }

    /// Issue a signed token for `subject`, expiring after the configured
    /// lifetime.
    pub fn generate(&self, subject: &str) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            exp: (Utc::now() + self.token_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify `token`'s signature against the current secret and check that
    /// its expiry lies in the future.
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            })
    }

    /// Extract and validate the bearer token from a request's headers.
    ///
    /// Absence of `Authorization` fails before any parse is attempted; a
    /// `Bearer ` prefix is stripped when present but its absence is
    /// tolerated.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let header_value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?;

        let token = header_value.to_str().map_err(|_| AuthError::Malformed)?;
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        self.validate(token)
    }
}
