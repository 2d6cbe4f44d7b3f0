use crate::error::ApiError;
use crate::models::Claims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// TTL used when a caller does not pick one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token carries no subject")]
    MissingSubject,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Issues and checks signed, time-limited bearer tokens.
///
/// Stateless: validity depends only on the signing key, the payload and the
/// clock. There is no revocation list.
pub struct TokenService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            default_ttl: DEFAULT_TTL,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject, ttl, now())
    }

    pub fn issue_default(&self, subject: &str) -> Result<String, TokenError> {
        self.issue(subject, self.default_ttl)
    }

    pub fn issue_at(&self, subject: &str, ttl: Duration, now: i64) -> Result<String, TokenError> {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: Some(subject.to_owned()),
            exp: now.saturating_add(ttl_secs),
        };

        debug!(subject, exp = claims.exp, "issuing token");

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Returns the token's subject if the signature verifies and it has not expired.
    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        self.validate_at(token, now())
    }

    pub fn validate_at(&self, token: &str, now: i64) -> Result<String, TokenError> {
        // Expiry is checked below against `now` so tests can move the clock;
        // `exp` is still required to be present.
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if claims.exp <= now {
            return Err(TokenError::Expired);
        }

        claims.sub.ok_or(TokenError::MissingSubject)
    }
}

/// Credential check guarding protected endpoints.
///
/// A request without a usable `Authorization: Bearer` header fails with
/// `MissingToken`; one whose token does not validate fails with `InvalidToken`.
pub fn authenticate_bearer(tokens: &TokenService, token: Option<&str>) -> Result<String, ApiError> {
    let token = token.ok_or(ApiError::MissingToken)?;
    tokens.validate(token).map_err(|e| {
        warn!(reason = %e, "rejected bearer token");
        ApiError::InvalidToken(e)
    })
}

/// Token from an `Authorization` value whose scheme is `bearer` in any case.
pub fn parse_bearer(value: &str) -> Option<String> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
