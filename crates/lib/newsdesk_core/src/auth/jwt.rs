//! JWT token generation and verification.
//!
//! Tokens are HS256-signed and carry only the principal id plus `iat`/`exp`.
//! Access and refresh tokens share the signing key and differ only in
//! lifetime. Verification is stateless: a token is valid iff its signature
//! checks out and the current time is strictly before `exp`.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Minimum accepted length of the signing secret, in characters.
pub const MIN_SECRET_LEN: usize = 32;

/// Default access token lifetime.
pub const DEFAULT_ACCESS_LIFETIME: &str = "7d";

/// Default refresh token lifetime.
pub const DEFAULT_REFRESH_LIFETIME: &str = "30d";

/// Which of the two token flavors to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Configured token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::days(7),
            refresh: Duration::days(30),
        }
    }
}

impl TokenLifetimes {
    /// Parse both lifetimes from `<n><unit>` strings (see [`parse_lifetime`]).
    pub fn parse(access: &str, refresh: &str) -> Result<Self, AuthError> {
        Ok(Self {
            access: parse_lifetime(access)?,
            refresh: parse_lifetime(refresh)?,
        })
    }

    fn for_kind(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access,
            TokenKind::Refresh => self.refresh,
        }
    }
}

/// Parse a lifetime such as `7d`, `12h`, `15m`, `90s`, `2w` or a bare number
/// of seconds. Zero and negative lifetimes are rejected.
pub fn parse_lifetime(raw: &str) -> Result<Duration, AuthError> {
    let raw = raw.trim();
    let invalid = || AuthError::Config(format!("invalid token lifetime '{raw}'"));

    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        Some(_) => (raw, 's'),
        None => return Err(invalid()),
    };
    let amount: i64 = digits.parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let seconds_per_unit = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        'w' => 7 * 24 * 60 * 60,
        _ => return Err(invalid()),
    };
    amount
        .checked_mul(seconds_per_unit)
        .and_then(Duration::try_seconds)
        .ok_or_else(invalid)
}

/// Issues and verifies signed bearer tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetimes: TokenLifetimes,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetimes", &self.lifetimes)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service. Fails when the secret is shorter than
    /// [`MIN_SECRET_LEN`] characters; callers treat this as fatal at startup.
    pub fn new(secret: &str, lifetimes: TokenLifetimes) -> Result<Self, AuthError> {
        if secret.chars().count() < MIN_SECRET_LEN {
            return Err(AuthError::Config(format!(
                "JWT secret is missing or shorter than {MIN_SECRET_LEN} characters"
            )));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetimes,
        })
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Issue a short-lived access token.
    pub fn issue_access_token(&self, principal_id: Uuid) -> Result<String, AuthError> {
        self.issue_at(principal_id, TokenKind::Access, Utc::now())
    }

    /// Issue a long-lived refresh token.
    pub fn issue_refresh_token(&self, principal_id: Uuid) -> Result<String, AuthError> {
        self.issue_at(principal_id, TokenKind::Refresh, Utc::now())
    }

    /// Issue a token as if the current time were `issued_at`.
    pub fn issue_at(
        &self,
        principal_id: Uuid,
        kind: TokenKind,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let iat = issued_at.timestamp();
        let exp = iat
            .checked_add(self.lifetimes.for_kind(kind).num_seconds())
            .ok_or_else(|| AuthError::TokenError("token expiry out of range".into()))?;
        let claims = TokenClaims {
            id: principal_id,
            iat,
            exp,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))
    }

    /// Verify a token and return the principal id it was issued for.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token against an explicit clock reading.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, AuthError> {
        // Expiry is checked below so the boundary is exclusive and no leeway applies.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => "invalid signature".to_string(),
                    ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) => {
                        "malformed token".to_string()
                    }
                    ErrorKind::InvalidAlgorithm => "unexpected signing algorithm".to_string(),
                    _ => format!("jwt decode: {e}"),
                };
                AuthError::TokenError(reason)
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::TokenError("token expired".into()));
        }
        Ok(claims.id)
    }
}
