//! Principal and token domain models.
//!
//! These are internal domain models; the API layer serializes `Principal`
//! directly but never exposes `PrincipalWithPassword`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Principal role. The set is closed: anything else read from storage or
/// submitted by a client is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Role; 3] = [Role::User, Role::Moderator, Role::Admin];

    /// Database and wire text representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Moderator => "Moderator",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role string is not one of `User`, `Moderator`, `Admin`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Domain principal (a registered user). Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Principal with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct PrincipalWithPassword {
    pub principal: Principal,
    /// bcrypt hash, or a legacy `enc:`-prefixed cipher text.
    pub password_hash: String,
}

/// Insert payload for a new principal.
#[derive(Debug, Clone)]
pub struct NewPrincipal {
    pub name: String,
    /// Already normalized (trimmed, lowercase).
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal id.
    pub id: Uuid,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}
