//! Authentication primitives.
//!
//! Provides token issuance/verification, password hashing and the legacy
//! credential cipher. Nothing here performs I/O; store lookups live in the
//! API services.

pub mod cipher;
pub mod jwt;
pub mod password;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
