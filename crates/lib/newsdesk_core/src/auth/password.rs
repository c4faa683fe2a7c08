//! Password hashing via bcrypt, plus verification of legacy records.

use tracing::warn;

use super::AuthError;
use super::cipher::{LEGACY_PREFIX, SecretCipher, constant_time_eq};

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Outcome of checking a submitted password against a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    /// Matched a bcrypt hash.
    Valid,
    /// Matched a legacy cipher-text record; the caller should re-hash it.
    ValidLegacy,
    Invalid,
}

/// Hash a password with bcrypt (cost 10).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
}

/// Check `submitted` against a stored password record.
///
/// Legacy records need `cipher`; without it they never match.
pub fn check_credential(
    submitted: &str,
    stored: &str,
    cipher: Option<&SecretCipher>,
) -> Result<CredentialCheck, AuthError> {
    let Some(sealed) = stored.strip_prefix(LEGACY_PREFIX) else {
        return Ok(if verify_password(submitted, stored)? {
            CredentialCheck::Valid
        } else {
            CredentialCheck::Invalid
        });
    };

    let Some(cipher) = cipher else {
        warn!("legacy credential present but no cipher key configured");
        return Ok(CredentialCheck::Invalid);
    };

    match cipher.decrypt(sealed) {
        Ok(plain) if constant_time_eq(plain.as_bytes(), submitted.as_bytes()) => {
            Ok(CredentialCheck::ValidLegacy)
        }
        Ok(_) => Ok(CredentialCheck::Invalid),
        Err(e) => {
            warn!(error = %e, "legacy credential could not be decrypted");
            Ok(CredentialCheck::Invalid)
        }
    }
}
