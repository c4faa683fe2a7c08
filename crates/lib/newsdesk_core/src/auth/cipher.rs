//! AES-256-GCM cipher for reversible secrets.
//!
//! Passwords used to be stored as reversible cipher text. They are now
//! bcrypt-hashed; this cipher only remains so legacy `enc:` records can be
//! checked once and upgraded on the next successful login.
//!
//! Output is base64-encoded `nonce || ciphertext || tag`.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::AuthError;

/// Prefix marking a stored password as legacy cipher text.
pub const LEGACY_PREFIX: &str = "enc:";

/// Nonce size for AES-256-GCM (12 bytes).
const NONCE_SIZE: usize = 12;
/// GCM tag size (16 bytes).
const TAG_SIZE: usize = 16;

/// Symmetric cipher keyed by a single process-wide passphrase.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretCipher(..)")
    }
}

impl SecretCipher {
    /// Derive a 256-bit key from `passphrase` with SHA-256.
    pub fn new(passphrase: &str) -> Result<Self, AuthError> {
        if passphrase.is_empty() {
            return Err(AuthError::Config("cipher key must not be empty".into()));
        }
        let key = Sha256::digest(passphrase.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AuthError::Cipher(format!("key init failed: {e}")))?;
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext` with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AuthError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AuthError::Cipher(format!("encryption failed: {e}")))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(&combined))
    }

    /// Decrypt base64-encoded `nonce || ciphertext || tag`.
    pub fn decrypt(&self, encrypted_b64: &str) -> Result<String, AuthError> {
        let combined = STANDARD
            .decode(encrypted_b64)
            .map_err(|e| AuthError::Cipher(format!("base64 decode failed: {e}")))?;

        if combined.len() < NONCE_SIZE + TAG_SIZE {
            return Err(AuthError::Cipher("ciphertext too short".into()));
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| AuthError::Cipher(format!("decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|e| AuthError::Cipher(format!("utf-8 decode failed: {e}")))
    }

    /// Produce a legacy-format stored password (`enc:` + cipher text).
    pub fn seal_legacy(&self, plaintext: &str) -> Result<String, AuthError> {
        Ok(format!("{LEGACY_PREFIX}{}", self.encrypt(plaintext)?))
    }
}

/// Compare two byte strings without short-circuiting on the first mismatch.
/// Inputs are digested first so the running time does not depend on their
/// lengths either.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let a = Sha256::digest(a);
    let b = Sha256::digest(b);
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
