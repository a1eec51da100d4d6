//! Authenticated encryption for sensitive setting values
//!
//! Uses AES-256-GCM with a random 96-bit nonce per value. The key is never
//! stored: it is rederived on every start from a stable installation
//! identifier (the database path) and an application constant through
//! PBKDF2-HMAC-SHA256. Moving the database therefore changes the key, and
//! old ciphertext fails authentication instead of decoding to garbage.
//!
//! Token layout (standard base64): `version (1) || nonce (12) || ciphertext+tag`.

use crate::error::{Error, Result};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use ring::pbkdf2;
use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;

/// Application-level constant mixed into key derivation
pub const DEFAULT_APP_SECRET: &[u8] = b"stock-analysis-secret";

/// PBKDF2 work factor
pub const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::new(100_000).unwrap();

const TOKEN_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Symmetric encrypt/decrypt of opaque strings under one derived key
#[derive(Clone)]
pub struct CryptoBox {
    cipher: Aes256Gcm,
}

impl fmt::Debug for CryptoBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoBox").finish_non_exhaustive()
    }
}

impl CryptoBox {
    /// Derive the process key from an installation identifier.
    ///
    /// The same `identifier` and `app_secret` always produce the same key;
    /// a different identifier produces a different one.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyDerivation` if the identifier is empty or the cipher
    /// cannot be initialised. Callers treat this as a startup failure.
    pub fn derive(identifier: &str, app_secret: &[u8]) -> Result<Self> {
        if identifier.is_empty() {
            return Err(Error::KeyDerivation(
                "installation identifier must not be empty".into(),
            ));
        }
        if app_secret.is_empty() {
            return Err(Error::KeyDerivation(
                "application secret must not be empty".into(),
            ));
        }

        let mut key = [0u8; 32];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            PBKDF2_ITERATIONS,
            identifier.as_bytes(),
            app_secret,
            &mut key,
        );
        Self::from_key(&key)
    }

    /// Derive the key for a database file path
    ///
    /// # Errors
    ///
    /// See [`CryptoBox::derive`].
    pub fn for_database(path: &Path, app_secret: &[u8]) -> Result<Self> {
        Self::derive(&path.to_string_lossy(), app_secret)
    }

    /// Build from raw key material
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyDerivation` if the key is rejected by the cipher.
    pub fn from_key(key: &[u8; 32]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| Error::KeyDerivation("invalid key length".into()))?;
        Ok(Self { cipher })
    }

    /// Encrypt a plaintext value into a self-contained token
    ///
    /// # Errors
    ///
    /// Returns `Error::Encryption` if the AEAD rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::rng().random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| Error::Encryption(e.to_string()))?;

        let mut token = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
        token.push(TOKEN_VERSION);
        token.extend_from_slice(&nonce_bytes);
        token.extend_from_slice(&sealed);
        Ok(BASE64.encode(token))
    }

    /// Decrypt a token produced by [`CryptoBox::encrypt`]
    ///
    /// # Errors
    ///
    /// Returns `Error::DecryptionFailed` for malformed tokens, tokens sealed
    /// under a different key, or tampered ciphertext.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let rejected = || Error::DecryptionFailed { key: None };

        let raw = BASE64.decode(ciphertext.trim()).map_err(|_| rejected())?;
        if raw.len() < 1 + NONCE_LEN + TAG_LEN || raw[0] != TOKEN_VERSION {
            return Err(rejected());
        }

        let (nonce_bytes, sealed) = raw[1..].split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| rejected())?;

        String::from_utf8(plaintext).map_err(|_| rejected())
    }
}
