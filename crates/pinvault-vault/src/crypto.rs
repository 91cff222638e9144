//! Vault cryptography: AES-256-GCM for stored passwords, Argon2id for the
//! master PIN, and CSPRNG helpers.
//!
//! - **Encryption/decryption**: [`Cipher`] seals each password under the
//!   static vault key with a fresh random 96-bit IV. IV and ciphertext are
//!   returned base64-encoded, ready for the `password_entries` text columns.
//! - **PIN hashing**: [`hash_pin`] / [`verify_pin`] produce and check PHC
//!   strings (`$argon2id$v=19$...`). Hashes written by other Argon2id
//!   implementations verify as long as they use the PHC format.
//! - **Random generation**: session tokens and fresh vault keys.
//!
//! # Security Notes
//!
//! - A 4-digit PIN has 10,000 possible values. Argon2id slows each guess but
//!   cannot stop an offline search if the stored hash is exfiltrated; online
//!   guessing is bounded by the login rate limit only.
//! - Any decryption failure is an error. Callers decide how to present it.

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use ring::aead::{
    self, Aad, BoundKey, NONCE_LEN, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey,
};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::error::{Result, VaultError};

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the per-record IV (GCM nonce) in bytes.
pub const IV_LEN: usize = NONCE_LEN;

/// Length of the Argon2id salt in bytes.
const SALT_LEN: usize = 16;

/// Random bytes behind each session token.
const SESSION_TOKEN_LEN: usize = 32;

static AEAD_ALG: &aead::Algorithm = &aead::AES_256_GCM;

// ---------------------------------------------------------------------------
// Nonce handling
// ---------------------------------------------------------------------------

/// Yields exactly one nonce, then errors, so a key bound to it seals once.
struct SingleNonce(Option<[u8; IV_LEN]>);

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

/// A password sealed for storage. Both fields are standard base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: String,
    pub ciphertext: String,
}

/// AES-256-GCM under the static vault key.
pub struct Cipher {
    key: Zeroizing<[u8; KEY_LEN]>,
    rng: SystemRandom,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("key", &"<redacted>").finish()
    }
}

impl Cipher {
    /// Build a cipher from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] unless `key` is exactly [`KEY_LEN`]
    /// bytes.
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            VaultError::crypto(format!("key must be {KEY_LEN} bytes, got {}", key.len()))
        })?;
        Ok(Self {
            key: Zeroizing::new(key),
            rng: SystemRandom::new(),
        })
    }

    /// Build a cipher from a base64-encoded key (the configured form).
    pub fn from_base64_key(encoded: &str) -> Result<Self> {
        let raw = Zeroizing::new(
            BASE64
                .decode(encoded.trim())
                .map_err(|e| VaultError::crypto(format!("key is not valid base64: {e}")))?,
        );
        Self::new(&raw)
    }

    /// Encrypt `plaintext` with a fresh random IV.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] if the CSPRNG or `ring` fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<Sealed> {
        let mut iv = [0u8; IV_LEN];
        self.rng
            .fill(&mut iv)
            .map_err(|_| VaultError::crypto("failed to generate random IV"))?;

        let unbound = UnboundKey::new(AEAD_ALG, &self.key[..])
            .map_err(|_| VaultError::crypto("failed to create AES-256-GCM key"))?;
        let mut sealing_key = SealingKey::new(unbound, SingleNonce(Some(iv)));

        // `ring` encrypts in place and appends the 16-byte tag.
        let mut in_out = plaintext.as_bytes().to_vec();
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::crypto("seal_in_place failed"))?;

        tracing::trace!(
            plaintext_len = plaintext.len(),
            ciphertext_len = in_out.len(),
            "encrypted password"
        );

        Ok(Sealed {
            iv: BASE64.encode(iv),
            ciphertext: BASE64.encode(in_out),
        })
    }

    /// Decrypt a stored `ciphertext` with its `iv` (both base64).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Crypto`] on bad encoding, a wrong IV length, a
    /// failed tag check (wrong key or tampered data) or non-UTF-8 plaintext.
    pub fn decrypt(&self, ciphertext: &str, iv: &str) -> Result<String> {
        let iv: [u8; IV_LEN] = BASE64
            .decode(iv)
            .map_err(|e| VaultError::crypto(format!("IV is not valid base64: {e}")))?
            .try_into()
            .map_err(|bytes: Vec<u8>| {
                VaultError::crypto(format!("IV must be {IV_LEN} bytes, got {}", bytes.len()))
            })?;
        let mut in_out = BASE64
            .decode(ciphertext)
            .map_err(|e| VaultError::crypto(format!("ciphertext is not valid base64: {e}")))?;

        let unbound = UnboundKey::new(AEAD_ALG, &self.key[..])
            .map_err(|_| VaultError::crypto("failed to create AES-256-GCM key"))?;
        let mut opening_key = OpeningKey::new(unbound, SingleNonce(Some(iv)));

        let plaintext = opening_key
            .open_in_place(Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::crypto("authentication failed: wrong key or corrupted data"))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| VaultError::crypto("decrypted password is not valid UTF-8"))
    }
}

// ---------------------------------------------------------------------------
// PIN hashing
// ---------------------------------------------------------------------------

/// Hash `pin` with Argon2id (default parameters, random salt) into a PHC
/// string.
pub fn hash_pin(pin: &str) -> Result<String> {
    let salt_bytes = random_bytes(SALT_LEN)?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| VaultError::crypto(format!("failed to encode salt: {e}")))?;

    let hash = Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| VaultError::crypto(format!("Argon2id hashing failed: {e}")))?;

    Ok(hash.to_string())
}

/// Check `pin` against a stored PHC hash. A malformed hash never verifies.
pub fn verify_pin(pin: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored PIN hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}

// ---------------------------------------------------------------------------
// Random values
// ---------------------------------------------------------------------------

/// Generate `len` cryptographically secure random bytes.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| VaultError::crypto("failed to generate random bytes"))?;
    Ok(buf)
}

/// A new unguessable session id (URL-safe base64, 256 bits).
pub fn session_token() -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(random_bytes(SESSION_TOKEN_LEN)?))
}

/// A new vault encryption key in its configured (base64) form.
pub fn generate_key() -> Result<String> {
    let key = Zeroizing::new(random_bytes(KEY_LEN)?);
    Ok(BASE64.encode(key.as_slice()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
