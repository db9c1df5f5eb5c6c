//! # Key Derivation Functions
//!
//! Turns the two user secrets (unlock PIN, recovery phrase) into store keys
//! and stable record identifiers.
//!
//! ## Derivation Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      KEY DERIVATION HIERARCHY                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  User Secret (PIN or recovery phrase, any non-empty string)             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Argon2id (default params: m=19 MiB, t=2, p=1)                  │   │
//! │  │                                                                 │   │
//! │  │  password = secret                                              │   │
//! │  │  salt     = per-installation 16-byte random salt                │   │
//! │  │                                                                 │   │
//! │  │  → 32-byte intermediate key material                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │                                ▼                                        │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  HKDF-SHA256(ikm, info = "vesper-store-key-v1")                 │   │
//! │  │                                                                 │   │
//! │  │  → 32-byte AES-256-GCM store key                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Separately, for record identity (no key material involved):            │
//! │                                                                         │
//! │  User Secret ──► SHA-256 ──► hex string (stable across installations)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Choices
//!
//! | Aspect | Choice | Rationale |
//! |--------|--------|-----------|
//! | Password KDF | Argon2id | Memory-hard; offline guessing of a short PIN must be slow |
//! | Salt | 16 random bytes, per installation | Same PIN on two devices yields unrelated keys |
//! | Salt location | Sidecar file next to the stores | Must be readable before either store can open |
//! | Expansion | HKDF with "-v1" info string | Domain separation and room for algorithm upgrades |
//! | Record ids | Unsalted SHA-256 hex | Identifiers must survive a device migration |
//!
//! ## Security
//!
//! Neither the input secret nor any derived key is ever logged. The salt is
//! not secret; its only job is making derived keys installation-specific.

use std::path::Path;

use argon2::Argon2;
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::keys::{EncryptionKey, SecretKind, KEY_SIZE};
use crate::error::{Error, Result, StoreOpenError};

/// Size of the per-installation KDF salt in bytes
pub const SALT_SIZE: usize = 16;

/// Domain separation strings for HKDF
///
/// These ensure that keys derived for different purposes are cryptographically
/// independent, even when derived from the same secret.
pub mod domain {
    /// Domain for store key derivation
    pub const STORE_KEY: &[u8] = b"vesper-store-key-v1";
}

/// Per-installation KDF salt
///
/// Generated once when the vault is created, then persisted in a plaintext
/// sidecar file *next to* the encrypted stores (never inside them — it has
/// to be readable before either store can open). Immutable thereafter:
/// regenerating it would silently re-key every derived key and make the
/// existing stores undecryptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfSalt([u8; SALT_SIZE]);

impl KdfSalt {
    /// Generate a fresh random salt from the OS RNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from existing bytes
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw salt bytes
    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }

    /// Load the salt from its sidecar file
    ///
    /// ## Errors
    ///
    /// - `NotFound` if the file does not exist (the vault was never created)
    /// - `StoreOpen(Corrupt)` if the file has the wrong length
    /// - `StoreOpen(IoFailure)` for any other I/O error
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("KDF salt at {}", path.display()))
            } else {
                Error::StoreOpen(StoreOpenError::IoFailure(format!(
                    "Failed to read salt file: {}",
                    e
                )))
            }
        })?;

        let bytes: [u8; SALT_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            Error::StoreOpen(StoreOpenError::Corrupt(format!(
                "Salt file has wrong length (expected {} bytes)",
                SALT_SIZE
            )))
        })?;

        Ok(Self(bytes))
    }

    /// Write the salt to its sidecar file (atomic replace + fsync)
    pub fn persist(&self, path: &Path) -> Result<()> {
        crate::storage::atomic_write_file(path, &self.0)
            .map_err(|e| Error::WriteError(format!("Failed to persist salt file: {}", e)))
    }

    /// Load the salt if present, otherwise generate and persist a new one
    ///
    /// Returns the salt and whether this call created the file, so a failing
    /// composite flow knows whether rollback owns it.
    pub fn load_or_generate(path: &Path) -> Result<(Self, bool)> {
        match Self::load(path) {
            Ok(salt) => Ok((salt, false)),
            Err(Error::NotFound(_)) => {
                let salt = Self::generate();
                salt.persist(path)?;
                Ok((salt, true))
            }
            Err(e) => Err(e),
        }
    }
}

/// Derive a store encryption key from a user secret
///
/// Deliberately slow: the whole point is that brute-forcing a short PIN
/// against a stolen store file costs real time per guess.
///
/// ## Parameters
///
/// - `secret`: PIN or recovery phrase (any non-empty string)
/// - `salt`: the installation's [`KdfSalt`]
/// - `kind`: which secret this is, carried on the key as metadata
///
/// ## Errors
///
/// `InvalidSecret` for an empty secret; `KeyDerivationFailed` if the KDF
/// internals fail (parameter misuse, never input-dependent).
pub fn derive_key(secret: &str, salt: &KdfSalt, kind: SecretKind) -> Result<EncryptionKey> {
    if secret.is_empty() {
        return Err(Error::InvalidSecret);
    }

    // Slow, memory-hard step
    let mut ikm = Zeroizing::new([0u8; KEY_SIZE]);
    Argon2::default()
        .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut ikm[..])
        .map_err(|e| Error::KeyDerivationFailed(format!("Argon2 failed: {}", e)))?;

    // Domain-separated expansion to the store key
    let hkdf = Hkdf::<Sha256>::new(None, &ikm[..]);
    let mut key_bytes = [0u8; KEY_SIZE];
    hkdf.expand(domain::STORE_KEY, &mut key_bytes)
        .map_err(|_| Error::KeyDerivationFailed("HKDF expansion failed".into()))?;

    let key = EncryptionKey::from_bytes(key_bytes, kind);
    key_bytes.zeroize();

    Ok(key)
}

/// Derive a stable record identifier from a user secret
///
/// Fast and unsalted: the identifier must be reproducible on any device
/// that knows the secret. It is an identity, not a key — never use the
/// output as key material.
pub fn derive_id(secret: &str) -> Result<String> {
    if secret.is_empty() {
        return Err(Error::InvalidSecret);
    }

    let digest = Sha256::digest(secret.as_bytes());
    Ok(hex::encode(digest))
}

// ============================================================================
// TESTS
// ============================================================================
