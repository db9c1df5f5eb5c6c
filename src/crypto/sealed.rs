//! # Sealed Snapshot Codec
//!
//! Whole-store authenticated encryption. Each store persists as a single
//! sealed blob; opening it with the wrong key fails deterministically at the
//! AEAD tag check instead of yielding garbage records.
//!
//! ## File Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SEALED SNAPSHOT LAYOUT                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────┬─────────┬──────────────┬──────────────────────────────┐  │
//! │  │  magic   │ version │    nonce     │  AES-256-GCM ciphertext      │  │
//! │  │ 8 bytes  │ 1 byte  │   12 bytes   │  (payload + 16-byte tag)     │  │
//! │  │"VSPVAULT"│  0x01   │ random/write │                              │  │
//! │  └──────────┴─────────┴──────────────┴──────────────────────────────┘  │
//! │                                                                         │
//! │  AAD = magic ‖ version ‖ store kind label                               │
//! │                                                                         │
//! │  The AAD binds the ciphertext to its store kind, so a seed.vault file   │
//! │  renamed to main.vault (or vice versa) can never authenticate.          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Semantics
//!
//! | Condition | Reported as |
//! |-----------|-------------|
//! | Short file / bad magic / unknown version | `StoreOpen(Corrupt)` |
//! | Tag mismatch (wrong key, tampering, kind swap) | `StoreOpen(WrongKey)` |
//!
//! A GCM tag failure cannot distinguish a wrong key from a flipped ciphertext
//! bit; both surface as `WrongKey`.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;

use crate::crypto::keys::EncryptionKey;
use crate::error::{Error, Result, StoreOpenError};

/// Magic bytes identifying a sealed vault file
pub const MAGIC: &[u8; 8] = b"VSPVAULT";

/// Current sealed snapshot format version
pub const FORMAT_VERSION: u8 = 1;

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes (128 bits)
pub const TAG_SIZE: usize = 16;

/// Bytes preceding the ciphertext: magic + version + nonce
const HEADER_SIZE: usize = MAGIC.len() + 1 + NONCE_SIZE;

/// Which store a sealed blob belongs to
///
/// Mixed into the AAD so the two store files are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// The single-record recovery phrase container
    Seed,
    /// The multi-record application database
    Main,
}

impl StoreKind {
    fn label(self) -> &'static [u8] {
        match self {
            StoreKind::Seed => b"seed-store",
            StoreKind::Main => b"main-store",
        }
    }

    fn aad(self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(MAGIC.len() + 1 + self.label().len());
        aad.extend_from_slice(MAGIC);
        aad.push(FORMAT_VERSION);
        aad.extend_from_slice(self.label());
        aad
    }
}

/// A nonce (number used once) for the sealing cipher
///
/// Freshly random for every seal. Random 96-bit nonces are safe far beyond
/// the write rate of a store that re-seals on each transaction.
struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// Seal a store snapshot under the given key
///
/// Produces the full on-disk byte layout (header + ciphertext). A fresh
/// nonce is drawn per call, so sealing the same plaintext twice yields
/// different bytes.
pub fn seal(key: &EncryptionKey, kind: StoreKind, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = Nonce::random();
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::WriteError(format!("Invalid sealing key: {}", e)))?;

    let aad = kind.aad();
    let ciphertext = cipher
        .encrypt(
            AesNonce::from_slice(&nonce.0),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| Error::WriteError(format!("Failed to seal store snapshot: {}", e)))?;

    let mut sealed = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    sealed.extend_from_slice(MAGIC);
    sealed.push(FORMAT_VERSION);
    sealed.extend_from_slice(&nonce.0);
    sealed.extend_from_slice(&ciphertext);

    Ok(sealed)
}

/// Open a sealed store snapshot
///
/// ## Errors
///
/// - `StoreOpen(Corrupt)` — structural damage: short file, bad magic,
///   unknown version
/// - `StoreOpen(WrongKey)` — GCM authentication failed: wrong key, tampered
///   ciphertext, or a blob of the other store kind
pub fn open(key: &EncryptionKey, kind: StoreKind, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < HEADER_SIZE + TAG_SIZE {
        return Err(Error::StoreOpen(StoreOpenError::Corrupt(
            "Sealed file is truncated".into(),
        )));
    }

    if &sealed[..MAGIC.len()] != MAGIC {
        return Err(Error::StoreOpen(StoreOpenError::Corrupt(
            "Bad magic bytes".into(),
        )));
    }

    let version = sealed[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(Error::StoreOpen(StoreOpenError::Corrupt(format!(
            "Unsupported format version {}",
            version
        ))));
    }

    let nonce = &sealed[MAGIC.len() + 1..HEADER_SIZE];
    let ciphertext = &sealed[HEADER_SIZE..];

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
        Error::StoreOpen(StoreOpenError::Corrupt("Invalid opening key length".into()))
    })?;

    let aad = kind.aad();
    cipher
        .decrypt(
            AesNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| Error::StoreOpen(StoreOpenError::WrongKey))
}

// ============================================================================
// TESTS
// ============================================================================
