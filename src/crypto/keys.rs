//! # Store Keys
//!
//! Symmetric key material for the two sealed stores.
//!
//! A key is always the product of [`crate::crypto::kdf::derive_key`] over a
//! user secret; it never exists on disk, and it lives only as long as the
//! store handle (or orchestrator stack frame) that owns it.

use zeroize::ZeroizeOnDrop;

/// Size of a store encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Which user secret a key was derived from
///
/// Carried as metadata so the orchestrator can assert it is handing the
/// PIN-derived key to the SeedStore and the phrase-derived key to the
/// MainStore, never the other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    /// Derived from the unlock PIN
    Pin,
    /// Derived from the recovery phrase
    Phrase,
}

/// An AES-256-GCM store key
///
/// Zeroized when dropped. The raw bytes never appear in `Debug` output.
#[derive(ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
    #[zeroize(skip)]
    kind: SecretKind,
}

impl EncryptionKey {
    /// Create from raw derived bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE], kind: SecretKind) -> Self {
        Self { bytes, kind }
    }

    /// Get the raw key bytes (for the AEAD cipher)
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Which secret this key was derived from
    pub fn kind(&self) -> SecretKind {
        self.kind
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        write!(f, "EncryptionKey({:?}, [REDACTED])", self.kind)
    }
}
