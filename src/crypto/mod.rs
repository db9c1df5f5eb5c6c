//! # Cryptography Module
//!
//! All cryptographic primitives used by the vault.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY HIERARCHY                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │   Unlock PIN                      Recovery Phrase               │   │
//! │  │       │                                │                        │   │
//! │  │       ▼                                ▼                        │   │
//! │  │   Argon2id(salt) + HKDF           Argon2id(salt) + HKDF         │   │
//! │  │       │                                │                        │   │
//! │  │       ▼                                ▼                        │   │
//! │  │   ┌───────────────┐              ┌───────────────┐             │   │
//! │  │   │ SeedStore key │              │ MainStore key │             │   │
//! │  │   │ (SecretKind:: │              │ (SecretKind:: │             │   │
//! │  │   │  Pin)         │              │  Phrase)      │             │   │
//! │  │   └───────────────┘              └───────────────┘             │   │
//! │  │                                                                 │   │
//! │  │   The PIN gates the phrase; the phrase gates the data.          │   │
//! │  │   Changing the PIN re-seals only the tiny SeedStore.            │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    SEALING SCHEME                               │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Store Sealing (AES-256-GCM)                                    │   │
//! │  │  ─────────────────────────────                                  │   │
//! │  │                                                                 │   │
//! │  │  • 256-bit key from the KDF hierarchy                           │   │
//! │  │  • 96-bit nonce (random per write)                              │   │
//! │  │  • 128-bit authentication tag                                   │   │
//! │  │  • AAD binds magic, version, and store kind                     │   │
//! │  │                                                                 │   │
//! │  │  The tag check is what makes a wrong-key open fail              │   │
//! │  │  deterministically instead of returning garbage records.        │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | Argon2id | Secret → key material | Memory-hard; slows offline PIN guessing |
//! | HKDF-SHA256 | Key expansion | Industry standard, domain separation |
//! | AES-256-GCM | Store sealing | Hardware acceleration, AEAD |
//! | SHA-256 | Record identifiers | Fast, stable across installations |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: All key material is zeroized when dropped
//! 2. **Secure Random**: Using `rand::rngs::OsRng` for salts and nonces
//! 3. **No Nonce Reuse**: A fresh nonce is drawn for every seal
//! 4. **No Secret Logging**: Secrets and keys never reach `Debug` or tracing

mod kdf;
mod keys;
mod sealed;

pub use kdf::{derive_id, derive_key, KdfSalt, SALT_SIZE};
pub use keys::{EncryptionKey, SecretKind, KEY_SIZE};
pub use sealed::{open, seal, StoreKind, FORMAT_VERSION, MAGIC, NONCE_SIZE, TAG_SIZE};
