//! # Error Handling
//!
//! This module provides the error types for the Vesper vault.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                      │
//! │  │                                                                      │
//! │  ├── Secret / Key Errors                                                │
//! │  │   ├── InvalidSecret         - Empty PIN or phrase                    │
//! │  │   ├── KeyDerivationFailed   - KDF internals failed                   │
//! │  │   └── InvalidRecoveryPhrase - Phrase failed BIP39 validation         │
//! │  │                                                                      │
//! │  ├── Credential Errors                                                  │
//! │  │   └── WrongCredential       - Store rejected a derived key, or the   │
//! │  │                               required record is absent              │
//! │  │                                                                      │
//! │  ├── Store Open Errors                                                  │
//! │  │   └── StoreOpen                                                      │
//! │  │       ├── WrongKey          - AEAD authentication failed             │
//! │  │       ├── Corrupt           - Bad header / truncated / undecodable   │
//! │  │       └── IoFailure         - Underlying I/O failed                  │
//! │  │                                                                      │
//! │  ├── Store Access Errors                                                │
//! │  │   ├── WriteError            - Write failed, store unchanged          │
//! │  │   ├── NotFound              - Record never written                   │
//! │  │   └── SerializationError    - Snapshot encode/decode failed          │
//! │  │                                                                      │
//! │  └── Orchestrator Errors                                                │
//! │      ├── VaultBusy             - Another operation is in flight         │
//! │      ├── InitializationError   - Account creation failed (rolled back)  │
//! │      ├── RestoreError          - Restore flow failed (rolled back)      │
//! │      └── MalformedBackup       - Backup payload shape violation         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Discipline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         FAILURE DISCIPLINE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Fail fast:    secrets and backup payloads are validated before any     │
//! │                file is touched (InvalidSecret, MalformedBackup).        │
//! │                                                                         │
//! │  Surface:      StoreOpen and WriteError always reach the caller; they   │
//! │                are never converted into silent empty results.           │
//! │                                                                         │
//! │  Roll back:    composite flows (initialize, restore) delete the files   │
//! │                they created before surfacing InitializationError or     │
//! │                RestoreError. Rollback itself is best-effort.            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for vault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Deterministic reasons a sealed store can refuse to open.
///
/// The AEAD tag cannot distinguish a wrong key from tampered ciphertext, so
/// an authentication failure is reported as `WrongKey`; structural damage to
/// the file (bad magic, truncation, undecodable plaintext) is `Corrupt`.
#[derive(Error, Debug)]
pub enum StoreOpenError {
    /// The store rejected the supplied key
    #[error("Store rejected the key (authentication failed).")]
    WrongKey,

    /// The store file is structurally damaged
    #[error("Store file is corrupt: {0}")]
    Corrupt(String),

    /// The underlying storage engine failed
    #[error("Storage I/O failure: {0}")]
    IoFailure(String),
}

impl From<std::io::Error> for StoreOpenError {
    fn from(err: std::io::Error) -> Self {
        StoreOpenError::IoFailure(err.to_string())
    }
}

/// Main error type for the Vesper vault
///
/// All errors are categorized by module/domain to make error handling
/// clearer and to provide meaningful error messages to users.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Secret / Key Errors (100-199)
    // ========================================================================

    /// A PIN or recovery phrase was empty
    #[error("Secret must not be empty.")]
    InvalidSecret,

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// A recovery phrase failed BIP39 validation
    #[error("Invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),

    // ========================================================================
    // Credential Errors (200-299)
    // ========================================================================

    /// A derived key was rejected, or the record it should unlock is absent
    #[error("Wrong credential.")]
    WrongCredential,

    // ========================================================================
    // Store Open Errors (300-399)
    // ========================================================================

    /// A store could not be opened
    #[error("Failed to open store: {0}")]
    StoreOpen(#[from] StoreOpenError),

    // ========================================================================
    // Store Access Errors (400-499)
    // ========================================================================

    /// A store write failed; the store is unchanged
    #[error("Failed to write to store: {0}")]
    WriteError(String),

    /// A record was read before it was ever written
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Snapshot encoding or decoding failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ========================================================================
    // Orchestrator Errors (500-599)
    // ========================================================================

    /// Another state-mutating operation is already in flight
    #[error("Another vault operation is in flight. Retry when it completes.")]
    VaultBusy,

    /// Account creation failed; files created by the call were rolled back
    #[error("Vault initialization failed: {0}")]
    InitializationError(String),

    /// A restore flow failed; files created by the call were rolled back
    #[error("Vault restore failed: {0}")]
    RestoreError(String),

    /// A backup payload violated the expected shape
    #[error("Malformed backup payload: {0}")]
    MalformedBackup(String),
}

/// Coarse error classification, used by the vault state machine to label
/// its `Failed` state without carrying the full error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty secret
    InvalidSecret,
    /// KDF failure
    KeyDerivation,
    /// Rejected credential
    WrongCredential,
    /// Store open failure
    StoreOpen,
    /// Store write failure
    Write,
    /// Missing record
    NotFound,
    /// Snapshot codec failure
    Serialization,
    /// Operation gate contention
    Busy,
    /// Failed account creation
    Initialization,
    /// Failed restore flow
    Restore,
    /// Malformed backup payload
    MalformedBackup,
}

impl Error {
    /// Get the numeric error code
    ///
    /// Error codes are organized by category:
    /// - 100-199: Secrets / key derivation
    /// - 200-299: Credentials
    /// - 300-399: Store open
    /// - 400-499: Store access
    /// - 500-599: Orchestrator
    pub fn code(&self) -> i32 {
        match self {
            // Secrets (100-199)
            Error::InvalidSecret => 100,
            Error::KeyDerivationFailed(_) => 101,
            Error::InvalidRecoveryPhrase(_) => 102,

            // Credentials (200-299)
            Error::WrongCredential => 200,

            // Store open (300-399)
            Error::StoreOpen(StoreOpenError::WrongKey) => 300,
            Error::StoreOpen(StoreOpenError::Corrupt(_)) => 301,
            Error::StoreOpen(StoreOpenError::IoFailure(_)) => 302,

            // Store access (400-499)
            Error::WriteError(_) => 400,
            Error::NotFound(_) => 401,
            Error::SerializationError(_) => 402,

            // Orchestrator (500-599)
            Error::VaultBusy => 500,
            Error::InitializationError(_) => 501,
            Error::RestoreError(_) => 502,
            Error::MalformedBackup(_) => 503,
        }
    }

    /// Coarse classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidSecret => ErrorKind::InvalidSecret,
            Error::KeyDerivationFailed(_) => ErrorKind::KeyDerivation,
            Error::InvalidRecoveryPhrase(_) => ErrorKind::InvalidSecret,
            Error::WrongCredential => ErrorKind::WrongCredential,
            Error::StoreOpen(_) => ErrorKind::StoreOpen,
            Error::WriteError(_) => ErrorKind::Write,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::SerializationError(_) => ErrorKind::Serialization,
            Error::VaultBusy => ErrorKind::Busy,
            Error::InitializationError(_) => ErrorKind::Initialization,
            Error::RestoreError(_) => ErrorKind::Restore,
            Error::MalformedBackup(_) => ErrorKind::MalformedBackup,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by retrying
    /// or by user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::VaultBusy
                | Error::WrongCredential
                | Error::InvalidSecret
                | Error::InvalidRecoveryPhrase(_)
        )
    }

    /// Check if this error requires user action (re-entry of a credential
    /// or a different backup file)
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::InvalidSecret
                | Error::InvalidRecoveryPhrase(_)
                | Error::WrongCredential
                | Error::MalformedBackup(_)
                | Error::StoreOpen(StoreOpenError::WrongKey)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedBackup(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
