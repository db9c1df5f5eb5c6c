//! # Vesper Vault
//!
//! Encrypted dual-store persistence for the Vesper messenger: a small
//! PIN-guarded store holding the recovery phrase, and a phrase-guarded
//! store holding the user's profile, contacts and chats.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VESPER VAULT MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   unlock PIN                         recovery phrase                    │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  ┌──────────────────────────────────────────────────┐                   │
//! │  │  crypto: Argon2id + HKDF key derivation,         │                   │
//! │  │          AES-256-GCM sealed snapshots            │                   │
//! │  └──────────────┬──────────────────┬────────────────┘                   │
//! │                 │                  │                                    │
//! │                 ▼                  ▼                                    │
//! │  ┌─────────────────────┐  ┌─────────────────────┐                       │
//! │  │ storage::SeedStore  │  │ storage::MainStore  │                       │
//! │  │ (recovery phrase)   │  │ (profile/contacts/  │                       │
//! │  │                     │  │  chats)             │                       │
//! │  └──────────┬──────────┘  └──────────┬──────────┘                       │
//! │             │                        │                                  │
//! │             └───────────┬────────────┘                                  │
//! │                         ▼                                               │
//! │  ┌──────────────────────────────────────────────────┐                   │
//! │  │  vault: orchestrator state machine               │                   │
//! │  │  initialize / unlock / verify / change_pin /     │                   │
//! │  │  restore  ──►  VaultSession (owned value)        │                   │
//! │  └──────────────────────────────────────────────────┘                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - On-disk layout of the vault directory
//! - [`model`] - Record types and backup payload normalization
//! - [`phrase`] - BIP39 recovery phrase generation and validation
//! - [`vault`] - Orchestrator, state machine and sessions
//!
//! The `crypto` and `storage` modules are internal: store keys and raw
//! store handles never cross the crate boundary.
//!
//! ## Security Model
//!
//! | Aspect | Measure |
//! |--------|---------|
//! | PIN brute force | Argon2id, memory-hard, per-installation salt |
//! | Store secrecy | AES-256-GCM over the whole snapshot |
//! | Store binding | AAD ties each file to its store role |
//! | Key lifetime | Keys live only inside an open session, zeroized on drop |
//! | Secrets in logs | Never; sensitive `Debug` impls print `[REDACTED]` |
//!
//! ## Example
//!
//! ```no_run
//! use vesper_vault::{UserProfile, Vault, VaultConfig};
//!
//! # async fn demo() -> vesper_vault::Result<()> {
//! let vault = Vault::new(VaultConfig::new("/data/vesper"));
//!
//! let mut session = vault
//!     .initialize("123456", "winter apple basket brave lunar oak")
//!     .await?;
//! session.write_user(UserProfile::new("user-1"), vec![], vec![])?;
//! session.close();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod error;
pub mod model;
pub mod phrase;
pub mod vault;

pub(crate) mod crypto;
pub(crate) mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::VaultConfig;
pub use error::{Error, ErrorKind, Result};
pub use model::{BackupPayload, Chat, Contact, FileMeta, Message, UserProfile};
pub use phrase::RecoveryPhrase;
pub use vault::{Vault, VaultListener, VaultSession, VaultState};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of Vesper Vault
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        #[cfg(target_os = "ios")]
        target: "ios",
        #[cfg(target_os = "android")]
        target: "android",
        #[cfg(target_os = "macos")]
        target: "macos",
        #[cfg(target_os = "linux")]
        target: "linux",
        #[cfg(target_os = "windows")]
        target: "windows",
        #[cfg(not(any(
            target_os = "ios",
            target_os = "android",
            target_os = "macos",
            target_os = "linux",
            target_os = "windows",
        )))]
        target: "unknown",
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Target platform
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
    }
}
