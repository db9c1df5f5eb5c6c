//! # Storage Module
//!
//! Encrypted at-rest storage for the vault's two record families.
//!
//! ## On-Disk Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VAULT DIRECTORY                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  seed.vault                                                     │   │
//! │  │  ──────────                                                     │   │
//! │  │  Single-record container for the recovery phrase.              │   │
//! │  │  Sealed with the PIN-derived key.                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  main.vault                                                     │   │
//! │  │  ──────────                                                     │   │
//! │  │  Profile, contacts and chats.                                  │   │
//! │  │  Sealed with the phrase-derived key.                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  vault.salt                                                     │   │
//! │  │  ──────────                                                     │   │
//! │  │  Per-installation KDF salt. Random, plaintext, immutable.      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Durability Model
//!
//! Each store keeps its full record set in memory and rewrites the whole
//! sealed snapshot on every mutation. Writes go through
//! [`atomic_write_file`]: the new snapshot is written to a temporary
//! sibling, synced, then renamed over the live file. A crash at any point
//! leaves either the old snapshot or the new one, never a torn file.

mod main_store;
mod seed_store;

pub use main_store::MainStore;
pub use seed_store::{SeedRecord, SeedStore};

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Write `bytes` to `path` atomically and durably.
///
/// The data lands in a `.tmp` sibling first and is fsynced before the
/// rename, so the destination always holds a complete snapshot. The parent
/// directory is synced after the rename where the platform allows it.
pub(crate) fn atomic_write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp_path = temp_sibling(path);

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    // Directory fsync is advisory; some platforms cannot open directories.
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "store".into());
    name.push(".tmp");
    path.with_file_name(name)
}

// ============================================================================
// TESTS
// ============================================================================
