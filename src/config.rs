//! # Vault Configuration
//!
//! Locates the vault's on-disk footprint. File names are fixed (never
//! content-addressed); only the containing directory is configurable, so a
//! caller that knows the directory can always find the stores.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ON-DISK LAYOUT                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  <vault dir>/                                                           │
//! │  ├── seed.vault    Sealed SeedStore snapshot  (key: PIN-derived)       │
//! │  ├── main.vault    Sealed MainStore snapshot  (key: phrase-derived)    │
//! │  └── vault.salt    Per-installation KDF salt  (plaintext, 16 bytes)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

/// File name of the sealed SeedStore snapshot
pub const SEED_FILE_NAME: &str = "seed.vault";

/// File name of the sealed MainStore snapshot
pub const MAIN_FILE_NAME: &str = "main.vault";

/// File name of the per-installation KDF salt
pub const SALT_FILE_NAME: &str = "vault.salt";

/// Vault configuration
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Directory holding the two store files and the salt sidecar
    pub dir: PathBuf,
}

impl VaultConfig {
    /// Create a configuration rooted at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the sealed SeedStore file
    pub fn seed_path(&self) -> PathBuf {
        self.dir.join(SEED_FILE_NAME)
    }

    /// Path of the sealed MainStore file
    pub fn main_path(&self) -> PathBuf {
        self.dir.join(MAIN_FILE_NAME)
    }

    /// Path of the KDF salt sidecar
    pub fn salt_path(&self) -> PathBuf {
        self.dir.join(SALT_FILE_NAME)
    }

    /// Directory holding the vault files
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
