//! # Seed Store
//!
//! Single-record encrypted container for the recovery phrase.
//!
//! The store holds at most one [`SeedRecord`]. A freshly created store is
//! empty; the first upsert installs the record and later upserts replace
//! it. Opening with the wrong key fails deterministically — the sealed
//! snapshot authenticates before a single plaintext byte is produced.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::{self, EncryptionKey, StoreKind};
use crate::error::{Error, Result, StoreOpenError};

/// The single record a seed store can hold
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SeedRecord {
    /// Digest-derived identifier of the phrase
    pub content_id: String,
    /// The recovery phrase text
    pub phrase_text: String,
}

impl fmt::Debug for SeedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedRecord")
            .field("content_id", &self.content_id)
            .field("phrase_text", &"[REDACTED]")
            .finish()
    }
}

/// Encrypted single-record store for the recovery phrase
#[derive(Debug)]
pub struct SeedStore {
    path: PathBuf,
    key: EncryptionKey,
    record: Option<SeedRecord>,
}

impl SeedStore {
    /// Create a new, empty store file at `path`
    ///
    /// The empty snapshot is committed immediately so a subsequent open
    /// with the same key succeeds even if no phrase was ever written.
    pub fn create(path: &Path, key: EncryptionKey) -> Result<Self> {
        let store = Self {
            path: path.to_path_buf(),
            key,
            record: None,
        };
        store.persist(&None)?;

        debug!("Seed store created at {:?}", store.path);
        Ok(store)
    }

    /// Create a store file already holding a record, in one atomic write
    ///
    /// Used when re-keying: the file is replaced wholesale, so there is no
    /// window where it exists under the new key but without its record.
    pub fn create_with(
        path: &Path,
        key: EncryptionKey,
        content_id: String,
        phrase_text: String,
    ) -> Result<Self> {
        let store = Self {
            path: path.to_path_buf(),
            key,
            record: Some(SeedRecord {
                content_id,
                phrase_text,
            }),
        };
        store.persist(&store.record)?;

        debug!("Seed store created at {:?}", store.path);
        Ok(store)
    }

    /// Open an existing store file
    pub fn open(path: &Path, key: EncryptionKey) -> Result<Self> {
        let sealed = std::fs::read(path).map_err(StoreOpenError::from)?;
        let plaintext = Zeroizing::new(crypto::open(&key, StoreKind::Seed, &sealed)?);

        let record: Option<SeedRecord> = bincode::deserialize(plaintext.as_slice())
            .map_err(|e| StoreOpenError::Corrupt(format!("Seed store payload invalid: {}", e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            key,
            record,
        })
    }

    /// Insert or replace the phrase record
    ///
    /// The new snapshot is durable before the in-memory record updates;
    /// on failure the store still reflects the previous state.
    pub fn upsert_phrase(&mut self, content_id: String, phrase_text: String) -> Result<()> {
        let next = Some(SeedRecord {
            content_id,
            phrase_text,
        });

        self.persist(&next)?;
        self.record = next;

        debug!("Seed store record committed");
        Ok(())
    }

    /// Read the phrase record, failing if none was ever written
    pub fn read_phrase(&self) -> Result<&SeedRecord> {
        self.record
            .as_ref()
            .ok_or_else(|| Error::NotFound("Seed store holds no phrase record".into()))
    }

    /// The store's file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize, seal and atomically write a candidate state
    fn persist(&self, record: &Option<SeedRecord>) -> Result<()> {
        let plaintext = Zeroizing::new(bincode::serialize(record)?);
        let sealed = crypto::seal(&self.key, StoreKind::Seed, &plaintext)?;

        super::atomic_write_file(&self.path, &sealed)
            .map_err(|e| Error::WriteError(format!("Seed store write failed: {}", e)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
