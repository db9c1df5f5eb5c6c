//! # Vault Orchestrator
//!
//! The recovery and unlock state machine over the two sealed stores.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         VAULT ORCHESTRATOR                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │            PIN ──► Argon2id+HKDF ──► SeedStore key                      │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                   ┌────────────┐   phrase text          │
//! │                                   │ seed.vault │ ───────────┐           │
//! │                                   └────────────┘            │           │
//! │                                                             ▼           │
//! │                              Argon2id+HKDF ◄── recovery phrase          │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                   ┌────────────┐                        │
//! │                                   │ main.vault │ ──► VaultSession       │
//! │                                   └────────────┘                        │
//! │                                                                         │
//! │  The orchestrator is the only composer of the two stores. The main      │
//! │  store opens with its own phrase-derived key, never "with a PIN";       │
//! │  the PIN's only power is unsealing the phrase.                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            VAULT STATES                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │          initialize / unlock_with_pin / change_pin                      │
//! │   Locked ────────────────────────────────────► Unlocking ──► Unlocked   │
//! │     ▲        restore_from_phrase / _backup                              │
//! │     │    ────────────────────────────────────► Recovering ─► Unlocked   │
//! │     │                                               │                   │
//! │   lock()                                            ▼                   │
//! │     └────────────────────────────────────────── Failed(kind)            │
//! │                                                                         │
//! │  verify_pin / verify_phrase never change state. Failed is re-entrant:   │
//! │  every transition may be retried from it.                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         OPERATION GATE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Mutating transitions take the gate's write half; verifies take the     │
//! │  read half. A second caller is rejected immediately with VaultBusy      │
//! │  rather than queued, so the UI always knows an attempt was dropped.     │
//! │                                                                         │
//! │    initialize ───────┐                                                  │
//! │    unlock_with_pin ──┤                                                  │
//! │    change_pin ───────┼──► try_write ──► exclusive                       │
//! │    restore_* ────────┘                                                  │
//! │                                                                         │
//! │    verify_pin ───────┬──► try_read ───► shared among verifies           │
//! │    verify_phrase ────┘                                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transition bodies are synchronous and run to completion in a single
//! poll: a dropped future never leaves a half-applied mutation behind.
//! Composite flows (initialize, backup restore) record every file they
//! create and delete those files before surfacing a failure.

mod session;

pub use session::{VaultListener, VaultSession};

use std::path::PathBuf;

use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::VaultConfig;
use crate::crypto::{self, KdfSalt, SecretKind};
use crate::error::{Error, ErrorKind, Result, StoreOpenError};
use crate::model::{BackupPayload, NormalizedBackup};
use crate::storage::{MainStore, SeedStore};

/// Observable lifecycle state of the vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// No session is open
    Locked,
    /// A PIN-based transition is in flight
    Unlocking,
    /// The last transition produced a session
    Unlocked,
    /// A restore transition is in flight
    Recovering,
    /// The last transition failed
    Failed(ErrorKind),
}

/// Orchestrator for the encrypted dual-store vault
///
/// Owns no open store handles itself; every successful unlock or restore
/// hands ownership to the returned [`VaultSession`]. The vault value can
/// therefore be shared freely (`Arc<Vault>`) while sessions stay exclusive.
#[derive(Debug)]
pub struct Vault {
    config: VaultConfig,
    /// Single-writer gate: mutating transitions hold the write half,
    /// verifies share the read half.
    gate: RwLock<()>,
    state: Mutex<VaultState>,
}

impl Vault {
    /// Create an orchestrator over the given vault directory
    ///
    /// Touches nothing on disk; stores are only opened by transitions.
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config,
            gate: RwLock::new(()),
            state: Mutex::new(VaultState::Locked),
        }
    }

    /// The vault's configuration
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> VaultState {
        *self.state.lock()
    }

    /// Whether a seed store exists on disk (the vault was ever initialized)
    pub fn is_initialized(&self) -> bool {
        self.config.seed_path().exists()
    }

    /// Mark the vault locked again
    ///
    /// Sessions are independent values; drop (or close) them separately.
    pub fn lock(&self) {
        self.set_state(VaultState::Locked);
    }

    // ========================================================================
    // TRANSITIONS
    // ========================================================================

    /// Set up a new vault from a PIN and a recovery phrase
    ///
    /// Creates the salt sidecar and both stores if absent, writes the
    /// phrase record, and returns an open session. Re-running with the
    /// same credentials on an existing vault is harmless; credentials that
    /// do not match an existing vault fail without modifying it. On
    /// failure every file this call created is deleted and
    /// `InitializationError` is returned.
    pub async fn initialize(&self, pin: &str, phrase: &str) -> Result<VaultSession> {
        let _guard = self.gate.try_write().map_err(|_| Error::VaultBusy)?;
        self.set_state(VaultState::Unlocking);

        let result = self.initialize_stores(pin, phrase);
        self.finish(result, VaultState::Unlocked)
    }

    /// Open a session from the unlock PIN
    ///
    /// The PIN unseals the seed store; the phrase found there unseals the
    /// main store. A vault that was never initialized and a wrong PIN are
    /// indistinguishable to the caller: both are `WrongCredential`.
    pub async fn unlock_with_pin(&self, pin: &str) -> Result<VaultSession> {
        let _guard = self.gate.try_write().map_err(|_| Error::VaultBusy)?;
        self.set_state(VaultState::Unlocking);

        let result = self.unlock_stores(pin);
        self.finish(result, VaultState::Unlocked)
    }

    /// Check a PIN without opening a session
    ///
    /// Read-only and side-effect free; may run concurrently with other
    /// verifies but not with a mutating transition.
    pub async fn verify_pin(&self, pin: &str) -> Result<()> {
        let _guard = self.gate.try_read().map_err(|_| Error::VaultBusy)?;

        if pin.is_empty() {
            return Err(Error::InvalidSecret);
        }
        if !self.is_initialized() {
            return Err(Error::WrongCredential);
        }

        let salt = self.load_salt()?;
        self.open_seed_with_pin(pin, &salt).map(|_| ())
    }

    /// Check a recovery phrase without opening a session
    ///
    /// On success returns the seed store's file path, so the caller can
    /// stage a follow-up recovery step against it.
    pub async fn verify_phrase(&self, phrase: &str) -> Result<PathBuf> {
        let _guard = self.gate.try_read().map_err(|_| Error::VaultBusy)?;

        if phrase.is_empty() {
            return Err(Error::InvalidSecret);
        }
        if !self.config.main_path().exists() {
            return Err(Error::WrongCredential);
        }

        let salt = self.load_salt()?;
        self.open_main_with_phrase(phrase, &salt, true)
            .map(|_| self.config.seed_path())
    }

    /// Re-key the seed store under a new PIN and open a session
    ///
    /// The phrase must prove itself against the main store first; only the
    /// seed store is rewritten. Main store data and the phrase itself are
    /// untouched, so the recovery phrase and any exported backups keep
    /// working. The proven stores come back as a live session, the same as
    /// an unlock.
    pub async fn change_pin(&self, new_pin: &str, phrase: &str) -> Result<VaultSession> {
        let _guard = self.gate.try_write().map_err(|_| Error::VaultBusy)?;
        self.set_state(VaultState::Unlocking);

        let result = self.rekey_seed_store(new_pin, phrase);
        self.finish(result, VaultState::Unlocked)
    }

    /// Open a session from the recovery phrase alone
    ///
    /// For a device where the PIN is lost. The main store opens directly;
    /// the old seed store stays on disk under the forgotten PIN, and the
    /// returned session carries no seed handle. Call
    /// [`Vault::change_pin`] afterwards to set a new PIN.
    pub async fn restore_from_phrase(&self, phrase: &str) -> Result<VaultSession> {
        let _guard = self.gate.try_write().map_err(|_| Error::VaultBusy)?;
        self.set_state(VaultState::Recovering);

        let result = self.reopen_from_phrase(phrase);
        self.finish(result, VaultState::Unlocked)
    }

    /// Rebuild the vault from an exported backup payload
    ///
    /// The payload is validated in full before any file is touched. On
    /// success both stores exist, keyed by the given PIN and the backup's
    /// phrase, with the backup's records merged into the main store. On
    /// failure files created by this call are deleted and `RestoreError`
    /// is returned; records already merged into a pre-existing main store
    /// stay there, and retrying with the same payload converges on the
    /// same state.
    pub async fn restore_from_backup(&self, pin: &str, payload: &[u8]) -> Result<VaultSession> {
        let _guard = self.gate.try_write().map_err(|_| Error::VaultBusy)?;
        self.set_state(VaultState::Recovering);

        let result = self.restore_stores(pin, payload);
        self.finish(result, VaultState::Unlocked)
    }

    // ========================================================================
    // TRANSITION BODIES
    // ========================================================================

    fn initialize_stores(&self, pin: &str, phrase: &str) -> Result<VaultSession> {
        if pin.is_empty() || phrase.is_empty() {
            return Err(Error::InvalidSecret);
        }

        info!("Initializing vault at {:?}", self.config.dir());
        std::fs::create_dir_all(self.config.dir()).map_err(|e| {
            Error::InitializationError(format!("Cannot create vault directory: {}", e))
        })?;

        let mut rollback = Rollback::new();
        match self.build_stores(pin, phrase, &mut rollback) {
            Ok(session) => {
                info!("Vault initialized");
                Ok(session)
            }
            Err(e) => {
                rollback.run();
                Err(Error::InitializationError(e.to_string()))
            }
        }
    }

    fn build_stores(
        &self,
        pin: &str,
        phrase: &str,
        rollback: &mut Rollback,
    ) -> Result<VaultSession> {
        let salt_path = self.config.salt_path();
        let (salt, salt_created) = KdfSalt::load_or_generate(&salt_path)?;
        if salt_created {
            rollback.track(salt_path);
        }

        let content_id = crypto::derive_id(phrase)?;
        let pin_key = crypto::derive_key(pin, &salt, SecretKind::Pin)?;
        let phrase_key = crypto::derive_key(phrase, &salt, SecretKind::Phrase)?;

        // Main store first. An existing one proves or rejects the phrase,
        // and an existing seed store is only rewritten after that proof:
        // a mismatched credential must not modify the pair it mismatches.
        let main_path = self.config.main_path();
        let main = if main_path.exists() {
            MainStore::open(&main_path, phrase_key)?
        } else {
            rollback.track(main_path.clone());
            MainStore::create(&main_path, phrase_key)?
        };

        let seed_path = self.config.seed_path();
        let seed = if seed_path.exists() {
            let mut seed = SeedStore::open(&seed_path, pin_key)?;
            seed.upsert_phrase(content_id, phrase.to_string())?;
            seed
        } else {
            rollback.track(seed_path.clone());
            SeedStore::create_with(&seed_path, pin_key, content_id, phrase.to_string())?
        };

        Ok(VaultSession::new(Some(seed), main))
    }

    fn unlock_stores(&self, pin: &str) -> Result<VaultSession> {
        if pin.is_empty() {
            return Err(Error::InvalidSecret);
        }
        if !self.is_initialized() {
            return Err(Error::WrongCredential);
        }

        let salt = self.load_salt()?;
        let seed = self.open_seed_with_pin(pin, &salt)?;

        // A seed store holding no record, or a phrase the main store
        // rejects, is a broken credential chain; the caller sees
        // WrongCredential for both, the same as a wrong PIN.
        let phrase_text = match seed.read_phrase() {
            Ok(record) => Zeroizing::new(record.phrase_text.clone()),
            Err(Error::NotFound(_)) => return Err(Error::WrongCredential),
            Err(e) => return Err(e),
        };
        let main = self.open_main_with_phrase(&phrase_text, &salt, false)?;

        info!("Vault unlocked");
        Ok(VaultSession::new(Some(seed), main))
    }

    fn rekey_seed_store(&self, new_pin: &str, phrase: &str) -> Result<VaultSession> {
        if new_pin.is_empty() || phrase.is_empty() {
            return Err(Error::InvalidSecret);
        }
        if !self.is_initialized() {
            return Err(Error::WrongCredential);
        }

        let salt = self.load_salt()?;

        // Prove the phrase before rewriting anything
        let main = self.open_main_with_phrase(phrase, &salt, false)?;

        let content_id = crypto::derive_id(phrase)?;
        let new_pin_key = crypto::derive_key(new_pin, &salt, SecretKind::Pin)?;
        let seed = SeedStore::create_with(
            &self.config.seed_path(),
            new_pin_key,
            content_id,
            phrase.to_string(),
        )?;

        info!("PIN changed; seed store re-keyed");
        Ok(VaultSession::new(Some(seed), main))
    }

    fn reopen_from_phrase(&self, phrase: &str) -> Result<VaultSession> {
        if phrase.is_empty() {
            return Err(Error::InvalidSecret);
        }
        if !self.config.main_path().exists() {
            return Err(Error::WrongCredential);
        }

        let salt = self.load_salt()?;
        let main = self.open_main_with_phrase(phrase, &salt, false)?;

        info!("Vault restored from phrase; no PIN is set until change_pin");
        Ok(VaultSession::new(None, main))
    }

    fn restore_stores(&self, pin: &str, payload: &[u8]) -> Result<VaultSession> {
        if pin.is_empty() {
            return Err(Error::InvalidSecret);
        }

        // Full payload validation before any file is touched
        let backup = BackupPayload::from_slice(payload)?;
        let normalized = backup.normalize()?;
        let phrase = Zeroizing::new(backup.phrase().to_string());

        info!("Restoring vault from backup at {:?}", self.config.dir());
        std::fs::create_dir_all(self.config.dir())
            .map_err(|e| Error::RestoreError(format!("Cannot create vault directory: {}", e)))?;

        let mut rollback = Rollback::new();
        match self.build_restored(pin, &phrase, &normalized, &mut rollback) {
            Ok(session) => {
                info!(
                    "Vault restored from backup: {} contacts, {} chats",
                    normalized.contacts.len(),
                    normalized.chats.len()
                );
                Ok(session)
            }
            Err(e) => {
                rollback.run();
                Err(Error::RestoreError(e.to_string()))
            }
        }
    }

    fn build_restored(
        &self,
        pin: &str,
        phrase: &str,
        data: &NormalizedBackup,
        rollback: &mut Rollback,
    ) -> Result<VaultSession> {
        let salt_path = self.config.salt_path();
        let (salt, salt_created) = KdfSalt::load_or_generate(&salt_path)?;
        if salt_created {
            rollback.track(salt_path);
        }

        let content_id = crypto::derive_id(phrase)?;
        let pin_key = crypto::derive_key(pin, &salt, SecretKind::Pin)?;
        let phrase_key = crypto::derive_key(phrase, &salt, SecretKind::Phrase)?;

        // Main store first: the seed store is only replaced once the data
        // landed, so a failing restore cannot orphan the old PIN. If the
        // seed write then fails, the merged records stay in a pre-existing
        // main store; the merge upserts by id, so retrying the same
        // payload converges instead of duplicating.
        let main_path = self.config.main_path();
        let mut main = if main_path.exists() {
            MainStore::open(&main_path, phrase_key)?
        } else {
            rollback.track(main_path.clone());
            MainStore::create(&main_path, phrase_key)?
        };
        main.write_user(
            data.profile.clone(),
            data.contacts.clone(),
            data.chats.clone(),
        )?;

        let seed_path = self.config.seed_path();
        if !seed_path.exists() {
            rollback.track(seed_path.clone());
        }
        let seed = SeedStore::create_with(&seed_path, pin_key, content_id, phrase.to_string())?;

        Ok(VaultSession::new(Some(seed), main))
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Load the installation salt for flows that require an existing vault
    ///
    /// A missing salt next to existing store files means the installation
    /// is damaged beyond any credential check.
    fn load_salt(&self) -> Result<KdfSalt> {
        match KdfSalt::load(&self.config.salt_path()) {
            Ok(salt) => Ok(salt),
            Err(Error::NotFound(_)) => Err(Error::StoreOpen(StoreOpenError::Corrupt(
                "KDF salt sidecar is missing".into(),
            ))),
            Err(e) => Err(e),
        }
    }

    /// Open the seed store with a PIN, mapping a key rejection to
    /// `WrongCredential`
    fn open_seed_with_pin(&self, pin: &str, salt: &KdfSalt) -> Result<SeedStore> {
        let key = crypto::derive_key(pin, salt, SecretKind::Pin)?;
        match SeedStore::open(&self.config.seed_path(), key) {
            Ok(seed) => Ok(seed),
            Err(Error::StoreOpen(StoreOpenError::WrongKey)) => Err(Error::WrongCredential),
            Err(e) => Err(e),
        }
    }

    /// Open the main store with a phrase, mapping a key rejection to
    /// `WrongCredential`
    fn open_main_with_phrase(
        &self,
        phrase: &str,
        salt: &KdfSalt,
        read_only: bool,
    ) -> Result<MainStore> {
        let key = crypto::derive_key(phrase, salt, SecretKind::Phrase)?;
        let path = self.config.main_path();
        let result = if read_only {
            MainStore::open_read_only(&path, key)
        } else {
            MainStore::open(&path, key)
        };
        match result {
            Ok(main) => Ok(main),
            Err(Error::StoreOpen(StoreOpenError::WrongKey)) => Err(Error::WrongCredential),
            Err(e) => Err(e),
        }
    }

    fn set_state(&self, next: VaultState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!("Vault state: {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Record a transition's outcome in the state machine
    fn finish<T>(&self, result: Result<T>, success: VaultState) -> Result<T> {
        match &result {
            Ok(_) => self.set_state(success),
            Err(e) => self.set_state(VaultState::Failed(e.kind())),
        }
        result
    }
}

/// Files created by a composite flow, deleted if the flow fails.
///
/// Deletion is best-effort: a file that refuses to go is logged and left
/// behind rather than masking the original error.
struct Rollback {
    created: Vec<PathBuf>,
}

impl Rollback {
    fn new() -> Self {
        Self {
            created: Vec::new(),
        }
    }

    fn track(&mut self, path: PathBuf) {
        self.created.push(path);
    }

    fn run(self) {
        for path in &self.created {
            match std::fs::remove_file(path) {
                Ok(()) => debug!("Rolled back {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Rollback could not remove {:?}: {}", path, e),
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Contact, UserProfile};
    use serde_json::json;
    use std::sync::Arc;

    const PIN: &str = "123456";
    const PHRASE: &str = "winter apple basket brave lunar oak";

    fn new_vault(dir: &std::path::Path) -> Vault {
        Vault::new(VaultConfig::new(dir))
    }

    fn backup_payload() -> Vec<u8> {
        let value = json!({
            "seed": { "seed": PHRASE },
            "user": {
                "uid": "user-1",
                "name": "Alice",
                "contacts": {
                    "c-2": { "name": "Carol" }
                },
                "chats": {
                    "chat-1": {
                        "messages": {
                            "m-2": { "sender": "c-2", "body": "second", "timestamp": 2 },
                            "m-1": { "sender": "user-1", "body": "first", "timestamp": 1 }
                        },
                        "queue": [
                            { "id": "q-1", "sender": "user-1", "body": "unsent", "timestamp": 3 }
                        ]
                    }
                }
            }
        });
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_creates_vault_files() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        assert!(!vault.is_initialized());
        let session = vault.initialize(PIN, PHRASE).await.unwrap();

        assert!(vault.config().seed_path().exists());
        assert!(vault.config().main_path().exists());
        assert!(vault.config().salt_path().exists());
        assert!(vault.is_initialized());
        assert_eq!(vault.state(), VaultState::Unlocked);

        session.close();
    }

    #[tokio::test]
    async fn test_initialize_then_unlock_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let mut session = vault.initialize(PIN, PHRASE).await.unwrap();
        session
            .write_user(
                UserProfile::new("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![],
            )
            .unwrap();
        session.close();
        vault.lock();

        let session = vault.unlock_with_pin(PIN).await.unwrap();
        assert_eq!(session.read_user().unwrap().uid, "user-1");
        assert_eq!(session.contacts().len(), 1);
    }

    #[tokio::test]
    async fn test_initialize_empty_secret_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let vault_dir = dir.path().join("vault");
        let vault = new_vault(&vault_dir);

        let result = vault.initialize("", PHRASE).await;
        assert!(matches!(result, Err(Error::InvalidSecret)));

        let result = vault.initialize(PIN, "").await;
        assert!(matches!(result, Err(Error::InvalidSecret)));

        // Validation happens before the directory is even created
        assert!(!vault_dir.exists());
    }

    #[tokio::test]
    async fn test_initialize_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let mut session = vault.initialize(PIN, PHRASE).await.unwrap();
        session
            .write_user(UserProfile::new("user-1"), vec![], vec![])
            .unwrap();
        session.close();

        // Same credentials again: data survives
        let session = vault.initialize(PIN, PHRASE).await.unwrap();
        assert_eq!(session.read_user().unwrap().uid, "user-1");
    }

    #[tokio::test]
    async fn test_mid_initialize_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        // A pre-existing damaged main store makes initialization fail right
        // after the salt was created; no seed store is ever written
        std::fs::write(vault.config().main_path(), b"not a sealed store").unwrap();

        let result = vault.initialize(PIN, PHRASE).await;
        assert!(matches!(result, Err(Error::InitializationError(_))));

        assert!(!vault.config().seed_path().exists());
        assert!(!vault.config().salt_path().exists());
        // The file this call did not create is left alone
        assert!(vault.config().main_path().exists());
    }

    #[tokio::test]
    async fn test_late_initialize_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        // A pre-existing damaged seed store makes initialization fail after
        // the salt and main store were created; both are removed again
        std::fs::write(vault.config().seed_path(), b"not a sealed store").unwrap();

        let result = vault.initialize(PIN, PHRASE).await;
        assert!(matches!(result, Err(Error::InitializationError(_))));

        assert!(!vault.config().main_path().exists());
        assert!(!vault.config().salt_path().exists());
        assert!(vault.config().seed_path().exists());
    }

    #[tokio::test]
    async fn test_initialize_phrase_mismatch_leaves_stores_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        let seed_before = std::fs::read(vault.config().seed_path()).unwrap();
        let main_before = std::fs::read(vault.config().main_path()).unwrap();

        // Same PIN, different phrase: the main store rejects the phrase
        // before the seed store is rewritten
        let result = vault.initialize(PIN, "wrong words entirely").await;
        assert!(matches!(result, Err(Error::InitializationError(_))));

        assert_eq!(std::fs::read(vault.config().seed_path()).unwrap(), seed_before);
        assert_eq!(std::fs::read(vault.config().main_path()).unwrap(), main_before);

        // The original credentials still open the vault
        assert!(vault.unlock_with_pin(PIN).await.is_ok());
    }

    #[tokio::test]
    async fn test_unlock_with_wrong_pin() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        let seed_before = std::fs::read(vault.config().seed_path()).unwrap();
        let main_before = std::fs::read(vault.config().main_path()).unwrap();

        let result = vault.unlock_with_pin("000000").await;
        assert!(matches!(result, Err(Error::WrongCredential)));

        // Stores are byte-identical after the failed attempt
        assert_eq!(std::fs::read(vault.config().seed_path()).unwrap(), seed_before);
        assert_eq!(std::fs::read(vault.config().main_path()).unwrap(), main_before);
    }

    #[tokio::test]
    async fn test_unlock_without_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let result = vault.unlock_with_pin(PIN).await;
        assert!(matches!(result, Err(Error::WrongCredential)));
    }

    #[tokio::test]
    async fn test_unlock_with_empty_seed_record_is_wrong_credential() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        // Replace the seed store with one sealed under the same PIN key
        // but holding no phrase record
        let salt = KdfSalt::load(&vault.config().salt_path()).unwrap();
        let key = crypto::derive_key(PIN, &salt, SecretKind::Pin).unwrap();
        SeedStore::create(&vault.config().seed_path(), key).unwrap();

        assert!(matches!(
            vault.unlock_with_pin(PIN).await,
            Err(Error::WrongCredential)
        ));
    }

    #[tokio::test]
    async fn test_unlock_with_uncorrelated_stores_is_wrong_credential() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        // Re-seal the main store under a different phrase; the seed store
        // still yields the old one
        let salt = KdfSalt::load(&vault.config().salt_path()).unwrap();
        let key = crypto::derive_key("other words entirely", &salt, SecretKind::Phrase).unwrap();
        MainStore::create(&vault.config().main_path(), key).unwrap();

        assert!(matches!(
            vault.unlock_with_pin(PIN).await,
            Err(Error::WrongCredential)
        ));
    }

    #[tokio::test]
    async fn test_verify_pin_is_side_effect_free() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();
        vault.lock();

        assert!(vault.verify_pin(PIN).await.is_ok());
        assert!(matches!(
            vault.verify_pin("000000").await,
            Err(Error::WrongCredential)
        ));

        // Verifies never move the state machine
        assert_eq!(vault.state(), VaultState::Locked);
    }

    #[tokio::test]
    async fn test_verify_phrase_returns_seed_path() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        let path = vault.verify_phrase(PHRASE).await.unwrap();
        assert_eq!(path, vault.config().seed_path());

        assert!(matches!(
            vault.verify_phrase("wrong words entirely").await,
            Err(Error::WrongCredential)
        ));
    }

    #[tokio::test]
    async fn test_change_pin_preserves_data_and_invalidates_old_pin() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let mut session = vault.initialize(PIN, PHRASE).await.unwrap();
        session
            .write_user(
                UserProfile::new("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![],
            )
            .unwrap();
        session.close();

        vault.lock();

        // The re-key itself ends in an open session
        let session = vault.change_pin("654321", PHRASE).await.unwrap();
        assert_eq!(vault.state(), VaultState::Unlocked);
        assert_eq!(session.read_user().unwrap().uid, "user-1");
        session.close();
        vault.lock();

        assert!(matches!(
            vault.unlock_with_pin(PIN).await,
            Err(Error::WrongCredential)
        ));

        let session = vault.unlock_with_pin("654321").await.unwrap();
        assert_eq!(session.contacts().len(), 1);
        session.close();

        // The phrase itself is untouched
        assert!(vault.verify_phrase(PHRASE).await.is_ok());
    }

    #[tokio::test]
    async fn test_change_pin_requires_correct_phrase() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        let result = vault.change_pin("654321", "wrong words entirely").await;
        assert!(matches!(result, Err(Error::WrongCredential)));

        // Old PIN still works
        assert!(vault.unlock_with_pin(PIN).await.is_ok());
    }

    #[tokio::test]
    async fn test_restore_from_phrase() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let mut session = vault.initialize(PIN, PHRASE).await.unwrap();
        session
            .write_user(UserProfile::new("user-1"), vec![], vec![])
            .unwrap();
        session.close();

        // PIN lost; phrase alone reopens the data
        let session = vault.restore_from_phrase(PHRASE).await.unwrap();
        assert_eq!(session.read_user().unwrap().uid, "user-1");
        session.close();

        assert!(matches!(
            vault.restore_from_phrase("wrong words entirely").await,
            Err(Error::WrongCredential)
        ));
    }

    #[tokio::test]
    async fn test_restore_from_backup_flattens_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let session = vault.restore_from_backup(PIN, &backup_payload()).await.unwrap();

        assert_eq!(session.read_user().unwrap().uid, "user-1");
        assert_eq!(session.contacts().len(), 1);

        let chat = &session.chats()[0];
        let ids: Vec<&str> = chat.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m-2", "m-1"]);
        assert!(chat.queue.is_empty());
        session.close();

        // The restored vault unlocks with the PIN given at restore time
        let session = vault.unlock_with_pin(PIN).await.unwrap();
        assert_eq!(session.read_user().unwrap().name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn test_restore_from_backup_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let result = vault
            .restore_from_backup(PIN, br#"{"user": {"uid": "u"}}"#)
            .await;
        assert!(matches!(result, Err(Error::MalformedBackup(_))));

        // Nothing was created
        assert!(!vault.config().seed_path().exists());
        assert!(!vault.config().main_path().exists());
        assert!(!vault.config().salt_path().exists());
    }

    #[tokio::test]
    async fn test_restore_from_backup_onto_existing_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let mut session = vault.initialize(PIN, PHRASE).await.unwrap();
        session
            .write_user(
                UserProfile::new("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![],
            )
            .unwrap();
        session.close();

        // Restore with a different PIN; backup carries the same phrase
        let session = vault.restore_from_backup("999999", &backup_payload()).await.unwrap();

        // Existing records merged with the backup's
        let ids: Vec<&str> = session.contacts().iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"c-1"));
        assert!(ids.contains(&"c-2"));
        session.close();

        assert!(vault.unlock_with_pin("999999").await.is_ok());
        assert!(matches!(
            vault.unlock_with_pin(PIN).await,
            Err(Error::WrongCredential)
        ));
    }

    #[tokio::test]
    async fn test_restore_from_backup_retry_converges() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let mut session = vault.initialize(PIN, PHRASE).await.unwrap();
        session
            .write_user(
                UserProfile::new("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![],
            )
            .unwrap();
        session.close();

        let session = vault.restore_from_backup(PIN, &backup_payload()).await.unwrap();
        let contacts_first: Vec<String> =
            session.contacts().iter().map(|c| c.id.clone()).collect();
        session.close();

        // Running the same payload again merges onto its own result
        let session = vault.restore_from_backup(PIN, &backup_payload()).await.unwrap();
        let contacts_second: Vec<String> =
            session.contacts().iter().map(|c| c.id.clone()).collect();
        assert_eq!(contacts_first, contacts_second);
        assert_eq!(session.chats().len(), 1);
        assert_eq!(session.chats()[0].messages.len(), 2);
        session.close();
    }

    #[tokio::test]
    async fn test_transition_rejected_while_gate_held() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        let guard = vault.gate.try_write().unwrap();

        assert!(matches!(
            vault.initialize(PIN, PHRASE).await,
            Err(Error::VaultBusy)
        ));
        assert!(matches!(vault.verify_pin(PIN).await, Err(Error::VaultBusy)));

        // A rejected call never moves the state machine
        assert_eq!(vault.state(), VaultState::Locked);

        drop(guard);
        assert!(vault.initialize(PIN, PHRASE).await.is_ok());
    }

    #[tokio::test]
    async fn test_verifies_share_the_gate() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        let _read_guard = vault.gate.try_read().unwrap();

        // Verifies run alongside other verifies
        assert!(vault.verify_pin(PIN).await.is_ok());
        assert!(vault.verify_phrase(PHRASE).await.is_ok());

        // Mutations do not
        assert!(matches!(
            vault.change_pin("654321", PHRASE).await,
            Err(Error::VaultBusy)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_unlock_single_winner() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(new_vault(dir.path()));

        vault.initialize(PIN, PHRASE).await.unwrap().close();

        let a = tokio::spawn({
            let vault = vault.clone();
            async move { vault.unlock_with_pin(PIN).await.map(|s| s.close()) }
        });
        let b = tokio::spawn({
            let vault = vault.clone();
            async move { vault.unlock_with_pin(PIN).await.map(|s| s.close()) }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        assert!(results.iter().any(|r| r.is_ok()));
        for result in results {
            if let Err(e) = result {
                assert!(matches!(e, Error::VaultBusy));
            }
        }
    }

    #[tokio::test]
    async fn test_state_machine_reports_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let vault = new_vault(dir.path());
        assert_eq!(vault.state(), VaultState::Locked);

        vault.initialize(PIN, PHRASE).await.unwrap().close();
        assert_eq!(vault.state(), VaultState::Unlocked);

        vault.lock();
        assert_eq!(vault.state(), VaultState::Locked);

        let _ = vault.unlock_with_pin("000000").await;
        assert_eq!(
            vault.state(),
            VaultState::Failed(ErrorKind::WrongCredential)
        );

        // Failed is re-entrant
        assert!(vault.unlock_with_pin(PIN).await.is_ok());
        assert_eq!(vault.state(), VaultState::Unlocked);
    }
}
