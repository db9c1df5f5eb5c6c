//! # Vault Session
//!
//! An unlocked vault, materialized as an owned value.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          VAULT SESSION                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  VaultSession (owned by the caller, Send)                               │
//! │  ├── SeedStore handle      private, never exposed                       │
//! │  ├── MainStore handle      read_user / write_user / save_photo          │
//! │  └── VaultListener         optional, read-only, refresh on demand       │
//! │                                                                         │
//! │  Dropping the session drops the handles; the keys inside them are       │
//! │  zeroized. There is no global registry and no way to reach a session    │
//! │  other than holding the value.                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session exposes main-store data only. The seed store handle is held
//! so the PIN-derived key lives exactly as long as the session, but no
//! method reads through it.

use tracing::debug;

use crate::error::Result;
use crate::model::{Chat, Contact, UserProfile};
use crate::storage::{MainStore, SeedStore};

/// Read-only observer over the main store file
///
/// A listener sees the snapshot that existed when it was attached (or last
/// refreshed); it never writes.
#[derive(Debug)]
pub struct VaultListener {
    store: MainStore,
}

impl VaultListener {
    /// Re-read the snapshot, picking up writes made since the last refresh
    pub fn refresh(&mut self) -> Result<()> {
        self.store.reload()
    }

    /// Read the profile singleton
    pub fn read_user(&self) -> Result<&UserProfile> {
        self.store.read_user()
    }

    /// Stored contacts in insertion order
    pub fn contacts(&self) -> &[Contact] {
        self.store.contacts()
    }

    /// Stored chats in insertion order
    pub fn chats(&self) -> &[Chat] {
        self.store.chats()
    }
}

/// Handles onto an unlocked vault
#[derive(Debug)]
pub struct VaultSession {
    /// Held so the PIN-derived key lives as long as the session; nothing
    /// is ever read through it. Absent after a phrase-only restore, where
    /// no PIN exists yet.
    #[allow(dead_code)]
    seed: Option<SeedStore>,
    main: MainStore,
    listener: Option<VaultListener>,
}

impl VaultSession {
    pub(crate) fn new(seed: Option<SeedStore>, main: MainStore) -> Self {
        Self {
            seed,
            main,
            listener: None,
        }
    }

    /// Read the profile singleton
    pub fn read_user(&self) -> Result<&UserProfile> {
        self.main.read_user()
    }

    /// Write the profile and merge contact/chat collections by id
    ///
    /// Empty collections leave the stored ones untouched. The call is a
    /// single transaction: on failure nothing changes. Returns the profile
    /// as stored.
    pub fn write_user(
        &mut self,
        profile: UserProfile,
        contacts: Vec<Contact>,
        chats: Vec<Chat>,
    ) -> Result<UserProfile> {
        self.main.write_user(profile, contacts, chats)
    }

    /// Update the profile photo path reference, returning the updated profile
    pub fn save_photo(&mut self, user_id: &str, path_ref: &str) -> Result<UserProfile> {
        self.main.save_photo(user_id, path_ref)
    }

    /// Stored contacts in insertion order
    pub fn contacts(&self) -> &[Contact] {
        self.main.contacts()
    }

    /// Stored chats in insertion order
    pub fn chats(&self) -> &[Chat] {
        self.main.chats()
    }

    /// Attach a read-only listener over the main store, if none is attached
    pub fn attach_listener(&mut self) -> Result<()> {
        if self.listener.is_none() {
            let store = self.main.open_listener()?;
            self.listener = Some(VaultListener { store });
        }
        Ok(())
    }

    /// The attached listener, if any
    pub fn listener(&self) -> Option<&VaultListener> {
        self.listener.as_ref()
    }

    /// The attached listener, mutably (required for [`VaultListener::refresh`])
    pub fn listener_mut(&mut self) -> Option<&mut VaultListener> {
        self.listener.as_mut()
    }

    /// Drop the listener handle
    pub fn detach_listener(&mut self) {
        self.listener = None;
    }

    /// Close the session, dropping all store handles and wiping their keys
    ///
    /// Equivalent to dropping the value; exists so call sites can make the
    /// end of a session visible.
    pub fn close(self) {
        debug!("Vault session closed");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EncryptionKey, SecretKind};

    fn open_session(dir: &std::path::Path) -> VaultSession {
        let key = EncryptionKey::from_bytes([3u8; 32], SecretKind::Phrase);
        let main = MainStore::create(&dir.join("main.vault"), key).unwrap();
        VaultSession::new(None, main)
    }

    #[test]
    fn test_session_delegates_reads_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_session(dir.path());

        session
            .write_user(
                UserProfile::new("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![],
            )
            .unwrap();

        assert_eq!(session.read_user().unwrap().uid, "user-1");
        assert_eq!(session.contacts().len(), 1);

        session.save_photo("user-1", "/photos/me.jpg").unwrap();
        assert_eq!(
            session.read_user().unwrap().picture.as_deref(),
            Some("/photos/me.jpg")
        );
    }

    #[test]
    fn test_listener_sees_writes_after_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_session(dir.path());

        session
            .write_user(UserProfile::new("user-1"), vec![], vec![])
            .unwrap();

        session.attach_listener().unwrap();
        assert!(session.listener().is_some());

        session
            .write_user(
                UserProfile::new("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![],
            )
            .unwrap();

        // Stale until refreshed
        assert!(session.listener().unwrap().contacts().is_empty());
        session.listener_mut().unwrap().refresh().unwrap();
        assert_eq!(session.listener().unwrap().contacts().len(), 1);
    }

    #[test]
    fn test_attach_listener_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = open_session(dir.path());

        session.attach_listener().unwrap();
        session.attach_listener().unwrap();
        assert!(session.listener().is_some());

        session.detach_listener();
        assert!(session.listener().is_none());
    }

    #[test]
    fn test_close_consumes_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = open_session(dir.path());
        session.close();
    }
}
