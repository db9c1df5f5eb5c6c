//! # Main Store
//!
//! Multi-record encrypted container for the user's profile, contacts and
//! chats.
//!
//! ## Record Families
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           MAIN STORE STATE                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  user       Option<UserProfile>   singleton, set by write_user         │
//! │  contacts   Vec<Contact>          upsert-by-id, insertion ordered      │
//! │  chats      Vec<Chat>             upsert-by-id, insertion ordered      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Semantics
//!
//! Every mutating call is a single transaction: inputs validate first, the
//! merged state seals and lands atomically on disk, and only then does the
//! in-memory state flip. A failed call leaves both the file and the handle
//! exactly as they were.
//!
//! Read-only handles (listeners) observe the same file and refresh with
//! [`MainStore::reload`]; any mutation through them is rejected.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{self, EncryptionKey, StoreKind};
use crate::error::{Error, Result, StoreOpenError};
use crate::model::{Chat, Contact, UserProfile};

/// Full record set held by a main store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct MainState {
    user: Option<UserProfile>,
    contacts: Vec<Contact>,
    chats: Vec<Chat>,
}

/// Encrypted multi-record store for profile, contacts and chats
#[derive(Debug)]
pub struct MainStore {
    path: PathBuf,
    key: EncryptionKey,
    state: MainState,
    read_only: bool,
}

impl MainStore {
    /// Create a new, empty store file at `path`
    pub fn create(path: &Path, key: EncryptionKey) -> Result<Self> {
        let store = Self {
            path: path.to_path_buf(),
            key,
            state: MainState::default(),
            read_only: false,
        };
        store.persist(&store.state)?;

        debug!("Main store created at {:?}", store.path);
        Ok(store)
    }

    /// Open an existing store file for reading and writing
    pub fn open(path: &Path, key: EncryptionKey) -> Result<Self> {
        let state = load_state(path, &key)?;
        Ok(Self {
            path: path.to_path_buf(),
            key,
            state,
            read_only: false,
        })
    }

    /// Open an existing store file as a read-only observer
    pub fn open_read_only(path: &Path, key: EncryptionKey) -> Result<Self> {
        let state = load_state(path, &key)?;
        Ok(Self {
            path: path.to_path_buf(),
            key,
            state,
            read_only: true,
        })
    }

    /// Open a second, read-only handle onto this store's file
    pub fn open_listener(&self) -> Result<MainStore> {
        let key = EncryptionKey::from_bytes(*self.key.as_bytes(), self.key.kind());
        Self::open_read_only(&self.path, key)
    }

    /// Re-read the snapshot from disk, picking up another handle's writes
    pub fn reload(&mut self) -> Result<()> {
        self.state = load_state(&self.path, &self.key)?;
        Ok(())
    }

    /// Write the profile and merge contact/chat collections
    ///
    /// The profile replaces the singleton. Contacts and chats merge by id:
    /// an incoming record replaces the stored one with the same id in
    /// place, new ids append in input order, and records not mentioned are
    /// untouched. Duplicate ids within one call resolve last-write-wins.
    /// Returns the profile as stored.
    pub fn write_user(
        &mut self,
        profile: UserProfile,
        contacts: Vec<Contact>,
        chats: Vec<Chat>,
    ) -> Result<UserProfile> {
        self.check_writable()?;

        // Validate everything before any state moves
        profile.validate()?;
        for contact in &contacts {
            contact.validate()?;
        }
        for chat in &chats {
            chat.validate()?;
        }

        let mut next = self.state.clone();
        next.user = Some(profile);
        upsert_by_id(&mut next.contacts, contacts, |c| c.id.as_str());
        upsert_by_id(&mut next.chats, chats, |c| c.id.as_str());

        self.persist(&next)?;
        self.state = next;

        debug!(
            "Main store committed: {} contacts, {} chats",
            self.state.contacts.len(),
            self.state.chats.len()
        );
        self.read_user().cloned()
    }

    /// Update the profile photo path reference, returning the updated profile
    ///
    /// Fails with `WriteError` when the store holds no profile or `user_id`
    /// names a different one.
    pub fn save_photo(&mut self, user_id: &str, path_ref: &str) -> Result<UserProfile> {
        self.check_writable()?;

        let user = match &self.state.user {
            Some(user) => user,
            None => return Err(Error::WriteError("Main store holds no profile".into())),
        };
        if user.uid != user_id {
            return Err(Error::WriteError(format!(
                "Photo update targets unknown user '{}'",
                user_id
            )));
        }

        let mut next = self.state.clone();
        if let Some(user) = next.user.as_mut() {
            user.picture = Some(path_ref.to_string());
        }

        self.persist(&next)?;
        self.state = next;
        self.read_user().cloned()
    }

    /// Read the profile singleton, failing if none was ever written
    pub fn read_user(&self) -> Result<&UserProfile> {
        self.state
            .user
            .as_ref()
            .ok_or_else(|| Error::NotFound("Main store holds no profile".into()))
    }

    /// Stored contacts in insertion order
    pub fn contacts(&self) -> &[Contact] {
        &self.state.contacts
    }

    /// Stored chats in insertion order
    pub fn chats(&self) -> &[Chat] {
        &self.state.chats
    }

    /// The store's file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::WriteError(
                "Store handle is read-only".into(),
            ));
        }
        Ok(())
    }

    /// Serialize, seal and atomically write a candidate state
    fn persist(&self, state: &MainState) -> Result<()> {
        let plaintext = Zeroizing::new(bincode::serialize(state)?);
        let sealed = crypto::seal(&self.key, StoreKind::Main, &plaintext)?;

        super::atomic_write_file(&self.path, &sealed)
            .map_err(|e| Error::WriteError(format!("Main store write failed: {}", e)))
    }
}

fn load_state(path: &Path, key: &EncryptionKey) -> Result<MainState> {
    let sealed = std::fs::read(path).map_err(StoreOpenError::from)?;
    let plaintext = Zeroizing::new(crypto::open(key, StoreKind::Main, &sealed)?);

    let state = bincode::deserialize(plaintext.as_slice())
        .map_err(|e| StoreOpenError::Corrupt(format!("Main store payload invalid: {}", e)))?;
    Ok(state)
}

/// Merge `incoming` into `existing` by id: replace in place or append.
///
/// Later duplicates within `incoming` overwrite earlier ones.
fn upsert_by_id<T>(existing: &mut Vec<T>, incoming: Vec<T>, id_of: fn(&T) -> &str) {
    for item in incoming {
        match existing
            .iter()
            .position(|candidate| id_of(candidate) == id_of(&item))
        {
            Some(index) => existing[index] = item,
            None => existing.push(item),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecretKind;
    use crate::model::Message;

    fn test_key(byte: u8) -> EncryptionKey {
        EncryptionKey::from_bytes([byte; 32], SecretKind::Phrase)
    }

    fn profile(uid: &str) -> UserProfile {
        UserProfile::new(uid.to_string())
    }

    #[test]
    fn test_new_store_has_no_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let store = MainStore::create(&path, test_key(1)).unwrap();

        assert!(matches!(store.read_user(), Err(Error::NotFound(_))));
        assert!(store.contacts().is_empty());
        assert!(store.chats().is_empty());
    }

    #[test]
    fn test_write_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut store = MainStore::create(&path, test_key(1)).unwrap();
        let written = store
            .write_user(
                profile("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![Chat::new("chat-1")],
            )
            .unwrap();
        assert_eq!(written.uid, "user-1");
        drop(store);

        let store = MainStore::open(&path, test_key(1)).unwrap();
        assert_eq!(store.read_user().unwrap().uid, "user-1");
        assert_eq!(store.contacts().len(), 1);
        assert_eq!(store.chats().len(), 1);
    }

    #[test]
    fn test_incremental_upsert_merges_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut store = MainStore::create(&path, test_key(1)).unwrap();
        store
            .write_user(
                profile("user-1"),
                vec![
                    Contact::new("c-1", "Bob"),
                    Contact::new("c-2", "Carol"),
                ],
                vec![],
            )
            .unwrap();

        // Second call updates c-1 and adds c-3; c-2 is untouched
        store
            .write_user(
                profile("user-1"),
                vec![
                    Contact::new("c-1", "Bobby"),
                    Contact::new("c-3", "Dave"),
                ],
                vec![],
            )
            .unwrap();

        let names: Vec<&str> = store.contacts().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bobby", "Carol", "Dave"]);
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut store = MainStore::create(&path, test_key(1)).unwrap();
        store
            .write_user(
                profile("user-1"),
                vec![
                    Contact::new("c-1", "first"),
                    Contact::new("c-1", "second"),
                ],
                vec![],
            )
            .unwrap();

        assert_eq!(store.contacts().len(), 1);
        assert_eq!(store.contacts()[0].name, "second");
    }

    #[test]
    fn test_invalid_input_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut store = MainStore::create(&path, test_key(1)).unwrap();
        store
            .write_user(profile("user-1"), vec![], vec![])
            .unwrap();

        let result = store.write_user(
            profile("user-1"),
            vec![Contact::new("", "nameless")],
            vec![],
        );
        assert!(matches!(result, Err(Error::WriteError(_))));
        assert!(store.contacts().is_empty());

        // Disk snapshot is also untouched
        let reopened = MainStore::open(&path, test_key(1)).unwrap();
        assert!(reopened.contacts().is_empty());
    }

    #[test]
    fn test_wrong_key_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        MainStore::create(&path, test_key(1)).unwrap();

        let result = MainStore::open(&path, test_key(2));
        assert!(matches!(
            result,
            Err(Error::StoreOpen(StoreOpenError::WrongKey))
        ));
    }

    #[test]
    fn test_listener_is_read_only_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut writer = MainStore::create(&path, test_key(1)).unwrap();
        writer
            .write_user(profile("user-1"), vec![], vec![])
            .unwrap();

        let mut listener = writer.open_listener().unwrap();
        assert_eq!(listener.read_user().unwrap().uid, "user-1");

        let result = listener.write_user(profile("user-2"), vec![], vec![]);
        assert!(matches!(result, Err(Error::WriteError(_))));

        writer
            .write_user(
                profile("user-1"),
                vec![Contact::new("c-1", "Bob")],
                vec![],
            )
            .unwrap();

        assert!(listener.contacts().is_empty());
        listener.reload().unwrap();
        assert_eq!(listener.contacts().len(), 1);
    }

    #[test]
    fn test_save_photo_updates_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut store = MainStore::create(&path, test_key(1)).unwrap();
        store
            .write_user(profile("user-1"), vec![], vec![])
            .unwrap();

        let updated = store.save_photo("user-1", "/photos/me.jpg").unwrap();
        assert_eq!(updated.picture.as_deref(), Some("/photos/me.jpg"));
        assert_eq!(
            store.read_user().unwrap().picture.as_deref(),
            Some("/photos/me.jpg")
        );

        drop(store);
        let store = MainStore::open(&path, test_key(1)).unwrap();
        assert_eq!(
            store.read_user().unwrap().picture.as_deref(),
            Some("/photos/me.jpg")
        );
    }

    #[test]
    fn test_save_photo_for_unknown_user_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut store = MainStore::create(&path, test_key(1)).unwrap();

        // No profile yet: a write failure, not a lookup miss
        assert!(matches!(
            store.save_photo("user-1", "/p.jpg"),
            Err(Error::WriteError(_))
        ));

        store
            .write_user(profile("user-1"), vec![], vec![])
            .unwrap();

        // Wrong uid
        assert!(matches!(
            store.save_photo("someone-else", "/p.jpg"),
            Err(Error::WriteError(_))
        ));
    }

    #[test]
    fn test_message_order_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.vault");

        let mut chat = Chat::new("chat-1");
        chat.messages = vec![
            Message::new("m-3", "a", "third", 3),
            Message::new("m-1", "a", "first", 1),
            Message::new("m-2", "b", "second", 2),
        ];

        let mut store = MainStore::create(&path, test_key(1)).unwrap();
        store
            .write_user(profile("user-1"), vec![], vec![chat])
            .unwrap();
        drop(store);

        let store = MainStore::open(&path, test_key(1)).unwrap();
        let ids: Vec<&str> = store.chats()[0]
            .messages
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m-3", "m-1", "m-2"]);
    }
}
