//! # Backup Payloads
//!
//! Parsing and normalization of exported backup files.
//!
//! ## Payload Shape
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         BACKUP PAYLOAD (JSON)                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  {                                                                      │
//! │    "seed": { "seed": "<recovery phrase text>" },                        │
//! │    "user": {                                                            │
//! │      "uid": "...", "name": "...", "picture": "...",                     │
//! │      "contacts": { "<id>": { ...contact fields... }, ... },             │
//! │      "chats": {                                                         │
//! │        "<id>": {                                                        │
//! │          ...chat fields...,                                             │
//! │          "messages": { "<id>": { ...message fields... }, ... },         │
//! │          "queue":    [ ...ignored, reset on restore... ]                │
//! │        }                                                                │
//! │      }                                                                  │
//! │    }                                                                    │
//! │  }                                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Normalization Rules
//!
//! - Map-shaped collections flatten to vectors in document order; an entry's
//!   embedded `id` field wins over its map key, and a missing `id` is filled
//!   from the key. Already-flat message arrays are accepted as-is.
//! - Every chat's outbound `queue` is reset to empty. The queue is
//!   device-local state and must not resurrect another device's backlog.
//! - Shape violations (missing required keys, wrong-typed collections,
//!   empty identifiers) fail with `MalformedBackup` before any store is
//!   touched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{Chat, Contact, Message, UserProfile};

/// The seed section of a backup payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSeed {
    /// The recovery phrase text
    pub seed: String,
}

/// The user section of a backup payload
///
/// Field aliases accept the export dialects that used `id`/`image` for the
/// profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupUser {
    /// User identifier
    #[serde(alias = "id")]
    pub uid: String,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// Profile photo path reference
    #[serde(default, alias = "image")]
    pub picture: Option<String>,

    /// Contacts keyed by id
    pub contacts: Map<String, Value>,

    /// Chats keyed by id
    pub chats: Map<String, Value>,
}

/// A parsed backup payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupPayload {
    /// Recovery phrase section
    pub seed: BackupSeed,
    /// User data section
    pub user: BackupUser,
}

/// Backup data after normalization, ready for a single `write_user` call
#[derive(Debug, Clone)]
pub struct NormalizedBackup {
    /// The profile singleton
    pub profile: UserProfile,
    /// Contacts in document order
    pub contacts: Vec<Contact>,
    /// Chats in document order, queues reset
    pub chats: Vec<Chat>,
}

impl BackupPayload {
    /// Parse a payload from JSON text
    pub fn from_str(json: &str) -> Result<Self> {
        let payload: Self = serde_json::from_str(json)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Parse a payload from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let payload: Self = serde_json::from_slice(bytes)?;
        payload.validate()?;
        Ok(payload)
    }

    /// Parse a payload from an already-deserialized JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        let payload: Self = serde_json::from_value(value)?;
        payload.validate()?;
        Ok(payload)
    }

    /// The recovery phrase carried by this backup
    pub fn phrase(&self) -> &str {
        &self.seed.seed
    }

    /// Check the payload's required keys
    pub fn validate(&self) -> Result<()> {
        if self.seed.seed.is_empty() {
            return Err(Error::MalformedBackup(
                "Backup seed phrase must be non-empty".into(),
            ));
        }
        if self.user.uid.is_empty() {
            return Err(Error::MalformedBackup(
                "Backup user id must be non-empty".into(),
            ));
        }
        Ok(())
    }

    /// Flatten the payload into store records
    ///
    /// Applies the normalization rules documented at module level. The
    /// payload itself is not mutated; restore flows re-read nothing from it
    /// after this call.
    pub fn normalize(&self) -> Result<NormalizedBackup> {
        self.validate()?;

        let profile = UserProfile {
            uid: self.user.uid.clone(),
            name: self.user.name.clone(),
            picture: self.user.picture.clone(),
        };

        let contacts = self
            .user
            .contacts
            .iter()
            .map(|(key, value)| contact_from_entry(key, value))
            .collect::<Result<Vec<_>>>()?;

        let chats = self
            .user
            .chats
            .iter()
            .map(|(key, value)| chat_from_entry(key, value))
            .collect::<Result<Vec<_>>>()?;

        Ok(NormalizedBackup {
            profile,
            contacts,
            chats,
        })
    }
}

/// Clone a map entry as an object, filling a missing `id` from the map key
fn object_with_id(key: &str, value: &Value, what: &str) -> Result<Map<String, Value>> {
    let mut obj = match value.as_object() {
        Some(obj) => obj.clone(),
        None => {
            return Err(Error::MalformedBackup(format!(
                "{} entry '{}' must be an object",
                what, key
            )))
        }
    };

    obj.entry("id")
        .or_insert_with(|| Value::String(key.to_string()));

    Ok(obj)
}

fn contact_from_entry(key: &str, value: &Value) -> Result<Contact> {
    let obj = object_with_id(key, value, "Contact")?;
    let contact: Contact = serde_json::from_value(Value::Object(obj))?;

    if contact.id.is_empty() {
        return Err(Error::MalformedBackup(format!(
            "Contact entry '{}' has an empty id",
            key
        )));
    }

    Ok(contact)
}

fn message_from_entry(key: &str, value: &Value) -> Result<Message> {
    let obj = object_with_id(key, value, "Message")?;
    let message: Message = serde_json::from_value(Value::Object(obj))?;

    if message.id.is_empty() {
        return Err(Error::MalformedBackup(format!(
            "Message entry '{}' has an empty id",
            key
        )));
    }

    Ok(message)
}

fn chat_from_entry(key: &str, value: &Value) -> Result<Chat> {
    let mut obj = object_with_id(key, value, "Chat")?;

    // Pull the message collections out before the typed parse; their backup
    // shape differs from the store shape.
    let messages_value = obj.remove("messages");
    obj.remove("queue");

    let mut chat: Chat = serde_json::from_value(Value::Object(obj))?;

    if chat.id.is_empty() {
        return Err(Error::MalformedBackup(format!(
            "Chat entry '{}' has an empty id",
            key
        )));
    }

    chat.messages = match messages_value {
        None => Vec::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| message_from_entry(k, v))
            .collect::<Result<Vec<_>>>()?,
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| {
                let message: Message = serde_json::from_value(item)?;
                if message.id.is_empty() {
                    return Err(Error::MalformedBackup(format!(
                        "Message with empty id in chat '{}'",
                        chat.id
                    )));
                }
                Ok(message)
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => {
            return Err(Error::MalformedBackup(format!(
                "Chat '{}' messages must be a map or an array",
                chat.id
            )))
        }
    };

    // Outbound queue never survives a restore
    chat.queue = Vec::new();

    Ok(chat)
}

// ============================================================================
// TESTS
// ============================================================================
