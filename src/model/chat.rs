//! # Chats, Messages, and File Metadata
//!
//! A `Chat` owns its messages outright: a `Message` exists nowhere except
//! nested inside exactly one chat, so chat membership can never dangle.
//!
//! Each chat carries two message collections with different lifecycles:
//!
//! - `messages` — the ordered delivered history. Order is meaningful and
//!   preserved by every store operation.
//! - `queue` — outbound messages not yet handed to the transport. The queue
//!   is device-local state: a restore from a backup file always resets it to
//!   empty rather than resurrecting another device's unsent backlog.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Metadata for a file attachment
///
/// The vault stores only metadata; the file bytes live outside it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FileMeta {
    /// Original file name
    #[serde(default)]
    pub name: String,

    /// MIME type, if known
    #[serde(default)]
    pub mime_type: Option<String>,

    /// File size in bytes
    #[serde(default)]
    pub size: u64,

    /// Path reference to the file on local storage
    #[serde(default)]
    pub path: String,
}

/// A single message inside a chat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Stable message identifier
    pub id: String,

    /// Sender's user identifier
    #[serde(default)]
    pub sender: String,

    /// Message body text
    #[serde(default)]
    pub body: String,

    /// Unix timestamp when sent (milliseconds)
    #[serde(default)]
    pub timestamp: i64,

    /// Optional file attachment metadata
    #[serde(default)]
    pub file: Option<FileMeta>,
}

impl Message {
    /// Create a text message
    pub fn new(
        id: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            body: body.into(),
            timestamp,
            file: None,
        }
    }
}

/// A conversation record, keyed by `id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    /// Stable chat identifier
    pub id: String,

    /// Optional display name (broadcast chats)
    #[serde(default)]
    pub name: Option<String>,

    /// Contacts participating in this chat
    #[serde(default)]
    pub contact_ids: Vec<String>,

    /// Ordered delivered message history
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Outbound messages not yet delivered
    #[serde(default)]
    pub queue: Vec<Message>,
}

impl Chat {
    /// Create an empty chat
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            contact_ids: Vec::new(),
            messages: Vec::new(),
            queue: Vec::new(),
        }
    }

    /// Validate the chat before it is written
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::WriteError("Chat id cannot be empty".into()));
        }

        for message in self.messages.iter().chain(self.queue.iter()) {
            if message.id.is_empty() {
                return Err(Error::WriteError(format!(
                    "Message with empty id in chat '{}'",
                    self.id
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
