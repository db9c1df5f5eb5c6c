//! # Data Model
//!
//! The record families persisted by the MainStore, plus the backup payload
//! the restore flow accepts.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          RECORD FAMILIES                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  UserProfile (singleton)      the device owner                          │
//! │  Contact     (by id)          address book entries                      │
//! │  Chat        (by id)          one conversation:                         │
//! │                                 messages  - ordered delivered history   │
//! │                                 queue     - outbound, not yet delivered │
//! │  Message     (nested)         belongs to exactly one chat               │
//! │  FileMeta    (nested)         attachment metadata; bytes live outside   │
//! │                               the vault                                 │
//! │                                                                         │
//! │  Identity is always the explicit `id` field, never position.            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod backup;
mod chat;
mod contact;
mod profile;

pub use backup::{BackupPayload, BackupSeed, BackupUser, NormalizedBackup};
pub use chat::{Chat, FileMeta, Message};
pub use contact::Contact;
pub use profile::{UserProfile, MAX_NAME_LENGTH};
