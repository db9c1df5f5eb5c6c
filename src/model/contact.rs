//! # Contacts
//!
//! Address-book records, keyed by `id`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A contact record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    /// Stable contact identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Optional path reference to the contact's photo
    #[serde(default)]
    pub picture: Option<String>,
}

impl Contact {
    /// Create a contact
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            picture: None,
        }
    }

    /// Validate the contact before it is written
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::WriteError("Contact id cannot be empty".into()));
        }
        Ok(())
    }
}
