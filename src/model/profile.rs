//! # User Profile
//!
//! The MainStore's singleton record describing the device owner.
//!
//! There is exactly one profile per vault. Writes go through
//! `write_user` / `save_photo`, both of which upsert this single record.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum length for the display name
pub const MAX_NAME_LENGTH: usize = 64;

/// The device owner's profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Stable user identifier
    pub uid: String,

    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,

    /// Optional path reference to the profile photo (the image bytes live
    /// outside the vault)
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserProfile {
    /// Create a profile with just an identifier
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: None,
            picture: None,
        }
    }

    /// Validate the profile before it is written
    pub fn validate(&self) -> Result<()> {
        if self.uid.is_empty() {
            return Err(Error::WriteError("Profile uid cannot be empty".into()));
        }

        if let Some(ref name) = self.name {
            if name.len() > MAX_NAME_LENGTH {
                return Err(Error::WriteError(format!(
                    "Profile name too long: max {} characters",
                    MAX_NAME_LENGTH
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
